//! 粒子仓与求交数学的属性测试
//!
//! 使用 proptest 验证任意操作序列下的链表不变量和圆盘求交的
//! 几何性质。

#[cfg(test)]
mod tests {
    use crate::math::disc_ray_trace;
    use crate::particle::Particle;
    use crate::storage::ParticleArena;
    use crate::template::TemplateId;
    use glam::Vec3;
    use proptest::prelude::*;

    fn finite_f32() -> impl Strategy<Value = f32> {
        (-1000.0f32..1000.0).prop_filter("must be finite", |x| x.is_finite())
    }

    fn valid_vec3() -> impl Strategy<Value = Vec3> {
        (finite_f32(), finite_f32(), finite_f32()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
    }

    /// 对粒子仓的一步操作：插入，或移除第 n 个已发出的句柄
    #[derive(Debug, Clone)]
    enum ArenaOp {
        Insert,
        Remove(usize),
    }

    fn arena_ops() -> impl Strategy<Value = Vec<ArenaOp>> {
        prop::collection::vec(
            prop_oneof![
                3 => Just(ArenaOp::Insert),
                2 => (0usize..64).prop_map(ArenaOp::Remove),
            ],
            1..200,
        )
    }

    proptest! {
        #[test]
        fn arena_stays_consistent_under_any_op_sequence(ops in arena_ops()) {
            let mut arena = ParticleArena::new();
            let mut issued = Vec::new();

            for op in ops {
                match op {
                    ArenaOp::Insert => {
                        issued.push(arena.insert(Particle::new(TemplateId(0))));
                    }
                    ArenaOp::Remove(index) => {
                        if !issued.is_empty() {
                            // 可能移除已经移除过的句柄：必须是幂等空操作
                            let handle = issued[index % issued.len()];
                            arena.remove(handle);
                        }
                    }
                }
                // 每步之后链接互相一致、无环、可达数等于 len
                prop_assert!(arena.check_consistency());
            }
        }

        #[test]
        fn removing_head_reports_was_head(extra in 0usize..8) {
            let mut arena = ParticleArena::new();
            for _ in 0..extra {
                arena.insert(Particle::new(TemplateId(0)));
            }
            let head = arena.insert(Particle::new(TemplateId(0)));

            let removed = arena.remove(head).unwrap();
            prop_assert!(removed.was_head);
            prop_assert!(arena.check_consistency());
        }

        #[test]
        fn segment_on_one_side_never_hits(
            origin in valid_vec3(),
            lateral_x in -500.0f32..500.0,
            lateral_y in -500.0f32..500.0,
            height1 in 0.001f32..100.0,
            height2 in 0.001f32..100.0,
        ) {
            // 两个端点都严格在平面上方：绝不能报告命中
            let normal = Vec3::Z;
            let lateral = Vec3::new(lateral_x, lateral_y, 0.0);
            let p1 = origin + lateral + Vec3::Z * height1;
            let p2 = origin - lateral + Vec3::Z * height2;
            prop_assert!(disc_ray_trace(origin, normal, 0.0, p1, p2).is_none());
        }

        #[test]
        fn zero_radius_hits_any_crossing(
            lateral_x in -500.0f32..500.0,
            lateral_y in -500.0f32..500.0,
            depth in 0.1f32..50.0,
        ) {
            // radius 0 是无限平面：任何穿越都命中，与横向距离无关
            let p1 = Vec3::new(lateral_x, lateral_y, depth);
            let p2 = Vec3::new(lateral_x, lateral_y, -depth);
            let hit = disc_ray_trace(Vec3::ZERO, Vec3::Z, 0.0, p1, p2);
            prop_assert!(hit.is_some());
            let point = hit.unwrap();
            prop_assert!(point.z.abs() < 1e-3);
        }
    }
}
