//! 圆盘碰撞力场
//!
//! 用 [`crate::math::disc_ray_trace`] 对每个粒子本帧的运动线段做
//! 圆盘求交；命中时按配置反弹或击杀粒子。`radius` 为 0 表示无限
//! 平面。

use crate::core::error::ForceError;
use crate::force::{Force, ForceContext};
use crate::impl_default;
use crate::math::disc_ray_trace;
use serde::{Deserialize, Serialize};

use glam::Vec3;

/// 表面偏移量，反弹后把粒子挪离平面以免下一帧重复命中
const SURFACE_OFFSET: f32 = 1e-3;

/// 命中后的碰撞响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CollisionResponse {
    /// 沿法线反射速度，`elasticity` 为速度保留比例（0-1）
    Reflect { elasticity: f32 },
    /// 销毁粒子
    Kill,
}

/// 圆盘碰撞配置（字段声明顺序即序列化顺序）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscConfig {
    /// 调度优先级
    pub priority: i32,
    /// 圆盘原点
    pub origin: Vec3,
    /// 圆盘法向量
    pub normal: Vec3,
    /// 半径，0 表示无限平面
    pub radius: f32,
    /// 碰撞响应
    pub response: CollisionResponse,
}

impl_default!(DiscConfig {
    priority: 100,
    origin: Vec3::ZERO,
    normal: Vec3::Y,
    radius: 0.0,
    response: CollisionResponse::Reflect { elasticity: 0.6 },
});

/// 圆盘碰撞力场
#[derive(Debug, Clone)]
pub struct CollisionDiscForce {
    config: DiscConfig,
}

impl CollisionDiscForce {
    pub fn new(config: DiscConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DiscConfig {
        &self.config
    }
}

impl Force for CollisionDiscForce {
    fn type_name(&self) -> &'static str {
        "CollisionDiscForce"
    }

    fn priority(&self) -> i32 {
        self.config.priority
    }

    fn apply(&mut self, ctx: &mut ForceContext<'_>) -> Result<(), ForceError> {
        let normal = self.config.normal.normalize_or_zero();
        if normal == Vec3::ZERO {
            return Err(ForceError::InvalidConfig(
                "collision disc normal must be non-zero".into(),
            ));
        }

        for handle in ctx.affected_handles() {
            let (p1, p2) = match ctx.get(handle) {
                Some(p) => (p.location, p.location + p.velocity * ctx.delta_time),
                None => continue,
            };

            let Some(point) =
                disc_ray_trace(self.config.origin, normal, self.config.radius, p1, p2)
            else {
                continue;
            };

            match self.config.response {
                CollisionResponse::Kill => ctx.kill(handle),
                CollisionResponse::Reflect { elasticity } => {
                    // 入射侧符号决定把粒子挪离平面的方向
                    let side = (p1 - self.config.origin).dot(normal).signum();
                    if let Some(p) = ctx.get_mut(handle) {
                        let reflected =
                            p.velocity - normal * (2.0 * p.velocity.dot(normal));
                        p.velocity = reflected * elasticity.clamp(0.0, 1.0);
                        p.location = point + normal * SURFACE_OFFSET * side;
                    }
                }
            }
        }
        Ok(())
    }

    fn duplicate(&self) -> Box<dyn Force> {
        Box::new(Self::new(self.config.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;
    use crate::storage::ParticleArena;
    use crate::template::TemplateId;

    fn falling_particle(location: Vec3, velocity: Vec3) -> Particle {
        let mut p = Particle::new(TemplateId(0));
        p.location = location;
        p.velocity = velocity;
        p.age_remaining = 10.0;
        p
    }

    fn apply_once(force: &mut CollisionDiscForce, arena: &mut ParticleArena) -> Vec<crate::storage::ParticleHandle> {
        let mut kills = Vec::new();
        let mut ctx = ForceContext {
            particles: arena,
            delta_time: 1.0,
            elapsed: 0.0,
            attached: &[TemplateId(0)],
            kills: &mut kills,
        };
        force.apply(&mut ctx).unwrap();
        kills
    }

    #[test]
    fn test_reflect_on_plane_crossing() {
        let mut arena = ParticleArena::new();
        let h = arena.insert(falling_particle(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, -2.0, 0.0),
        ));

        let mut force = CollisionDiscForce::new(DiscConfig {
            priority: 0,
            origin: Vec3::ZERO,
            normal: Vec3::Y,
            radius: 0.0,
            response: CollisionResponse::Reflect { elasticity: 1.0 },
        });
        apply_once(&mut force, &mut arena);

        let p = arena.get(h).unwrap();
        assert!(p.velocity.y > 0.0, "velocity reflected upward");
        assert!(p.location.y >= 0.0, "particle placed on the incoming side");
    }

    #[test]
    fn test_kill_response_queues_particle() {
        let mut arena = ParticleArena::new();
        let h = arena.insert(falling_particle(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, -2.0, 0.0),
        ));

        let mut force = CollisionDiscForce::new(DiscConfig {
            priority: 0,
            origin: Vec3::ZERO,
            normal: Vec3::Y,
            radius: 5.0,
            response: CollisionResponse::Kill,
        });
        let kills = apply_once(&mut force, &mut arena);
        assert_eq!(kills, vec![h]);
        // 击杀同时在粒子上置位 pending_kill
        assert!(arena.get(h).unwrap().pending_kill);
    }

    #[test]
    fn test_miss_outside_radius() {
        let mut arena = ParticleArena::new();
        let h = arena.insert(falling_particle(
            Vec3::new(10.0, 1.0, 10.0),
            Vec3::new(0.0, -2.0, 0.0),
        ));

        let mut force = CollisionDiscForce::new(DiscConfig {
            priority: 0,
            origin: Vec3::ZERO,
            normal: Vec3::Y,
            radius: 5.0,
            response: CollisionResponse::Kill,
        });
        let kills = apply_once(&mut force, &mut arena);
        assert!(kills.is_empty());
        assert!(arena.contains(h));
    }

    #[test]
    fn test_zero_normal_is_config_error() {
        let mut arena = ParticleArena::new();
        arena.insert(falling_particle(Vec3::Y, Vec3::NEG_Y));

        let mut force = CollisionDiscForce::new(DiscConfig {
            normal: Vec3::ZERO,
            ..Default::default()
        });
        let mut kills = Vec::new();
        let mut ctx = ForceContext {
            particles: &mut arena,
            delta_time: 1.0,
            elapsed: 0.0,
            attached: &[TemplateId(0)],
            kills: &mut kills,
        };
        assert!(force.apply(&mut ctx).is_err());
    }
}
