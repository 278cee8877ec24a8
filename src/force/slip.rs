//! 滑移约束力场
//!
//! 维持两个端点粒子之间的目标间距（`slip_distance`）。每 tick 把
//! 两个端点各朝满足约束的方向推进一小步——这是迭代式的位置约束，
//! 不是瞬时解算；在固定的小步长下间距误差单调不增。

use crate::core::error::ForceError;
use crate::force::{Force, ForceContext};
use crate::impl_default;
use crate::storage::ParticleHandle;
use serde::{Deserialize, Serialize};

/// 滑移约束配置（字段声明顺序即序列化顺序）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlipConfig {
    /// 调度优先级
    pub priority: i32,
    /// 目标间距
    pub slip_distance: f32,
    /// 刚度：每秒修正误差的比例
    pub stiffness: f32,
}

impl_default!(SlipConfig {
    priority: 0,
    slip_distance: 1.0,
    stiffness: 4.0,
});

/// 滑移约束力场
#[derive(Debug, Clone)]
pub struct SlipForce {
    config: SlipConfig,
    endpoint_a: Option<ParticleHandle>,
    endpoint_b: Option<ParticleHandle>,
}

impl SlipForce {
    pub fn new(config: SlipConfig) -> Self {
        Self {
            config,
            endpoint_a: None,
            endpoint_b: None,
        }
    }

    pub fn set_endpoints(&mut self, a: ParticleHandle, b: ParticleHandle) {
        self.endpoint_a = Some(a);
        self.endpoint_b = Some(b);
    }

    pub fn endpoints(&self) -> (Option<ParticleHandle>, Option<ParticleHandle>) {
        (self.endpoint_a, self.endpoint_b)
    }
}

impl Force for SlipForce {
    fn type_name(&self) -> &'static str {
        "SlipForce"
    }

    fn priority(&self) -> i32 {
        self.config.priority
    }

    fn apply(&mut self, ctx: &mut ForceContext<'_>) -> Result<(), ForceError> {
        let (a, b) = match (self.endpoint_a, self.endpoint_b) {
            (Some(a), Some(b)) => (a, b),
            _ => return Ok(()),
        };
        let (a_loc, b_loc) = match (ctx.get(a), ctx.get(b)) {
            (Some(pa), Some(pb)) => (pa.location, pb.location),
            _ => return Ok(()),
        };

        let offset = b_loc - a_loc;
        let distance = offset.length();
        if distance <= f32::EPSILON {
            // 重合端点没有确定的修正方向
            return Ok(());
        }

        let error = distance - self.config.slip_distance;
        // 修正比例钳制到 [0, 1]，保证误差单调不增、永不过冲
        let factor = (self.config.stiffness * ctx.delta_time).clamp(0.0, 1.0);
        let step = offset / distance * (error * factor * 0.5);

        if let Some(pa) = ctx.get_mut(a) {
            pa.location += step;
        }
        if let Some(pb) = ctx.get_mut(b) {
            pb.location -= step;
        }
        Ok(())
    }

    fn notify_particle_destroyed(&mut self, handle: ParticleHandle) {
        if self.endpoint_a == Some(handle) {
            self.endpoint_a = None;
        }
        if self.endpoint_b == Some(handle) {
            self.endpoint_b = None;
        }
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
    use glam::Vec3;

    fn particle_at(location: Vec3) -> Particle {
        let mut p = Particle::new(TemplateId(0));
        p.location = location;
        p.age_remaining = 10.0;
        p
    }

    #[test]
    fn test_convergence_is_monotone() {
        let mut arena = ParticleArena::new();
        let a = arena.insert(particle_at(Vec3::ZERO));
        let b = arena.insert(particle_at(Vec3::new(20.0, 0.0, 0.0)));

        let mut force = SlipForce::new(SlipConfig {
            priority: 0,
            slip_distance: 10.0,
            stiffness: 4.0,
        });
        force.set_endpoints(a, b);

        let mut previous_error = f32::MAX;
        for _ in 0..50 {
            let mut kills = Vec::new();
            let mut ctx = ForceContext {
                particles: &mut arena,
                delta_time: 0.05,
                elapsed: 0.0,
                attached: &[TemplateId(0)],
                kills: &mut kills,
            };
            force.apply(&mut ctx).unwrap();

            let distance = arena
                .get(a)
                .unwrap()
                .location
                .distance(arena.get(b).unwrap().location);
            let error = (distance - 10.0).abs();
            assert!(
                error <= previous_error + 1e-4,
                "distance-to-target must be non-increasing: {error} > {previous_error}"
            );
            previous_error = error;
        }
        assert!(previous_error < 0.5, "separation converges toward 10");
    }

    #[test]
    fn test_pushes_apart_when_too_close() {
        let mut arena = ParticleArena::new();
        let a = arena.insert(particle_at(Vec3::ZERO));
        let b = arena.insert(particle_at(Vec3::new(2.0, 0.0, 0.0)));

        let mut force = SlipForce::new(SlipConfig {
            priority: 0,
            slip_distance: 10.0,
            stiffness: 4.0,
        });
        force.set_endpoints(a, b);

        let mut kills = Vec::new();
        let mut ctx = ForceContext {
            particles: &mut arena,
            delta_time: 0.05,
            elapsed: 0.0,
            attached: &[TemplateId(0)],
            kills: &mut kills,
        };
        force.apply(&mut ctx).unwrap();

        let distance = arena
            .get(a)
            .unwrap()
            .location
            .distance(arena.get(b).unwrap().location);
        assert!(distance > 2.0, "endpoints below target separation move apart");
    }

    #[test]
    fn test_missing_endpoint_is_noop() {
        let mut arena = ParticleArena::new();
        let a = arena.insert(particle_at(Vec3::ZERO));
        let b = arena.insert(particle_at(Vec3::X));

        let mut force = SlipForce::new(SlipConfig::default());
        force.set_endpoints(a, b);
        force.notify_particle_destroyed(a);

        let mut kills = Vec::new();
        let mut ctx = ForceContext {
            particles: &mut arena,
            delta_time: 0.05,
            elapsed: 0.0,
            attached: &[TemplateId(0)],
            kills: &mut kills,
        };
        assert!(force.apply(&mut ctx).is_ok());
        assert_eq!(arena.get(b).unwrap().location, Vec3::X);
    }
}
