//! 贴图拖尾模板
//!
//! 为每个粒子维护一段位置历史，`tick` 时推进缓冲，渲染时把历史点
//! 连成贴图条带。历史缓冲是运行时状态，粒子销毁通知时释放，复制
//! 时清空。

use crate::core::error::TemplateError;
use crate::impl_default;
use crate::particle::Particle;
use crate::render::{Light, RenderInterface, SceneContext};
use crate::storage::{ParticleArena, ParticleHandle};
use crate::template::{ParticleTemplate, TemplateContext, TemplateId};
use glam::{Vec3, Vec4};
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 拖尾模板配置（字段声明顺序即序列化顺序）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakConfig {
    /// 每秒发射数量
    pub spawn_rate: f32,
    /// 粒子寿命（秒）
    pub lifespan: f32,
    /// 历史缓冲长度（条带最多经过的点数）
    pub trail_length: usize,
    /// 条带宽度
    pub size: f32,
    /// 颜色
    pub color: Vec4,
    /// 初始速度范围
    pub velocity_min: Vec3,
    pub velocity_max: Vec3,
}

impl_default!(StreakConfig {
    spawn_rate: 5.0,
    lifespan: 2.0,
    trail_length: 8,
    size: 0.25,
    color: Vec4::ONE,
    velocity_min: Vec3::new(-2.0, 2.0, -2.0),
    velocity_max: Vec3::new(2.0, 5.0, 2.0),
});

/// 贴图拖尾模板
#[derive(Debug, Clone)]
pub struct StreakTemplate {
    config: StreakConfig,
    /// 逐粒子位置历史，从新到旧
    histories: HashMap<ParticleHandle, Vec<Vec3>>,
}

impl StreakTemplate {
    pub fn new(config: StreakConfig) -> Self {
        Self {
            config,
            histories: HashMap::new(),
        }
    }

    /// 测试辅助：当前追踪的历史条数
    pub fn tracked_count(&self) -> usize {
        self.histories.len()
    }
}

impl ParticleTemplate for StreakTemplate {
    fn type_name(&self) -> &'static str {
        "StreakTemplate"
    }

    fn spawn_rate(&self) -> f32 {
        self.config.spawn_rate
    }

    fn init_particle(&mut self, particle: &mut Particle, rng: &mut SmallRng) {
        particle.size = self.config.size;
        particle.color = self.config.color;
        particle.age_remaining = self.config.lifespan;
        let min = self.config.velocity_min;
        let max = self.config.velocity_max;
        particle.velocity = Vec3::new(
            if max.x > min.x { rng.gen_range(min.x..max.x) } else { min.x },
            if max.y > min.y { rng.gen_range(min.y..max.y) } else { min.y },
            if max.z > min.z { rng.gen_range(min.z..max.z) } else { min.z },
        );
    }

    fn notify_particle_destroyed(&mut self, handle: ParticleHandle) {
        self.histories.remove(&handle);
    }

    fn tick(&mut self, ctx: &mut TemplateContext<'_>) -> Result<(), TemplateError> {
        let trail_length = self.config.trail_length.max(1);
        for (handle, particle) in ctx.particles.iter() {
            if particle.template != ctx.template {
                continue;
            }
            let history = self.histories.entry(handle).or_default();
            history.insert(0, particle.location);
            history.truncate(trail_length);
        }
        Ok(())
    }

    fn render(
        &self,
        particles: &ParticleArena,
        own_id: TemplateId,
        scene: &SceneContext,
        _lights: &[Light],
        draw: &mut dyn RenderInterface,
    ) -> Result<usize, TemplateError> {
        let mut drawn = 0;
        for (handle, particle) in particles.iter() {
            if particle.template != own_id {
                continue;
            }
            if !scene.is_visible(particle.location) {
                continue;
            }
            let Some(history) = self.histories.get(&handle) else {
                // 尚未 tick 过的新粒子还没有历史
                continue;
            };
            if history.len() < 2 {
                continue;
            }
            draw.draw_streak(history, particle.size, particle.color);
            drawn += 1;
        }
        Ok(drawn)
    }

    fn duplicate(&self) -> Box<dyn ParticleTemplate> {
        // 历史缓冲是发射器本地状态，副本从空历史开始
        Box::new(Self::new(self.config.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingRenderer;

    fn streak_particle(location: Vec3) -> Particle {
        let mut p = Particle::new(TemplateId(0));
        p.location = location;
        p.age_remaining = 5.0;
        p
    }

    #[test]
    fn test_tick_builds_history() {
        let mut template = StreakTemplate::new(StreakConfig {
            trail_length: 3,
            ..Default::default()
        });
        let mut arena = ParticleArena::new();
        let h = arena.insert(streak_particle(Vec3::ZERO));

        for step in 0..5 {
            if let Some(p) = arena.get_mut(h) {
                p.location = Vec3::new(step as f32, 0.0, 0.0);
            }
            let mut ctx = TemplateContext {
                particles: &mut arena,
                delta_time: 0.1,
                template: TemplateId(0),
            };
            template.tick(&mut ctx).unwrap();
        }

        // 历史被截断到 trail_length，最新的点在前
        assert_eq!(template.tracked_count(), 1);
    }

    #[test]
    fn test_destroy_notification_drops_history() {
        let mut template = StreakTemplate::new(StreakConfig::default());
        let mut arena = ParticleArena::new();
        let h = arena.insert(streak_particle(Vec3::ZERO));

        let mut ctx = TemplateContext {
            particles: &mut arena,
            delta_time: 0.1,
            template: TemplateId(0),
        };
        template.tick(&mut ctx).unwrap();
        assert_eq!(template.tracked_count(), 1);

        template.notify_particle_destroyed(h);
        assert_eq!(template.tracked_count(), 0);
    }

    #[test]
    fn test_render_needs_two_history_points() {
        let mut template = StreakTemplate::new(StreakConfig::default());
        let mut arena = ParticleArena::new();
        let h = arena.insert(streak_particle(Vec3::new(0.0, 0.0, -5.0)));

        let mut renderer = RecordingRenderer::new();
        let scene = SceneContext::default();

        // 一次 tick 只有一个历史点，不出条带
        let mut ctx = TemplateContext {
            particles: &mut arena,
            delta_time: 0.1,
            template: TemplateId(0),
        };
        template.tick(&mut ctx).unwrap();
        let drawn = template
            .render(&arena, TemplateId(0), &scene, &[], &mut renderer)
            .unwrap();
        assert_eq!(drawn, 0);

        if let Some(p) = arena.get_mut(h) {
            p.location = Vec3::new(1.0, 0.0, -5.0);
        }
        let mut ctx = TemplateContext {
            particles: &mut arena,
            delta_time: 0.1,
            template: TemplateId(0),
        };
        template.tick(&mut ctx).unwrap();
        let drawn = template
            .render(&arena, TemplateId(0), &scene, &[], &mut renderer)
            .unwrap();
        assert_eq!(drawn, 1);
        assert_eq!(renderer.streaks, vec![2]);
    }

    #[test]
    fn test_duplicate_starts_with_empty_history() {
        let mut template = StreakTemplate::new(StreakConfig::default());
        let mut arena = ParticleArena::new();
        arena.insert(streak_particle(Vec3::ZERO));

        let mut ctx = TemplateContext {
            particles: &mut arena,
            delta_time: 0.1,
            template: TemplateId(0),
        };
        template.tick(&mut ctx).unwrap();
        assert_eq!(template.tracked_count(), 1);

        let copy = template.duplicate();
        assert_eq!(copy.type_name(), "StreakTemplate");
        // 原件的历史不受复制影响
        assert_eq!(template.tracked_count(), 1);
    }
}
