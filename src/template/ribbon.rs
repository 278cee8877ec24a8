//! 三角条带模板
//!
//! 每个粒子渲染为一个沿速度方向展开的三角形。速度为零时退化为
//! 固定朝向的小三角形，不会产生 NaN 几何。

use crate::core::error::TemplateError;
use crate::impl_default;
use crate::particle::Particle;
use crate::render::{Light, RenderInterface, SceneContext};
use crate::storage::ParticleArena;
use crate::template::{ParticleTemplate, TemplateId};
use glam::{Vec3, Vec4};
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 三角条带配置（字段声明顺序即序列化顺序）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RibbonConfig {
    /// 每秒发射数量
    pub spawn_rate: f32,
    /// 粒子寿命（秒）
    pub lifespan: f32,
    /// 三角形底边宽度
    pub width: f32,
    /// 三角形沿速度方向的长度系数（长度 = size * length_scale）
    pub length_scale: f32,
    /// 颜色
    pub color: Vec4,
    /// 初始速度范围
    pub velocity_min: Vec3,
    pub velocity_max: Vec3,
}

impl_default!(RibbonConfig {
    spawn_rate: 5.0,
    lifespan: 1.5,
    width: 0.3,
    length_scale: 2.0,
    color: Vec4::ONE,
    velocity_min: Vec3::new(-1.0, 1.0, -1.0),
    velocity_max: Vec3::new(1.0, 4.0, 1.0),
});

/// 三角条带模板
#[derive(Debug, Clone)]
pub struct RibbonTemplate {
    config: RibbonConfig,
}

impl RibbonTemplate {
    pub fn new(config: RibbonConfig) -> Self {
        Self { config }
    }

    /// 粒子的三角形顶点：尖端沿速度方向，底边垂直于速度
    fn triangle_for(&self, particle: &Particle) -> [Vec3; 3] {
        let direction = {
            let d = particle.velocity.normalize_or_zero();
            if d == Vec3::ZERO {
                Vec3::X
            } else {
                d
            }
        };
        // 选一条与方向不平行的参考轴来构造底边
        let reference = if direction.y.abs() < 0.9 { Vec3::Y } else { Vec3::X };
        let side = direction.cross(reference).normalize() * (self.config.width * 0.5);

        let tip = particle.location + direction * particle.size * self.config.length_scale;
        [
            tip,
            particle.location + side,
            particle.location - side,
        ]
    }
}

impl ParticleTemplate for RibbonTemplate {
    fn type_name(&self) -> &'static str {
        "RibbonTemplate"
    }

    fn spawn_rate(&self) -> f32 {
        self.config.spawn_rate
    }

    fn init_particle(&mut self, particle: &mut Particle, rng: &mut SmallRng) {
        particle.size = self.config.width;
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

    fn render(
        &self,
        particles: &ParticleArena,
        own_id: TemplateId,
        scene: &SceneContext,
        _lights: &[Light],
        draw: &mut dyn RenderInterface,
    ) -> Result<usize, TemplateError> {
        let mut drawn = 0;
        for (_, particle) in particles.iter() {
            if particle.template != own_id {
                continue;
            }
            if !scene.is_visible(particle.location) {
                continue;
            }
            draw.draw_triangle(self.triangle_for(particle), particle.color);
            drawn += 1;
        }
        Ok(drawn)
    }

    fn duplicate(&self) -> Box<dyn ParticleTemplate> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingRenderer;

    #[test]
    fn test_triangle_points_along_velocity() {
        let template = RibbonTemplate::new(RibbonConfig::default());
        let mut particle = Particle::new(TemplateId(0));
        particle.location = Vec3::ZERO;
        particle.velocity = Vec3::new(10.0, 0.0, 0.0);
        particle.size = 1.0;

        let [tip, left, right] = template.triangle_for(&particle);
        assert!(tip.x > 0.0, "tip extends along +X velocity");
        assert!((left - right).length() > 0.0, "base edge has width");
    }

    #[test]
    fn test_zero_velocity_degenerates_gracefully() {
        let template = RibbonTemplate::new(RibbonConfig::default());
        let mut particle = Particle::new(TemplateId(0));
        particle.velocity = Vec3::ZERO;
        particle.size = 1.0;

        let triangle = template.triangle_for(&particle);
        for vertex in triangle {
            assert!(vertex.is_finite(), "no NaN geometry at zero velocity");
        }
    }

    #[test]
    fn test_render_counts_drawn() {
        let template = RibbonTemplate::new(RibbonConfig::default());
        let mut arena = ParticleArena::new();
        let mut p = Particle::new(TemplateId(0));
        p.location = Vec3::new(0.0, 0.0, -3.0);
        p.age_remaining = 1.0;
        arena.insert(p);

        let mut renderer = RecordingRenderer::new();
        let drawn = template
            .render(
                &arena,
                TemplateId(0),
                &SceneContext::default(),
                &[],
                &mut renderer,
            )
            .unwrap();
        assert_eq!(drawn, 1);
        assert_eq!(renderer.triangles.len(), 1);
    }
}
