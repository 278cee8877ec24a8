//! 精灵粒子模板
//!
//! 最常用的模板：每个粒子渲染为一个面向相机的四边形，支持图集
//! UV 动画和逐粒子可见性测试。

use crate::core::error::TemplateError;
use crate::impl_default;
use crate::particle::Particle;
use crate::render::{Light, RenderInterface, SceneContext};
use crate::storage::ParticleArena;
use crate::template::{ParticleTemplate, TemplateId};
use glam::{Vec2, Vec3, Vec4};
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 精灵模板配置（字段声明顺序即序列化顺序）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpriteConfig {
    /// 每秒发射数量
    pub spawn_rate: f32,
    /// 粒子寿命（秒）
    pub lifespan: f32,
    /// 初始大小范围
    pub size_min: f32,
    pub size_max: f32,
    /// 颜色
    pub color: Vec4,
    /// 初始速度范围（逐分量均匀采样）
    pub velocity_min: Vec3,
    pub velocity_max: Vec3,
    /// 图集列数 / 行数（1×1 表示整张贴图）
    pub atlas_cols: u32,
    pub atlas_rows: u32,
}

impl_default!(SpriteConfig {
    spawn_rate: 10.0,
    lifespan: 2.0,
    size_min: 0.5,
    size_max: 1.0,
    color: Vec4::ONE,
    velocity_min: Vec3::new(-1.0, 1.0, -1.0),
    velocity_max: Vec3::new(1.0, 3.0, 1.0),
    atlas_cols: 1,
    atlas_rows: 1,
});

/// 精灵粒子模板
#[derive(Debug, Clone)]
pub struct SpriteTemplate {
    config: SpriteConfig,
}

impl SpriteTemplate {
    pub fn new(config: SpriteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpriteConfig {
        &self.config
    }

    /// 图集单元的 UV 矩形（min, max）
    ///
    /// 纯函数：单元索引对总格数取模后按行优先展开。
    pub fn element_uv(&self, index: u32) -> (Vec2, Vec2) {
        let cols = self.config.atlas_cols.max(1);
        let rows = self.config.atlas_rows.max(1);
        let cell = index % (cols * rows);
        let col = cell % cols;
        let row = cell / cols;

        let cell_w = 1.0 / cols as f32;
        let cell_h = 1.0 / rows as f32;
        let min = Vec2::new(col as f32 * cell_w, row as f32 * cell_h);
        (min, min + Vec2::new(cell_w, cell_h))
    }

    /// 按寿命进度选择图集单元（用于翻页动画）
    fn atlas_cell_for(&self, particle: &Particle) -> u32 {
        let total = (self.config.atlas_cols.max(1) * self.config.atlas_rows.max(1)) as f32;
        let progress = 1.0 - (particle.age_remaining / self.config.lifespan).clamp(0.0, 1.0);
        (progress * total).min(total - 1.0) as u32
    }

    fn sample(min: Vec3, max: Vec3, rng: &mut SmallRng) -> Vec3 {
        Vec3::new(
            sample_range(min.x, max.x, rng),
            sample_range(min.y, max.y, rng),
            sample_range(min.z, max.z, rng),
        )
    }
}

fn sample_range(min: f32, max: f32, rng: &mut SmallRng) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

impl ParticleTemplate for SpriteTemplate {
    fn type_name(&self) -> &'static str {
        "SpriteTemplate"
    }

    fn spawn_rate(&self) -> f32 {
        self.config.spawn_rate
    }

    fn init_particle(&mut self, particle: &mut Particle, rng: &mut SmallRng) {
        particle.size = sample_range(self.config.size_min, self.config.size_max, rng);
        particle.color = self.config.color;
        particle.velocity = Self::sample(self.config.velocity_min, self.config.velocity_max, rng);
        particle.age_remaining = self.config.lifespan;
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
            // 逐粒子可见性测试
            if !scene.is_visible(particle.location) {
                continue;
            }
            let uv = self.element_uv(self.atlas_cell_for(particle));
            draw.draw_sprite(particle.location, particle.size, particle.color, uv);
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
    use rand::SeedableRng;

    #[test]
    fn test_init_particle_within_configured_ranges() {
        let mut template = SpriteTemplate::new(SpriteConfig {
            size_min: 0.5,
            size_max: 1.5,
            lifespan: 3.0,
            ..Default::default()
        });
        let mut rng = SmallRng::seed_from_u64(7);
        let mut particle = Particle::new(TemplateId(0));
        template.init_particle(&mut particle, &mut rng);

        assert!(particle.size >= 0.5 && particle.size < 1.5);
        assert_eq!(particle.age_remaining, 3.0);
    }

    #[test]
    fn test_element_uv_grid() {
        let template = SpriteTemplate::new(SpriteConfig {
            atlas_cols: 2,
            atlas_rows: 2,
            ..Default::default()
        });

        let (min, max) = template.element_uv(0);
        assert_eq!(min, Vec2::new(0.0, 0.0));
        assert_eq!(max, Vec2::new(0.5, 0.5));

        let (min, max) = template.element_uv(3);
        assert_eq!(min, Vec2::new(0.5, 0.5));
        assert_eq!(max, Vec2::new(1.0, 1.0));

        // 越界索引取模回绕
        let (wrapped, _) = template.element_uv(4);
        assert_eq!(wrapped, Vec2::new(0.0, 0.0));
    }

    #[test]
    fn test_render_culls_invisible_particles() {
        let template = SpriteTemplate::new(SpriteConfig::default());
        let mut arena = ParticleArena::new();

        let mut visible = Particle::new(TemplateId(0));
        visible.location = Vec3::new(0.0, 0.0, -5.0);
        visible.age_remaining = 1.0;
        arena.insert(visible);

        let mut behind = Particle::new(TemplateId(0));
        behind.location = Vec3::new(0.0, 0.0, 5.0);
        behind.age_remaining = 1.0;
        arena.insert(behind);

        let scene = SceneContext {
            view_origin: Vec3::ZERO,
            view_direction: Vec3::NEG_Z,
            max_draw_distance: 100.0,
        };
        let mut renderer = RecordingRenderer::new();
        let drawn = template
            .render(&arena, TemplateId(0), &scene, &[], &mut renderer)
            .unwrap();

        assert_eq!(drawn, 1);
        assert_eq!(renderer.sprites.len(), 1);
    }

    #[test]
    fn test_render_skips_other_templates() {
        let template = SpriteTemplate::new(SpriteConfig::default());
        let mut arena = ParticleArena::new();

        let mut other = Particle::new(TemplateId(1));
        other.location = Vec3::new(0.0, 0.0, -5.0);
        arena.insert(other);

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
        assert_eq!(drawn, 0);
    }
}
