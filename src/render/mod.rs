//! 渲染边界模块
//!
//! 粒子核心不直接接触图形 API，模板的 `render` 只向这里定义的
//! 抽象绘制接口发出声明式图元（精灵四边形、拖尾条带、三角形）。
//! 场景/光照上下文由外层 world/actor 层透传进来。

use crate::impl_default;
use glam::{Vec2, Vec3, Vec4};

/// 抽象绘制接口
///
/// 由渲染后端实现；核心只负责发出图元，不关心提交细节。
pub trait RenderInterface {
    /// 绘制面向相机的精灵四边形，`uv` 为图集 UV 矩形（min, max）
    fn draw_sprite(&mut self, center: Vec3, size: f32, color: Vec4, uv: (Vec2, Vec2));

    /// 绘制贴图拖尾条带，`points` 按从新到旧排列
    fn draw_streak(&mut self, points: &[Vec3], size: f32, color: Vec4);

    /// 绘制单个三角形
    fn draw_triangle(&mut self, vertices: [Vec3; 3], color: Vec4);
}

/// 不透明的场景上下文，由外层每帧提供
#[derive(Debug, Clone, Copy)]
pub struct SceneContext {
    /// 观察点位置
    pub view_origin: Vec3,
    /// 观察方向（单位向量）
    pub view_direction: Vec3,
    /// 最大绘制距离
    pub max_draw_distance: f32,
}

impl_default!(SceneContext {
    view_origin: Vec3::ZERO,
    view_direction: Vec3::NEG_Z,
    max_draw_distance: f32::MAX,
});

impl SceneContext {
    /// 逐粒子可见性测试：在观察方向前方且在绘制距离之内
    pub fn is_visible(&self, point: Vec3) -> bool {
        let offset = point - self.view_origin;
        if offset.length_squared() > self.max_draw_distance * self.max_draw_distance {
            return false;
        }
        self.view_direction.dot(offset) >= 0.0
    }
}

/// 透传给模板渲染的光源数据
#[derive(Debug, Clone, Copy)]
pub struct Light {
    pub position: Vec3,
    pub color: Vec4,
    pub radius: f32,
}

// ============================================================================
// 记录型渲染器（测试替身 / 统计）
// ============================================================================

/// 记录所有已发出图元的渲染器
///
/// 测试中用来断言模板发出了哪些绘制调用，也可用于离线统计。
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    /// (中心, 大小, 颜色) 精灵记录
    pub sprites: Vec<(Vec3, f32, Vec4)>,
    /// 拖尾记录（点序列长度）
    pub streaks: Vec<usize>,
    /// 三角形记录
    pub triangles: Vec<[Vec3; 3]>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已发出的图元总数
    pub fn primitive_count(&self) -> usize {
        self.sprites.len() + self.streaks.len() + self.triangles.len()
    }
}

impl RenderInterface for RecordingRenderer {
    fn draw_sprite(&mut self, center: Vec3, size: f32, color: Vec4, _uv: (Vec2, Vec2)) {
        self.sprites.push((center, size, color));
    }

    fn draw_streak(&mut self, points: &[Vec3], _size: f32, _color: Vec4) {
        self.streaks.push(points.len());
    }

    fn draw_triangle(&mut self, vertices: [Vec3; 3], _color: Vec4) {
        self.triangles.push(vertices);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_behind_viewer() {
        let scene = SceneContext {
            view_origin: Vec3::ZERO,
            view_direction: Vec3::NEG_Z,
            max_draw_distance: 100.0,
        };
        assert!(scene.is_visible(Vec3::new(0.0, 0.0, -10.0)));
        assert!(!scene.is_visible(Vec3::new(0.0, 0.0, 10.0)));
    }

    #[test]
    fn test_visibility_distance_cull() {
        let scene = SceneContext {
            view_origin: Vec3::ZERO,
            view_direction: Vec3::NEG_Z,
            max_draw_distance: 5.0,
        };
        assert!(!scene.is_visible(Vec3::new(0.0, 0.0, -50.0)));
    }
}
