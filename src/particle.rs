//! 粒子数据结构
//!
//! 模拟的最小单元。粒子内存完全由发射器的粒子仓（`ParticleArena`）
//! 独占持有，模板和力场只保存句柄（`ParticleHandle`），不持有所有权。

use crate::template::TemplateId;
use glam::{Vec3, Vec4};

/// 单个粒子的运行时状态
///
/// 运行时状态永远不做持久化，只有模板/力场的配置参与序列化。
#[derive(Debug, Clone)]
pub struct Particle {
    /// 世界空间位置
    pub location: Vec3,
    /// 速度（每秒位移）
    pub velocity: Vec3,
    /// RGBA 颜色
    pub color: Vec4,
    /// 大小
    pub size: f32,
    /// 剩余寿命（秒），低于死亡阈值时销毁
    pub age_remaining: f32,
    /// 所属模板（每个存活粒子恰好属于一个模板）
    pub template: TemplateId,
    /// 力场可以置位该标志来请求销毁（如碰撞击杀）
    pub pending_kill: bool,
}

impl Particle {
    /// 创建一个归属于指定模板的粒子，其余字段由模板的
    /// `init_particle` 填充
    pub fn new(template: TemplateId) -> Self {
        Self {
            location: Vec3::ZERO,
            velocity: Vec3::ZERO,
            color: Vec4::ONE,
            size: 1.0,
            age_remaining: 1.0,
            template,
            pending_kill: false,
        }
    }
}
