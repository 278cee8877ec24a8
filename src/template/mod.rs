//! 粒子模板模块
//!
//! 模板是多态的工厂/行为对象，定义一类粒子如何初始化、推进和渲染：
//!
//! - 精灵（SpriteTemplate）：面向相机的四边形，带图集 UV 和逐粒子可见性测试
//! - 贴图拖尾（StreakTemplate）：维护逐粒子位置历史，渲染成条带
//! - 三角条带（RibbonTemplate）：按速度朝向的三角形
//! - 递归发射（RecursiveTemplate）：粒子携带嵌套的子发射器，槽位池化回收
//!
//! 每个存活粒子恰好属于一个模板和一个发射器。模板只保存粒子句柄，
//! 粒子内存归发射器的粒子仓所有。

pub mod recursive;
pub mod ribbon;
pub mod sprite;
pub mod streak;

pub use recursive::{RecursiveConfig, RecursiveTemplate};
pub use ribbon::{RibbonConfig, RibbonTemplate};
pub use sprite::{SpriteConfig, SpriteTemplate};
pub use streak::{StreakConfig, StreakTemplate};

use crate::core::error::TemplateError;
use crate::particle::Particle;
use crate::render::{Light, RenderInterface, SceneContext};
use crate::storage::{ParticleArena, ParticleHandle};
use rand::rngs::SmallRng;

/// 模板在发射器内的稳定编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateId(pub u32);

/// 模板每 tick 的推进上下文
pub struct TemplateContext<'a> {
    /// 发射器的粒子仓
    pub particles: &'a mut ParticleArena,
    /// 本帧时间步长（秒）
    pub delta_time: f32,
    /// 正在推进的模板编号
    pub template: TemplateId,
}

/// 多态粒子模板接口
///
/// `tick`/`render` 返回的错误在发射器层被捕获并记录日志，视为
/// "该模板本帧没有贡献"，模拟继续。
pub trait ParticleTemplate {
    /// 子类型名称，用于日志
    fn type_name(&self) -> &'static str;

    /// 每秒发射数量（发射器在 Active 状态按此生成粒子）
    fn spawn_rate(&self) -> f32;

    /// 填充新分配粒子的初始状态
    ///
    /// 粒子位置按发射器本地坐标填写，发射器随后叠加世界原点。
    fn init_particle(&mut self, particle: &mut Particle, rng: &mut SmallRng);

    /// 粒子入仓后的通知（此时句柄已可用）
    fn notify_particle_created(&mut self, _handle: ParticleHandle) {}

    /// 粒子销毁前的通知，带逐粒子附属状态的模板在此释放
    fn notify_particle_destroyed(&mut self, _handle: ParticleHandle) {}

    /// 每帧推进（默认空操作；拖尾模板在此推进历史缓冲）
    fn tick(&mut self, _ctx: &mut TemplateContext<'_>) -> Result<(), TemplateError> {
        Ok(())
    }

    /// 为本模板名下的每个存活粒子发出绘制调用
    ///
    /// 返回实际绘制的粒子数（被可见性测试剔除的不计入）。
    fn render(
        &self,
        particles: &ParticleArena,
        own_id: TemplateId,
        scene: &SceneContext,
        lights: &[Light],
        draw: &mut dyn RenderInterface,
    ) -> Result<usize, TemplateError>;

    /// 复制出一个独立实例
    ///
    /// 配置深拷贝，逐粒子的运行时状态（历史缓冲、子发射器映射）
    /// 一律清空；修改副本绝不影响原件。
    fn duplicate(&self) -> Box<dyn ParticleTemplate>;
}
