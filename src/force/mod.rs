//! 力场模块
//!
//! 力场是每 tick 作用在粒子上的多态行为对象。发射器按优先级升序
//! 调度所有力场（优先级相同时按插入顺序），后面的力场可以依赖
//! 前面力场写入的状态（例如吸引力先设置速度，碰撞力再做钳制）。
//!
//! ## 功能特性
//!
//! - 吸引力（AttractionForce）：端点间反比距离的牵引
//! - 滑移约束（SlipForce）：迭代式的距离约束
//! - 圆盘碰撞（CollisionDiscForce）：运动线段与圆盘求交、反弹或击杀
//! - 神经网络力（NeuralForce）：训练后的前馈网络驱动的力向量
//!
//! 有状态的力场通过生命周期通知（`notify_particle_destroyed` 等）
//! 同步清理对粒子的追踪句柄，保证引用不会悬垂到 tick 结束之后。

pub mod attraction;
pub mod collision;
pub mod neural;
pub mod slip;

pub use attraction::{AttractionConfig, AttractionForce};
pub use collision::{CollisionDiscForce, CollisionResponse, DiscConfig};
pub use neural::{NeuralConfig, NeuralForce, TrainingReport};
pub use slip::{SlipConfig, SlipForce};

use crate::core::error::ForceError;
use crate::particle::Particle;
use crate::storage::{ParticleArena, ParticleHandle};
use crate::template::TemplateId;

/// 力场在发射器内的稳定编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForceId(pub u32);

/// 力场每 tick 的施加上下文
///
/// 发射器构造该上下文并依次交给每个力场；`attached` 是该力场当前
/// 挂接的模板集合，力场只应影响这些模板名下的粒子。
pub struct ForceContext<'a> {
    /// 发射器的粒子仓
    pub particles: &'a mut ParticleArena,
    /// 本帧时间步长（秒）
    pub delta_time: f32,
    /// 发射器累计模拟时间（秒）
    pub elapsed: f32,
    /// 该力场挂接的模板集合
    pub attached: &'a [TemplateId],
    /// 击杀队列：力场请求销毁的粒子在本 tick 末尾统一移除
    pub kills: &'a mut Vec<ParticleHandle>,
}

impl ForceContext<'_> {
    /// 收集该力场影响范围内的粒子句柄（只含挂接模板的粒子）
    pub fn affected_handles(&self) -> Vec<ParticleHandle> {
        self.particles
            .iter()
            .filter(|(_, p)| self.attached.contains(&p.template))
            .map(|(handle, _)| handle)
            .collect()
    }

    pub fn get(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.particles.get(handle)
    }

    pub fn get_mut(&mut self, handle: ParticleHandle) -> Option<&mut Particle> {
        self.particles.get_mut(handle)
    }

    /// 请求销毁一个粒子（本 tick 末尾生效）
    ///
    /// 同时在粒子上置位 `pending_kill`，后续力场在同一 tick 内
    /// 可以据此跳过已判死的粒子。
    pub fn kill(&mut self, handle: ParticleHandle) {
        if let Some(particle) = self.particles.get_mut(handle) {
            particle.pending_kill = true;
        }
        if !self.kills.contains(&handle) {
            self.kills.push(handle);
        }
    }
}

/// 多态力场接口
///
/// 所有方法都必须容忍零粒子的情形。`apply` 返回的错误在发射器层
/// 被捕获并记录日志，视为"该力场本帧没有贡献"，模拟继续。
pub trait Force {
    /// 子类型名称，用于日志
    fn type_name(&self) -> &'static str;

    /// 调度优先级，升序施加
    fn priority(&self) -> i32 {
        0
    }

    /// 每帧对挂接粒子施加作用
    fn apply(&mut self, ctx: &mut ForceContext<'_>) -> Result<(), ForceError>;

    /// 粒子诞生通知
    fn notify_particle_created(&mut self, _handle: ParticleHandle) {}

    /// 粒子销毁通知：在粒子从粒子仓移除之前同步触发，
    /// 有状态的力场在此清除对应的追踪句柄
    fn notify_particle_destroyed(&mut self, _handle: ParticleHandle) {}

    /// 模板脱离通知：力场释放为该模板维护的所有附属状态
    fn notify_detached(&mut self, _template: TemplateId) {}

    /// 复制出一个独立实例
    ///
    /// 副本的挂接列表和追踪的粒子句柄一律清空（它们是发射器本地
    /// 状态），配置深拷贝；修改副本绝不影响原件。
    fn duplicate(&self) -> Box<dyn Force>;

    /// 发射器停止发射后，该力场还需要粒子额外存活多久（秒）
    fn max_life_span(&self) -> f32 {
        0.0
    }
}
