//! 吸引力场
//!
//! 把端点 A 拉向端点 B（`mutual` 时互相牵引），加速度随距离按
//! 可配置的衰减指数递减。任一端点销毁时通过销毁通知干净地解除
//! 追踪，不会留下悬垂句柄。

use crate::core::error::ForceError;
use crate::force::{Force, ForceContext};
use crate::impl_default;
use crate::storage::ParticleHandle;
use serde::{Deserialize, Serialize};

/// 吸引力配置（字段声明顺序即序列化顺序）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttractionConfig {
    /// 调度优先级
    pub priority: i32,
    /// 牵引强度
    pub strength: f32,
    /// 距离衰减指数（1.0 = 反比距离）
    pub falloff_exponent: f32,
    /// 软化距离：距离低于该值时按该值计算，避免近距发散
    pub softening: f32,
    /// 互相牵引（B 也被拉向 A）
    pub mutual: bool,
    /// 停止发射后要求粒子额外存活的时间（淡出）
    pub fade_out: f32,
}

impl_default!(AttractionConfig {
    priority: 0,
    strength: 10.0,
    falloff_exponent: 1.0,
    softening: 0.1,
    mutual: false,
    fade_out: 0.0,
});

/// 吸引力场
#[derive(Debug, Clone)]
pub struct AttractionForce {
    config: AttractionConfig,
    endpoint_a: Option<ParticleHandle>,
    endpoint_b: Option<ParticleHandle>,
}

impl AttractionForce {
    pub fn new(config: AttractionConfig) -> Self {
        Self {
            config,
            endpoint_a: None,
            endpoint_b: None,
        }
    }

    /// 重新指定两个端点
    pub fn set_endpoints(&mut self, a: ParticleHandle, b: ParticleHandle) {
        self.endpoint_a = Some(a);
        self.endpoint_b = Some(b);
    }

    pub fn endpoints(&self) -> (Option<ParticleHandle>, Option<ParticleHandle>) {
        (self.endpoint_a, self.endpoint_b)
    }

    pub fn config(&self) -> &AttractionConfig {
        &self.config
    }
}

impl Force for AttractionForce {
    fn type_name(&self) -> &'static str {
        "AttractionForce"
    }

    fn priority(&self) -> i32 {
        self.config.priority
    }

    fn apply(&mut self, ctx: &mut ForceContext<'_>) -> Result<(), ForceError> {
        // 端点缺失时是空操作，不算错误
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
            return Ok(());
        }

        let effective = distance.max(self.config.softening.max(f32::EPSILON));
        let magnitude = self.config.strength / effective.powf(self.config.falloff_exponent);
        let impulse = offset / distance * magnitude * ctx.delta_time;

        if let Some(pa) = ctx.get_mut(a) {
            pa.velocity += impulse;
        }
        if self.config.mutual {
            if let Some(pb) = ctx.get_mut(b) {
                pb.velocity -= impulse;
            }
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
        // 端点句柄是发射器本地状态，副本一律清空
        Box::new(Self::new(self.config.clone()))
    }

    fn max_life_span(&self) -> f32 {
        self.config.fade_out
    }
}
