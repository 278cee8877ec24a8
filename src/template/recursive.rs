//! 递归发射模板
//!
//! 每个粒子（载体）携带一个嵌套的子发射器：粒子诞生时从空闲池取
//! 一个子发射器槽位并激活，粒子移动时子发射器跟随，粒子销毁时
//! 槽位回收（`recycle_particle`）而不是释放——持续生灭的嵌套效果
//! 不会产生分配抖动。
//!
//! 池容量受 `max_children` 约束；池耗尽时新粒子退化为普通粒子
//! （没有子发射器），这是正常降级而不是错误。

use crate::core::error::TemplateError;
use crate::descriptor::EffectDescriptor;
use crate::generator::ParticleGenerator;
use crate::impl_default;
use crate::particle::Particle;
use crate::render::{Light, RenderInterface, SceneContext};
use crate::storage::{ParticleArena, ParticleHandle};
use crate::template::{ParticleTemplate, TemplateContext, TemplateId};
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 递归模板配置（字段声明顺序即序列化顺序）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecursiveConfig {
    /// 每秒发射数量（载体粒子）
    pub spawn_rate: f32,
    /// 载体粒子寿命（秒）
    pub lifespan: f32,
    /// 载体初始速度范围
    pub velocity_min: Vec3,
    pub velocity_max: Vec3,
    /// 子发射器池上限
    pub max_children: usize,
    /// 子发射器的效果描述
    pub child: Box<EffectDescriptor>,
}

impl_default!(RecursiveConfig {
    spawn_rate: 2.0,
    lifespan: 3.0,
    velocity_min: Vec3::new(-1.0, 2.0, -1.0),
    velocity_max: Vec3::new(1.0, 4.0, 1.0),
    max_children: 8,
    child: Box::new(EffectDescriptor::default()),
});

/// 递归发射模板
pub struct RecursiveTemplate {
    config: RecursiveConfig,
    /// 子发射器原型，槽位从它复制
    prototype: ParticleGenerator,
    /// 子发射器池（只增长到 max_children，之后循环复用）
    children: Vec<ParticleGenerator>,
    /// 空闲槽位索引
    free: Vec<usize>,
    /// 载体粒子 → 槽位索引
    active: HashMap<ParticleHandle, usize>,
}

impl RecursiveTemplate {
    pub fn new(config: RecursiveConfig) -> Self {
        let prototype = config.child.instantiate();
        Self {
            config,
            prototype,
            children: Vec::new(),
            free: Vec::new(),
            active: HashMap::new(),
        }
    }

    /// 池中已分配的槽位总数
    pub fn pool_size(&self) -> usize {
        self.children.len()
    }

    /// 当前空闲槽位数
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// 回收载体粒子占用的子发射器槽位
    ///
    /// 子发射器转入排空而不是立即清空，槽位回到空闲池等待复用；
    /// 复用时才做 reset。
    pub fn recycle_particle(&mut self, handle: ParticleHandle) {
        if let Some(index) = self.active.remove(&handle) {
            self.children[index].deactivate();
            self.free.push(index);
        }
    }

    fn acquire_slot(&mut self) -> Option<usize> {
        if let Some(index) = self.free.pop() {
            self.children[index].reset();
            return Some(index);
        }
        if self.children.len() < self.config.max_children {
            self.children.push(self.prototype.duplicate());
            return Some(self.children.len() - 1);
        }
        // 池耗尽：降级为没有子发射器的普通粒子
        None
    }
}

impl ParticleTemplate for RecursiveTemplate {
    fn type_name(&self) -> &'static str {
        "RecursiveTemplate"
    }

    fn spawn_rate(&self) -> f32 {
        self.config.spawn_rate
    }

    fn init_particle(&mut self, particle: &mut Particle, rng: &mut SmallRng) {
        particle.age_remaining = self.config.lifespan;
        let min = self.config.velocity_min;
        let max = self.config.velocity_max;
        particle.velocity = Vec3::new(
            if max.x > min.x { rng.gen_range(min.x..max.x) } else { min.x },
            if max.y > min.y { rng.gen_range(min.y..max.y) } else { min.y },
            if max.z > min.z { rng.gen_range(min.z..max.z) } else { min.z },
        );
    }

    fn notify_particle_created(&mut self, handle: ParticleHandle) {
        if let Some(index) = self.acquire_slot() {
            self.children[index].activate();
            self.active.insert(handle, index);
        }
    }

    fn notify_particle_destroyed(&mut self, handle: ParticleHandle) {
        self.recycle_particle(handle);
    }

    fn tick(&mut self, ctx: &mut TemplateContext<'_>) -> Result<(), TemplateError> {
        // 子发射器跟随载体粒子
        for (handle, index) in &self.active {
            if let Some(particle) = ctx.particles.get(*handle) {
                self.children[*index].set_origin(particle.location);
            }
        }
        // 空闲槽位里排空中的子发射器也要继续推进
        for child in &mut self.children {
            child.tick(ctx.delta_time);
        }
        Ok(())
    }

    fn render(
        &self,
        _particles: &ParticleArena,
        _own_id: TemplateId,
        scene: &SceneContext,
        lights: &[Light],
        draw: &mut dyn RenderInterface,
    ) -> Result<usize, TemplateError> {
        // 载体粒子本身不可见，绘制全部来自子发射器
        let mut drawn = 0;
        for child in &self.children {
            drawn += child.render(scene, lights, draw);
        }
        Ok(drawn)
    }

    fn duplicate(&self) -> Box<dyn ParticleTemplate> {
        // 池和映射是运行时状态，副本从空池开始
        Box::new(Self::new(self.config.clone()))
    }
}
