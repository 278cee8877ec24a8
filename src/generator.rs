//! 粒子发射器（聚合根）
//!
//! 发射器持有模板集合、力场集合和存活粒子仓，驱动每帧的模拟循环：
//! 发射新粒子 → 模板推进 → 按优先级施加力场 → 老化与销毁。
//!
//! ## 状态机
//!
//! ```text
//! Idle ──activate()──► Active ──deactivate()──► Draining ──粒子耗尽──► Idle
//! ```
//!
//! Draining 状态停止发射，但存活粒子继续模拟，直到各自的剩余寿命
//! （加上力场通过 `max_life_span` 申请的延长）耗尽，避免效果关闭
//! 时的视觉跳变。
//!
//! ## 错误隔离
//!
//! 单个力场或模板在 `apply`/`tick`/`render` 中出错只会让它本帧没有
//! 贡献：错误被捕获、记录日志，帧循环继续。
//!
//! 多个发射器彼此独立，帧内可以按任意顺序 tick，不共享可变状态。

use crate::force::{Force, ForceContext, ForceId};
use crate::particle::Particle;
use crate::render::{Light, RenderInterface, SceneContext};
use crate::storage::{ParticleArena, ParticleHandle};
use crate::template::{ParticleTemplate, TemplateContext, TemplateId};
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{info, warn};

/// 发射器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// 无存活粒子且不发射
    Idle,
    /// 按模板规则发射并施加所有力场
    Active,
    /// 停止发射，存量粒子继续模拟到自然耗尽
    Draining,
}

struct TemplateSlot {
    template: Box<dyn ParticleTemplate>,
    /// 发射累积器：spawn_rate * dt 的小数部分跨帧滚存
    accumulator: f32,
}

struct ForceSlot {
    force: Box<dyn Force>,
    id: ForceId,
    /// 插入序号，优先级相同时按它稳定排序
    seq: u32,
    /// 挂接的本地模板
    attached: Vec<TemplateId>,
    /// 外部系统登记的模板（同样参与影响集合与脱离通知）
    external: Vec<TemplateId>,
}

/// 粒子发射器
pub struct ParticleGenerator {
    templates: Vec<TemplateSlot>,
    forces: Vec<ForceSlot>,
    particles: ParticleArena,
    state: GeneratorState,
    elapsed: f32,
    origin: Vec3,
    rng: SmallRng,
    next_seq: u32,
}

impl ParticleGenerator {
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// 固定随机种子的发射器（测试和可重现回放用）
    pub fn with_seed(seed: u64) -> Self {
        Self {
            templates: Vec::new(),
            forces: Vec::new(),
            particles: ParticleArena::new(),
            state: GeneratorState::Idle,
            elapsed: 0.0,
            origin: Vec3::ZERO,
            rng: SmallRng::seed_from_u64(seed),
            next_seq: 0,
        }
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// 外层 actor 每帧提供的世界空间原点
    pub fn set_origin(&mut self, origin: Vec3) {
        self.origin = origin;
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> &ParticleArena {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut ParticleArena {
        &mut self.particles
    }

    // ========================================================================
    // 模板 / 力场管理
    // ========================================================================

    /// 注册模板，返回它的稳定编号
    pub fn add_template(&mut self, template: Box<dyn ParticleTemplate>) -> TemplateId {
        let id = TemplateId(self.templates.len() as u32);
        info!(template = template.type_name(), id = id.0, "template added");
        self.templates.push(TemplateSlot {
            template,
            accumulator: 0.0,
        });
        id
    }

    /// 注册力场，返回它的稳定编号
    pub fn add_force(&mut self, force: Box<dyn Force>) -> ForceId {
        let id = ForceId(self.next_seq);
        info!(
            force = force.type_name(),
            priority = force.priority(),
            "force added"
        );
        self.forces.push(ForceSlot {
            force,
            id,
            seq: self.next_seq,
            attached: Vec::new(),
            external: Vec::new(),
        });
        self.next_seq += 1;
        id
    }

    /// 把力场挂接到模板上（幂等：重复挂接是空操作）
    pub fn attach_force_to_template(&mut self, force: ForceId, template: TemplateId) {
        if let Some(slot) = self.force_slot_mut(force) {
            if !slot.attached.contains(&template) {
                slot.attached.push(template);
            }
        }
    }

    /// 解除力场与模板的挂接（幂等：未挂接过是空操作）
    ///
    /// 成功解除时触发 `notify_detached`，力场释放为该模板维护的
    /// 附属状态。
    pub fn detach_force_from_template(&mut self, force: ForceId, template: TemplateId) {
        if let Some(slot) = self.force_slot_mut(force) {
            if let Some(pos) = slot.attached.iter().position(|t| *t == template) {
                slot.attached.remove(pos);
                slot.force.notify_detached(template);
            }
        }
    }

    /// 登记外部系统的模板（同样的幂等挂接语义）
    pub fn attach_external_template(&mut self, force: ForceId, template: TemplateId) {
        if let Some(slot) = self.force_slot_mut(force) {
            if !slot.external.contains(&template) {
                slot.external.push(template);
            }
        }
    }

    /// 解除外部模板登记，成功时同样触发 `notify_detached`
    pub fn detach_external_template(&mut self, force: ForceId, template: TemplateId) {
        if let Some(slot) = self.force_slot_mut(force) {
            if let Some(pos) = slot.external.iter().position(|t| *t == template) {
                slot.external.remove(pos);
                slot.force.notify_detached(template);
            }
        }
    }

    fn force_slot_mut(&mut self, id: ForceId) -> Option<&mut ForceSlot> {
        self.forces.iter_mut().find(|slot| slot.id == id)
    }

    /// 所有力场申请的停发后寿命延长的最大值
    pub fn max_force_extension(&self) -> f32 {
        self.forces
            .iter()
            .map(|slot| slot.force.max_life_span())
            .fold(0.0, f32::max)
    }

    // ========================================================================
    // 状态机
    // ========================================================================

    /// 开始发射
    pub fn activate(&mut self) {
        if self.state != GeneratorState::Active {
            info!("particle generator activated");
            self.state = GeneratorState::Active;
        }
    }

    /// 停止发射并进入排空阶段
    ///
    /// 存量粒子继续模拟直到耗尽；没有存量时立即回到 Idle。
    pub fn deactivate(&mut self) {
        if self.state == GeneratorState::Active {
            self.state = if self.particles.is_empty() {
                GeneratorState::Idle
            } else {
                GeneratorState::Draining
            };
            info!(state = ?self.state, "particle generator deactivated");
        }
    }

    /// 立即清空所有粒子并回到 Idle（子发射器槽位复用时调用）
    ///
    /// 每个粒子仍然走完整的销毁通知，力场不会留下悬垂句柄。
    pub fn reset(&mut self) {
        for handle in self.particles.handles() {
            self.destroy_particle(handle);
        }
        for slot in &mut self.templates {
            slot.accumulator = 0.0;
        }
        self.elapsed = 0.0;
        self.state = GeneratorState::Idle;
    }

    // ========================================================================
    // 模拟循环
    // ========================================================================

    /// 推进一帧模拟
    ///
    /// 单线程协作模型：一次 tick 完整跑完才开始渲染，期间不会挂起。
    pub fn tick(&mut self, delta_time: f32) {
        if delta_time <= 0.0 {
            return;
        }
        self.elapsed += delta_time;

        // 1. 发射（仅 Active）
        if self.state == GeneratorState::Active {
            for index in 0..self.templates.len() {
                let rate = self.templates[index].template.spawn_rate();
                self.templates[index].accumulator += rate * delta_time;
                let count = self.templates[index].accumulator.floor() as u32;
                self.templates[index].accumulator -= count as f32;
                for _ in 0..count {
                    self.spawn_particle(TemplateId(index as u32));
                }
            }
        }

        // 2. 模板推进
        {
            let Self {
                templates,
                particles,
                ..
            } = self;
            for (index, slot) in templates.iter_mut().enumerate() {
                let mut ctx = TemplateContext {
                    particles: &mut *particles,
                    delta_time,
                    template: TemplateId(index as u32),
                };
                if let Err(error) = slot.template.tick(&mut ctx) {
                    warn!(
                        template = slot.template.type_name(),
                        %error,
                        "template tick failed; contributing nothing this frame"
                    );
                }
            }
        }

        // 3. 力场施加：优先级升序，相同优先级按插入顺序
        let mut kills: Vec<ParticleHandle> = Vec::new();
        {
            let mut order: Vec<usize> = (0..self.forces.len()).collect();
            order.sort_by_key(|&i| (self.forces[i].force.priority(), self.forces[i].seq));

            let Self {
                forces,
                particles,
                elapsed,
                ..
            } = self;
            for index in order {
                let slot = &mut forces[index];
                let affected: Vec<TemplateId> = slot
                    .attached
                    .iter()
                    .chain(slot.external.iter())
                    .copied()
                    .collect();
                let mut ctx = ForceContext {
                    particles: &mut *particles,
                    delta_time,
                    elapsed: *elapsed,
                    attached: &affected,
                    kills: &mut kills,
                };
                if let Err(error) = slot.force.apply(&mut ctx) {
                    warn!(
                        force = slot.force.type_name(),
                        %error,
                        "force apply failed; contributing nothing this frame"
                    );
                }
            }
        }

        // 4. 积分与老化
        for handle in self.particles.handles() {
            if let Some(particle) = self.particles.get_mut(handle) {
                particle.location += particle.velocity * delta_time;
                particle.age_remaining -= delta_time;
            }
        }

        // 5. 销毁：寿命耗尽、力场否决、击杀队列
        //    Draining 时死亡阈值被力场申请的延长量下移
        let threshold = if self.state == GeneratorState::Draining {
            -self.max_force_extension()
        } else {
            0.0
        };
        let mut dead: Vec<ParticleHandle> = kills;
        for handle in self.particles.handles() {
            if let Some(particle) = self.particles.get(handle) {
                if (particle.age_remaining <= threshold || particle.pending_kill)
                    && !dead.contains(&handle)
                {
                    dead.push(handle);
                }
            }
        }
        for handle in dead {
            self.destroy_particle(handle);
        }

        // 6. 排空完成
        if self.state == GeneratorState::Draining && self.particles.is_empty() {
            info!("particle generator drained; back to idle");
            self.state = GeneratorState::Idle;
        }
    }

    /// 立即生成一个指定模板的粒子
    ///
    /// 发射循环内部使用；也可手工调用来布置约束力场的端点粒子。
    pub fn spawn_particle(&mut self, template: TemplateId) -> Option<ParticleHandle> {
        let slot = self.templates.get_mut(template.0 as usize)?;
        let mut particle = Particle::new(template);
        slot.template.init_particle(&mut particle, &mut self.rng);
        particle.location += self.origin;

        let handle = self.particles.insert(particle);
        self.templates[template.0 as usize]
            .template
            .notify_particle_created(handle);
        for force in &mut self.forces {
            force.force.notify_particle_created(handle);
        }
        Some(handle)
    }

    /// 销毁一个粒子
    ///
    /// 销毁通知在粒子离开粒子仓之前同步触发（先力场、后模板），
    /// 有状态的对象得以在句柄失效前清理。
    fn destroy_particle(&mut self, handle: ParticleHandle) {
        let template = match self.particles.get(handle) {
            Some(particle) => particle.template,
            None => return,
        };
        for slot in &mut self.forces {
            slot.force.notify_particle_destroyed(handle);
        }
        if let Some(slot) = self.templates.get_mut(template.0 as usize) {
            slot.template.notify_particle_destroyed(handle);
        }
        self.particles.remove(handle);
    }

    // ========================================================================
    // 渲染
    // ========================================================================

    /// 让每个模板为其名下粒子发出绘制调用，返回实际绘制总数
    pub fn render(
        &self,
        scene: &SceneContext,
        lights: &[Light],
        draw: &mut dyn RenderInterface,
    ) -> usize {
        let mut total = 0;
        for (index, slot) in self.templates.iter().enumerate() {
            match slot
                .template
                .render(&self.particles, TemplateId(index as u32), scene, lights, draw)
            {
                Ok(count) => total += count,
                Err(error) => warn!(
                    template = slot.template.type_name(),
                    %error,
                    "template render failed; contributing nothing this frame"
                ),
            }
        }
        total
    }

    // ========================================================================
    // 复制
    // ========================================================================

    /// 复制出一个结构相同、粒子仓为空的独立发射器
    ///
    /// 模板与力场逐个走各自的 `duplicate`，挂接关系按编号照搬
    /// （两边的模板编号一一对应）；修改副本绝不影响原件。
    pub fn duplicate(&self) -> ParticleGenerator {
        let mut copy = ParticleGenerator::with_seed(rand::random());
        copy.origin = self.origin;
        for slot in &self.templates {
            copy.add_template(slot.template.duplicate());
        }
        for slot in &self.forces {
            let id = copy.add_force(slot.force.duplicate());
            for template in &slot.attached {
                copy.attach_force_to_template(id, *template);
            }
            for template in &slot.external {
                copy.attach_external_template(id, *template);
            }
        }
        copy
    }
}

impl Default for ParticleGenerator {
    fn default() -> Self {
        Self::new()
    }
}
