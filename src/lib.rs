//! # Particle Engine
//!
//! A CPU-side particle effects core: polymorphic forces, particle templates
//! and generators driving a per-frame simulation loop.
//!
//! ## Features
//!
//! - **Forces**: attraction, slip (distance) constraint, disc collision with
//!   ray-traced response, and a trainable feed-forward neural force
//! - **Templates**: sprite, textured streak, triangle ribbon and recursive
//!   (nested emitter) particle definitions
//! - **Generator**: the aggregate root owning templates, forces and live
//!   particles, with an Idle → Active → Draining → Idle lifecycle
//! - **Arena storage**: stable-handle particle slots threaded into an
//!   intrusive doubly-linked live list with O(1) insert/remove
//! - **Render boundary**: templates emit declarative primitives through an
//!   abstract draw interface, never touching a graphics API
//!
//! ## 架构设计
//!
//! 控制流：`Generator::tick` → 发射 → 模板推进 → 力场按优先级施加 →
//! 老化销毁；`Generator::render` → 各模板发出绘制图元。
//!
//! 粒子内存由发射器的粒子仓独占；力场和模板只保存稳定句柄，并通过
//! 同步的销毁通知在句柄失效前清理自身状态。
//!
//! ### Example
//!
//! ```ignore
//! use particle_engine::prelude::*;
//!
//! let mut generator = ParticleGenerator::new();
//! let sparks = generator.add_template(Box::new(SpriteTemplate::new(SpriteConfig::default())));
//! let floor = generator.add_force(Box::new(CollisionDiscForce::new(DiscConfig::default())));
//! generator.attach_force_to_template(floor, sparks);
//!
//! generator.activate();
//! generator.tick(0.016);
//! ```

/// Core functionality: unified error types and shared macros
pub mod core;
/// Math helpers, including the pure disc ray-trace used by collision forces
pub mod math;
/// Arena-backed intrusive list storing the live particle population
pub mod storage;
/// The smallest simulated unit
pub mod particle;
/// Polymorphic per-tick force hierarchy
pub mod force;
/// Polymorphic particle template hierarchy
pub mod template;
/// Render boundary: abstract draw interface and scene pass-through data
pub mod render;
/// The aggregate root driving the simulation loop
pub mod generator;
/// Serializable effect configuration
pub mod descriptor;

#[cfg(test)]
mod property_tests;

pub use crate::core::{EffectError, ForceError, TemplateError};
pub use descriptor::{EffectDescriptor, ForceBinding, ForceDescriptor, TemplateDescriptor};
pub use generator::{GeneratorState, ParticleGenerator};
pub use particle::Particle;
pub use storage::{ParticleArena, ParticleHandle, RemovedParticle};

/// 常用类型的一站式导入
pub mod prelude {
    pub use crate::descriptor::{
        EffectDescriptor, ForceBinding, ForceDescriptor, TemplateDescriptor,
    };
    pub use crate::force::{
        AttractionConfig, AttractionForce, CollisionDiscForce, CollisionResponse, DiscConfig,
        Force, ForceContext, ForceId, NeuralConfig, NeuralForce, SlipConfig, SlipForce,
    };
    pub use crate::generator::{GeneratorState, ParticleGenerator};
    pub use crate::math::disc_ray_trace;
    pub use crate::particle::Particle;
    pub use crate::render::{Light, RecordingRenderer, RenderInterface, SceneContext};
    pub use crate::storage::{ParticleArena, ParticleHandle};
    pub use crate::template::{
        ParticleTemplate, RecursiveConfig, RecursiveTemplate, RibbonConfig, RibbonTemplate,
        SpriteConfig, SpriteTemplate, StreakConfig, StreakTemplate, TemplateContext, TemplateId,
    };
}
