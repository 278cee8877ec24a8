//! 效果描述与序列化
//!
//! 力场和模板的**配置**可以持久化；粒子的运行时状态（位置、寿命）
//! 永远不会被序列化。所有配置结构体用 serde 派生，字段声明顺序
//! 即保存/加载的稳定字段顺序。
//!
//! [`EffectDescriptor`] 是一个发射器的完整可序列化描述（模板配置 +
//! 力场配置 + 挂接关系），`instantiate` 从它构建出可运行的发射器，
//! 从而完成配置的往返。

use crate::core::error::EffectError;
use crate::force::{
    AttractionConfig, AttractionForce, CollisionDiscForce, DiscConfig, Force, NeuralConfig,
    NeuralForce, SlipConfig, SlipForce,
};
use crate::generator::ParticleGenerator;
use crate::template::{
    ParticleTemplate, RecursiveConfig, RecursiveTemplate, RibbonConfig, RibbonTemplate,
    SpriteConfig, SpriteTemplate, StreakConfig, StreakTemplate, TemplateId,
};
use serde::{Deserialize, Serialize};

/// 可序列化的模板描述
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TemplateDescriptor {
    Sprite(SpriteConfig),
    Streak(StreakConfig),
    Ribbon(RibbonConfig),
    Recursive(RecursiveConfig),
}

impl TemplateDescriptor {
    pub fn instantiate(&self) -> Box<dyn ParticleTemplate> {
        match self {
            Self::Sprite(config) => Box::new(SpriteTemplate::new(config.clone())),
            Self::Streak(config) => Box::new(StreakTemplate::new(config.clone())),
            Self::Ribbon(config) => Box::new(RibbonTemplate::new(config.clone())),
            Self::Recursive(config) => Box::new(RecursiveTemplate::new(config.clone())),
        }
    }
}

/// 可序列化的力场描述
///
/// 神经网络力场只持久化配置；训练样本在装配期提供，训练好的权重
/// 不参与序列化。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ForceDescriptor {
    Attraction(AttractionConfig),
    Slip(SlipConfig),
    CollisionDisc(DiscConfig),
    Neural(NeuralConfig),
}

impl ForceDescriptor {
    pub fn instantiate(&self) -> Box<dyn Force> {
        match self {
            Self::Attraction(config) => Box::new(AttractionForce::new(config.clone())),
            Self::Slip(config) => Box::new(SlipForce::new(config.clone())),
            Self::CollisionDisc(config) => Box::new(CollisionDiscForce::new(config.clone())),
            Self::Neural(config) => Box::new(NeuralForce::new(config.clone())),
        }
    }
}

/// 力场描述加挂接关系（按模板下标）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceBinding {
    pub force: ForceDescriptor,
    /// 挂接的模板下标（对应 `EffectDescriptor::templates` 的顺序）
    pub attached: Vec<u32>,
}

/// 一个发射器的完整可序列化描述
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectDescriptor {
    pub templates: Vec<TemplateDescriptor>,
    pub forces: Vec<ForceBinding>,
}

impl EffectDescriptor {
    /// 构建出可运行的发射器
    pub fn instantiate(&self) -> ParticleGenerator {
        let mut generator = ParticleGenerator::new();
        for template in &self.templates {
            generator.add_template(template.instantiate());
        }
        for binding in &self.forces {
            let id = generator.add_force(binding.force.instantiate());
            for index in &binding.attached {
                generator.attach_force_to_template(id, TemplateId(*index));
            }
        }
        generator
    }

    pub fn to_json(&self) -> Result<String, EffectError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, EffectError> {
        Ok(serde_json::from_str(json)?)
    }
}
