//! 统一错误处理模块
//!
//! 提供粒子系统范围内的统一错误类型定义
//!
//! ## 错误类型分层
//!
//! - **力场层错误** (`ForceError`): 力场配置、训练和应用阶段的错误
//! - **模板层错误** (`TemplateError`): 粒子模板初始化和渲染阶段的错误
//!
//! `EffectError` 可以同时处理力场层和模板层的错误。
//! 发生器在 tick 期间捕获这些错误并记录日志，模拟不会因单个
//! 力场或模板出错而中断。

use thiserror::Error;

/// 粒子系统顶层错误类型
#[derive(Error, Debug)]
pub enum EffectError {
    #[error("Force error: {0}")]
    Force(#[from] ForceError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

/// 力场系统错误
#[derive(Error, Debug, Clone)]
pub enum ForceError {
    #[error("Network has not been trained: call train() before apply()")]
    UntrainedNetwork,

    #[error("Training data shape mismatch: {inputs} input rows vs {targets} target rows")]
    TrainingShapeMismatch { inputs: usize, targets: usize },

    #[error("Training row {row} has width {got}, expected {expected}")]
    TrainingRowWidth {
        row: usize,
        got: usize,
        expected: usize,
    },

    #[error("Invalid force configuration: {0}")]
    InvalidConfig(String),
}

/// 粒子模板错误
#[derive(Error, Debug, Clone)]
pub enum TemplateError {
    #[error("Invalid template configuration: {0}")]
    InvalidConfig(String),

    #[error("Render failed: {0}")]
    RenderFailed(String),
}
