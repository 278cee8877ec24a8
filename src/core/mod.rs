//! 核心模块
//!
//! 提供引擎范围内的统一错误类型和通用宏。

pub mod error;
pub mod macros;

pub use error::{EffectError, ForceError, TemplateError};
