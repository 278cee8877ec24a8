//! 数学辅助模块
//!
//! 提供粒子模拟所需的几何求交算法。

pub mod disc;

pub use disc::disc_ray_trace;
