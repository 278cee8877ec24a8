//! 神经网络力场
//!
//! 一个小型前馈网络（单隐藏层，sigmoid 激活，线性输出）在装配期
//! 用给定的输入/输出样本对训练，之后每帧把粒子速度喂进网络得到
//! 力向量。训练在 `max_epochs` 轮次或均方误差降到
//! `convergence_threshold` 以下时终止（两者先到先停，均可配置），
//! 绝不会无限阻塞模拟 tick。
//!
//! 未训练就 `apply` 会得到 [`ForceError::UntrainedNetwork`]，由
//! 发射器捕获记录，不会静默地用随机权重驱动粒子。

use crate::core::error::ForceError;
use crate::force::{Force, ForceContext};
use crate::impl_default;
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 网络输入维度（粒子速度）
const INPUT_DIM: usize = 3;
/// 网络输出维度（力向量）
const OUTPUT_DIM: usize = 3;

/// 神经网络力场配置（字段声明顺序即序列化顺序）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralConfig {
    /// 调度优先级
    pub priority: i32,
    /// 隐藏单元数
    pub hidden_units: usize,
    /// 学习率
    pub learning_rate: f32,
    /// 初始权重幅度（均匀分布 [-scale, scale]）
    pub weight_scale: f32,
    /// 训练轮次上限
    pub max_epochs: usize,
    /// 收敛阈值（均方误差）
    pub convergence_threshold: f32,
    /// 输出力向量的缩放
    pub output_scale: f32,
    /// 权重初始化种子（固定种子保证可重现）
    pub seed: u64,
}

impl_default!(NeuralConfig {
    priority: 0,
    hidden_units: 8,
    learning_rate: 0.05,
    weight_scale: 0.5,
    max_epochs: 2000,
    convergence_threshold: 1e-3,
    output_scale: 1.0,
    seed: 0x5eed,
});

/// 训练结果报告
#[derive(Debug, Clone, Copy)]
pub struct TrainingReport {
    /// 实际执行的轮次
    pub epochs: usize,
    /// 最终均方误差
    pub final_error: f32,
    /// 是否因收敛（而非轮次耗尽）终止
    pub converged: bool,
}

/// 训练好的网络权重
///
/// `w1` 为 hidden × (INPUT_DIM + 1)（含偏置列），
/// `w2` 为 OUTPUT_DIM × (hidden + 1)。
#[derive(Debug, Clone)]
struct Network {
    hidden_units: usize,
    w1: Vec<f32>,
    w2: Vec<f32>,
}

impl Network {
    fn forward(&self, input: [f32; INPUT_DIM]) -> (Vec<f32>, [f32; OUTPUT_DIM]) {
        let mut hidden = vec![0.0f32; self.hidden_units];
        for (j, h) in hidden.iter_mut().enumerate() {
            let row = &self.w1[j * (INPUT_DIM + 1)..(j + 1) * (INPUT_DIM + 1)];
            let mut sum = row[INPUT_DIM]; // 偏置
            for i in 0..INPUT_DIM {
                sum += row[i] * input[i];
            }
            *h = sigmoid(sum);
        }

        let mut output = [0.0f32; OUTPUT_DIM];
        for (k, o) in output.iter_mut().enumerate() {
            let row = &self.w2[k * (self.hidden_units + 1)..(k + 1) * (self.hidden_units + 1)];
            let mut sum = row[self.hidden_units]; // 偏置
            for (j, h) in hidden.iter().enumerate() {
                sum += row[j] * h;
            }
            *o = sum; // 线性输出
        }
        (hidden, output)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// 神经网络力场
#[derive(Debug, Clone)]
pub struct NeuralForce {
    config: NeuralConfig,
    network: Option<Network>,
}

impl NeuralForce {
    pub fn new(config: NeuralConfig) -> Self {
        Self {
            config,
            network: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.network.is_some()
    }

    /// 批量梯度下降训练
    ///
    /// `inputs` 与 `targets` 必须行数一致且每行宽度为 3；形状不匹配
    /// 立即返回配置错误，不会带着未训练的网络进入模拟。
    pub fn train(
        &mut self,
        inputs: &[Vec<f32>],
        targets: &[Vec<f32>],
    ) -> Result<TrainingReport, ForceError> {
        if self.config.hidden_units == 0 {
            return Err(ForceError::InvalidConfig(
                "hidden_units must be at least 1".into(),
            ));
        }
        if inputs.len() != targets.len() || inputs.is_empty() {
            return Err(ForceError::TrainingShapeMismatch {
                inputs: inputs.len(),
                targets: targets.len(),
            });
        }
        for (row, input) in inputs.iter().enumerate() {
            if input.len() != INPUT_DIM {
                return Err(ForceError::TrainingRowWidth {
                    row,
                    got: input.len(),
                    expected: INPUT_DIM,
                });
            }
        }
        for (row, target) in targets.iter().enumerate() {
            if target.len() != OUTPUT_DIM {
                return Err(ForceError::TrainingRowWidth {
                    row,
                    got: target.len(),
                    expected: OUTPUT_DIM,
                });
            }
        }

        let hidden_units = self.config.hidden_units;
        let mut rng = SmallRng::seed_from_u64(self.config.seed);
        let scale = self.config.weight_scale;
        let mut network = Network {
            hidden_units,
            w1: (0..hidden_units * (INPUT_DIM + 1))
                .map(|_| rng.gen_range(-scale..=scale))
                .collect(),
            w2: (0..OUTPUT_DIM * (hidden_units + 1))
                .map(|_| rng.gen_range(-scale..=scale))
                .collect(),
        };

        let sample_count = inputs.len() as f32;
        let mut report = TrainingReport {
            epochs: 0,
            final_error: f32::MAX,
            converged: false,
        };

        for epoch in 0..self.config.max_epochs {
            let mut grad_w1 = vec![0.0f32; network.w1.len()];
            let mut grad_w2 = vec![0.0f32; network.w2.len()];
            let mut squared_error = 0.0f32;

            for (input, target) in inputs.iter().zip(targets) {
                let x = [input[0], input[1], input[2]];
                let (hidden, output) = network.forward(x);

                // 输出层梯度（线性输出）
                let mut delta_out = [0.0f32; OUTPUT_DIM];
                for k in 0..OUTPUT_DIM {
                    delta_out[k] = output[k] - target[k];
                    squared_error += delta_out[k] * delta_out[k];
                    let base = k * (hidden_units + 1);
                    for (j, h) in hidden.iter().enumerate() {
                        grad_w2[base + j] += delta_out[k] * h;
                    }
                    grad_w2[base + hidden_units] += delta_out[k];
                }

                // 隐藏层梯度（sigmoid 导数 h(1-h)）
                for (j, h) in hidden.iter().enumerate() {
                    let mut back = 0.0f32;
                    for k in 0..OUTPUT_DIM {
                        back += delta_out[k] * network.w2[k * (hidden_units + 1) + j];
                    }
                    let delta_hidden = back * h * (1.0 - h);
                    let base = j * (INPUT_DIM + 1);
                    for i in 0..INPUT_DIM {
                        grad_w1[base + i] += delta_hidden * x[i];
                    }
                    grad_w1[base + INPUT_DIM] += delta_hidden;
                }
            }

            let step = self.config.learning_rate / sample_count;
            for (w, g) in network.w1.iter_mut().zip(&grad_w1) {
                *w -= step * g;
            }
            for (w, g) in network.w2.iter_mut().zip(&grad_w2) {
                *w -= step * g;
            }

            report.epochs = epoch + 1;
            report.final_error = squared_error / sample_count;
            if report.final_error < self.config.convergence_threshold {
                report.converged = true;
                break;
            }
        }

        info!(
            epochs = report.epochs,
            error = report.final_error,
            converged = report.converged,
            "neural force training finished"
        );
        self.network = Some(network);
        Ok(report)
    }
}

impl Force for NeuralForce {
    fn type_name(&self) -> &'static str {
        "NeuralForce"
    }

    fn priority(&self) -> i32 {
        self.config.priority
    }

    fn apply(&mut self, ctx: &mut ForceContext<'_>) -> Result<(), ForceError> {
        let network = self.network.as_ref().ok_or(ForceError::UntrainedNetwork)?;

        let dt = ctx.delta_time;
        for handle in ctx.affected_handles() {
            let velocity = match ctx.get(handle) {
                Some(p) => p.velocity,
                None => continue,
            };
            let (_, output) = network.forward([velocity.x, velocity.y, velocity.z]);
            let force = Vec3::from_array(output) * self.config.output_scale;
            if !force.is_finite() {
                continue;
            }
            if let Some(p) = ctx.get_mut(handle) {
                p.velocity += force * dt;
            }
        }
        Ok(())
    }

    fn duplicate(&self) -> Box<dyn Force> {
        // 训练好的权重是不可变配置的一部分，深拷贝随副本走
        Box::new(self.clone())
    }
}
