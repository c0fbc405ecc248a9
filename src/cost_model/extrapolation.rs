//! 耗时外推模型

use super::measurement::Measurement;
use crate::core::error::{CostModelError, CostModelResult};

/// 由数据规模预测耗时（毫秒）
pub type TimePrediction = Box<dyn Fn(u64) -> f64 + Send + Sync>;

/// 外推模型特征
pub trait ExtrapolationModel: Send + Sync {
    /// 由一组样本生成预测函数
    fn fit(&self, measurements: &[Measurement]) -> CostModelResult<TimePrediction>;
}

/// 分段线性外推
///
/// 样本范围内取相邻两点插值；小于最小规模时用前两点外推，
/// 大于最大规模时用后两点外推
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearExtrapolation;

impl LinearExtrapolation {
    pub fn new() -> Self {
        Self
    }

    fn predict(samples: &[Measurement], size_bytes: u64) -> f64 {
        let upper = samples.partition_point(|m| m.size_bytes <= size_bytes);
        let (i1, i2) = if upper == 0 {
            (0, 1)
        } else if upper == samples.len() {
            (samples.len() - 2, samples.len() - 1)
        } else {
            (upper - 1, upper)
        };

        let (p1, p2) = (samples[i1], samples[i2]);
        let (x1, x2) = (p1.size_bytes as f64, p2.size_bytes as f64);
        if x2 == x1 {
            return p1.time_ms;
        }
        p1.time_ms + (size_bytes as f64 - x1) / (x2 - x1) * (p2.time_ms - p1.time_ms)
    }
}

impl ExtrapolationModel for LinearExtrapolation {
    fn fit(&self, measurements: &[Measurement]) -> CostModelResult<TimePrediction> {
        if measurements.len() < 2 {
            return Err(CostModelError::InsufficientSamples(measurements.len()));
        }
        let mut samples = measurements.to_vec();
        samples.sort();
        Ok(Box::new(move |size_bytes| Self::predict(&samples, size_bytes)))
    }
}
