//! 测量数据来源

use super::measurement::{AnalyticalTemplate, DeviceMeasurements, Measurement};
use crate::core::device::DeviceType;
use crate::core::error::{CostModelError, CostModelResult};

/// 测量数据来源特征
pub trait DataSource: Send + Sync {
    /// 数据来源名称，用于日志
    fn name(&self) -> &str;

    /// 获取指定设备与模板的测量数据，每组样本按规模升序
    fn get_measurements(
        &self,
        devices: &[DeviceType],
        templates: &[AnalyticalTemplate],
    ) -> CostModelResult<DeviceMeasurements>;
}

/// 内存中的固定测量数据
#[derive(Debug, Clone, Default)]
pub struct StaticDataSource {
    measurements: DeviceMeasurements,
}

impl StaticDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一组样本
    pub fn with_samples(
        mut self,
        device: DeviceType,
        template: AnalyticalTemplate,
        mut samples: Vec<Measurement>,
    ) -> Self {
        samples.sort();
        self.measurements
            .entry(device)
            .or_default()
            .insert(template, samples);
        self
    }
}

impl DataSource for StaticDataSource {
    fn name(&self) -> &str {
        "StaticDataSource"
    }

    fn get_measurements(
        &self,
        devices: &[DeviceType],
        templates: &[AnalyticalTemplate],
    ) -> CostModelResult<DeviceMeasurements> {
        let mut result = DeviceMeasurements::new();
        for device in devices {
            for template in templates {
                let samples = self
                    .measurements
                    .get(device)
                    .and_then(|per_template| per_template.get(template))
                    .ok_or_else(|| CostModelError::MissingMeasurements {
                        device: device.to_string(),
                        template: template.to_string(),
                    })?;
                result
                    .entry(*device)
                    .or_default()
                    .insert(*template, samples.clone());
            }
        }
        Ok(result)
    }
}
