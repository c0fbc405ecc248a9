//! 代价模型
//!
//! 校准阶段从数据来源获取各 (设备, 模板) 的测量数据并拟合预测函数；
//! 预测阶段选择预测耗时最低的设备。决策按 DAG 字符串缓存在 LRU 中，
//! 空 DAG 不缓存。

use std::collections::HashMap;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::{Mutex, RwLock};

use super::data_source::DataSource;
use super::extrapolation::{ExtrapolationModel, TimePrediction};
use super::measurement::AnalyticalTemplate;
use super::policy::ExecutionPolicy;
use crate::config::CostModelConfig;
use crate::core::device::DeviceType;
use crate::core::error::{CostModelError, CostModelResult};
use crate::dag::{DagGeneration, ExtractedPlanDag};

type TemplatePredictions = HashMap<AnalyticalTemplate, TimePrediction>;
type DevicePredictions = HashMap<DeviceType, TemplatePredictions>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DecisionKey {
    generation: DagGeneration,
    dag: String,
    template: AnalyticalTemplate,
    size_bytes: u64,
}

/// 代价模型
pub struct CostModel {
    data_source: Box<dyn DataSource>,
    extrapolation: Box<dyn ExtrapolationModel>,
    devices: Vec<DeviceType>,
    templates: Vec<AnalyticalTemplate>,
    predictions: RwLock<DevicePredictions>,
    decisions: Mutex<LruCache<DecisionKey, ExecutionPolicy>>,
}

impl CostModel {
    pub fn new(
        data_source: Box<dyn DataSource>,
        extrapolation: Box<dyn ExtrapolationModel>,
        decision_cache_capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(decision_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            data_source,
            extrapolation,
            devices: DeviceType::ALL.to_vec(),
            templates: AnalyticalTemplate::ALL.to_vec(),
            predictions: RwLock::new(HashMap::new()),
            decisions: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn from_config(
        config: &CostModelConfig,
        data_source: Box<dyn DataSource>,
        extrapolation: Box<dyn ExtrapolationModel>,
    ) -> Self {
        Self::new(data_source, extrapolation, config.decision_cache_capacity)
    }

    /// 限定参与校准与预测的设备
    pub fn with_devices(mut self, devices: &[DeviceType]) -> Self {
        self.devices = devices.to_vec();
        self
    }

    /// 限定参与校准的模板
    pub fn with_templates(mut self, templates: &[AnalyticalTemplate]) -> Self {
        self.templates = templates.to_vec();
        self
    }

    /// 拉取测量数据并重新拟合，清空已有决策
    pub fn calibrate(&self) -> CostModelResult<()> {
        let measurements = self
            .data_source
            .get_measurements(&self.devices, &self.templates)?;

        let mut fitted = DevicePredictions::new();
        for device in &self.devices {
            for template in &self.templates {
                let samples = measurements
                    .get(device)
                    .and_then(|per_template| per_template.get(template))
                    .ok_or_else(|| CostModelError::MissingMeasurements {
                        device: device.to_string(),
                        template: template.to_string(),
                    })?;
                let prediction = self.extrapolation.fit(samples)?;
                fitted.entry(*device).or_default().insert(*template, prediction);
            }
        }

        *self.predictions.write() = fitted;
        self.decisions.lock().clear();
        log::info!(
            "代价模型已由 {} 校准：{} 个设备，{} 个模板",
            self.data_source.name(),
            self.devices.len(),
            self.templates.len()
        );
        Ok(())
    }

    pub fn is_calibrated(&self) -> bool {
        !self.predictions.read().is_empty()
    }

    /// 预测指定设备上的耗时
    pub fn predict_time(
        &self,
        device: DeviceType,
        template: AnalyticalTemplate,
        size_bytes: u64,
    ) -> CostModelResult<f64> {
        let predictions = self.predictions.read();
        if predictions.is_empty() {
            return Err(CostModelError::NotCalibrated);
        }
        let prediction = predictions
            .get(&device)
            .and_then(|per_template| per_template.get(&template))
            .ok_or_else(|| CostModelError::MissingMeasurements {
                device: device.to_string(),
                template: template.to_string(),
            })?;
        Ok(prediction(size_bytes))
    }

    /// 为计划选择执行策略
    pub fn predict(
        &self,
        dag: &ExtractedPlanDag,
        template: AnalyticalTemplate,
        size_bytes: u64,
    ) -> CostModelResult<ExecutionPolicy> {
        let key = dag.is_cacheable().then(|| DecisionKey {
            generation: dag.generation,
            dag: dag.extracted_dag.clone(),
            template,
            size_bytes,
        });
        if let Some(key) = &key {
            if let Some(policy) = self.decisions.lock().get(key) {
                return Ok(*policy);
            }
        }

        let mut best: Option<(DeviceType, f64)> = None;
        for device in &self.devices {
            let time = self.predict_time(*device, template, size_bytes)?;
            if best.map_or(true, |(_, best_time)| time < best_time) {
                best = Some((*device, time));
            }
        }
        let (device, time) = best.ok_or(CostModelError::NotCalibrated)?;
        let policy = ExecutionPolicy::FragmentIdAssignment(device);
        log::debug!(
            "{} 规模 {} 预测耗时 {:.3}ms，选择 {}",
            template,
            size_bytes,
            time,
            policy
        );

        if let Some(key) = key {
            self.decisions.lock().put(key, policy);
        }
        Ok(policy)
    }

    /// 已缓存的决策数
    pub fn cached_decision_count(&self) -> usize {
        self.decisions.lock().len()
    }
}
