//! 测量数据类型

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::device::DeviceType;

/// 单次测量：数据规模与耗时
///
/// 按数据规模排序，规模相同时按耗时排序
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Measurement {
    pub size_bytes: u64,
    pub time_ms: f64,
}

impl Measurement {
    pub fn new(size_bytes: u64, time_ms: f64) -> Self {
        Self {
            size_bytes,
            time_ms,
        }
    }
}

impl PartialEq for Measurement {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Measurement {}

impl PartialOrd for Measurement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Measurement {
    fn cmp(&self, other: &Self) -> Ordering {
        self.size_bytes
            .cmp(&other.size_bytes)
            .then_with(|| self.time_ms.total_cmp(&other.time_ms))
    }
}

/// 分析模板，代价模型按模板分别校准
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnalyticalTemplate {
    GroupBy,
    Join,
    Scan,
    Reduce,
}

impl AnalyticalTemplate {
    pub const ALL: [AnalyticalTemplate; 4] = [
        AnalyticalTemplate::GroupBy,
        AnalyticalTemplate::Join,
        AnalyticalTemplate::Scan,
        AnalyticalTemplate::Reduce,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticalTemplate::GroupBy => "GroupBy",
            AnalyticalTemplate::Join => "Join",
            AnalyticalTemplate::Scan => "Scan",
            AnalyticalTemplate::Reduce => "Reduce",
        }
    }
}

impl fmt::Display for AnalyticalTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type TemplateMeasurements = HashMap<AnalyticalTemplate, Vec<Measurement>>;
pub type DeviceMeasurements = HashMap<DeviceType, TemplateMeasurements>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_order() {
        let mut samples = vec![
            Measurement::new(300, 1.0),
            Measurement::new(100, 5.0),
            Measurement::new(100, 2.0),
        ];
        samples.sort();
        let sizes: Vec<_> = samples.iter().map(|m| (m.size_bytes, m.time_ms)).collect();
        assert_eq!(sizes, vec![(100, 2.0), (100, 5.0), (300, 1.0)]);
    }
}
