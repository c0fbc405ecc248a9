//! 代价模型模块
//!
//! 依据基准测量数据预测各设备上的耗时，并据此给出片段调度策略

pub mod data_source;
pub mod dwarf_bench;
pub mod extrapolation;
pub mod measurement;
pub mod model;
pub mod policy;

pub use data_source::{DataSource, StaticDataSource};
pub use dwarf_bench::{DwarfBench, DwarfCsvParser};
pub use extrapolation::{ExtrapolationModel, LinearExtrapolation, TimePrediction};
pub use measurement::{AnalyticalTemplate, DeviceMeasurements, Measurement, TemplateMeasurements};
pub use model::CostModel;
pub use policy::{ExecutionPolicy, FragmentInfo, SchedulingAssignment};
