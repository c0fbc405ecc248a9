//! 统一错误处理系统
//!
//! ## 设计理念
//!
//! 1. **软结果不是错误**：缓存容量拒绝、计划不可缓存、DAG 缓存溢出清空
//!    都通过返回值或标志位表达，不会出现在这里
//! 2. **可失败的边界**：配置加载、代价模型校准、基准报告解析返回结构化错误
//! 3. **统一接口**：`DRResult<T>` 提供统一的返回类型，简化错误传播

use std::fmt;
use thiserror::Error;

/// 统一错误类型
#[derive(Error, Debug)]
pub enum DataRecyclerError {
    #[error("解析错误: {0}")]
    Parse(#[from] ParseError),

    #[error("代价模型错误: {0}")]
    CostModel(#[from] CostModelError),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 统一的结果类型
pub type DRResult<T> = Result<T, DataRecyclerError>;

/// 解析错误种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// 报告文件不存在或不可读
    MissingReport,
    /// 表头缺少所需列
    MissingColumn,
    /// 数据行字段数不足
    MalformedRow,
    /// 数值字段无法解析
    InvalidNumber,
    /// 报告没有表头
    EmptyReport,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseErrorKind::MissingReport => "报告文件不存在",
            ParseErrorKind::MissingColumn => "缺少列",
            ParseErrorKind::MalformedRow => "数据行格式错误",
            ParseErrorKind::InvalidNumber => "数值格式错误",
            ParseErrorKind::EmptyReport => "空报告",
        };
        f.write_str(name)
    }
}

/// 解析错误
///
/// `context` 保存出错的文件名、列名或行内容，便于诊断
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {context}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub context: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, context: impl Into<String>) -> Self {
        Self {
            kind,
            context: context.into(),
        }
    }

    pub fn missing_column(column: &str) -> Self {
        Self::new(ParseErrorKind::MissingColumn, column)
    }
}

/// 代价模型错误
#[derive(Error, Debug)]
pub enum CostModelError {
    #[error("基准报告解析失败: {0}")]
    Report(#[from] ParseError),

    #[error("基准脚本执行失败: {0}")]
    BenchmarkFailed(String),

    #[error("外推至少需要两个样本，实际只有 {0} 个")]
    InsufficientSamples(usize),

    #[error("代价模型尚未校准")]
    NotCalibrated,

    #[error("缺少设备 {device} 上模板 {template} 的测量数据")]
    MissingMeasurements { device: String, template: String },

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 代价模型结果类型
pub type CostModelResult<T> = Result<T, CostModelError>;
