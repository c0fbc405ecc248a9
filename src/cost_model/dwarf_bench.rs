//! DwarfBench 基准数据来源
//!
//! 对每个 (模板, 设备) 组合运行 `scripts/benchmark_<模板>.sh <报告> <设备>`，
//! 再从生成的 CSV 报告中读取数据规模列与耗时列

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use csv::{ReaderBuilder, StringRecord, Trim};

use super::data_source::DataSource;
use super::measurement::{AnalyticalTemplate, DeviceMeasurements, Measurement};
use crate::config::CostModelConfig;
use crate::core::device::DeviceType;
use crate::core::error::{CostModelError, CostModelResult, ParseError, ParseErrorKind};

const RESULTS_DIR: &str = "results";
const SCRIPTS_DIR: &str = "scripts";

/// DwarfBench 报告解析器
#[derive(Debug, Clone)]
pub struct DwarfCsvParser {
    size_header: String,
    time_header: String,
}

impl DwarfCsvParser {
    pub fn new(size_header: impl Into<String>, time_header: impl Into<String>) -> Self {
        Self {
            size_header: size_header.into(),
            time_header: time_header.into(),
        }
    }

    /// 读取并解析报告文件
    pub fn parse_report(&self, path: &Path) -> Result<Vec<Measurement>, ParseError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ParseError::new(
                ParseErrorKind::MissingReport,
                format!("{}: {}", path.display(), e),
            )
        })?;
        self.parse_str(&content)
    }

    /// 解析报告内容，结果按规模升序
    ///
    /// 支持带引号的字段，首尾空白会被去掉，空行被跳过
    pub fn parse_str(&self, content: &str) -> Result<Vec<Measurement>, ParseError> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader.headers().map_err(malformed)?.clone();
        if headers.is_empty() {
            return Err(ParseError::new(ParseErrorKind::EmptyReport, "报告没有表头"));
        }
        let size_index = column_index(&headers, &self.size_header)?;
        let time_index = column_index(&headers, &self.time_header)?;

        let mut measurements = Vec::new();
        for record in reader.records() {
            let record = record.map_err(malformed)?;
            let (Some(size), Some(time)) = (record.get(size_index), record.get(time_index)) else {
                return Err(ParseError::new(
                    ParseErrorKind::MalformedRow,
                    describe_record(&record),
                ));
            };
            let size_bytes = size
                .parse::<u64>()
                .map_err(|_| ParseError::new(ParseErrorKind::InvalidNumber, size))?;
            let time_ms = time
                .parse::<f64>()
                .map_err(|_| ParseError::new(ParseErrorKind::InvalidNumber, time))?;
            measurements.push(Measurement::new(size_bytes, time_ms));
        }

        measurements.sort();
        Ok(measurements)
    }
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize, ParseError> {
    headers
        .iter()
        .position(|column| column == name)
        .ok_or_else(|| ParseError::missing_column(name))
}

fn malformed(err: csv::Error) -> ParseError {
    ParseError::new(ParseErrorKind::MalformedRow, err.to_string())
}

fn describe_record(record: &StringRecord) -> String {
    let line = record.position().map_or(0, |position| position.line());
    format!("第 {} 行: {}", line, record.iter().collect::<Vec<_>>().join(","))
}

/// DwarfBench 数据来源
#[derive(Debug, Clone)]
pub struct DwarfBench {
    root: PathBuf,
    parser: DwarfCsvParser,
}

impl DwarfBench {
    pub fn new(root: impl Into<PathBuf>, parser: DwarfCsvParser) -> Self {
        Self {
            root: root.into(),
            parser,
        }
    }

    pub fn from_config(config: &CostModelConfig) -> Self {
        Self::new(
            &config.dwarf_bench_path,
            DwarfCsvParser::new(&config.size_header, &config.time_header),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 报告文件路径
    pub fn report_path(&self, template: AnalyticalTemplate, device: DeviceType) -> PathBuf {
        self.root
            .join(RESULTS_DIR)
            .join(format!("report_{}_{}.csv", template, device))
    }

    /// 运行单个基准脚本
    pub fn run_benchmark(
        &self,
        template: AnalyticalTemplate,
        device: DeviceType,
        report: &Path,
    ) -> CostModelResult<()> {
        let script = self
            .root
            .join(SCRIPTS_DIR)
            .join(format!("benchmark_{}.sh", template));
        log::info!("运行基准脚本 {} (设备 {})", script.display(), device);

        let status = Command::new(&script)
            .arg(report)
            .arg(device.as_str())
            .current_dir(&self.root)
            .stdout(Stdio::null())
            .status()
            .map_err(|e| CostModelError::BenchmarkFailed(format!("{}: {}", script.display(), e)))?;

        if !status.success() {
            return Err(CostModelError::BenchmarkFailed(format!(
                "{} 退出状态 {}",
                script.display(),
                status
            )));
        }
        Ok(())
    }
}

impl DataSource for DwarfBench {
    fn name(&self) -> &str {
        "DwarfBench"
    }

    fn get_measurements(
        &self,
        devices: &[DeviceType],
        templates: &[AnalyticalTemplate],
    ) -> CostModelResult<DeviceMeasurements> {
        fs::create_dir_all(self.root.join(RESULTS_DIR))?;

        let mut dm = DeviceMeasurements::new();
        for template in templates {
            for device in devices {
                let report = self.report_path(*template, *device);
                self.run_benchmark(*template, *device, &report)?;
                let samples = self.parser.parse_report(&report)?;
                log::debug!(
                    "{} 在设备 {} 上得到 {} 个样本",
                    template,
                    device,
                    samples.len()
                );
                dm.entry(*device).or_default().insert(*template, samples);
            }
        }
        Ok(dm)
    }
}
