use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{DRResult, DataRecyclerError};
use crate::dag::{DEFAULT_BYTES_PER_NODE, MAX_NODE_CACHE_SIZE};
use crate::recycler::{CacheBudget, CacheItemType};

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub dag_cache: DagCacheConfig,
    pub hashtable_cache: HashtableCacheConfig,
    pub cost_model: CostModelConfig,
    pub log: LogConfig,
}

/// 查询计划 DAG 缓存配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DagCacheConfig {
    /// 节点映射允许占用的最大字节数
    pub max_node_map_bytes: u64,
    /// 每个节点按固定字节数计
    pub bytes_per_node: u64,
}

impl Default for DagCacheConfig {
    fn default() -> Self {
        Self {
            max_node_map_bytes: MAX_NODE_CACHE_SIZE,
            bytes_per_node: DEFAULT_BYTES_PER_NODE,
        }
    }
}

/// 连接哈希表缓存配置，每种哈希表一份预算
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct HashtableCacheConfig {
    pub perfect_ht: CacheBudget,
    pub baseline_ht: CacheBudget,
    pub overlaps_ht: CacheBudget,
}

impl HashtableCacheConfig {
    pub fn budget(&self, item_type: CacheItemType) -> CacheBudget {
        match item_type {
            CacheItemType::PerfectHt => self.perfect_ht,
            CacheItemType::BaselineHt => self.baseline_ht,
            CacheItemType::OverlapsHt => self.overlaps_ht,
        }
    }

    pub fn budgets(&self) -> [(CacheItemType, CacheBudget); 3] {
        CacheItemType::ALL.map(|item_type| (item_type, self.budget(item_type)))
    }
}

/// 代价模型配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CostModelConfig {
    /// DwarfBench 安装目录
    pub dwarf_bench_path: PathBuf,
    /// 报告中数据规模列名
    pub size_header: String,
    /// 报告中耗时列名
    pub time_header: String,
    /// 决策缓存容量
    pub decision_cache_capacity: usize,
}

impl Default for CostModelConfig {
    fn default() -> Self {
        Self {
            dwarf_bench_path: PathBuf::from("/dwarf_bench"),
            size_header: "buf_size_bytes".to_string(),
            time_header: "total_time".to_string(),
            decision_cache_capacity: 1024,
        }
    }
}

/// 日志配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "logs".to_string(),
            file: "datarecycler".to_string(),
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_files: 5,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> DRResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| DataRecyclerError::Config(e.to_string()))?;
        config.validate().map_err(DataRecyclerError::Config)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> DRResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| DataRecyclerError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), String> {
        if self.dag_cache.bytes_per_node == 0 {
            return Err("dag_cache.bytes_per_node 必须大于0".to_string());
        }
        for (item_type, budget) in self.hashtable_cache.budgets() {
            budget
                .validate()
                .map_err(|e| format!("hashtable_cache.{}: {}", item_type, e))?;
        }
        if self.cost_model.decision_cache_capacity == 0 {
            return Err("cost_model.decision_cache_capacity 必须大于0".to_string());
        }
        if self.cost_model.size_header.is_empty() || self.cost_model.time_header.is_empty() {
            return Err("cost_model 的列名不能为空".to_string());
        }
        if self.log.max_files == 0 {
            return Err("log.max_files 必须大于0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.dag_cache.max_node_map_bytes, 1_000_000_000);
        assert_eq!(config.dag_cache.bytes_per_node, 16);
        assert_eq!(config.hashtable_cache.perfect_ht.max_total_bytes, 4294967296);
        assert_eq!(config.cost_model.size_header, "buf_size_bytes");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_save() {
        let temp_file = NamedTempFile::new().expect("Failed to create temporary file");

        let mut config = Config::default();
        config.dag_cache.max_node_map_bytes = 48;
        config.hashtable_cache.baseline_ht = CacheBudget::new(30, 18);
        config.save(temp_file.path()).expect("Failed to save config");

        let loaded_config =
            Config::load(temp_file.path()).expect("Failed to load config from temporary file");
        assert_eq!(config, loaded_config);
    }

    #[test]
    fn test_config_partial_file_uses_defaults() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        temp_file
            .write_all(b"[hashtable_cache.perfect_ht]\nmax_total_bytes = 64\n")
            .expect("Failed to write TOML content to temporary file");

        let config = Config::load(temp_file.path()).expect("Failed to load config");
        assert_eq!(config.hashtable_cache.perfect_ht.max_total_bytes, 64);
        assert_eq!(
            config.hashtable_cache.perfect_ht.max_item_bytes,
            crate::recycler::DEFAULT_MAX_ITEM_BYTES
        );
        assert_eq!(config.log.file, "datarecycler");
    }

    #[test]
    fn test_config_invalid() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temporary file");
        temp_file
            .write_all(b"[dag_cache]\nbytes_per_node = 0\n")
            .expect("Failed to write TOML content to temporary file");

        let err = Config::load(temp_file.path()).unwrap_err();
        assert!(matches!(err, DataRecyclerError::Config(_)));
    }
}
