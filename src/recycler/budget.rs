//! 缓存容量预算

use serde::{Deserialize, Serialize};

/// 默认分区总容量 4GiB
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 4 * 1024 * 1024 * 1024;
/// 默认单项上限 2GiB
pub const DEFAULT_MAX_ITEM_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// 某类缓存项的容量预算，对该类型下每个设备分区分别生效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheBudget {
    /// 单个设备分区允许的总字节数
    pub max_total_bytes: u64,
    /// 单个缓存项允许的最大字节数
    pub max_item_bytes: u64,
}

impl CacheBudget {
    pub fn new(max_total_bytes: u64, max_item_bytes: u64) -> Self {
        Self {
            max_total_bytes,
            max_item_bytes,
        }
    }

    /// 单项大小是否在预算内
    pub fn admits(&self, mem_size: u64) -> bool {
        mem_size <= self.max_item_bytes && mem_size <= self.max_total_bytes
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_total_bytes == 0 {
            return Err("max_total_bytes 必须大于0".to_string());
        }
        if self.max_item_bytes == 0 {
            return Err("max_item_bytes 必须大于0".to_string());
        }
        Ok(())
    }
}

impl Default for CacheBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOTAL_BYTES, DEFAULT_MAX_ITEM_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits() {
        let budget = CacheBudget::new(30, 18);
        assert!(budget.admits(18));
        assert!(!budget.admits(19));

        let budget = CacheBudget::new(10, 18);
        assert!(!budget.admits(12));
    }

    #[test]
    fn test_validate() {
        assert!(CacheBudget::default().validate().is_ok());
        assert!(CacheBudget::new(0, 1).validate().is_err());
        assert!(CacheBudget::new(1, 0).validate().is_err());
    }
}
