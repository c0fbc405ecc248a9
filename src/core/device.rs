//! 执行设备定义
//!
//! 计划缓存与哈希表回收器按设备划分分区，此处定义设备类型与设备标识

use serde::{Deserialize, Serialize};
use std::fmt;

/// 设备标识
///
/// CPU 只有一个逻辑设备，GPU 设备从 1 开始编号
pub type DeviceIdentifier = i32;

/// CPU 设备标识
pub const CPU_DEVICE_IDENTIFIER: DeviceIdentifier = 0;

/// 执行设备类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Cpu,
    Gpu,
}

impl DeviceType {
    /// 所有设备类型，按固定顺序
    pub const ALL: [DeviceType; 2] = [DeviceType::Cpu, DeviceType::Gpu];

    /// 设备在外部基准工具中的名称
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Cpu => "cpu",
            DeviceType::Gpu => "gpu",
        }
    }

    /// 获取 GPU 第 `ordinal` 块卡的设备标识
    pub fn gpu_device_identifier(ordinal: u32) -> DeviceIdentifier {
        CPU_DEVICE_IDENTIFIER + 1 + ordinal as DeviceIdentifier
    }

    /// 根据设备标识推断设备类型
    pub fn from_identifier(device: DeviceIdentifier) -> Self {
        if device == CPU_DEVICE_IDENTIFIER {
            DeviceType::Cpu
        } else {
            DeviceType::Gpu
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
