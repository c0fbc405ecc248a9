//! 片段调度策略

use std::fmt;

use crate::core::device::{DeviceIdentifier, DeviceType, CPU_DEVICE_IDENTIFIER};

/// 片段信息，记录片段在各类设备上的设备标识
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentInfo {
    pub fragment_id: usize,
    pub num_tuples: usize,
    pub cpu_device_id: DeviceIdentifier,
    pub gpu_device_id: DeviceIdentifier,
}

impl FragmentInfo {
    pub fn new(fragment_id: usize, num_tuples: usize) -> Self {
        Self {
            fragment_id,
            num_tuples,
            cpu_device_id: CPU_DEVICE_IDENTIFIER,
            gpu_device_id: DeviceType::gpu_device_identifier(0),
        }
    }

    pub fn with_gpu_device(mut self, device: DeviceIdentifier) -> Self {
        self.gpu_device_id = device;
        self
    }

    pub fn device_id(&self, device_type: DeviceType) -> DeviceIdentifier {
        match device_type {
            DeviceType::Cpu => self.cpu_device_id,
            DeviceType::Gpu => self.gpu_device_id,
        }
    }
}

/// 单个片段的调度结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingAssignment {
    pub device_type: DeviceType,
    pub device_id: DeviceIdentifier,
}

/// 执行策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPolicy {
    /// 所有片段放在同一类设备上
    FragmentIdAssignment(DeviceType),
    /// 奇数片段放 GPU，偶数片段放 CPU
    RoundRobin,
}

impl ExecutionPolicy {
    pub fn schedule_single_fragment(
        &self,
        fragment: &FragmentInfo,
        frag_id: usize,
        _frag_num: usize,
    ) -> SchedulingAssignment {
        let device_type = match self {
            ExecutionPolicy::FragmentIdAssignment(device_type) => *device_type,
            ExecutionPolicy::RoundRobin if frag_id % 2 == 1 => DeviceType::Gpu,
            ExecutionPolicy::RoundRobin => DeviceType::Cpu,
        };
        SchedulingAssignment {
            device_type,
            device_id: fragment.device_id(device_type),
        }
    }

    /// 按片段顺序调度全部片段
    pub fn schedule_all(&self, fragments: &[FragmentInfo]) -> Vec<SchedulingAssignment> {
        fragments
            .iter()
            .enumerate()
            .map(|(frag_id, fragment)| self.schedule_single_fragment(fragment, frag_id, fragments.len()))
            .collect()
    }
}

impl fmt::Display for ExecutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionPolicy::FragmentIdAssignment(device) => {
                write!(f, "FragmentIdAssignment({})", device)
            }
            ExecutionPolicy::RoundRobin => write!(f, "RoundRobin"),
        }
    }
}
