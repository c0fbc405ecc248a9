//! 查询计划 DAG 缓存
//!
//! 签名与 DAG 节点ID之间的双向映射，进程内共享。
//!
//! 容量按固定的单节点开销计算：当前大小恒等于唯一节点数乘以 `bytes_per_node`。
//! 插入新节点会超出上限时整体清空（不做部分淘汰），发起插入的那次提取得到空 DAG。
//!
//! 每次整体清空都会递增代数。清空后ID从 0 重新分配，同一个ID在不同代中
//! 指向不同的签名，因此ID序列只有与代数一起才能唯一标识计划结构。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::signature::NodeSignature;
use crate::config::DagCacheConfig;

/// DAG 节点ID
pub type DagNodeId = u64;

/// DAG 缓存代数，每次整体清空加一
pub type DagGeneration = u64;

/// 默认的单节点记账开销（两张映射表各一个 8 字节条目）
pub const DEFAULT_BYTES_PER_NODE: u64 = 2 * 8;

/// 默认的节点映射容量上限
pub const MAX_NODE_CACHE_SIZE: u64 = 1_000_000_000;

/// 节点映射，所有字段在同一把锁下修改
#[derive(Debug)]
struct NodeMap {
    node_ids: HashMap<Arc<NodeSignature>, DagNodeId>,
    signatures: HashMap<DagNodeId, Arc<NodeSignature>>,
    next_id: DagNodeId,
    generation: DagGeneration,
    max_bytes: u64,
}

impl NodeMap {
    fn new(max_bytes: u64) -> Self {
        Self {
            node_ids: HashMap::new(),
            signatures: HashMap::new(),
            next_id: 0,
            generation: 0,
            max_bytes,
        }
    }

    fn unique_nodes(&self) -> u64 {
        self.node_ids.len() as u64
    }

    /// 命中返回已有ID；未命中分配下一个ID；超出上限时清空并返回 None
    fn resolve(&mut self, signature: &Arc<NodeSignature>, bytes_per_node: u64) -> Option<DagNodeId> {
        if let Some(id) = self.node_ids.get(signature) {
            return Some(*id);
        }

        let required = (self.unique_nodes() + 1).saturating_mul(bytes_per_node);
        if required > self.max_bytes {
            self.clear();
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.node_ids.insert(signature.clone(), id);
        self.signatures.insert(id, signature.clone());
        Some(id)
    }

    fn clear(&mut self) {
        self.node_ids.clear();
        self.signatures.clear();
        self.next_id = 0;
        self.generation += 1;
    }
}

/// 一次解析得到的ID序列及其所属代数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSequence {
    pub node_ids: Vec<DagNodeId>,
    pub generation: DagGeneration,
}

/// 查询计划 DAG 缓存
#[derive(Debug)]
pub struct QueryPlanDagCache {
    node_map: Mutex<NodeMap>,
    bytes_per_node: u64,
    overflow_clears: AtomicU64,
}

impl QueryPlanDagCache {
    /// 根据配置创建
    pub fn new(config: &DagCacheConfig) -> Self {
        Self::with_limits(config.max_node_map_bytes, config.bytes_per_node)
    }

    /// 指定容量上限与单节点开销创建
    pub fn with_limits(max_node_map_bytes: u64, bytes_per_node: u64) -> Self {
        Self {
            node_map: Mutex::new(NodeMap::new(max_node_map_bytes)),
            bytes_per_node,
            overflow_clears: AtomicU64::new(0),
        }
    }

    /// 获取签名对应的ID，不存在时分配新ID
    ///
    /// 返回 None 表示插入会超出容量，缓存已被整体清空
    pub fn get_or_assign_id(&self, signature: &Arc<NodeSignature>) -> Option<DagNodeId> {
        self.resolve_sequence(std::slice::from_ref(signature))
            .and_then(|resolved| resolved.node_ids.first().copied())
    }

    /// 在一个临界区内依次解析一组签名
    ///
    /// 任何一次插入溢出都会清空整个缓存并返回 None，已分配的ID随之作废。
    /// 整组在同一把锁下完成，并发的清空不会让返回的ID序列引用被重新分配的ID。
    /// 返回的代数与ID序列在同一临界区内读取。
    pub fn resolve_sequence(&self, signatures: &[Arc<NodeSignature>]) -> Option<ResolvedSequence> {
        let mut node_map = self.node_map.lock();
        let mut ids = Vec::with_capacity(signatures.len());
        for signature in signatures {
            match node_map.resolve(signature, self.bytes_per_node) {
                Some(id) => ids.push(id),
                None => {
                    let (max_bytes, generation) = (node_map.max_bytes, node_map.generation);
                    drop(node_map);
                    self.overflow_clears.fetch_add(1, Ordering::Relaxed);
                    log::info!(
                        "DAG 缓存超出容量上限 {} 字节，已清空全部节点，进入第 {} 代",
                        max_bytes,
                        generation
                    );
                    return None;
                }
            }
        }
        Some(ResolvedSequence {
            node_ids: ids,
            generation: node_map.generation,
        })
    }

    /// 只查找不插入
    pub fn lookup(&self, signature: &NodeSignature) -> Option<DagNodeId> {
        self.node_map.lock().node_ids.get(signature).copied()
    }

    /// 反向查找ID对应的签名
    pub fn signature_of(&self, id: DagNodeId) -> Option<Arc<NodeSignature>> {
        self.node_map.lock().signatures.get(&id).cloned()
    }

    /// 当前记账大小（字节）
    pub fn get_current_node_map_size(&self) -> u64 {
        self.node_map.lock().unique_nodes() * self.bytes_per_node
    }

    /// 唯一节点数
    pub fn unique_node_count(&self) -> usize {
        self.node_map.lock().node_ids.len()
    }

    /// 设置容量上限，缩小上限不会立即清空，下一次溢出的插入才会触发
    pub fn set_node_map_max_size(&self, max_bytes: u64) {
        self.node_map.lock().max_bytes = max_bytes;
        log::debug!("DAG 缓存容量上限调整为 {} 字节", max_bytes);
    }

    pub fn node_map_max_size(&self) -> u64 {
        self.node_map.lock().max_bytes
    }

    pub fn bytes_per_node(&self) -> u64 {
        self.bytes_per_node
    }

    /// 当前代数
    pub fn generation(&self) -> DagGeneration {
        self.node_map.lock().generation
    }

    /// 溢出触发的清空次数
    pub fn overflow_clear_count(&self) -> u64 {
        self.overflow_clears.load(Ordering::Relaxed)
    }

    /// 清空缓存并重置ID计数器
    pub fn clear_query_plan_cache(&self) {
        let mut node_map = self.node_map.lock();
        node_map.clear();
        log::debug!("DAG 缓存已清空，进入第 {} 代", node_map.generation);
    }
}

impl Default for QueryPlanDagCache {
    fn default() -> Self {
        Self::with_limits(MAX_NODE_CACHE_SIZE, DEFAULT_BYTES_PER_NODE)
    }
}
