//! 模式提供者
//!
//! DAG 提取只需要知道扫描节点引用的表是否存在以及表的稳定标识

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

/// 表引用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableRef {
    pub db_id: i32,
    pub table_id: i32,
}

impl TableRef {
    pub fn new(db_id: i32, table_id: i32) -> Self {
        Self { db_id, table_id }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.db_id, self.table_id)
    }
}

/// 表信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub table: TableRef,
    pub name: String,
    pub column_names: Vec<String>,
}

impl TableInfo {
    pub fn new(table: TableRef, name: impl Into<String>, column_names: Vec<String>) -> Self {
        Self {
            table,
            name: name.into(),
            column_names,
        }
    }
}

/// 模式提供者特征
pub trait SchemaProvider: Send + Sync {
    /// 查询表信息，表不存在时返回 None
    fn table_info(&self, table: TableRef) -> Option<TableInfo>;
}

/// 基于内存的模式提供者
#[derive(Debug, Default)]
pub struct InMemorySchemaProvider {
    tables: RwLock<HashMap<TableRef, TableInfo>>,
}

impl InMemorySchemaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册表，已存在时覆盖
    pub fn add_table(&self, info: TableInfo) {
        self.tables.write().insert(info.table, info);
    }

    /// 删除表
    pub fn drop_table(&self, table: TableRef) -> Option<TableInfo> {
        self.tables.write().remove(&table)
    }

    pub fn table_count(&self) -> usize {
        self.tables.read().len()
    }
}

impl SchemaProvider for InMemorySchemaProvider {
    fn table_info(&self, table: TableRef) -> Option<TableInfo> {
        self.tables.read().get(&table).cloned()
    }
}
