//! 计划节点签名
//!
//! 签名由节点种类、算子参数的规范文本以及输入节点的签名组成，
//! 结构相等即视为同一个子计划。构造时预先计算 64 位摘要用于哈希，
//! 相等性判断始终回落到结构比较，摘要碰撞不会合并不同的计划。

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::plan::RelKind;

/// 计划节点签名
#[derive(Debug)]
pub struct NodeSignature {
    kind: RelKind,
    params: String,
    inputs: Vec<Arc<NodeSignature>>,
    digest: u64,
}

impl NodeSignature {
    /// 创建签名，输入签名必须已经解析完成
    pub fn new(kind: RelKind, params: String, inputs: Vec<Arc<NodeSignature>>) -> Arc<Self> {
        let mut hasher = DefaultHasher::new();
        kind.hash(&mut hasher);
        params.hash(&mut hasher);
        inputs.len().hash(&mut hasher);
        for input in &inputs {
            input.digest.hash(&mut hasher);
        }
        let digest = hasher.finish();

        Arc::new(Self {
            kind,
            params,
            inputs,
            digest,
        })
    }

    pub fn kind(&self) -> RelKind {
        self.kind
    }

    pub fn params(&self) -> &str {
        &self.params
    }

    pub fn inputs(&self) -> &[Arc<NodeSignature>] {
        &self.inputs
    }

    pub fn digest(&self) -> u64 {
        self.digest
    }
}

impl PartialEq for NodeSignature {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.digest == other.digest
            && self.kind == other.kind
            && self.params == other.params
            && self.inputs.len() == other.inputs.len()
            && self
                .inputs
                .iter()
                .zip(other.inputs.iter())
                .all(|(a, b)| Arc::ptr_eq(a, b) || a == b)
    }
}

impl Eq for NodeSignature {}

impl Hash for NodeSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.digest);
    }
}

impl fmt::Display for NodeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{{}}}", self.kind, self.params)?;
        if !self.inputs.is_empty() {
            f.write_str("(")?;
            for (i, input) in self.inputs.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "#{:016x}", input.digest)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn scan(table: &str) -> Arc<NodeSignature> {
        NodeSignature::new(RelKind::Scan, table.to_string(), Vec::new())
    }

    #[test]
    fn test_structural_equality_across_instances() {
        let a = NodeSignature::new(RelKind::Project, "[$0]".into(), vec![scan("1:1")]);
        let b = NodeSignature::new(RelKind::Project, "[$0]".into(), vec![scan("1:1")]);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_inputs_distinguish_signatures() {
        let a = NodeSignature::new(RelKind::Project, "[$0]".into(), vec![scan("1:1")]);
        let b = NodeSignature::new(RelKind::Project, "[$0]".into(), vec![scan("1:2")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_input_order_matters() {
        let a = NodeSignature::new(RelKind::Union, "all".into(), vec![scan("1:1"), scan("1:2")]);
        let b = NodeSignature::new(RelKind::Union, "all".into(), vec![scan("1:2"), scan("1:1")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_lists_input_digests() {
        let leaf = scan("1:1");
        let parent = NodeSignature::new(RelKind::Filter, "($0 < 3:int)".into(), vec![leaf.clone()]);
        let text = parent.to_string();
        assert!(text.starts_with("Filter{($0 < 3:int)}(#"));
        assert!(text.contains(&format!("{:016x}", leaf.digest())));
    }
}
