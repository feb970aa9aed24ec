use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 组件编号，单调分配、永不复用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub u64);

impl ComponentId {
    #[inline]
    pub(super) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 并查集节点。`parent == 自身` 即存活的根；被合并的组件把标签整体移交给根，
/// 自身只留下指向根方向的 parent。
#[derive(Debug)]
pub(super) struct ComponentRecord {
    pub(super) parent: ComponentId,
    pub(super) tags: BTreeSet<u64>,
    pub(super) n_merges: u64,
}

impl ComponentRecord {
    pub(super) fn new(id: ComponentId) -> Self {
        Self { parent: id, tags: BTreeSet::new(), n_merges: 0 }
    }
}

/// 存活组件的只读视图。
#[derive(Debug, Clone, Copy)]
pub struct Component<'a> {
    id: ComponentId,
    record: &'a ComponentRecord,
}

impl<'a> Component<'a> {
    pub(super) fn new(id: ComponentId, record: &'a ComponentRecord) -> Self {
        Self { id, record }
    }

    pub fn component_id(&self) -> ComponentId {
        self.id
    }

    /// 组件拥有的标签数
    pub fn len(&self) -> usize {
        self.record.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.tags.is_empty()
    }

    /// 本组件沿合并谱系累计吸收的组件数
    pub fn n_merges(&self) -> u64 {
        self.record.n_merges
    }

    pub fn contains(&self, tag: u64) -> bool {
        self.record.tags.contains(&tag)
    }

    /// 标签（k-mer 规范哈希），升序。
    pub fn tags(&self) -> impl Iterator<Item = u64> + 'a {
        self.record.tags.iter().copied()
    }
}

impl<'a> PartialEq for Component<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<'a> Eq for Component<'a> {}
