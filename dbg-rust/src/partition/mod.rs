//! 流式连通分量划分。
//!
//! 序列逐条流入时，沿序列稀疏采样若干 k-mer 作为标签（tag），
//! 用并查集维护“标签 → 组件”的归属；新序列在图上触及多个组件时将其合并。

mod component;
mod streaming;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

pub use component::{Component, ComponentId};
pub use streaming::ComponentIndex;

pub const DEFAULT_TAG_DENSITY: usize = 40;
pub const DEFAULT_SEARCH_RADIUS: usize = 40;

/// 划分参数。
///
/// - `tag_density`：沿序列每隔多少个 k-mer 放置一个标签（首尾 k-mer 总是标签）；
/// - `search_radius`：寻找已有标签时在图上最多走多少步。
///
/// 任一 k-mer 到其所在序列最近标签的距离不超过 `tag_density / 2`，
/// 因此 `search_radius >= tag_density / 2` 时重叠的序列总能互相找到。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionParams {
    pub tag_density: usize,
    pub search_radius: usize,
}

impl Default for PartitionParams {
    fn default() -> Self {
        Self { tag_density: DEFAULT_TAG_DENSITY, search_radius: DEFAULT_SEARCH_RADIUS }
    }
}

impl PartitionParams {
    pub fn validate(&self) -> Result<()> {
        if self.tag_density < 1 {
            return Err(GraphError::InvalidParameter("tag density must be at least 1".into()));
        }
        if self.search_radius < 1 {
            return Err(GraphError::InvalidParameter("search radius must be at least 1".into()));
        }
        Ok(())
    }
}
