//! 概率 k-mer 计数表及其尺寸计算与持久化。

mod counting;
mod persist;
pub mod sizing;

pub use counting::{CountingStore, StoreKind, StoreParams, MAX_COUNT};
pub use persist::StoreMeta;
pub use sizing::{expected_fp_rate, optimal_size, TableSizing};
