//! # dbg-rust
//!
//! 基于概率 k-mer 计数表的流式 de Bruijn 图引擎。
//!
//! 图本身不存储任何边：节点是计数表中存在的 k-mer，
//! 两个 k-mer 共享 K-1 个碱基的重叠即相邻，邻居在查询时现场探测。
//! 在此之上提供：
//!
//! - **计数表**：多张素数长度子表组成的近似计数 / 存在表，无假阴性
//! - **图视图**：惰性邻居枚举与度计算
//! - **线性组装**：从种子 k-mer 双向延伸，遇分支、死端、环或 blocker 停止
//! - **组件划分**：流式摄入序列，以稀疏标签与并查集维护连通分量
//!
//! ## 快速示例
//!
//! ```rust
//! use dbg_rust::assembly::LinearAssembler;
//! use dbg_rust::graph::GraphView;
//! use dbg_rust::store::CountingStore;
//!
//! let store = CountingStore::new(7, 10_007, 4).unwrap();
//! store.consume("CCGTAATGCCTTTCCCT").unwrap();
//!
//! let asm = LinearAssembler::new(GraphView::new(&store));
//! let contig = asm.assemble("ATGCCTT", None).unwrap();
//! assert_eq!(contig, "CCGTAATGCCTTTCCCT");
//! ```
//!
//! ## 模块说明
//!
//! - [`store`]：计数表、尺寸计算与持久化
//! - [`graph`]：隐式图视图
//! - [`assembly`]：线性 contig 组装
//! - [`partition`]：流式连通分量
//! - [`io`]：FASTA / FASTQ 读取
//! - [`util`]：碱基编码与 k-mer 哈希

pub mod assembly;
pub mod error;
pub mod graph;
pub mod io;
pub mod partition;
pub mod store;
pub mod util;

#[cfg(test)]
mod testutil;

pub use error::{GraphError, Result};
