//! 线性 contig 组装。

mod linear;

pub use linear::{LinearAssembler, Walk, WalkEnd};
