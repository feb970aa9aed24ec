use thiserror::Error;

/// 图引擎的错误分类。全部为同步、本地、不可重试的错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// 构造参数非法（K / 表大小 / 表数量 / 分区参数）
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// 输入序列短于 K
    #[error("sequence of length {len} is shorter than k = {k}")]
    TooShort { len: usize, k: usize },

    /// 协作结构之间的 K 不一致（例如图与 blocker）
    #[error("incompatible parameters: {0}")]
    IncompatibleParameters(String),

    /// 有界搜索耗尽
    #[error("not found: {0}")]
    NotFound(String),

    /// 非 ACGT 字符
    #[error("invalid base {base:?} at position {pos}")]
    InvalidBase { base: char, pos: usize },
}

pub type Result<T> = std::result::Result<T, GraphError>;
