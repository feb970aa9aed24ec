use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::persist::StoreMeta;
use super::sizing;
use crate::error::{GraphError, Result};
use crate::util::kmer::{check_ksize, Kmer, KmerIter};

/// 计数单元的上限：8-bit 饱和计数，达到后不再增长。
pub const MAX_COUNT: u8 = u8::MAX;

/// 计数表的两种形态：近似计数，或仅记录存在位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreKind {
    Counts,
    Presence,
}

/// 计数表构造参数。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreParams {
    pub ksize: usize,
    pub table_size: u64,
    pub n_tables: usize,
    pub kind: StoreKind,
}

/// 单张子表。计数单元与存在位都是原子量，增量可以跨线程并发执行。
pub(super) enum Table {
    Counts(Box<[AtomicU8]>),
    Bits { len: u64, words: Box<[AtomicU64]> },
}

impl Table {
    fn new(kind: StoreKind, len: u64) -> Self {
        match kind {
            StoreKind::Counts => Table::Counts((0..len).map(|_| AtomicU8::new(0)).collect()),
            StoreKind::Presence => {
                let n_words = ((len + 63) / 64) as usize;
                Table::Bits { len, words: (0..n_words).map(|_| AtomicU64::new(0)).collect() }
            }
        }
    }

    pub(super) fn len(&self) -> u64 {
        match self {
            Table::Counts(cells) => cells.len() as u64,
            Table::Bits { len, .. } => *len,
        }
    }

    #[inline]
    fn increment(&self, slot: u64) {
        match self {
            Table::Counts(cells) => {
                // checked_add 在 255 处返回 None，单元保持不变
                let _ = cells[slot as usize].fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                    v.checked_add(1)
                });
            }
            Table::Bits { words, .. } => {
                words[(slot / 64) as usize].fetch_or(1u64 << (slot % 64), Ordering::Relaxed);
            }
        }
    }

    #[inline]
    fn get(&self, slot: u64) -> u8 {
        match self {
            Table::Counts(cells) => cells[slot as usize].load(Ordering::Relaxed),
            Table::Bits { words, .. } => {
                let word = words[(slot / 64) as usize].load(Ordering::Relaxed);
                ((word >> (slot % 64)) & 1) as u8
            }
        }
    }

    fn n_occupied(&self) -> u64 {
        match self {
            Table::Counts(cells) => {
                cells.iter().filter(|c| c.load(Ordering::Relaxed) != 0).count() as u64
            }
            Table::Bits { words, .. } => words
                .iter()
                .map(|w| u64::from(w.load(Ordering::Relaxed).count_ones()))
                .sum(),
        }
    }
}

/// 概率计数表：Z 张长度互异（素数）的子表，k-mer 以规范哈希对表长取模定位。
///
/// - `count` 在每张子表对应单元做饱和自增；
/// - `get` 取 Z 个单元的最小值（计数形态）或全部置位（存在形态）；
/// - 已计数的 k-mer 永远读回 ≥ 1（无假阴性），假阳性率由表长、Z 与插入量决定。
pub struct CountingStore {
    pub(super) ksize: usize,
    pub(super) kind: StoreKind,
    pub(super) tables: Vec<Table>,
    pub(super) meta: StoreMeta,
}

impl CountingStore {
    /// 近似计数表。
    pub fn new(ksize: usize, table_size: u64, n_tables: usize) -> Result<Self> {
        Self::from_params(&StoreParams { ksize, table_size, n_tables, kind: StoreKind::Counts })
    }

    /// 仅记录存在与否的表，每单元 1 bit。
    pub fn presence(ksize: usize, table_size: u64, n_tables: usize) -> Result<Self> {
        Self::from_params(&StoreParams { ksize, table_size, n_tables, kind: StoreKind::Presence })
    }

    pub fn from_params(params: &StoreParams) -> Result<Self> {
        check_ksize(params.ksize)?;
        if params.table_size < 1 {
            return Err(GraphError::InvalidParameter("table size must be at least 1".into()));
        }
        if params.n_tables < 1 {
            return Err(GraphError::InvalidParameter("number of tables must be at least 1".into()));
        }
        let tables = sizing::table_sizes(params.table_size, params.n_tables)
            .into_iter()
            .map(|len| Table::new(params.kind, len))
            .collect();
        Ok(Self { ksize: params.ksize, kind: params.kind, tables, meta: StoreMeta::default() })
    }

    #[inline]
    pub fn ksize(&self) -> usize {
        self.ksize
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    pub fn n_tables(&self) -> usize {
        self.tables.len()
    }

    pub fn table_sizes(&self) -> Vec<u64> {
        self.tables.iter().map(Table::len).collect()
    }

    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    pub fn set_meta(&mut self, meta: StoreMeta) {
        self.meta = meta;
    }

    /// 记录一个规范哈希。
    #[inline]
    pub fn count_hash(&self, hash: u64) {
        for t in &self.tables {
            t.increment(hash % t.len());
        }
    }

    /// 读取一个规范哈希的近似计数；存在形态返回 0/1。
    #[inline]
    pub fn get_hash(&self, hash: u64) -> u8 {
        let mut min = MAX_COUNT;
        for t in &self.tables {
            let v = t.get(hash % t.len());
            if v == 0 {
                return 0;
            }
            min = min.min(v);
        }
        min
    }

    #[inline]
    pub fn contains_hash(&self, hash: u64) -> bool {
        self.get_hash(hash) > 0
    }

    #[inline]
    pub fn contains(&self, kmer: &Kmer) -> bool {
        self.contains_hash(kmer.canonical())
    }

    /// 解析一个长度恰为 K 的 k-mer 串。
    pub fn kmer(&self, s: &str) -> Result<Kmer> {
        let bytes = s.as_bytes();
        if bytes.len() < self.ksize {
            return Err(GraphError::TooShort { len: bytes.len(), k: self.ksize });
        }
        if bytes.len() > self.ksize {
            return Err(GraphError::InvalidParameter(format!(
                "expected a k-mer of length {}, got {} bases",
                self.ksize,
                bytes.len()
            )));
        }
        Kmer::from_bases(bytes)
    }

    pub fn count(&self, kmer: &str) -> Result<()> {
        let km = self.kmer(kmer)?;
        self.count_hash(km.canonical());
        Ok(())
    }

    pub fn get(&self, kmer: &str) -> Result<u8> {
        Ok(self.get_hash(self.kmer(kmer)?.canonical()))
    }

    /// 以长度 K 的窗口滑过序列并逐个计数，返回计数的 k-mer 数。
    pub fn consume(&self, seq: &str) -> Result<usize> {
        let mut n = 0usize;
        for km in KmerIter::new(seq.as_bytes(), self.ksize)? {
            self.count_hash(km.canonical());
            n += 1;
        }
        Ok(n)
    }

    /// 并行摄入一批序列。单元增量可交换、饱和单调，因此无需加锁。
    pub fn consume_all<S>(&self, seqs: &[S]) -> Result<usize>
    where
        S: AsRef<str> + Sync,
    {
        seqs.par_iter()
            .map(|s| self.consume(s.as_ref()))
            .try_reduce(|| 0, |a, b| Ok(a + b))
    }

    /// 两个协作结构必须使用同一个 K。
    pub fn check_compatible(&self, other: &CountingStore) -> Result<()> {
        if self.ksize != other.ksize {
            return Err(GraphError::IncompatibleParameters(format!(
                "k = {} does not match k = {}",
                self.ksize, other.ksize
            )));
        }
        Ok(())
    }

    /// 第一张子表中的非零单元数。
    pub fn n_occupied(&self) -> u64 {
        self.tables.first().map(Table::n_occupied).unwrap_or(0)
    }

    /// 由第一张子表的占用率估计不同 k-mer 的个数：`-n · ln(1 - occupied / n)`。
    pub fn n_unique_kmers_estimate(&self) -> u64 {
        let Some(first) = self.tables.first() else {
            return 0;
        };
        let len = first.len() as f64;
        let occupied = first.n_occupied() as f64;
        if occupied >= len {
            return first.len();
        }
        (-len * (1.0 - occupied / len).ln()).round() as u64
    }

    /// 由各子表占用率估计当前的假阳性率。
    pub fn estimated_fp_rate(&self) -> f64 {
        self.tables
            .iter()
            .map(|t| t.n_occupied() as f64 / t.len() as f64)
            .product()
    }

    /// 读回一个 k-mer 的正向串，便于日志与调试。
    pub fn kmer_string(&self, kmer: &Kmer) -> String {
        kmer.sequence(self.ksize)
    }
}

impl fmt::Debug for CountingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingStore")
            .field("ksize", &self.ksize)
            .field("kind", &self.kind)
            .field("table_sizes", &self.table_sizes())
            .finish()
    }
}
