//! 计数表之上的隐式 de Bruijn 图。
//!
//! 图不保存任何邻接结构：某个 k-mer 在一侧的邻居，就是 4 个单碱基扩展里
//! 在计数表中存在的那些，每次查询时现场探测。

use crate::store::CountingStore;
use crate::util::dna;
use crate::util::kmer::Kmer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];
}

/// 只读图视图，可随意复制。
#[derive(Debug, Clone, Copy)]
pub struct GraphView<'a> {
    store: &'a CountingStore,
}

impl<'a> GraphView<'a> {
    pub fn new(store: &'a CountingStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'a CountingStore {
        self.store
    }

    #[inline]
    pub fn ksize(&self) -> usize {
        self.store.ksize()
    }

    #[inline]
    pub fn contains(&self, kmer: &Kmer) -> bool {
        self.store.contains(kmer)
    }

    /// `kmer` 在 `side` 一侧扩展 `code` 后得到的相邻 k-mer（不检查存在性）。
    #[inline]
    pub fn extend(&self, kmer: &Kmer, side: Side, code: u64) -> Kmer {
        match side {
            Side::Left => kmer.extend_left(code, self.ksize()),
            Side::Right => kmer.extend_right(code, self.ksize()),
        }
    }

    /// 一侧存在于计数表中的邻居，按扩展碱基 A < C < G < T 排序。
    pub fn neighbors(&self, kmer: &Kmer, side: Side) -> Vec<Kmer> {
        (0..dna::ALPHABET.len() as u64)
            .map(|code| self.extend(kmer, side, code))
            .filter(|nb| self.contains(nb))
            .collect()
    }

    /// 一侧的度，0..=4。
    pub fn degree(&self, kmer: &Kmer, side: Side) -> usize {
        (0..dna::ALPHABET.len() as u64)
            .filter(|&code| self.contains(&self.extend(kmer, side, code)))
            .count()
    }

    pub fn kmer_degree(&self, kmer: &Kmer) -> usize {
        self.degree(kmer, Side::Left) + self.degree(kmer, Side::Right)
    }

    /// 总度大于 2 的节点即分支点（HDN）。
    pub fn is_high_degree(&self, kmer: &Kmer) -> bool {
        self.kmer_degree(kmer) > 2
    }

    /// 某侧度 ≤ 1 即该侧为死端。
    pub fn is_dead_end(&self, kmer: &Kmer, side: Side) -> bool {
        self.degree(kmer, side) <= 1
    }
}
