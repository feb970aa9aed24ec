//! 测试夹具：随机序列、线性/分叉/环状图结构、覆盖序列的 reads。

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::store::CountingStore;
use crate::util::dna;
use crate::util::kmer::KmerIter;

pub(crate) const K: usize = 21;
pub(crate) const TABLE_SIZE: u64 = 1_000_003;
pub(crate) const N_TABLES: usize = 4;

pub(crate) fn presence_store() -> CountingStore {
    CountingStore::presence(K, TABLE_SIZE, N_TABLES).unwrap()
}

/// (K-1)-mer 的规范哈希集合；两条序列共享 (K-1)-mer 才可能在图中相邻。
fn overlap_keys(seq: &str) -> Vec<u64> {
    KmerIter::new(seq.as_bytes(), K - 1)
        .map(|it| it.map(|km| km.canonical()).collect::<Vec<u64>>())
        .unwrap_or_default()
}

pub(crate) struct SeqGen {
    rng: StdRng,
}

impl SeqGen {
    pub(crate) fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    /// 长度为 `len` 的随机序列：自身没有重复的 (K-1)-mer（因此没有分支），
    /// 且与 `exclude` 中的任何序列都不共享 (K-1)-mer。
    pub(crate) fn random_sequence(&mut self, len: usize, exclude: &[&str]) -> String {
        let excluded: HashSet<u64> = exclude.iter().flat_map(|s| overlap_keys(s)).collect();
        loop {
            let seq: String = (0..len)
                .map(|_| dna::ALPHABET[self.rng.gen_range(0..4)] as char)
                .collect();
            let keys = overlap_keys(&seq);
            let unique: HashSet<u64> = keys.iter().copied().collect();
            if unique.len() == keys.len() && unique.is_disjoint(&excluded) {
                return seq;
            }
        }
    }

    /// 以 `n` 条长度为 `read_len` 的 reads 均匀铺满 `seq`，相邻 reads 至少重叠 K 个碱基；
    /// 随机一半取反向互补，并打乱顺序。
    pub(crate) fn reads(&mut self, seq: &str, n: usize, read_len: usize) -> Vec<String> {
        assert!(n >= 2 && read_len >= K && read_len <= seq.len());
        let span = seq.len() - read_len;
        let mut out: Vec<String> = (0..n)
            .map(|i| {
                let start = i * span / (n - 1);
                let read = &seq[start..start + read_len];
                if self.rng.gen_bool(0.5) {
                    dna::reverse_complement(read)
                } else {
                    read.to_string()
                }
            })
            .collect();
        out.shuffle(&mut self.rng);
        out
    }

    pub(crate) fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}

/// 将 `pos` 处的碱基替换为字母表中的下一个碱基。
pub(crate) fn mutate_position(seq: &str, pos: usize) -> String {
    let mut bytes = seq.as_bytes().to_vec();
    let code = dna::to_code(bytes[pos]).unwrap();
    bytes[pos] = dna::from_code(code + 1);
    String::from_utf8(bytes).unwrap()
}

pub(crate) fn contains_rc(haystack: &str, needle: &str) -> bool {
    haystack.contains(needle) || haystack.contains(&dna::reverse_complement(needle))
}

/// 一条已摄入的线性序列。
pub(crate) fn linear_structure(gen: &mut SeqGen, len: usize) -> (CountingStore, String) {
    let store = presence_store();
    let contig = gen.random_sequence(len, &[]);
    store.consume(&contig).unwrap();
    (store, contig)
}

/// 在线性序列中点附近引入一个分支：`hdn` 的总度为 3。
pub(crate) struct TipStructure {
    pub store: CountingStore,
    pub contig: String,
    pub hdn_pos: usize,
    /// hdn 左侧的主路径 k-mer
    pub l: String,
    pub hdn: String,
    /// hdn 右侧的主路径 k-mer
    pub r: String,
    pub tip: String,
}

fn tip_structure(gen: &mut SeqGen, right: bool) -> TipStructure {
    let (store, contig) = linear_structure(gen, 1000);
    let s = contig.len() / 2;
    let l = contig[s - 1..s - 1 + K].to_string();
    let hdn = contig[s..s + K].to_string();
    let r = contig[s + 1..s + 1 + K].to_string();
    let tip = if right { mutate_position(&r, K - 1) } else { mutate_position(&l, 0) };
    store.count(&tip).unwrap();
    TipStructure { store, contig, hdn_pos: s, l, hdn, r, tip }
}

/// 分支在 hdn 右侧：tip 与 r 共享 hdn 的 (K-1) 后缀。
pub(crate) fn right_tip_structure(gen: &mut SeqGen) -> TipStructure {
    tip_structure(gen, true)
}

/// 分支在 hdn 左侧：tip 与 l 共享 hdn 的 (K-1) 前缀。
pub(crate) fn left_tip_structure(gen: &mut SeqGen) -> TipStructure {
    tip_structure(gen, false)
}
