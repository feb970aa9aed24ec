//! 2-bit 编码的定向 k-mer 与规范哈希。
//!
//! 一个 [`Kmer`] 同时保存正向编码与反向互补编码；两者较小者即规范哈希，
//! 存储与查询都只使用规范哈希，因此序列与其反向互补对计数表不可区分。
//! 左右单碱基扩展在两种编码上同时滚动，保持 O(1)。

use crate::error::{GraphError, Result};
use crate::util::dna;

/// 单个 u64 能容纳的最大 K。
pub const MAX_K: usize = 32;

pub fn check_ksize(k: usize) -> Result<()> {
    if k == 0 || k > MAX_K {
        return Err(GraphError::InvalidParameter(format!(
            "k must be in 1..={}, got {}",
            MAX_K, k
        )));
    }
    Ok(())
}

#[inline]
fn mask(k: usize) -> u64 {
    if k >= MAX_K {
        u64::MAX
    } else {
        (1u64 << (2 * k)) - 1
    }
}

/// 定向 k-mer：`fwd` 为给定方向的编码，`rc` 为其反向互补的编码。
/// 长度 K 不随值保存，由所属的计数表决定。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Kmer {
    fwd: u64,
    rc: u64,
}

impl Kmer {
    /// 从碱基串构建，K 即 `bases.len()`。
    pub fn from_bases(bases: &[u8]) -> Result<Self> {
        check_ksize(bases.len())?;
        let mut fwd = 0u64;
        let mut rc = 0u64;
        for (pos, &b) in bases.iter().enumerate() {
            let code = dna::to_code(b).ok_or(GraphError::InvalidBase { base: b as char, pos })?;
            fwd = (fwd << 2) | code;
            rc |= dna::complement_code(code) << (2 * pos);
        }
        Ok(Self { fwd, rc })
    }

    #[inline]
    pub fn canonical(&self) -> u64 {
        self.fwd.min(self.rc)
    }

    #[inline]
    pub fn reverse_complement(&self) -> Self {
        Self { fwd: self.rc, rc: self.fwd }
    }

    /// 去掉首碱基、在末尾追加 `code`。
    #[inline]
    pub fn extend_right(&self, code: u64, k: usize) -> Self {
        Self {
            fwd: ((self.fwd << 2) | code) & mask(k),
            rc: (self.rc >> 2) | (dna::complement_code(code) << (2 * (k - 1))),
        }
    }

    /// 去掉末碱基、在开头插入 `code`。
    #[inline]
    pub fn extend_left(&self, code: u64, k: usize) -> Self {
        Self {
            fwd: (self.fwd >> 2) | (code << (2 * (k - 1))),
            rc: ((self.rc << 2) | dna::complement_code(code)) & mask(k),
        }
    }

    #[inline]
    pub fn first_base(&self, k: usize) -> u8 {
        dna::from_code(self.fwd >> (2 * (k - 1)))
    }

    #[inline]
    pub fn last_base(&self) -> u8 {
        dna::from_code(self.fwd)
    }

    /// 按给定方向解码。
    pub fn to_bases(&self, k: usize) -> Vec<u8> {
        decode(self.fwd, k)
    }

    pub fn sequence(&self, k: usize) -> String {
        reverse_hash(self.fwd, k)
    }
}

fn decode(hash: u64, k: usize) -> Vec<u8> {
    (0..k).map(|i| dna::from_code(hash >> (2 * (k - 1 - i)))).collect()
}

pub fn canonical_hash(kmer: &[u8]) -> Result<u64> {
    Kmer::from_bases(kmer).map(|km| km.canonical())
}

/// 将哈希还原为长度为 K 的碱基串（对规范哈希即得规范方向的 k-mer）。
pub fn reverse_hash(hash: u64, k: usize) -> String {
    String::from_utf8_lossy(&decode(hash, k)).into_owned()
}

/// 在序列上滚动生成所有 k-mer（共 `len - k + 1` 个）。
/// 构造时一次性校验碱基，迭代本身不会失败。
pub struct KmerIter<'a> {
    seq: &'a [u8],
    k: usize,
    pos: usize,
    current: Kmer,
}

impl<'a> KmerIter<'a> {
    pub fn new(seq: &'a [u8], k: usize) -> Result<Self> {
        check_ksize(k)?;
        if seq.len() < k {
            return Err(GraphError::TooShort { len: seq.len(), k });
        }
        if let Some(pos) = seq.iter().position(|&b| dna::to_code(b).is_none()) {
            return Err(GraphError::InvalidBase { base: seq[pos] as char, pos });
        }
        let current = Kmer::from_bases(&seq[..k])?;
        Ok(Self { seq, k, pos: 0, current })
    }
}

impl<'a> Iterator for KmerIter<'a> {
    type Item = Kmer;

    fn next(&mut self) -> Option<Kmer> {
        if self.pos + self.k > self.seq.len() {
            return None;
        }
        if self.pos > 0 {
            // 构造时已校验，这里的 unwrap_or 不会触发
            let code = dna::to_code(self.seq[self.pos + self.k - 1]).unwrap_or(0);
            self.current = self.current.extend_right(code, self.k);
        }
        self.pos += 1;
        Some(self.current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.seq.len() + 1).saturating_sub(self.pos + self.k);
        (n, Some(n))
    }
}

impl<'a> ExactSizeIterator for KmerIter<'a> {}
