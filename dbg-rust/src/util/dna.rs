use crate::error::{GraphError, Result};

/// 图中使用的碱基字母表，顺序即邻居枚举顺序（A < C < G < T）。
pub const ALPHABET: [u8; 4] = *b"ACGT";

/// 2-bit 编码：A=0, C=1, G=2, T=3。互补碱基编码为 `3 - code`。
#[inline]
pub fn to_code(b: u8) -> Option<u64> {
    match b.to_ascii_uppercase() {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' | b'U' => Some(3),
        _ => None,
    }
}

#[inline]
pub fn from_code(code: u64) -> u8 {
    ALPHABET[(code & 3) as usize]
}

#[inline]
pub fn complement_code(code: u64) -> u64 {
    3 - (code & 3)
}

/// 大写化并校验序列；`U` 视为 `T`，其余非 ACGT 字符报错。
pub fn normalize_seq(seq: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(seq.len());
    for (pos, &b) in seq.iter().enumerate() {
        match to_code(b) {
            Some(code) => out.push(from_code(code)),
            None => {
                return Err(GraphError::InvalidBase { base: b as char, pos });
            }
        }
    }
    Ok(out)
}

#[inline]
pub fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' | b'U' => b'A',
        _ => b'N',
    }
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// 字符串版本的反向互补，便于测试与命令行输出。
pub fn reverse_complement(seq: &str) -> String {
    String::from_utf8_lossy(&revcomp(seq.as_bytes())).into_owned()
}
