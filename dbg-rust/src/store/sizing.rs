//! 计数表的尺寸计算：素数表长与假阳性率估计。
//!
//! 这些都是构造期使用的纯函数，运行期不参与查询。

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// 给定目标假阳性率和预计 k-mer 数量时推荐的表参数。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableSizing {
    pub table_size: u64,
    pub n_tables: usize,
    /// 按推荐参数插入 `expected_kmers` 个不同 k-mer 后的预期假阳性率
    pub fp_rate: f64,
}

/// 推荐参数：Z = ⌊log₀.₅ f⌋（至少 1），单表大小 = ⌊-N / ln(1 - f^(1/Z))⌋。
pub fn optimal_size(fp_rate: f64, expected_kmers: u64) -> Result<TableSizing> {
    if !(fp_rate > 0.0 && fp_rate < 1.0) {
        return Err(GraphError::InvalidParameter(format!(
            "false positive rate must be in (0, 1), got {}",
            fp_rate
        )));
    }
    if expected_kmers == 0 {
        return Err(GraphError::InvalidParameter(
            "expected number of k-mers must be positive".into(),
        ));
    }

    let z_exact = fp_rate.ln() / 0.5f64.ln();
    let n_tables = (z_exact.floor() as usize).max(1);
    let n = expected_kmers as f64;
    let per_table_fp = fp_rate.powf(1.0 / n_tables as f64);
    let table_size = ((-n / (1.0 - per_table_fp).ln()).floor() as u64).max(1);

    Ok(TableSizing {
        table_size,
        n_tables,
        fp_rate: expected_fp_rate(table_size, n_tables, expected_kmers),
    })
}

/// 插入 `distinct` 个不同 k-mer 后的预期假阳性率 (1 - e^(-N/size))^Z。
pub fn expected_fp_rate(table_size: u64, n_tables: usize, distinct: u64) -> f64 {
    if table_size == 0 {
        return 1.0;
    }
    let occupancy = 1.0 - (-(distinct as f64) / table_size as f64).exp();
    occupancy.powi(n_tables as i32)
}

pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut d = 3u64;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// 从 `size` 向下取 `n` 个不同素数作为各子表长度；素数不足时用 `size` 补齐。
/// 各表长度互异，`hash % len` 即构成一组不同的哈希函数。
pub fn table_sizes(size: u64, n: usize) -> Vec<u64> {
    let mut sizes = Vec::with_capacity(n);
    let mut candidate = size;
    while sizes.len() < n && candidate >= 2 {
        if is_prime(candidate) {
            sizes.push(candidate);
        }
        candidate -= 1;
    }
    while sizes.len() < n {
        sizes.push(size.max(1));
    }
    sizes
}
