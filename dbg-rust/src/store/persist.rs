use std::io::{BufReader, BufWriter, Write};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

use super::counting::{CountingStore, StoreKind, Table};
use crate::util::kmer::check_ksize;

/// 计数表的构建信息，随表一起落盘。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub source: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

#[derive(Serialize, Deserialize)]
enum TableImage {
    Counts(Vec<u8>),
    Bits { len: u64, words: Vec<u64> },
}

/// 落盘格式：K、形态、各子表原始单元与元信息。
#[derive(Serialize, Deserialize)]
struct StoreImage {
    ksize: usize,
    kind: StoreKind,
    tables: Vec<TableImage>,
    meta: StoreMeta,
}

impl CountingStore {
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let image = StoreImage {
            ksize: self.ksize,
            kind: self.kind,
            tables: self
                .tables
                .iter()
                .map(|t| match t {
                    Table::Counts(cells) => {
                        TableImage::Counts(cells.iter().map(|c| c.load(Ordering::Relaxed)).collect())
                    }
                    Table::Bits { len, words } => TableImage::Bits {
                        len: *len,
                        words: words.iter().map(|w| w.load(Ordering::Relaxed)).collect(),
                    },
                })
                .collect(),
            meta: self.meta.clone(),
        };
        let f = std::fs::File::create(path)?;
        let mut w = BufWriter::new(f);
        bincode::serialize_into(&mut w, &image)?;
        w.flush()?;
        Ok(())
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let f = std::fs::File::open(path)?;
        let image: StoreImage = bincode::deserialize_from(BufReader::new(f))?;
        check_ksize(image.ksize).map_err(|e| anyhow!("corrupt store '{}': {}", path, e))?;
        if image.tables.is_empty() {
            bail!("corrupt store '{}': no tables", path);
        }

        let mut tables = Vec::with_capacity(image.tables.len());
        for t in image.tables {
            let table = match (image.kind, t) {
                (StoreKind::Counts, TableImage::Counts(cells)) if !cells.is_empty() => {
                    Table::Counts(cells.into_iter().map(AtomicU8::new).collect())
                }
                (StoreKind::Presence, TableImage::Bits { len, words })
                    if len > 0 && words.len() as u64 == (len + 63) / 64 =>
                {
                    Table::Bits { len, words: words.into_iter().map(AtomicU64::new).collect() }
                }
                _ => bail!("corrupt store '{}': table does not match store kind", path),
            };
            tables.push(table);
        }

        Ok(Self { ksize: image.ksize, kind: image.kind, tables, meta: image.meta })
    }
}
