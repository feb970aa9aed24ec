use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info, warn};

use dbg_rust::assembly::LinearAssembler;
use dbg_rust::graph::GraphView;
use dbg_rust::io::open_reads;
use dbg_rust::partition::{ComponentId, ComponentIndex, PartitionParams, DEFAULT_SEARCH_RADIUS, DEFAULT_TAG_DENSITY};
use dbg_rust::store::{optimal_size, CountingStore, StoreKind, StoreMeta, StoreParams};
use dbg_rust::util::dna;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(
    name = "dbg-rust",
    author,
    version,
    about = "Streaming de Bruijn graph engine over probabilistic k-mer tables",
    arg_required_else_help = true
)]
struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct TableArgs {
    /// k-mer size (1..=32)
    #[arg(short = 'k', long = "ksize", default_value_t = 21)]
    ksize: usize,
    #[arg(long = "table-size", default_value_t = 1_000_003)]
    table_size: u64,
    #[arg(long = "n-tables", default_value_t = 4)]
    n_tables: usize,
    /// Size the tables for this false-positive rate instead of --table-size/--n-tables
    #[arg(long = "fp-rate", requires = "expected_kmers")]
    fp_rate: Option<f64>,
    /// Expected number of distinct k-mers, used with --fp-rate
    #[arg(long = "expected-kmers", requires = "fp_rate")]
    expected_kmers: Option<u64>,
    /// Keep presence bits only, no counts
    #[arg(long)]
    presence: bool,
}

impl TableArgs {
    fn params(&self) -> Result<StoreParams> {
        let kind = if self.presence { StoreKind::Presence } else { StoreKind::Counts };
        let (table_size, n_tables) = match (self.fp_rate, self.expected_kmers) {
            (Some(fp), Some(n)) => {
                let sizing = optimal_size(fp, n)?;
                info!(
                    table_size = sizing.table_size,
                    n_tables = sizing.n_tables,
                    fp_rate = sizing.fp_rate,
                    "derived table sizing"
                );
                (sizing.table_size, sizing.n_tables)
            }
            _ => (self.table_size, self.n_tables),
        };
        Ok(StoreParams { ksize: self.ksize, table_size, n_tables, kind })
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Count k-mers of FASTA/FASTQ reads into a table file
    Count {
        /// Reads files (FASTA or FASTQ)
        #[arg(required = true)]
        reads: Vec<String>,
        #[command(flatten)]
        table: TableArgs,
        /// Output table path
        #[arg(short, long)]
        output: String,
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        threads: usize,
        /// Reads counted per parallel batch
        #[arg(long = "batch-size", default_value_t = 10_000)]
        batch_size: usize,
    },
    /// Assemble linear contigs from seed k-mers over a saved table
    Assemble {
        /// Table written by `count`
        #[arg(short, long)]
        store: String,
        /// Seed k-mers (exactly k bases each)
        seeds: Vec<String>,
        /// Also seed from the first k-mer of every record in this file
        #[arg(long = "seeds-from")]
        seeds_from: Option<String>,
        /// Table of k-mers the walks must not enter
        #[arg(long)]
        blocker: Option<String>,
        /// Output FASTA path (stdout if omitted)
        #[arg(short, long)]
        out: Option<String>,
    },
    /// Stream reads into connected components
    Partition {
        #[arg(required = true)]
        reads: Vec<String>,
        #[command(flatten)]
        table: TableArgs,
        #[arg(long = "tag-density", default_value_t = DEFAULT_TAG_DENSITY)]
        tag_density: usize,
        #[arg(long = "search-radius", default_value_t = DEFAULT_SEARCH_RADIUS)]
        search_radius: usize,
        /// Output TSV of read -> component (stdout if omitted)
        #[arg(short, long)]
        out: Option<String>,
        /// Also save the table built while partitioning
        #[arg(long = "save-store")]
        save_store: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Count { reads, table, output, threads, batch_size } => {
            run_count(&reads, &table, &output, threads, batch_size)
        }
        Commands::Assemble { store, seeds, seeds_from, blocker, out } => {
            run_assemble(&store, &seeds, seeds_from.as_deref(), blocker.as_deref(), out.as_deref())
        }
        Commands::Partition { reads, table, tag_density, search_radius, out, save_store } => {
            let params = PartitionParams { tag_density, search_radius };
            run_partition(&reads, &table, params, out.as_deref(), save_store.as_deref())
        }
    }
}

#[derive(Debug, Default)]
struct ReadStats {
    n_reads: usize,
    n_skipped: usize,
    n_bases: usize,
}

/// Feeds every read with only ACGT bases and at least `k` of them to `f`.
fn stream_reads<F>(paths: &[String], k: usize, mut f: F) -> Result<ReadStats>
where
    F: FnMut(&str, String) -> Result<()>,
{
    let mut stats = ReadStats::default();
    for path in paths {
        let reader = open_reads(path)?;
        for rec in reader {
            let rec = rec.with_context(|| format!("malformed reads file '{}'", path))?;
            let bases = match dna::normalize_seq(&rec.seq) {
                Ok(b) if b.len() >= k => b,
                Ok(b) => {
                    debug!(id = %rec.id, len = b.len(), "read shorter than k skipped");
                    stats.n_skipped += 1;
                    continue;
                }
                Err(e) => {
                    debug!(id = %rec.id, error = %e, "read skipped");
                    stats.n_skipped += 1;
                    continue;
                }
            };
            stats.n_reads += 1;
            stats.n_bases += bases.len();
            f(&rec.id, String::from_utf8(bases)?)?;
            if stats.n_reads % 100_000 == 0 {
                info!(reads = stats.n_reads, "processed");
            }
        }
    }
    if stats.n_skipped > 0 {
        warn!(skipped = stats.n_skipped, "reads with non-ACGT bases or shorter than k were skipped");
    }
    Ok(stats)
}

fn build_meta(sources: &[String]) -> StoreMeta {
    StoreMeta {
        source: Some(sources.join(",")),
        build_args: Some(std::env::args().collect::<Vec<_>>().join(" ")),
        build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
    }
}

fn open_output(path: Option<&str>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => {
            let fh = File::create(p).map_err(|e| anyhow!("cannot create output '{}': {}", p, e))?;
            Box::new(BufWriter::new(fh))
        }
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    })
}

fn load_store(path: &str) -> Result<CountingStore> {
    CountingStore::load_from_file(path).map_err(|e| anyhow!("cannot load table '{}': {}", path, e))
}

fn run_count(
    reads: &[String],
    table: &TableArgs,
    output: &str,
    threads: usize,
    batch_size: usize,
) -> Result<()> {
    if batch_size == 0 {
        bail!("--batch-size must be at least 1");
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .context("cannot configure thread pool")?;

    let params = table.params()?;
    let mut store = CountingStore::from_params(&params)?;
    info!(?params, table_sizes = ?store.table_sizes(), "counting k-mers");

    let mut batch: Vec<String> = Vec::with_capacity(batch_size);
    let mut n_kmers = 0usize;
    let stats = stream_reads(reads, params.ksize, |_, seq| {
        batch.push(seq);
        if batch.len() >= batch_size {
            n_kmers += store.consume_all(&batch)?;
            batch.clear();
        }
        Ok(())
    })?;
    n_kmers += store.consume_all(&batch)?;

    store.set_meta(build_meta(reads));
    store
        .save_to_file(output)
        .map_err(|e| anyhow!("cannot write table to '{}': {}", output, e))?;

    println!("reads: {}", stats.n_reads);
    println!("bases: {}", stats.n_bases);
    println!("kmers: {}", n_kmers);
    println!("occupied: {}", store.n_occupied());
    println!("unique_kmers_est: {}", store.n_unique_kmers_estimate());
    println!("est_fp_rate: {:.6}", store.estimated_fp_rate());
    println!("table saved: {}", output);
    Ok(())
}

fn run_assemble(
    store_path: &str,
    seeds: &[String],
    seeds_from: Option<&str>,
    blocker_path: Option<&str>,
    out: Option<&str>,
) -> Result<()> {
    let store = load_store(store_path)?;
    let blocker = blocker_path.map(load_store).transpose()?;
    let k = store.ksize();

    let mut all_seeds: Vec<String> = seeds.iter().map(|s| s.to_ascii_uppercase()).collect();
    if let Some(path) = seeds_from {
        stream_reads(&[path.to_string()], k, |_, seq| {
            all_seeds.push(seq[..k].to_string());
            Ok(())
        })?;
    }
    if all_seeds.is_empty() {
        bail!("no seed k-mers given");
    }

    let asm = LinearAssembler::new(GraphView::new(&store));
    let mut w = open_output(out)?;
    let mut n_contigs = 0usize;
    for (i, seed) in all_seeds.iter().enumerate() {
        let contig = asm.assemble(seed, blocker.as_ref())?;
        if contig.is_empty() {
            warn!(seed = %seed, "seed k-mer not in table");
            continue;
        }
        n_contigs += 1;
        writeln!(w, ">contig_{} seed={} len={}", i + 1, seed, contig.len())?;
        writeln!(w, "{}", contig)?;
    }
    w.flush()?;
    info!(seeds = all_seeds.len(), contigs = n_contigs, "assembly finished");
    Ok(())
}

fn run_partition(
    reads: &[String],
    table: &TableArgs,
    params: PartitionParams,
    out: Option<&str>,
    save_store: Option<&str>,
) -> Result<()> {
    let store_params = table.params()?;
    let store = CountingStore::from_params(&store_params)?;
    let mut index = ComponentIndex::new(store, params)?;
    info!(?params, ksize = store_params.ksize, "partitioning reads");

    let mut assigned: Vec<(String, ComponentId)> = Vec::new();
    let stats = stream_reads(reads, store_params.ksize, |id, seq| {
        let component = index.consume_sequence(&seq)?;
        assigned.push((id.to_string(), component));
        Ok(())
    })?;

    // ids handed out while streaming may have been merged since
    let mut w = open_output(out)?;
    writeln!(w, "#read\tcomponent")?;
    for (id, component) in &assigned {
        let live = index.component(*component).map_or(*component, |c| c.component_id());
        writeln!(w, "{}\t{}", id, live)?;
    }
    w.flush()?;

    println!("reads: {}", stats.n_reads);
    println!("components: {}", index.n_components());
    println!("tags: {}", index.n_tags());
    if let Some(largest) = index.components().max_by_key(|c| c.len()) {
        println!("largest: {} ({} tags, {} merges)", largest.component_id(), largest.len(), largest.n_merges());
    }

    if let Some(path) = save_store {
        let mut store = index.into_store();
        store.set_meta(build_meta(reads));
        store
            .save_to_file(path)
            .map_err(|e| anyhow!("cannot write table to '{}': {}", path, e))?;
        println!("table saved: {}", path);
    }
    Ok(())
}
