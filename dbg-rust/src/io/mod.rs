//! FASTA / FASTQ reads input.

pub mod reads;

pub use reads::{open_reads, SeqFormat, SeqRecord, SequenceReader};
