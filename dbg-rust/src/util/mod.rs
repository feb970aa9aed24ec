pub mod dna;
pub mod kmer;
