use anyhow::{anyhow, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqFormat {
    Fasta,
    Fastq,
}

#[derive(Debug, Clone)]
pub struct SeqRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
    /// Only present for FASTQ input.
    pub qual: Option<Vec<u8>>,
}

/// Reads FASTA or FASTQ records; the format is decided by the first header line.
pub struct SequenceReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
    format: Option<SeqFormat>,
    peek_header: Option<String>,
}

/// Opens a FASTA/FASTQ file with a buffered reader.
pub fn open_reads(path: &str) -> Result<SequenceReader<BufReader<File>>> {
    let fh = File::open(path).map_err(|e| anyhow!("cannot open reads file '{}': {}", path, e))?;
    Ok(SequenceReader::new(BufReader::new(fh)))
}

fn split_header(header: &str) -> (String, Option<String>) {
    let mut parts = header.splitn(2, char::is_whitespace);
    let id = parts.next().unwrap_or("").to_string();
    let desc = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    (id, desc)
}

impl<R: BufRead> SequenceReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: String::new(), done: false, format: None, peek_header: None }
    }

    /// `None` until the first record has been seen.
    pub fn format(&self) -> Option<SeqFormat> {
        self.format
    }

    pub fn next_record(&mut self) -> Result<Option<SeqRecord>> {
        if self.done {
            return Ok(None);
        }
        match self.format {
            Some(SeqFormat::Fasta) => self.next_fasta(),
            Some(SeqFormat::Fastq) => self.next_fastq(),
            None => {
                // skip leading blank lines, then sniff
                loop {
                    self.buf.clear();
                    let n = self.reader.read_line(&mut self.buf)?;
                    if n == 0 {
                        self.done = true;
                        return Ok(None);
                    }
                    let line = self.buf.trim_end();
                    if line.is_empty() {
                        continue;
                    }
                    if let Some(h) = line.strip_prefix('>') {
                        self.format = Some(SeqFormat::Fasta);
                        self.peek_header = Some(h.trim().to_string());
                        return self.next_fasta();
                    }
                    if let Some(h) = line.strip_prefix('@') {
                        self.format = Some(SeqFormat::Fastq);
                        self.peek_header = Some(h.trim_end().to_string());
                        return self.next_fastq();
                    }
                    return Err(anyhow!("unrecognized sequence format: expected '>' or '@' header"));
                }
            }
        }
    }

    fn next_fasta(&mut self) -> Result<Option<SeqRecord>> {
        let header = if let Some(h) = self.peek_header.take() {
            h
        } else {
            loop {
                self.buf.clear();
                let n = self.reader.read_line(&mut self.buf)?;
                if n == 0 {
                    self.done = true;
                    return Ok(None);
                }
                if self.buf.starts_with('>') {
                    break self.buf[1..].trim().to_string();
                }
            }
        };
        let (id, desc) = split_header(&header);

        let mut seq: Vec<u8> = Vec::new();
        loop {
            self.buf.clear();
            let n = self.reader.read_line(&mut self.buf)?;
            if n == 0 {
                self.done = true;
                break;
            }
            if self.buf.starts_with('>') {
                self.peek_header = Some(self.buf[1..].trim().to_string());
                break;
            }
            for &b in self.buf.as_bytes() {
                match b {
                    b'\n' | b'\r' | b' ' | b'\t' => {}
                    _ => seq.push(b.to_ascii_uppercase()),
                }
            }
        }

        Ok(Some(SeqRecord { id, desc, seq, qual: None }))
    }

    fn next_fastq(&mut self) -> Result<Option<SeqRecord>> {
        let header = match self.peek_header.take() {
            Some(h) => h,
            None => loop {
                self.buf.clear();
                let n = self.reader.read_line(&mut self.buf)?;
                if n == 0 {
                    self.done = true;
                    return Ok(None);
                }
                if self.buf.trim_end().is_empty() {
                    continue;
                }
                if !self.buf.starts_with('@') {
                    return Err(anyhow!("FASTQ header not starting with '@'"));
                }
                break self.buf[1..].trim_end().to_string();
            },
        };
        let (id, desc) = split_header(&header);

        self.buf.clear();
        if self.reader.read_line(&mut self.buf)? == 0 {
            return Err(anyhow!("unexpected EOF after header of '{}'", id));
        }
        let seq = self.buf.trim_end().as_bytes().to_ascii_uppercase();

        self.buf.clear();
        if self.reader.read_line(&mut self.buf)? == 0 || !self.buf.starts_with('+') {
            return Err(anyhow!("missing '+' line in record '{}'", id));
        }

        self.buf.clear();
        if self.reader.read_line(&mut self.buf)? == 0 {
            return Err(anyhow!("missing quality line in record '{}'", id));
        }
        let qual = self.buf.trim_end().as_bytes().to_vec();
        if qual.len() != seq.len() {
            return Err(anyhow!("seq/qual length mismatch in record '{}'", id));
        }

        Ok(Some(SeqRecord { id, desc, seq, qual: Some(qual) }))
    }
}

impl<R: BufRead> Iterator for SequenceReader<R> {
    type Item = Result<SeqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(Some(rec)) => Some(Ok(rec)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
