use crate::models::ReferenceStore;
use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use serde::Serialize;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Drop a leading "chr" so VCF and FASTA names key the same chromosome.
pub(crate) fn strip_chr(name: &str) -> &str {
    name.strip_prefix("chr").unwrap_or(name)
}

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

// ============================================================================
// FASTA Reader
// ============================================================================

pub struct FastaReader;

impl FastaReader {
    /// Read a reference FASTA into a [`ReferenceStore`].
    ///
    /// Headers keep only the first whitespace token, with any leading "chr"
    /// stripped; sequence lines are joined and uppercased. Handles gzipped
    /// input transparently.
    pub fn read_reference(path: &Path) -> Result<ReferenceStore> {
        let mut reader = get_dynamic_reader(path)?;
        let mut store = ReferenceStore::new();

        let mut line = String::new();
        let mut current: Option<String> = None;
        let mut sequence = String::new();

        loop {
            line.clear();
            let bytes_read = reader
                .read_line(&mut line)
                .with_context(|| format!("Failed to read FASTA file: {:?}", path))?;
            if bytes_read == 0 {
                if let Some(name) = current.take() {
                    store.insert(name, std::mem::take(&mut sequence));
                }
                break;
            }

            let trimmed = line.trim_end();
            if let Some(header) = trimmed.strip_prefix('>') {
                if let Some(name) = current.take() {
                    store.insert(name, std::mem::take(&mut sequence));
                }
                let name = header.split_whitespace().next().unwrap_or(header);
                current = Some(strip_chr(name).to_string());
            } else if current.is_some() {
                sequence.push_str(&trimmed.to_ascii_uppercase());
            }
        }

        Ok(store)
    }
}

// ============================================================================
// VCF Reader
// ============================================================================

/// One VCF data row, split into raw fields. Interpretation (position parsing,
/// AF filtering, genotype resolution) belongs to the variant database builder.
#[derive(Debug, Clone)]
pub struct RawVariantRecord {
    pub chrom: String,
    /// Unparsed POS field; a non-numeric value is a per-record failure.
    pub pos: String,
    pub reference: String,
    /// Comma-separated alternate alleles, unsplit.
    pub alt: String,
    /// Semicolon-separated key=value INFO field.
    pub info: String,
    /// One genotype field per sample, in header column order.
    pub genotypes: Vec<String>,
}

/// Line reader for a multi-sample VCF.
///
/// `open` consumes the `##` meta lines and the `#CHROM` header row, exposing
/// the sample column names; iterating then yields raw data rows. Rows with
/// too few columns are warned about and skipped.
pub struct VcfReader {
    reader: BufReader<Box<dyn Read>>,
    samples: Vec<String>,
    line: String,
}

impl VcfReader {
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = get_dynamic_reader(path)?;
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader
                .read_line(&mut line)
                .with_context(|| format!("Failed to read VCF file: {:?}", path))?;
            if bytes_read == 0 {
                anyhow::bail!("No #CHROM header row found in VCF file: {:?}", path);
            }
            if line.starts_with("##") {
                continue;
            }
            if line.starts_with("#CHROM") {
                break;
            }
            anyhow::bail!("Malformed VCF header line: {}", line.trim_end());
        }

        // Sample columns start at column 10.
        let samples: Vec<String> = line
            .trim_end()
            .split('\t')
            .skip(9)
            .map(String::from)
            .collect();

        Ok(Self {
            reader,
            samples,
            line: String::new(),
        })
    }

    /// Sample names from the header row, in column order.
    pub fn samples(&self) -> &[String] {
        &self.samples
    }
}

impl Iterator for VcfReader {
    type Item = Result<RawVariantRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }

            let trimmed = self.line.trim_end();
            if trimmed.is_empty() {
                continue;
            }

            let fields: Vec<&str> = trimmed.split('\t').collect();
            if fields.len() < 10 {
                eprintln!(
                    "Warning: VCF row has {} fields (expected at least 10), skipping",
                    fields.len()
                );
                continue;
            }

            return Some(Ok(RawVariantRecord {
                chrom: fields[0].to_string(),
                pos: fields[1].to_string(),
                reference: fields[3].to_string(),
                alt: fields[4].to_string(),
                info: fields[7].to_string(),
                genotypes: fields[9..].iter().map(|s| s.to_string()).collect(),
            }));
        }
    }
}

// ============================================================================
// Sample FASTA Writer
// ============================================================================

/// Writes one sample's reconstructed windows as FASTA records with headers
/// `>chr<chrom>:<start>-<start + L>`.
pub struct SampleFastaWriter {
    writer: BufWriter<File>,
    window_length: u64,
}

impl SampleFastaWriter {
    pub fn create(path: &Path, window_length: u64) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output FASTA: {:?}", path))?;
        Ok(Self {
            writer: BufWriter::new(file),
            window_length,
        })
    }

    pub fn write_windows(&mut self, chrom: &str, windows: &[(u64, String)]) -> Result<()> {
        for (start, sequence) in windows {
            writeln!(
                self.writer,
                ">chr{}:{}-{}",
                chrom,
                start,
                start + self.window_length
            )?;
            writeln!(self.writer, "{}", sequence)?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// Scratch Writer
// ============================================================================

/// Optional persistence of intermediate artifacts (chromosome list, sample
/// list, window coordinates) as JSON, for inspection only. Write failures are
/// warned about and never fail the run; no resume capability is claimed.
pub struct ScratchWriter {
    dir: PathBuf,
}

impl ScratchWriter {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create scratch directory: {:?}", dir))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) {
        let path = self.dir.join(name);
        let result = serde_json::to_string(value)
            .map_err(anyhow::Error::from)
            .and_then(|content| std::fs::write(&path, content).map_err(anyhow::Error::from));
        if let Err(e) = result {
            eprintln!("Warning: failed to write scratch file {:?}: {}", path, e);
        }
    }
}
