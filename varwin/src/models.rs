use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::consts::{DEFAULT_AF_THRESHOLD, DEFAULT_WINDOW_COUNT, DEFAULT_WINDOW_LENGTH};

// ============================================================================
// Variant Database Model
// ============================================================================

/// Resolved allele string per sample at one genomic position.
pub type SampleAlleles = FxHashMap<String, String>;

/// Filtered per-chromosome variant/genotype database.
///
/// Chromosome names are stored with any leading "chr" stripped, in order of
/// first appearance in the VCF. Every chromosome encountered is registered,
/// even when all of its records end up filtered out; the sampler decides
/// which chromosomes are usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariantDb {
    chroms: Vec<String>,
    by_chrom: FxHashMap<String, BTreeMap<u64, SampleAlleles>>,
}

impl VariantDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chromosome names in order of first appearance.
    pub fn chromosomes(&self) -> &[String] {
        &self.chroms
    }

    /// Register a chromosome name without storing any record.
    pub fn touch_chromosome(&mut self, chrom: &str) {
        if !self.chroms.iter().any(|c| c == chrom) {
            self.chroms.push(chrom.to_string());
        }
    }

    /// Store the resolved alleles at one position. A later record at the same
    /// position overwrites an earlier one (last-wins).
    pub fn insert(&mut self, chrom: &str, pos: u64, alleles: SampleAlleles) {
        self.touch_chromosome(chrom);
        self.by_chrom
            .entry(chrom.to_string())
            .or_default()
            .insert(pos, alleles);
    }

    /// Position map for one chromosome, ordered by coordinate.
    pub fn positions(&self, chrom: &str) -> Option<&BTreeMap<u64, SampleAlleles>> {
        self.by_chrom.get(chrom)
    }

    /// Number of retained records for one chromosome.
    pub fn record_count(&self, chrom: &str) -> usize {
        self.by_chrom.get(chrom).map_or(0, |m| m.len())
    }

    pub fn is_empty(&self) -> bool {
        self.by_chrom.values().all(|m| m.is_empty())
    }
}

// ============================================================================
// Reference Store Model
// ============================================================================

/// Parsed chromosome name -> sequence text.
///
/// Sequences are stored uppercased with line breaks removed; names carry no
/// "chr" prefix so they key against [`VariantDb`] chromosomes directly.
#[derive(Debug, Clone, Default)]
pub struct ReferenceStore {
    sequences: FxHashMap<String, String>,
}

impl ReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: String, sequence: String) {
        self.sequences.insert(name, sequence);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sequences.contains_key(name)
    }

    pub fn sequence(&self, name: &str) -> Option<&str> {
        self.sequences.get(name).map(|s| s.as_str())
    }

    /// Substring of one chromosome, clamped to the sequence end.
    pub fn substring(&self, name: &str, start: u64, end: u64) -> Option<&str> {
        let seq = self.sequences.get(name)?;
        let start = start as usize;
        if start >= seq.len() {
            return None;
        }
        let end = (end as usize).min(seq.len());
        Some(&seq[start..end])
    }

    pub fn chromosome_count(&self) -> usize {
        self.sequences.len()
    }
}

// ============================================================================
// Consensus Window Model
// ============================================================================

/// Sampled window start coordinates, per chromosome.
///
/// `chroms` is the final filtered chromosome list (chromosomes lacking
/// variant or reference data are already dropped); `starts` holds the sorted,
/// deduplicated start list for each of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsensusWindows {
    pub chroms: Vec<String>,
    pub starts: FxHashMap<String, Vec<u64>>,
}

impl ConsensusWindows {
    pub fn starts_for(&self, chrom: &str) -> Option<&[u64]> {
        self.starts.get(chrom).map(|s| s.as_slice())
    }

    /// Total number of distinct windows across all chromosomes.
    pub fn total(&self) -> usize {
        self.starts.values().map(|s| s.len()).sum()
    }

    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string(self)?;
        std::fs::write(path, content)
            .map_err(|e| anyhow::anyhow!("Failed to write windows to {:?}: {}", path, e))?;
        Ok(())
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read windows from {:?}: {}", path, e))?;
        let windows: Self = serde_json::from_str(&content)?;
        Ok(windows)
    }
}

// ============================================================================
// Configuration Model
// ============================================================================

/// Run parameters shared by the sampling and reconstruction stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarwinConfig {
    /// Window length in bases.
    pub window_length: u64,
    /// Total requested window count across all chromosomes.
    pub window_count: u64,
    /// Inclusive minimum allele frequency for a record to be kept.
    pub af_threshold: f64,
    /// Seed for reproducible sampling; entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for VarwinConfig {
    fn default() -> Self {
        Self {
            window_length: DEFAULT_WINDOW_LENGTH,
            window_count: DEFAULT_WINDOW_COUNT,
            af_threshold: DEFAULT_AF_THRESHOLD,
            seed: None,
        }
    }
}
