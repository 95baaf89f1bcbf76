//! # Varwin: Variant-Aware Window Synthesis
//!
//! A module for synthesizing per-sample genomic sequence windows by combining
//! a reference genome with population variant calls. For every sample in a
//! multi-sample VCF, varwin emits a FASTA file of fixed-length DNA windows in
//! which reference bases have been replaced by that sample's observed alleles
//! at variant sites.
//!
//! ## Overview
//!
//! The pipeline runs in three stages on top of plain FASTA/VCF text input:
//!
//! 1. **Variant database** - filter VCF records by allele frequency and
//!    resolve each sample's genotype into a concrete allele string, keyed by
//!    chromosome and position.
//! 2. **Window sampling** - draw window start positions per chromosome,
//!    biased toward variant-dense regions (with-replacement position draws
//!    plus upstream jitter, deduplicated).
//! 3. **Reconstruction** - per sample and chromosome, splice alleles into the
//!    minimal reference span covering all windows and slice out each window.
//!
//! ## Key Features
//!
//! - **Allele frequency filtering** - keep only records common in the population
//! - **Phased and unphased genotypes** - `|` and `/` separators, multi-allelic sites
//! - **Variant-dense bias** - window starts land near and upstream of variants
//! - **Reproducible runs** - optional seed makes sampling deterministic
//! - **Parallel per chromosome** - chromosomes are processed independently
//!
//! ## Example
//!
//! ```bash
//! varwin -r reference.fa --vcf cohort.vcf.gz -o results -l 100 -c 1000000
//! ```
//!
//! ```rust,ignore
//! use varwin::{VariantDbBuilder, WindowSampler, SampleReconstructor};
//! use varwin::io::{FastaReader, VcfReader};
//!
//! let vcf = VcfReader::open(&vcf_path)?;
//! let samples = vcf.samples().to_vec();
//! let mut builder = VariantDbBuilder::new(samples.clone(), 0.5);
//! for record in vcf {
//!     builder.push(&record?);
//! }
//! let variants = builder.finish();
//!
//! let reference = FastaReader::read_reference(&fasta_path)?;
//! let windows = WindowSampler::new(100, 1_000_000, Some(42)).sample(&variants, &reference)?;
//!
//! let reconstructor = SampleReconstructor::new(&reference, &variants, &windows, 100);
//! for sample in &samples {
//!     let per_chrom = reconstructor.reconstruct(sample);
//!     // write one FASTA per sample
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`models`] - Core data structures (VariantDb, ReferenceStore, ConsensusWindows)
//! - [`io`] - FASTA/VCF text reading and per-sample FASTA output
//! - [`variants`] - Allele frequency filtering and genotype resolution
//! - [`sampling`] - Cross-chromosome allocation and window start sampling
//! - [`reconstruct`] - Allele splicing and window extraction
//! - [`cli`] - Command-line interface implementation

pub mod cli;
pub mod consts;
pub mod errors;
pub mod io;
pub mod models;
pub mod reconstruct;
pub mod sampling;
pub mod variants;


// Re-export commonly used types
pub use consts::VARWIN_CMD;
pub use errors::RecordError;
pub use io::{FastaReader, RawVariantRecord, SampleFastaWriter, ScratchWriter, VcfReader};
pub use models::{ConsensusWindows, ReferenceStore, SampleAlleles, VariantDb, VarwinConfig};
pub use reconstruct::{ChromWindows, SampleReconstructor};
pub use sampling::WindowSampler;
pub use variants::VariantDbBuilder;
