use crate::models::{ConsensusWindows, ReferenceStore, VariantDb};
use fxhash::FxHashSet;
use rayon::prelude::*;

/// Reconstructed `(start, sequence)` windows for one chromosome.
pub type ChromWindows = Vec<(u64, String)>;

// ============================================================================
// Sample Sequence Reconstruction
// ============================================================================

/// Rebuilds each sample's sequence over the sampled windows.
///
/// Per chromosome only the minimal span covering all windows is extracted
/// from the reference. Variant positions that fall inside a window's affected
/// range (the `L + 1` coordinates from each start) are replaced by the
/// sample's resolved allele string, splicing by the original span coordinate
/// against the immutable base so one substitution never shifts another's
/// index. Windows are then sliced from the joined mutated text.
pub struct SampleReconstructor<'a> {
    reference: &'a ReferenceStore,
    variants: &'a VariantDb,
    windows: &'a ConsensusWindows,
    window_length: u64,
}

impl<'a> SampleReconstructor<'a> {
    pub fn new(
        reference: &'a ReferenceStore,
        variants: &'a VariantDb,
        windows: &'a ConsensusWindows,
        window_length: u64,
    ) -> Self {
        Self {
            reference,
            variants,
            windows,
            window_length,
        }
    }

    /// Build every window for one sample, chromosomes fanned out in parallel.
    /// A chromosome that cannot be reconstructed is warned about and
    /// contributes no result.
    pub fn reconstruct(&self, sample: &str) -> Vec<(String, ChromWindows)> {
        self.windows
            .chroms
            .par_iter()
            .filter_map(|chrom| {
                self.reconstruct_chromosome(chrom, sample)
                    .map(|windows| (chrom.clone(), windows))
            })
            .collect()
    }

    fn reconstruct_chromosome(&self, chrom: &str, sample: &str) -> Option<ChromWindows> {
        let starts = self.windows.starts_for(chrom)?;
        if starts.is_empty() {
            return None;
        }

        let sequence = match self.reference.sequence(chrom) {
            Some(s) => s,
            None => {
                eprintln!("Warning: no reference sequence for chr{}, skipping", chrom);
                return None;
            }
        };

        let span_min = starts[0] as usize;
        if span_min >= sequence.len() {
            eprintln!(
                "Warning: windows on chr{} start past the reference end ({} >= {}), skipping",
                chrom,
                span_min,
                sequence.len()
            );
            return None;
        }
        let span_max = ((starts[starts.len() - 1] + self.window_length) as usize).min(sequence.len());
        let span = &sequence[span_min..span_max];

        // Coordinates any window can touch: L + 1 positions from each start.
        let mut affected = FxHashSet::default();
        for &start in starts {
            for pos in start..=start + self.window_length {
                affected.insert(pos);
            }
        }

        let mutated = self.splice_alleles(span, span_min as u64, chrom, sample, &affected);

        let windows = starts
            .iter()
            .map(|&start| {
                let local = start as usize - span_min;
                (start, slice_window(&mutated, local, self.window_length as usize))
            })
            .collect();
        Some(windows)
    }

    /// Replace single reference bases inside the affected set with the
    /// sample's allele strings.
    fn splice_alleles(
        &self,
        span: &str,
        span_min: u64,
        chrom: &str,
        sample: &str,
        affected: &FxHashSet<u64>,
    ) -> String {
        let positions = match self.variants.positions(chrom) {
            Some(p) => p,
            None => return span.to_string(),
        };

        let span_end = span_min + span.len() as u64;
        // BTreeMap range iteration keeps substitutions in ascending
        // coordinate order.
        let substitutions: Vec<(usize, &str)> = positions
            .range(span_min..span_end)
            .filter(|(pos, _)| affected.contains(pos))
            .filter_map(|(pos, samples)| {
                samples
                    .get(sample)
                    .map(|allele| ((pos - span_min) as usize, allele.as_str()))
            })
            .collect();

        if substitutions.is_empty() {
            return span.to_string();
        }

        let mut mutated = String::with_capacity(span.len());
        let mut cursor = 0usize;
        for (local, allele) in substitutions {
            mutated.push_str(&span[cursor..local]);
            mutated.push_str(allele);
            cursor = local + 1;
        }
        mutated.push_str(&span[cursor..]);
        mutated
    }
}

/// Slice `length` bytes at `local`, truncating at end-of-text.
fn slice_window(text: &str, local: usize, length: usize) -> String {
    if local >= text.len() {
        return String::new();
    }
    let end = (local + length).min(text.len());
    text[local..end].to_string()
}
