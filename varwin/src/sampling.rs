use crate::models::{ConsensusWindows, ReferenceStore, VariantDb};
use anyhow::{bail, Result};
use fxhash::FxHashMap;
use rand::prelude::*;
use rayon::prelude::*;
use std::collections::BTreeSet;

// ============================================================================
// Consensus Window Sampling
// ============================================================================

/// Samples window start coordinates per chromosome, biased toward
/// variant-dense regions.
///
/// Positions are drawn uniformly **with replacement** from each chromosome's
/// variant positions, then jittered upstream: for a drawn position `p` the
/// start is uniform in `[max(0, p - (L + 1)), p]`. Duplicate starts collapse
/// into a set, so the delivered count per chromosome is at most its
/// allocation.
pub struct WindowSampler {
    window_length: u64,
    window_count: u64,
    seed: Option<u64>,
}

impl WindowSampler {
    pub fn new(window_length: u64, window_count: u64, seed: Option<u64>) -> Self {
        Self {
            window_length,
            window_count,
            seed,
        }
    }

    /// Chromosomes with both retained variant records and a reference
    /// sequence, in first-appearance order.
    fn usable_chromosomes(&self, variants: &VariantDb, reference: &ReferenceStore) -> Vec<String> {
        variants
            .chromosomes()
            .iter()
            .filter(|chrom| variants.record_count(chrom) > 0 && reference.contains(chrom))
            .cloned()
            .collect()
    }

    /// Even split of the total count across chromosomes; the entire remainder
    /// is added to the first chromosome in iteration order.
    pub fn allocate(&self, chroms: &[String]) -> Vec<(String, u64)> {
        let per_chrom = self.window_count / chroms.len() as u64;
        let remainder = self.window_count % chroms.len() as u64;

        chroms
            .iter()
            .enumerate()
            .map(|(i, chrom)| {
                let count = if i == 0 { per_chrom + remainder } else { per_chrom };
                (chrom.clone(), count)
            })
            .collect()
    }

    /// Sample every usable chromosome in parallel. Zero usable chromosomes is
    /// a fatal configuration error.
    pub fn sample(&self, variants: &VariantDb, reference: &ReferenceStore) -> Result<ConsensusWindows> {
        let chroms = self.usable_chromosomes(variants, reference);
        if chroms.is_empty() {
            bail!("No chromosome has both variant data and a reference sequence");
        }

        let allocations = self.allocate(&chroms);

        // Each worker owns one chromosome and returns its starts; the map is
        // assembled here rather than shared across workers.
        let sampled: Vec<(String, Vec<u64>)> = allocations
            .into_par_iter()
            .map(|(chrom, count)| {
                let positions: Vec<u64> = variants
                    .positions(&chrom)
                    .map(|m| m.keys().copied().collect())
                    .unwrap_or_default();
                let starts = self.sample_chromosome(&chrom, &positions, count);
                (chrom, starts)
            })
            .collect();

        let mut starts: FxHashMap<String, Vec<u64>> = FxHashMap::default();
        for (chrom, chrom_starts) in sampled {
            starts.insert(chrom, chrom_starts);
        }

        Ok(ConsensusWindows { chroms, starts })
    }

    fn sample_chromosome(&self, chrom: &str, positions: &[u64], count: u64) -> Vec<u64> {
        if positions.is_empty() {
            return Vec::new();
        }

        let mut rng = self.rng_for(chrom);
        let mut unique = BTreeSet::new();
        for _ in 0..count {
            let pos = positions[rng.gen_range(0..positions.len())];
            let floor = pos.saturating_sub(self.window_length + 1);
            unique.insert(rng.gen_range(floor..=pos));
        }
        unique.into_iter().collect()
    }

    // One RNG stream per chromosome so seeded runs do not depend on thread
    // scheduling.
    fn rng_for(&self, chrom: &str) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ fxhash::hash64(chrom)),
            None => StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SampleAlleles, VariantDb};
    use pretty_assertions::assert_eq;

    fn sample_alleles(sample: &str, allele: &str) -> SampleAlleles {
        let mut m = SampleAlleles::default();
        m.insert(sample.to_string(), allele.to_string());
        m
    }

    fn db_with(chrom_positions: &[(&str, &[u64])]) -> VariantDb {
        let mut db = VariantDb::new();
        for (chrom, positions) in chrom_positions {
            for &pos in *positions {
                db.insert(chrom, pos, sample_alleles("S1", "G"));
            }
        }
        db
    }

    fn reference_with(chroms: &[(&str, usize)]) -> ReferenceStore {
        let mut store = ReferenceStore::new();
        for (chrom, len) in chroms {
            store.insert(chrom.to_string(), "A".repeat(*len));
        }
        store
    }

    #[test]
    fn test_allocation_sums_to_total_with_remainder_on_first() {
        let sampler = WindowSampler::new(100, 10, Some(1));
        let chroms: Vec<String> = ["1", "2", "3"].iter().map(|s| s.to_string()).collect();
        let allocations = sampler.allocate(&chroms);

        assert_eq!(allocations[0], ("1".to_string(), 4));
        assert_eq!(allocations[1], ("2".to_string(), 3));
        assert_eq!(allocations[2], ("3".to_string(), 3));
        assert_eq!(allocations.iter().map(|(_, c)| c).sum::<u64>(), 10);
    }

    #[test]
    fn test_starts_are_distinct_sorted_and_within_jitter_bounds() {
        let length = 10u64;
        let positions: Vec<u64> = vec![50, 120, 300];
        let sampler = WindowSampler::new(length, 200, Some(7));
        let starts = sampler.sample_chromosome("1", &positions, 200);

        assert!(!starts.is_empty());
        assert!(starts.windows(2).all(|w| w[0] < w[1]));
        for &s in &starts {
            // Every start must be derivable from some position via the jitter
            // range [max(0, p - L - 1), p].
            assert!(
                positions
                    .iter()
                    .any(|&p| s <= p && s >= p.saturating_sub(length + 1)),
                "start {} outside every jitter range",
                s
            );
        }
    }

    #[test]
    fn test_single_position_chromosome_still_samples() {
        let sampler = WindowSampler::new(100, 50, Some(3));
        let starts = sampler.sample_chromosome("1", &[5], 50);
        assert!(!starts.is_empty());
        assert!(starts.iter().all(|&s| s <= 5));
    }

    #[test]
    fn test_chromosomes_missing_reference_are_dropped() {
        let db = db_with(&[("1", &[10, 20]), ("2", &[30])]);
        let reference = reference_with(&[("1", 1000)]);
        let sampler = WindowSampler::new(10, 100, Some(11));

        let windows = sampler.sample(&db, &reference).unwrap();
        assert_eq!(windows.chroms, vec!["1".to_string()]);
        assert!(windows.starts_for("2").is_none());
    }

    #[test]
    fn test_no_usable_chromosomes_is_fatal() {
        let db = db_with(&[("1", &[10])]);
        let reference = reference_with(&[("2", 1000)]);
        let sampler = WindowSampler::new(10, 100, Some(11));
        assert!(sampler.sample(&db, &reference).is_err());
    }

    #[test]
    fn test_seeded_sampling_is_deterministic() {
        let db = db_with(&[("1", &[10, 200, 4000]), ("2", &[77, 88])]);
        let reference = reference_with(&[("1", 10_000), ("2", 10_000)]);

        let a = WindowSampler::new(25, 500, Some(42)).sample(&db, &reference).unwrap();
        let b = WindowSampler::new(25, 500, Some(42)).sample(&db, &reference).unwrap();
        assert_eq!(a, b);
    }
}
