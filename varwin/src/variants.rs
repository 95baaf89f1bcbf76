use crate::errors::RecordError;
use crate::io::{strip_chr, RawVariantRecord};
use crate::models::{SampleAlleles, VariantDb};
use fxhash::FxHashMap;

// ============================================================================
// Variant Database Builder
// ============================================================================

/// Builds a filtered [`VariantDb`] from raw VCF rows.
///
/// A record is kept only if every AF value in its INFO field is at or above
/// the threshold; a record with no AF entry is kept unconditionally. Each
/// sample's genotype is resolved into a concrete allele string; samples whose
/// genotype is not purely index digits are omitted from that record.
pub struct VariantDbBuilder {
    samples: Vec<String>,
    af_threshold: f64,
    db: VariantDb,
    skipped: u64,
}

impl VariantDbBuilder {
    pub fn new(samples: Vec<String>, af_threshold: f64) -> Self {
        Self {
            samples,
            af_threshold,
            db: VariantDb::new(),
            skipped: 0,
        }
    }

    /// Feed one raw VCF row. A malformed row (non-numeric POS, unparseable
    /// AF) is warned about and skipped; it never aborts the parse.
    pub fn push(&mut self, record: &RawVariantRecord) {
        if let Err(e) = self.process(record) {
            self.skipped += 1;
            eprintln!(
                "Warning: skipping VCF record at {}:{}: {}",
                record.chrom, record.pos, e
            );
        }
    }

    fn process(&mut self, record: &RawVariantRecord) -> Result<(), RecordError> {
        let chrom = strip_chr(&record.chrom);
        // Every encountered chromosome is registered, even when the record
        // itself is filtered out; the sampler drops unusable ones later.
        self.db.touch_chromosome(chrom);

        let pos: u64 = record
            .pos
            .parse()
            .map_err(|_| RecordError::InvalidPosition(record.pos.clone()))?;

        if !self.passes_af_filter(&record.info)? {
            return Ok(());
        }

        let mut alleles: Vec<&str> = Vec::with_capacity(4);
        alleles.push(record.reference.as_str());
        alleles.extend(record.alt.split(','));

        let mut resolved: SampleAlleles = FxHashMap::default();
        for (sample, genotype) in self.samples.iter().zip(&record.genotypes) {
            if let Some(allele) = resolve_genotype(genotype, &alleles) {
                resolved.insert(sample.clone(), allele);
            }
        }

        if !resolved.is_empty() {
            self.db.insert(chrom, pos, resolved);
        }
        Ok(())
    }

    /// True when the record passes the AF threshold. The first AF entry in
    /// INFO decides; all of its comma-separated values must be >= threshold.
    /// A record without an AF entry always passes.
    fn passes_af_filter(&self, info: &str) -> Result<bool, RecordError> {
        for entry in info.split(';') {
            if let Some((key, values)) = entry.split_once('=') {
                if key == "AF" {
                    for value in values.split(',') {
                        let af: f64 = value
                            .parse()
                            .map_err(|_| RecordError::InvalidAlleleFrequency(value.to_string()))?;
                        if af < self.af_threshold {
                            return Ok(false);
                        }
                    }
                    return Ok(true);
                }
            }
        }
        Ok(true)
    }

    pub fn finish(self) -> VariantDb {
        if self.skipped > 0 {
            eprintln!("Warning: {} malformed VCF records were skipped", self.skipped);
        }
        self.db
    }
}

// ============================================================================
// Genotype Resolution
// ============================================================================

/// Resolve one genotype field against the allele table `[REF] + ALT`.
///
/// Takes the GT subfield (before the first ':'), splits on '|' when present
/// (phased) else '/', maps every token as an index into the allele table and
/// concatenates the referenced alleles. Returns `None` when any token is not
/// a non-negative integer, or indexes past the allele table.
pub fn resolve_genotype(field: &str, alleles: &[&str]) -> Option<String> {
    let gt = field.split(':').next().unwrap_or(field);
    let separator = if gt.contains('|') { '|' } else { '/' };

    let mut result = String::new();
    for token in gt.split(separator) {
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index: usize = token.parse().ok()?;
        result.push_str(alleles.get(index)?);
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::RawVariantRecord;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn record(chrom: &str, pos: &str, reference: &str, alt: &str, info: &str, genotypes: &[&str]) -> RawVariantRecord {
        RawVariantRecord {
            chrom: chrom.to_string(),
            pos: pos.to_string(),
            reference: reference.to_string(),
            alt: alt.to_string(),
            info: info.to_string(),
            genotypes: genotypes.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn builder(samples: &[&str], af: f64) -> VariantDbBuilder {
        VariantDbBuilder::new(samples.iter().map(|s| s.to_string()).collect(), af)
    }

    #[rstest]
    #[case("0|1", &["A", "G"], Some("AG"))]
    #[case("1|0", &["A", "G"], Some("GA"))]
    #[case("1/1", &["A", "G"], Some("GG"))]
    #[case("0", &["A", "G"], Some("A"))]
    #[case("1/2", &["A", "G", "T"], Some("GT"))]
    #[case("0/1:35:99", &["A", "G"], Some("AG"))]
    #[case("./.", &["A", "G"], None)]
    #[case(".|1", &["A", "G"], None)]
    #[case("", &["A", "G"], None)]
    #[case("2/0", &["A", "G"], None)] // index past the allele table
    fn test_genotype_resolution(
        #[case] field: &str,
        #[case] alleles: &[&str],
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(resolve_genotype(field, alleles), expected.map(String::from));
    }

    #[test]
    fn test_phased_separator_takes_precedence() {
        // A '|' anywhere in the GT switches to phased splitting, so a mixed
        // field yields a non-digit token and no resolved allele.
        assert_eq!(resolve_genotype("0/1|1", &["A", "G"]), None);
    }

    #[test]
    fn test_af_filter_retains_and_drops_atomically() {
        let mut b = builder(&["S1", "S2"], 0.5);
        b.push(&record("chr1", "10", "A", "G", "AF=0.6,0.7", &["0|1", "1|1"]));
        b.push(&record("chr1", "20", "A", "G", "AF=0.6,0.3", &["0|1", "1|1"]));
        let db = b.finish();

        let positions = db.positions("1").unwrap();
        assert!(positions.contains_key(&10));
        // One value below the threshold drops the record for all samples.
        assert!(!positions.contains_key(&20));
    }

    #[test]
    fn test_missing_af_retains_record() {
        let mut b = builder(&["S1"], 0.9);
        b.push(&record("1", "5", "C", "T", "DP=100;MQ=60", &["1/1"]));
        let db = b.finish();
        assert_eq!(db.record_count("1"), 1);
    }

    #[test]
    fn test_malformed_records_skip_and_continue() {
        let mut b = builder(&["S1"], 0.5);
        b.push(&record("1", "notanumber", "A", "G", "AF=0.9", &["1/1"]));
        b.push(&record("1", "7", "A", "G", "AF=abc", &["1/1"]));
        b.push(&record("1", "9", "A", "G", "AF=0.9", &["1/1"]));
        let db = b.finish();

        let positions = db.positions("1").unwrap();
        assert_eq!(positions.len(), 1);
        assert!(positions.contains_key(&9));
    }

    #[test]
    fn test_last_record_wins_at_same_position() {
        let mut b = builder(&["S1"], 0.0);
        b.push(&record("1", "10", "A", "G", "AF=0.9", &["1/1"]));
        b.push(&record("1", "10", "A", "T", "AF=0.9", &["1/1"]));
        let db = b.finish();

        let alleles = db.positions("1").unwrap().get(&10).unwrap();
        assert_eq!(alleles.get("S1"), Some(&"TT".to_string()));
    }

    #[test]
    fn test_unresolved_samples_are_omitted() {
        let mut b = builder(&["S1", "S2"], 0.0);
        b.push(&record("1", "10", "A", "G", "AF=0.9", &["1/1", "./."]));
        let db = b.finish();

        let alleles = db.positions("1").unwrap().get(&10).unwrap();
        assert_eq!(alleles.get("S1"), Some(&"GG".to_string()));
        assert_eq!(alleles.get("S2"), None);
    }

    #[test]
    fn test_record_with_no_resolved_samples_is_not_stored() {
        let mut b = builder(&["S1"], 0.0);
        b.push(&record("1", "10", "A", "G", "AF=0.9", &["./."]));
        let db = b.finish();
        assert_eq!(db.record_count("1"), 0);
        // The chromosome itself is still registered.
        assert_eq!(db.chromosomes(), &["1".to_string()]);
    }

    #[test]
    fn test_chr_prefix_is_stripped() {
        let mut b = builder(&["S1"], 0.0);
        b.push(&record("chr2", "10", "A", "G", "AF=0.9", &["1/1"]));
        let db = b.finish();
        assert_eq!(db.chromosomes(), &["2".to_string()]);
        assert_eq!(db.record_count("2"), 1);
    }
}
