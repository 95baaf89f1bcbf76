use thiserror::Error;

/// Per-record VCF parse failures. These are reported and skip the offending
/// record only; they never abort the overall parse.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Invalid position '{0}'")]
    InvalidPosition(String),

    #[error("Unparseable AF value '{0}'")]
    InvalidAlleleFrequency(String),
}
