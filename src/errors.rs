// Error taxonomy for the whole pipeline. Every variant is fatal: the run is
// a deterministic-given-seed batch computation with no partial-result mode.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TnetError {
    /// A tree node has a children count other than 0 or 2.
    #[error("tree structure: {0}")]
    Structure(String),

    /// Empty host catalog, non-positive sample count, or similar bad setup.
    #[error("configuration: {0}")]
    Configuration(String),

    /// A leaf identifier is absent from the supplied metadata table.
    #[error("metadata lookup: {0}")]
    Lookup(String),

    /// A categorical weight vector summed to zero. Signals an internal
    /// inconsistency in the DP tables rather than bad input.
    #[error("sampling domain: {0}")]
    Domain(String),

    /// Malformed newick text or an unparseable date string.
    #[error("parse: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
