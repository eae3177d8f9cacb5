// Service-level errors. Insufficient data is never an error here; it is a
// `NotReady` reason on an otherwise well-formed result.

use fieldstat_core::source::SourceError;
use fieldstat_metrics::readiness::NotReady;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    /// Rejected before any query was issued.
    #[error("invalid_input: {0}")]
    InvalidInput(String),

    #[error("data_unavailable: {0}")]
    DataUnavailable(#[from] SourceError),
}

/// Why an evaluation stopped short of a ready result. Both gates and source
/// failures convert into it, so evaluation steps can use `?` for either.
#[derive(Debug)]
pub enum Halt {
    Gate(NotReady),
    Failed(MetricsError),
}

impl Halt {
    /// The `reason` string reported on the result.
    pub fn reason(&self) -> String {
        match self {
            Halt::Gate(gate) => gate.reason().to_string(),
            Halt::Failed(e) => e.to_string(),
        }
    }
}

impl From<NotReady> for Halt {
    fn from(gate: NotReady) -> Self {
        Halt::Gate(gate)
    }
}

impl From<MetricsError> for Halt {
    fn from(e: MetricsError) -> Self {
        Halt::Failed(e)
    }
}

impl From<SourceError> for Halt {
    fn from(e: SourceError) -> Self {
        Halt::Failed(e.into())
    }
}

/// Parse a caller-supplied entity id. Missing, non-numeric and non-positive
/// ids are rejected.
pub fn parse_entity_id(raw: &str) -> Result<i64, MetricsError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MetricsError::InvalidInput("missing entity id".to_string()));
    }
    let id: i64 = trimmed
        .parse()
        .map_err(|_| MetricsError::InvalidInput(format!("entity id `{trimmed}` is not numeric")))?;
    if id <= 0 {
        return Err(MetricsError::InvalidInput(format!(
            "entity id must be positive, got {id}"
        )));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_ids() {
        assert_eq!(parse_entity_id("42").unwrap(), 42);
        assert_eq!(parse_entity_id("  7 ").unwrap(), 7);
    }

    #[test]
    fn rejects_bad_ids() {
        for raw in ["", "   ", "abc", "12x", "0", "-3", "1.5"] {
            let err = parse_entity_id(raw).unwrap_err();
            assert!(matches!(err, MetricsError::InvalidInput(_)), "{raw:?} accepted");
        }
    }

    #[test]
    fn messages_carry_the_category() {
        let err = parse_entity_id("abc").unwrap_err();
        assert!(err.to_string().starts_with("invalid_input: "));

        let err = MetricsError::from(SourceError::Unavailable("down".into()));
        assert_eq!(err.to_string(), "data_unavailable: data source unavailable: down");
    }

    #[test]
    fn halt_reason_keeps_gate_codes_and_error_messages() {
        assert_eq!(Halt::from(NotReady::InsufficientSample).reason(), "insufficient_sample");
        let failed = Halt::from(SourceError::Unavailable("down".into()));
        assert!(matches!(failed, Halt::Failed(MetricsError::DataUnavailable(_))));
        assert!(failed.reason().starts_with("data_unavailable: "));
    }
}
