//! Error type shared by the history budgeting engine, providers, and the
//! transcript loader.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by [`apply_budget`](crate::history::apply_budget) and its
/// collaborators.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Not even the most recent message fits, at any rendering.
    ///
    /// `required` is the token cost of the cheapest rendering of the most
    /// recent message. Treat this as a configuration error (budget set too
    /// low) rather than something to retry.
    #[error("token budget {budget} is infeasible: the most recent message needs at least {required} tokens")]
    BudgetInfeasible { budget: usize, required: usize },

    #[error("message provider failed: {0}")]
    Provider(String),

    #[error("invalid transcript: {0}")]
    Transcript(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infeasible_message_names_both_numbers() {
        let err = HistoryError::BudgetInfeasible {
            budget: 10,
            required: 25,
        };
        let text = err.to_string();
        assert!(text.contains("10"));
        assert!(text.contains("25"));
    }

    #[test]
    fn io_error_includes_path() {
        let err = HistoryError::Io {
            path: PathBuf::from("/tmp/missing.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/tmp/missing.json"));
    }

    #[test]
    fn json_errors_convert() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: HistoryError = parse.unwrap_err().into();
        assert!(matches!(err, HistoryError::Json(_)));
    }
}
