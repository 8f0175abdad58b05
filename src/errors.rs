// Copyright 2025 Cowboy AI, LLC.

//! Error types for knowledge-graph operations

use thiserror::Error;

/// How bad a failure is, and therefore how the caller should react
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Log and continue
    Low,
    /// Partial failure; a fallback may be attempted
    Medium,
    /// The operation failed; any open transaction must roll back
    High,
    /// The process cannot continue (e.g. unusable configuration)
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorSeverity::Low => "low",
            ErrorSeverity::Medium => "medium",
            ErrorSeverity::High => "high",
            ErrorSeverity::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Errors that can occur in the knowledge-arbitration engine
///
/// Validation *rejections* are not errors: an edge that fails the arbiter is
/// routed to the drop log as a normal outcome. `Validation` here covers only
/// malformed input (missing required fields and the like).
#[derive(Debug, Clone, Error)]
pub enum KgError {
    /// Repository or transaction failure
    #[error("Storage error during {operation}: {message}")]
    Storage {
        /// Mutating operation that failed (e.g. "upsert_relation", "commit")
        operation: String,
        /// Human-readable cause
        message: String,
        /// Severity of the failure
        severity: ErrorSeverity,
        /// Whether the caller may retry
        retryable: bool,
    },

    /// External LLM failure that survived retries and fallback
    #[error("LLM service error ({kind}): {message}")]
    LlmService {
        /// Failure taxonomy entry: timeout, rate_limit, auth, network, parse, unknown
        kind: String,
        /// Human-readable cause
        message: String,
        /// Whether the caller may retry
        retryable: bool,
    },

    /// Malformed input to a validator (not a content rejection)
    #[error("Validation input error: {0}")]
    Validation(String),

    /// Upstream extractor failure propagated with context
    #[error("Extraction error in {stage}: {message}")]
    Extraction {
        /// Extraction stage that failed
        stage: String,
        /// Human-readable cause
        message: String,
    },

    /// Unrecoverable retrieval/fusion failure
    #[error("Reasoning error at {step}: {message}")]
    Reasoning {
        /// Reasoning step that failed
        step: String,
        /// Human-readable cause
        message: String,
    },

    /// Missing or malformed configuration file
    #[error("Config error for {key}: {message}")]
    Config {
        /// Config file or key involved
        key: String,
        /// Human-readable cause
        message: String,
    },

    /// Serialization failure at a repository or gateway boundary
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for knowledge-graph operations
pub type KgResult<T> = Result<T, KgError>;

impl KgError {
    /// Storage error with the default HIGH / retryable policy
    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        KgError::Storage {
            operation: operation.into(),
            message: message.into(),
            severity: ErrorSeverity::High,
            retryable: true,
        }
    }

    /// Config error (always CRITICAL, never retryable)
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        KgError::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Severity assigned by the taxonomy
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            KgError::Storage { severity, .. } => *severity,
            KgError::LlmService { .. } => ErrorSeverity::Medium,
            KgError::Validation(_) => ErrorSeverity::Low,
            KgError::Extraction { .. } => ErrorSeverity::Medium,
            KgError::Reasoning { .. } => ErrorSeverity::Medium,
            KgError::Config { .. } => ErrorSeverity::Critical,
            KgError::Serialization(_) => ErrorSeverity::Medium,
        }
    }

    /// Whether the taxonomy allows a retry of the failed operation
    pub fn is_retryable(&self) -> bool {
        match self {
            KgError::Storage { retryable, .. } => *retryable,
            KgError::LlmService { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Check if this is a storage-layer error
    pub fn is_storage_error(&self) -> bool {
        matches!(self, KgError::Storage { .. })
    }
}

impl From<serde_json::Error> for KgError {
    fn from(err: serde_json::Error) -> Self {
        KgError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for KgError {
    fn from(err: serde_yaml::Error) -> Self {
        KgError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = KgError::storage("upsert_entity", "backend unavailable");
        assert_eq!(
            err.to_string(),
            "Storage error during upsert_entity: backend unavailable"
        );

        let err = KgError::LlmService {
            kind: "timeout".to_string(),
            message: "deadline exceeded".to_string(),
            retryable: true,
        };
        assert_eq!(
            err.to_string(),
            "LLM service error (timeout): deadline exceeded"
        );

        let err = KgError::config("static_domain", "file not found");
        assert_eq!(
            err.to_string(),
            "Config error for static_domain: file not found"
        );
    }

    #[test]
    fn test_severity_taxonomy() {
        assert_eq!(
            KgError::storage("commit", "x").severity(),
            ErrorSeverity::High
        );
        assert_eq!(
            KgError::Validation("missing field".into()).severity(),
            ErrorSeverity::Low
        );
        assert_eq!(KgError::config("k", "m").severity(), ErrorSeverity::Critical);
        assert_eq!(
            KgError::Reasoning {
                step: "fusion".into(),
                message: "m".into()
            }
            .severity(),
            ErrorSeverity::Medium
        );
    }

    #[test]
    fn test_retryability() {
        assert!(KgError::storage("commit", "x").is_retryable());
        assert!(!KgError::Validation("x".into()).is_retryable());
        assert!(!KgError::config("k", "m").is_retryable());

        let auth = KgError::LlmService {
            kind: "auth".into(),
            message: "401".into(),
            retryable: false,
        };
        assert!(!auth.is_retryable());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Low < ErrorSeverity::Medium);
        assert!(ErrorSeverity::High < ErrorSeverity::Critical);
    }

    #[test]
    fn test_serde_json_conversion() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{ nope }").unwrap_err();
        let err: KgError = serde_err.into();
        assert!(matches!(err, KgError::Serialization(_)));
    }
}
