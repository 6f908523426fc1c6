use thiserror::Error;

use super::experiment::ExperimentResultError;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error(transparent)]
    Experiment(#[from] ExperimentResultError),
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Machine-readable code for errors raised by the experiment analysis
    pub fn experiment_code(&self) -> Option<String> {
        match self {
            Self::Experiment(err) => Some(err.code()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("Funnel results file 'results.json' not found");
        assert_eq!(
            error.to_string(),
            "Not found: Funnel results file 'results.json' not found"
        );
    }

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("Invalid input");
        assert_eq!(error.to_string(), "Validation error: Invalid input");
    }

    #[test]
    fn test_experiment_error_is_transparent() {
        let error = DomainError::from(ExperimentResultError::NoControlData);
        assert_eq!(error.to_string(), "No control variant data found");
        assert_eq!(error.experiment_code().as_deref(), Some("no_data"));
        assert!(DomainError::internal("boom").experiment_code().is_none());
    }
}
