//! Error types.
//!
//! Configuration problems are reported as [`ValidationError`] before any
//! request is made. Failures talking to GitHub are [`ApiError`]s; whether
//! one is fatal depends on where in the pipeline it happens.

use thiserror::Error;

/// Rejected command-line or config-file input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("either --org or --repo must be specified")]
    MissingTarget,

    #[error("cannot specify both --org and --repo")]
    ConflictingTarget,

    #[error("--repo must be in format OWNER/REPO (got '{0}')")]
    RepositoryFormat(String),

    #[error("invalid --{flag} value '{value}' (expected YYYY-MM-DD or an RFC 3339 timestamp)")]
    Date { flag: &'static str, value: String },

    #[error("--since must be before --until")]
    DateOrder,

    #[error("--head must be a non-negative integer (got {0})")]
    NegativeHead(i64),

    #[error("--sort format should be 'field' or 'field:order' (got '{0}')")]
    SortFormat(String),

    #[error("--sort field must be one of: repository, timestamp, code, event (got '{0}')")]
    SortField(String),

    #[error("--sort order must be 'asc' or 'desc' (got '{0}')")]
    SortOrder(String),

    #[error("cannot use both --verbose and --quiet")]
    VerboseQuiet,

    #[error("{0} worker count must be at least 1")]
    ZeroWorkers(&'static str),
}

/// Failure of a single GitHub REST call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no GitHub token found: {0}\nHint: run 'gh auth login' or set GH_TOKEN")]
    MissingToken(String),

    #[error("GET {path} failed with {status}: {message}")]
    Status {
        path: String,
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("GET {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ApiError {
    /// Whether GitHub rejected the credentials.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ApiError::MissingToken(_)
                | ApiError::Status {
                    status: reqwest::StatusCode::UNAUTHORIZED,
                    ..
                }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::SortOrder("up".to_string()).to_string(),
            "--sort order must be 'asc' or 'desc' (got 'up')"
        );
        assert!(ValidationError::NegativeHead(-3).to_string().contains("-3"));
    }

    #[test]
    fn test_auth_detection() {
        let unauthorized = ApiError::Status {
            path: "orgs/acme/repos".to_string(),
            status: reqwest::StatusCode::UNAUTHORIZED,
            message: "Bad credentials".to_string(),
        };
        assert!(unauthorized.is_auth());

        let missing = ApiError::Status {
            path: "orgs/acme/repos".to_string(),
            status: reqwest::StatusCode::NOT_FOUND,
            message: "Not Found".to_string(),
        };
        assert!(!missing.is_auth());
        assert!(ApiError::MissingToken("gh not installed".to_string()).is_auth());
    }
}
