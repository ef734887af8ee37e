//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap, and turns the
//! raw strings into a validated [`Query`] before anything touches the
//! network.

use crate::config::Config;
use crate::error::ValidationError;
use crate::filters::{StatusFilter, TimeRange};
use crate::models::Target;
use crate::ordering::SortSpec;
use crate::pipeline::Query;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Parser;
use std::path::PathBuf;

/// hookmon - monitor GitHub webhook deliveries
///
/// Retrieve and display webhook delivery history for every repository of
/// an organization, or for a single repository.
///
/// Examples:
///   hookmon --org myorg
///   hookmon --repo owner/repo --json
///   hookmon --org myorg --filter slack.com
///   hookmon --org myorg --since 2026-01-01 --until 2026-01-31
///   hookmon --org myorg --failed --head 3
///   hookmon --org myorg --sort code:asc
///   hookmon --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Process all repositories in this organization
    #[arg(long, value_name = "ORG")]
    pub org: Option<String>,

    /// Process a single repository
    #[arg(long, value_name = "OWNER/REPO")]
    pub repo: Option<String>,

    /// Only show deliveries whose target URL contains this text (case-insensitive)
    #[arg(long, value_name = "PATTERN")]
    pub filter: Option<String>,

    /// Start date, YYYY-MM-DD (from 00:00:00 UTC) or RFC 3339
    #[arg(long, value_name = "DATE")]
    pub since: Option<String>,

    /// End date, YYYY-MM-DD (until 23:59:59 UTC) or RFC 3339
    #[arg(long, value_name = "DATE")]
    pub until: Option<String>,

    /// Only show failed deliveries (4xx, 5xx, or no response)
    #[arg(long, conflicts_with = "status")]
    pub failed: bool,

    /// Filter by delivery outcome
    #[arg(long, value_name = "STATUS")]
    pub status: Option<StatusFilter>,

    /// Show only the N first deliveries per repository (0 = all)
    #[arg(long, value_name = "N", default_value = "0", allow_negative_numbers = true)]
    pub head: i64,

    /// Sort by field (repository, timestamp, code, event) with optional :asc or :desc
    #[arg(long, value_name = "FIELD[:ORDER]")]
    pub sort: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// GitHub token (falls back to GITHUB_TOKEN, then `gh auth token`)
    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub API root URL
    #[arg(long, value_name = "URL", env = "HOOKMON_API_URL")]
    pub api_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .hookmon.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Disable colored table output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no progress bars)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .hookmon.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Checks that do not depend on the config file.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.verbose && self.quiet {
            return Err(ValidationError::VerboseQuiet);
        }
        self.target()?;
        self.time_range()?;
        self.head()?;
        if let Some(ref sort) = self.sort {
            sort.parse::<SortSpec>()?;
        }
        Ok(())
    }

    /// The organization or repository to scan.
    pub fn target(&self) -> Result<Target, ValidationError> {
        let org = self.org.as_deref().filter(|s| !s.is_empty());
        let repo = self.repo.as_deref().filter(|s| !s.is_empty());

        match (org, repo) {
            (None, None) => Err(ValidationError::MissingTarget),
            (Some(_), Some(_)) => Err(ValidationError::ConflictingTarget),
            (Some(org), None) => Ok(Target::Organization(org.to_string())),
            (None, Some(repo)) => {
                let parts: Vec<&str> = repo.split('/').collect();
                if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
                    return Err(ValidationError::RepositoryFormat(repo.to_string()));
                }
                Ok(Target::Repository(repo.to_string()))
            }
        }
    }

    pub fn time_range(&self) -> Result<TimeRange, ValidationError> {
        let since = self
            .since
            .as_deref()
            .map(|v| parse_date("since", v, NaiveTime::default()))
            .transpose()?;
        let until = self
            .until
            .as_deref()
            .map(|v| parse_date("until", v, end_of_day()))
            .transpose()?;

        if let (Some(s), Some(u)) = (since, until) {
            if s > u {
                return Err(ValidationError::DateOrder);
            }
        }
        Ok(TimeRange::new(since, until))
    }

    pub fn head(&self) -> Result<usize, ValidationError> {
        usize::try_from(self.head).map_err(|_| ValidationError::NegativeHead(self.head))
    }

    pub fn status_filter(&self) -> StatusFilter {
        if self.failed {
            StatusFilter::Failed
        } else {
            self.status.unwrap_or_default()
        }
    }

    /// Build the query. `--sort` wins over the config file's default sort.
    pub fn to_query(&self, config: &Config) -> Result<Query, ValidationError> {
        let sort = match self.sort {
            Some(ref s) => s.parse()?,
            None => config.output.sort_spec().unwrap_or_default(),
        };

        Ok(Query {
            target: self.target()?,
            url_pattern: self.filter.clone().filter(|f| !f.is_empty()),
            range: self.time_range()?,
            status: self.status_filter(),
            head: self.head()?,
            sort,
        })
    }

    /// Token from `--token`/`GH_TOKEN`, else `GITHUB_TOKEN`.
    pub fn explicit_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .filter(|t| !t.trim().is_empty())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or_default()
}

/// Parse `YYYY-MM-DD` (at `time_of_day`, UTC) or a full RFC 3339 instant.
fn parse_date(
    flag: &'static str,
    value: &str,
    time_of_day: NaiveTime,
) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(time_of_day).and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ValidationError::Date {
            flag,
            value: value.to_string(),
        })
}
