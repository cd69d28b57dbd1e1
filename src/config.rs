use std::env;
use std::path::{Path, PathBuf};

use jiff::civil::Date;
use tracing::debug;

use crate::cli::{Cli, Language};
use crate::error::ValidationIssue;
use crate::time_utils::{ReportTimezone, ResolvedRange};
use crate::{AppError, AppResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validated, immutable settings for one report run.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub range: ResolvedRange,
    pub timezone: ReportTimezone,
    /// Directory the repository is discovered from.
    pub repository: PathBuf,
    /// How the repository is named in the report header.
    pub repository_label: String,
    pub output: PathBuf,
    pub language: Language,
}

impl ReportConfig {
    /// Check every option before touching the repository. All problems are
    /// reported together rather than stopping at the first one.
    #[tracing::instrument(name = "Validating options", level = "debug", skip(cli))]
    pub fn from_cli(cli: &Cli) -> AppResult<Self> {
        let mut issues = Vec::new();

        let from = parse_date("from-date", cli.from_date.as_deref(), &mut issues);
        let to = parse_date("to-date", cli.to_date.as_deref(), &mut issues);
        if let (Some(from), Some(to)) = (from, to)
            && from > to
        {
            issues.push(ValidationIssue::new(
                "from-date",
                "from-date must be before to-date",
            ));
        }

        let timezone = match cli.timezone.as_deref() {
            Some(name) => match ReportTimezone::named(name) {
                Ok(tz) => Some(tz),
                Err(e) => {
                    debug!("Rejected timezone {}: {}", name, e);
                    issues.push(ValidationIssue::new("timezone", "Invalid timezone"));
                    None
                }
            },
            None => Some(ReportTimezone::system()),
        };

        if let Some(path) = &cli.repository
            && !path.is_dir()
        {
            issues.push(ValidationIssue::new(
                "repository",
                "Repository path does not exist or is not a directory",
            ));
        }

        let (Some(from), Some(to), Some(timezone)) = (from, to, timezone) else {
            return Err(AppError::validation(issues));
        };
        if !issues.is_empty() {
            return Err(AppError::validation(issues));
        }

        let (repository, repository_label) = match &cli.repository {
            Some(path) => (path.clone(), path.display().to_string()),
            None => {
                let cwd = env::current_dir()?;
                let label = cwd.display().to_string();
                (cwd, label)
            }
        };

        let range = ResolvedRange::resolve(from, to, &timezone)?;

        Ok(Self {
            range,
            timezone,
            repository,
            repository_label,
            output: cli.output.clone(),
            language: cli.language,
        })
    }

    pub fn repository_path(&self) -> &Path {
        &self.repository
    }
}

fn parse_date(
    field: &'static str,
    raw: Option<&str>,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Date> {
    let Some(raw) = raw else {
        issues.push(ValidationIssue::new(field, "Required"));
        return None;
    };
    let parsed = if is_iso_date_shape(raw) {
        Date::strptime(DATE_FORMAT, raw).map_err(|e| e.to_string())
    } else {
        Err("not shaped like YYYY-MM-DD".to_string())
    };
    match parsed {
        Ok(date) => Some(date),
        Err(e) => {
            debug!("Rejected {} {:?}: {}", field, raw, e);
            issues.push(ValidationIssue::new(
                field,
                format!("Invalid date {raw:?}, expected YYYY-MM-DD"),
            ));
            None
        }
    }
}

/// Exactly `DDDD-DD-DD`. `strptime` alone accepts short, unpadded and signed years.
fn is_iso_date_shape(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(idx, b)| match idx {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}
