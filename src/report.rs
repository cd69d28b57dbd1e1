use std::path::PathBuf;

use tracing::{Instrument, debug, info, info_span};
use tracing_indicatif::indicatif_println;
use tracing_indicatif::span_ext::IndicatifSpanExt;
use tracing_indicatif::style::ProgressStyle;

use crate::ai::Summarizer;
use crate::ai::summary::{CommitSummary, TokenUsage};
use crate::config::ReportConfig;
use crate::git::{CommitRecord, CommitSource};
use crate::io_utils::write_file;
use crate::{AppError, AppResult};

/// Markdown report, built line by line in commit order.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    lines: Vec<String>,
}

impl ReportDocument {
    pub fn new(config: &ReportConfig, commit_count: usize) -> Self {
        let lines = vec![
            "# Git Commit Report".to_string(),
            String::new(),
            format!(
                "**FromDate - ToDate**: {} - {}",
                config.range.start_iso(),
                config.range.end_iso()
            ),
            format!("**Timezone**: {}", config.timezone),
            format!("**Total Commit Count**: {commit_count}"),
            format!("**Repository**: {}", config.repository_label),
            String::new(),
            "## Commits".to_string(),
            String::new(),
        ];
        Self { lines }
    }

    pub fn push_commit(&mut self, commit: &CommitRecord, summary: &CommitSummary) {
        let files = summary
            .affected_files
            .iter()
            .map(|file| format!("- {}", file.file_path))
            .collect::<Vec<_>>();
        self.lines.extend([
            format!("### {} - {}", commit.hash, summary.change_overview),
            String::new(),
            format!("**Commit Message**: {}", commit.message),
            format!("**Author**: {}", commit.author),
            format!("**Date**: {}", commit.date),
            String::new(),
            "#### Change overview".to_string(),
            summary.change_overview.clone(),
            String::new(),
            "#### Main changes".to_string(),
            summary.main_changes.join("\n"),
            String::new(),
            "#### Affected files".to_string(),
            files.join("\n"),
            String::new(),
            "---".to_string(),
            String::new(),
        ]);
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Nothing in range; no file was written.
    NoCommits,
    Written {
        path: PathBuf,
        commits: usize,
        usage: TokenUsage,
    },
}

/// List the commits in range, summarize each one in order and write the report.
///
/// Any failure aborts the run before the output file is touched.
#[tracing::instrument(
    name = "Generating report",
    level = "info",
    skip(source, summarizer, config)
)]
pub async fn generate_report<S, M>(
    source: &S,
    summarizer: &M,
    config: &ReportConfig,
) -> AppResult<ReportOutcome>
where
    S: CommitSource,
    M: Summarizer,
{
    let commits = source.list_commits(&config.range)?;
    if commits.is_empty() {
        info!("No commits between {} and {}", config.range.start_iso(), config.range.end_iso());
        return Ok(ReportOutcome::NoCommits);
    }

    indicatif_println!("Found {} commit(s):", commits.len());
    indicatif_println!("--------------------------------");

    let total = commits.len();
    let mut document = ReportDocument::new(config, total);
    let mut usage = TokenUsage::default();

    let progress = info_span!("Summarizing commits");
    progress.pb_set_style(
        &ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .map_err(|e| AppError::Other(format!("Invalid progress template: {e}")))?,
    );
    progress.pb_set_length(total as u64);

    async {
        for (idx, meta) in commits.iter().enumerate() {
            progress.pb_set_message(&format!("Processing commit: {}/{}", idx + 1, total));
            debug!(
                "Processing {} by {} at {}: {}",
                meta.hash, meta.author, meta.date, meta.message
            );

            let detail = source.commit_detail(&meta.hash)?;
            let response = summarizer.summarize(&detail, config.language).await?;

            document.push_commit(&detail, &response.summary);
            usage += response.usage;
            progress.pb_inc(1);
        }
        Ok::<_, AppError>(())
    }
    .instrument(progress.clone())
    .await?;

    write_file(&config.output, document.render()).await?;

    Ok(ReportOutcome::Written {
        path: config.output.clone(),
        commits: total,
        usage,
    })
}
