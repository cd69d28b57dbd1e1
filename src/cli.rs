use std::fmt::Display;
use std::path::PathBuf;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use clap::builder::styling::{AnsiColor, Color, Style, Styles};
use clap::{Args, Parser, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use tracing::{debug, info, warn};
use tracing_indicatif::indicatif_println;

use crate::ai::summary::OpenAiSummarizer;
use crate::config::ReportConfig;
use crate::git::GitRepository;
use crate::report::{self, ReportOutcome};
use crate::AppResult;

const STYLES: Styles = Styles::styled()
    .header(Style::new().bold())
    .usage(Style::new().bold())
    .error(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red))))
    .literal(
        Style::new()
            .bold()
            .fg_color(Some(Color::Ansi(AnsiColor::Green))),
    )
    .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
    .valid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
    .invalid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightRed))))
    .context(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Magenta))))
    .context_value(
        Style::new()
            .bold()
            .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
    );

/// Long-form CLI description shown in `--help`.
const LONG_ABOUT: &str = "Git Report - Summarize a repository's commits using AI

For every commit in the requested date range this tool collects:
- the commit hash, message, author and date
- the unified diff of every changed file, classified as added, deleted or modified

Each commit is sent to a language model (any OpenAI-compatible endpoint, Gemini by default) \
and the structured summaries are written to a Markdown report.";

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Git Report - Summarize a repository's commits using AI.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = Some(LONG_ABOUT), styles = STYLES)]
pub struct Cli {
    /// From date (YYYY-MM-DD)
    #[arg(short = 'f', long)]
    pub from_date: Option<String>,

    /// To date (YYYY-MM-DD)
    #[arg(short = 't', long)]
    pub to_date: Option<String>,

    /// Timezone (e.g., Asia/Tokyo, UTC, America/New_York)
    ///
    /// If not specified, uses the system timezone.
    #[arg(short = 'z', long)]
    pub timezone: Option<String>,

    /// Path to the git repository directory
    ///
    /// If not specified, uses the current directory.
    #[arg(short = 'r', long)]
    pub repository: Option<PathBuf>,

    /// Output file path for the report (Markdown)
    #[arg(short = 'o', long, default_value = "report.md")]
    pub output: PathBuf,

    /// Language for commit summary generation
    #[arg(short = 'l', long, value_enum, default_value_t = Language::Ja)]
    pub language: Language,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}

/// Language the summaries are written in.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Language {
    /// Japanese
    Ja,
    /// English
    En,
    /// Simplified Chinese
    Cn,
}

impl Display for Language {
    /// Render the language code as accepted on the command line.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Language::Ja => "ja",
            Language::En => "en",
            Language::Cn => "cn",
        };
        write!(f, "{}", s)
    }
}

/// Options for the language model endpoint.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Model used to summarize commits
    #[arg(long, env = "GIT_REPORT_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "GIT_REPORT_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// API key for the language model endpoint
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl ModelArgs {
    pub fn get_client(&self) -> Client<OpenAIConfig> {
        let mut config = OpenAIConfig::default().with_api_base(self.api_base.trim_end_matches('/'));
        match &self.api_key {
            Some(key) => config = config.with_api_key(key),
            None => warn!("No API key configured; requests to {} may be rejected.", self.api_base),
        }
        Client::with_config(config)
    }
}

impl Cli {
    /// Validate the options, then collect, summarize and write the report.
    #[tracing::instrument(name = "Running git report", level = "info", skip(self))]
    pub async fn run(&self) -> AppResult<()> {
        let config = ReportConfig::from_cli(self)?;

        indicatif_println!("--------------------------------");
        indicatif_println!("timezone: {}", config.timezone);
        indicatif_println!("fromDate: {}", config.range.start_iso());
        indicatif_println!("toDate: {}", config.range.end_iso());
        indicatif_println!("language: {}", config.language);
        indicatif_println!("repository: {}", config.repository_label);
        indicatif_println!("output: {}", config.output.display());
        indicatif_println!("--------------------------------");

        let repo = GitRepository::open(config.repository_path())?;
        debug!("Working tree: {:?}", repo.workdir());
        let summarizer = OpenAiSummarizer::new(self.model.get_client(), &self.model.model);
        info!("Summarizing with model {}", self.model.model);

        match report::generate_report(&repo, &summarizer, &config).await? {
            ReportOutcome::NoCommits => {
                indicatif_println!("No commits found in the specified date range.");
            }
            ReportOutcome::Written {
                path,
                commits,
                usage,
            } => {
                info!("Summarized {} commit(s)", commits);
                indicatif_println!("Report generated successfully: {}", path.display());
                indicatif_println!("Total usage: {usage}");
            }
        }
        Ok(())
    }
}
