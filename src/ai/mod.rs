pub mod prompt;
pub mod summary;

use crate::AppResult;
use crate::cli::Language;
use crate::git::CommitRecord;
use summary::SummaryResponse;

/// Turns one commit into a structured summary.
///
/// Implementations must enforce the `CommitSummary` shape themselves; a
/// response that does not fit is an error, never a partial summary.
#[allow(async_fn_in_trait)]
pub trait Summarizer {
    async fn summarize(
        &self,
        commit: &CommitRecord,
        language: Language,
    ) -> AppResult<SummaryResponse>;
}
