use std::fmt::{Display, Formatter};
use std::ops::AddAssign;

use async_openai::Client;
use async_openai::config::Config;
use async_openai::types::{
    ChatCompletionRequestMessageContentPartText, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
    CompletionUsage, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    ResponseFormat, ResponseFormatJsonSchema,
};
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};

use super::Summarizer;
use super::prompt;
use crate::cli::Language;
use crate::git::CommitRecord;
use crate::{AppError, AppResult};

/// # commit_summary
/// Structured summary of a single commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CommitSummary {
    /// Change overview (1-2 line summary of what this commit accomplished based on commit message and changes)
    pub change_overview: String,
    /// Main changes (functional changes listed in bullet points)
    pub main_changes: Vec<String>,
    /// Affected files (concise description of changes to important files)
    pub affected_files: Vec<AffectedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AffectedFile {
    /// File path
    pub file_path: String,
    /// Description of changes to this file
    pub description: String,
}

impl CommitSummary {
    pub fn response_format() -> ResponseFormatJsonSchema {
        ResponseFormatJsonSchema {
            description: Some("Structured summary of a single git commit".to_string()),
            name: "commit_summary".to_string(),
            schema: Some(schema_for!(CommitSummary).as_value().to_owned()),
            strict: None,
        }
    }

    /// Decode a model response, naming the offending path when the shape is off.
    pub fn from_response(s: &str) -> Result<Self, String> {
        trace!("Raw content: {s}");
        let jd = &mut serde_json::Deserializer::from_str(s);
        serde_path_to_error::deserialize(jd).map_err(|e| {
            let path = e.path().to_string();
            format!("response does not match the summary shape at `{path}`: {}", e.inner())
        })
    }

    /// Checks the schema cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.change_overview.trim().is_empty() {
            return Err("response has an empty change overview".to_string());
        }
        if let Some(idx) = self
            .affected_files
            .iter()
            .position(|file| file.file_path.trim().is_empty())
        {
            return Err(format!("affected file #{idx} has an empty path"));
        }
        Ok(())
    }
}

/// Prompt/completion token counts, summed across calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl From<&CompletionUsage> for TokenUsage {
    fn from(usage: &CompletionUsage) -> Self {
        Self {
            prompt_tokens: u64::from(usage.prompt_tokens),
            completion_tokens: u64::from(usage.completion_tokens),
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens += rhs.prompt_tokens;
        self.completion_tokens += rhs.completion_tokens;
    }
}

impl Display for TokenUsage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ promptTokens: {}, completionTokens: {} }}",
            self.prompt_tokens, self.completion_tokens
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResponse {
    pub summary: CommitSummary,
    pub usage: TokenUsage,
}

/// Commit data exactly as the model sees it.
pub fn request_payload(commit: &CommitRecord) -> AppResult<String> {
    Ok(serde_json::to_string(commit)?)
}

fn text_part(text: String) -> ChatCompletionRequestUserMessageContentPart {
    ChatCompletionRequestUserMessageContentPart::Text(ChatCompletionRequestMessageContentPartText {
        text,
    })
}

/// Summarizer backed by any OpenAI-compatible chat completions endpoint.
pub struct OpenAiSummarizer<C: Config> {
    client: Client<C>,
    model: String,
}

impl<C: Config> OpenAiSummarizer<C> {
    pub fn new<S: Into<String>>(client: Client<C>, model: S) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

impl<C: Config> Summarizer for OpenAiSummarizer<C> {
    #[tracing::instrument(
        name = "Summarizing commit",
        level = "debug",
        skip(self, commit),
        fields(hash = %commit.hash)
    )]
    async fn summarize(
        &self,
        commit: &CommitRecord,
        language: Language,
    ) -> AppResult<SummaryResponse> {
        // Instructions first, then the commit data, as two parts of one message.
        let content = ChatCompletionRequestUserMessageContent::Array(vec![
            text_part(prompt::instructions(language)?),
            text_part(request_payload(commit)?),
        ]);
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(vec![
                ChatCompletionRequestUserMessageArgs::default()
                    .content(content)
                    .build()?
                    .into(),
            ])
            .response_format(ResponseFormat::JsonSchema {
                json_schema: CommitSummary::response_format(),
            })
            .build()?;

        let response = self.client.chat().create(request).await?;
        debug!("AI Response: {:?}", response);
        into_summary(response, &commit.hash)
    }
}

/// Pull the typed summary and usage out of a completion. Anything other than a
/// well-formed, valid summary is a `Summarization` error for `hash`.
fn into_summary(
    response: CreateChatCompletionResponse,
    hash: &str,
) -> AppResult<SummaryResponse> {
    let failed = |message: String| AppError::Summarization {
        hash: hash.to_string(),
        message,
    };

    let usage = match response.usage.as_ref() {
        Some(usage) => TokenUsage::from(usage),
        None => {
            warn!("Response for {} reported no token usage; totals will undercount", hash);
            TokenUsage::default()
        }
    };

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| failed("model returned no choices".to_string()))?;
    if let Some(refusal) = choice.message.refusal {
        error!("AI refused prompt: {}", refusal);
        return Err(failed(format!("model refused: {refusal}")));
    }
    let text = choice
        .message
        .content
        .ok_or_else(|| failed("model returned no content".to_string()))?;

    let summary = CommitSummary::from_response(&text).map_err(&failed)?;
    summary.validate().map_err(&failed)?;

    Ok(SummaryResponse { summary, usage })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{FileDiff, FileStatus};

    const VALID: &str = r#"{
        "changeOverview": "Adds a config loader.",
        "mainChanges": ["- Load settings from TOML", "- Validate ports"],
        "affectedFiles": [{"filePath": "src/config.rs", "description": "New loader"}]
    }"#;

    #[test]
    fn parses_well_formed_response() {
        let summary = CommitSummary::from_response(VALID).unwrap();
        assert_eq!(summary.change_overview, "Adds a config loader.");
        assert_eq!(summary.main_changes.len(), 2);
        assert_eq!(summary.affected_files[0].file_path, "src/config.rs");
        assert!(summary.validate().is_ok());
    }

    #[test]
    fn shape_mismatch_names_the_path() {
        let bad = r#"{
            "changeOverview": "x",
            "mainChanges": [],
            "affectedFiles": [{"filePath": "a.rs"}]
        }"#;
        let err = CommitSummary::from_response(bad).unwrap_err();
        assert!(err.contains("affectedFiles[0]"), "{err}");
        assert!(err.contains("description"), "{err}");
    }

    #[test]
    fn unexpected_fields_are_rejected() {
        let bad = r#"{"changeOverview": "x", "mainChanges": [], "affectedFiles": [], "notes": []}"#;
        assert!(CommitSummary::from_response(bad).is_err());
    }

    #[test]
    fn non_json_is_rejected() {
        assert!(CommitSummary::from_response("Sure! Here is your summary.").is_err());
    }

    #[test]
    fn validation_fails_closed() {
        let mut summary = CommitSummary::from_response(VALID).unwrap();
        summary.change_overview = "  ".to_string();
        assert!(summary.validate().is_err());

        let mut summary = CommitSummary::from_response(VALID).unwrap();
        summary.affected_files[0].file_path.clear();
        assert_eq!(
            summary.validate().unwrap_err(),
            "affected file #0 has an empty path"
        );
    }

    #[test]
    fn schema_describes_every_field() {
        let format = CommitSummary::response_format();
        assert_eq!(format.name, "commit_summary");
        let schema = serde_json::to_string(&format.schema.unwrap()).unwrap();
        for field in ["changeOverview", "mainChanges", "affectedFiles", "filePath"] {
            assert!(schema.contains(field), "schema lacks {field}");
        }
    }

    fn completion(
        message: serde_json::Value,
        usage: Option<(u32, u32)>,
    ) -> CreateChatCompletionResponse {
        completion_with_choices(
            serde_json::json!([{ "index": 0, "message": message, "finish_reason": "stop" }]),
            usage,
        )
    }

    fn completion_with_choices(
        choices: serde_json::Value,
        usage: Option<(u32, u32)>,
    ) -> CreateChatCompletionResponse {
        let mut body = serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_704_067_200,
            "model": "gemini-2.5-flash",
            "choices": choices,
        });
        if let Some((prompt, completion)) = usage {
            body["usage"] = serde_json::json!({
                "prompt_tokens": prompt,
                "completion_tokens": completion,
                "total_tokens": prompt + completion,
            });
        }
        serde_json::from_value(body).unwrap()
    }

    fn assistant(content: Option<&str>, refusal: Option<&str>) -> serde_json::Value {
        serde_json::json!({ "role": "assistant", "content": content, "refusal": refusal })
    }

    fn summarization_message(result: AppResult<SummaryResponse>) -> String {
        match result {
            Err(AppError::Summarization { hash, message }) => {
                assert_eq!(hash, "abc123");
                message
            }
            other => panic!("expected a summarization error, got {other:?}"),
        }
    }

    #[test]
    fn completion_yields_summary_and_usage() {
        let response = completion(assistant(Some(VALID), None), Some((321, 45)));
        let result = into_summary(response, "abc123").unwrap();
        assert_eq!(result.summary.change_overview, "Adds a config loader.");
        assert_eq!(
            result.usage,
            TokenUsage {
                prompt_tokens: 321,
                completion_tokens: 45,
            }
        );
    }

    #[test]
    fn missing_usage_counts_as_zero() {
        let response = completion(assistant(Some(VALID), None), None);
        assert_eq!(
            into_summary(response, "abc123").unwrap().usage,
            TokenUsage::default()
        );
    }

    #[test]
    fn refusal_fails_the_commit() {
        let response = completion(assistant(None, Some("I can't help with that")), Some((10, 2)));
        let message = summarization_message(into_summary(response, "abc123"));
        assert!(message.contains("I can't help with that"), "{message}");
    }

    #[test]
    fn empty_choices_fail_the_commit() {
        let response = completion_with_choices(serde_json::json!([]), Some((10, 0)));
        assert_eq!(
            summarization_message(into_summary(response, "abc123")),
            "model returned no choices"
        );
    }

    #[test]
    fn null_content_fails_the_commit() {
        let response = completion(assistant(None, None), Some((10, 0)));
        assert_eq!(
            summarization_message(into_summary(response, "abc123")),
            "model returned no content"
        );
    }

    #[test]
    fn mismatched_shape_fails_the_commit() {
        let response = completion(
            assistant(Some(r#"{"changeOverview": "x", "mainChanges": "one"}"#), None),
            Some((10, 5)),
        );
        let message = summarization_message(into_summary(response, "abc123"));
        assert!(message.contains("mainChanges"), "{message}");
    }

    #[test]
    fn invalid_summary_fails_the_commit() {
        let blank = r#"{"changeOverview": " ", "mainChanges": [], "affectedFiles": []}"#;
        let response = completion(assistant(Some(blank), None), Some((10, 5)));
        assert_eq!(
            summarization_message(into_summary(response, "abc123")),
            "response has an empty change overview"
        );
    }

    #[test]
    fn usage_accumulates_and_prints() {
        let mut total = TokenUsage::default();
        total += TokenUsage {
            prompt_tokens: 120,
            completion_tokens: 30,
        };
        total += TokenUsage {
            prompt_tokens: 80,
            completion_tokens: 12,
        };
        assert_eq!(total.prompt_tokens, 200);
        assert_eq!(total.completion_tokens, 42);
        assert_eq!(
            total.to_string(),
            "{ promptTokens: 200, completionTokens: 42 }"
        );
    }

    #[test]
    fn payload_carries_commit_and_diffs() {
        let commit = CommitRecord {
            hash: "abc123".to_string(),
            message: "Fix parser".to_string(),
            author: "Jo".to_string(),
            date: "2024-01-01 09:00:00 +0900".to_string(),
            diffs: vec![FileDiff {
                file_path: "src/parser.rs".to_string(),
                status: FileStatus::Modified,
                diff: Some("@@ -1 +1 @@\n-a\n+b\n".to_string()),
            }],
        };
        let payload: serde_json::Value =
            serde_json::from_str(&request_payload(&commit).unwrap()).unwrap();
        assert_eq!(payload["hash"], "abc123");
        assert_eq!(payload["message"], "Fix parser");
        assert_eq!(payload["diffs"][0]["filePath"], "src/parser.rs");
        assert_eq!(payload["diffs"][0]["status"], "modified");
        assert_eq!(payload["diffs"][0]["diff"], "@@ -1 +1 @@\n-a\n+b\n");
    }
}
