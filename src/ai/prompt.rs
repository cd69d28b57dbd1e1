use std::io::Cursor;

use git_report_include_zstd::include_zstd;
use tracing::trace;

use crate::cli::Language;
use crate::{AppError, AppResult};

static JA_PROMPT: &[u8] = include_zstd!("prompts/ja.md");
static EN_PROMPT: &[u8] = include_zstd!("prompts/en.md");
static CN_PROMPT: &[u8] = include_zstd!("prompts/cn.md");

impl Language {
    fn compressed_prompt(&self) -> &'static [u8] {
        match self {
            Language::Ja => JA_PROMPT,
            Language::En => EN_PROMPT,
            Language::Cn => CN_PROMPT,
        }
    }
}

/// Instruction template sent ahead of the commit data.
#[tracing::instrument(level = "trace")]
pub fn instructions(language: Language) -> AppResult<String> {
    let bytes = zstd::decode_all(Cursor::new(language.compressed_prompt()))?;
    let prompt = String::from_utf8(bytes)
        .map_err(|e| AppError::Other(format!("Prompt for {language} is not UTF-8: {e}")))?;
    trace!("Loaded {} byte prompt for {}", prompt.len(), language);
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_language_has_a_prompt_naming_the_fields() {
        for language in [Language::Ja, Language::En, Language::Cn] {
            let prompt = instructions(language).unwrap();
            for field in ["changeOverview", "mainChanges", "affectedFiles"] {
                assert!(prompt.contains(field), "{language} prompt lacks {field}");
            }
        }
    }

    #[test]
    fn prompts_differ_per_language() {
        let ja = instructions(Language::Ja).unwrap();
        let en = instructions(Language::En).unwrap();
        let cn = instructions(Language::Cn).unwrap();
        assert!(en.contains("English"));
        assert_ne!(ja, en);
        assert_ne!(en, cn);
        assert_ne!(ja, cn);
    }
}
