use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

static SPECIAL_TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?s>|<pad>|<unk>").unwrap());

static MULTIPLE_NEWLINES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Cleans generated text by removing model artefacts and an echoed task prefix
pub fn clean_refined_text(response: &str, instruction_prefix: &str) -> String {
    let mut cleaned = THINK_TAG_PATTERN.replace_all(response, "").to_string();

    cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "").to_string();

    // Sequence-to-sequence models leak padding and end-of-sequence tokens
    cleaned = SPECIAL_TOKEN_PATTERN.replace_all(&cleaned, "").to_string();

    cleaned = cleaned.trim().to_string();

    let prefix = instruction_prefix.trim();
    if !prefix.is_empty() {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            cleaned = rest.trim_start().to_string();
        }
    }

    MULTIPLE_NEWLINES_PATTERN
        .replace_all(&cleaned, "\n\n")
        .to_string()
}
