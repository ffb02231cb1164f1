//! Summarization prompt construction.

use std::str::FromStr;

use dispatch::{ChatMessage, Prompt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sampling temperature for summaries; low to keep facts stable.
pub const SUMMARY_TEMPERATURE: f32 = 0.3;

/// Upper bound on summary length in tokens.
pub const SUMMARY_MAX_TOKENS: u32 = 500;

/// Language the summary is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "ne")]
    Nepali,
    #[serde(rename = "en")]
    English,
}

impl Language {
    /// ISO 639-1 code.
    pub fn code(self) -> &'static str {
        match self {
            Language::Nepali => "ne",
            Language::English => "en",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            Language::Nepali => {
                "Write the summary in Nepali, using Devanagari script. Keep names, \
                 places, numbers and dates exactly as they appear in the article."
            }
            Language::English => {
                "Write the summary in English. Transliterate Nepali names and places; \
                 keep numbers and dates exactly as they appear in the article."
            }
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported language '{0}' (expected 'ne' or 'en')")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ne" | "nepali" => Ok(Language::Nepali),
            "en" | "english" => Ok(Language::English),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

const SYSTEM_PROMPT: &str = "You are a news editor who summarizes Nepali news articles for a \
social media feed. Summaries are two or three sentences, factual, and neutral. Never add \
information that is not in the article.";

/// Builds the prompt sent to every candidate for one article.
pub fn summarization_prompt(text: &str, title: Option<&str>, language: Language) -> Prompt {
    let mut user = String::new();
    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        user.push_str("Title: ");
        user.push_str(title);
        user.push_str("\n\n");
    }
    user.push_str("Article:\n");
    user.push_str(text.trim());
    user.push_str("\n\n");
    user.push_str(language.instruction());

    Prompt {
        messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)],
        temperature: Some(SUMMARY_TEMPERATURE),
        max_tokens: Some(SUMMARY_MAX_TOKENS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch::Role;

    #[test]
    fn prompt_has_system_then_user_message() {
        let prompt = summarization_prompt("काठमाडौं । आजको मौसम सफा छ।", Some("मौसम"), Language::Nepali);

        let roles: Vec<_> = prompt.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User]);

        let user = &prompt.messages[1].content;
        assert!(user.starts_with("Title: मौसम\n\nArticle:\nकाठमाडौं । आजको मौसम सफा छ।"));
        assert!(user.contains("Devanagari"));
        assert_eq!(prompt.temperature, Some(SUMMARY_TEMPERATURE));
        assert_eq!(prompt.max_tokens, Some(SUMMARY_MAX_TOKENS));
    }

    #[test]
    fn blank_title_is_omitted() {
        let prompt = summarization_prompt("text", Some("  "), Language::English);
        assert!(prompt.messages[1].content.starts_with("Article:\ntext"));
        assert!(prompt.messages[1].content.contains("in English"));
    }

    #[test]
    fn language_parses_codes_and_names() {
        assert_eq!("ne".parse::<Language>().unwrap(), Language::Nepali);
        assert_eq!("English".parse::<Language>().unwrap(), Language::English);
        assert_eq!(
            "hi".parse::<Language>(),
            Err(UnknownLanguage("hi".to_string()))
        );
        assert_eq!(Language::default().to_string(), "ne");
    }
}
