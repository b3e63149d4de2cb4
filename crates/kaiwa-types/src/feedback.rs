//! Structured payloads returned by the model.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub original: String,
    pub corrected: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kanji: Option<String>,
    pub kana: String,
    pub meaning: String,
}

impl VocabEntry {
    /// Kanji spelling when present, otherwise the kana.
    pub fn headword(&self) -> &str {
        match self.kanji.as_deref() {
            Some(kanji) if !kanji.trim().is_empty() => kanji,
            _ => &self.kana,
        }
    }
}

/// Free-mode reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredFeedback {
    pub reply: String,
    #[serde(default)]
    pub corrections: Vec<Correction>,
    #[serde(default)]
    pub new_vocabulary: Vec<VocabEntry>,
}

/// Scenario-mode verdict.
///
/// `passed` is required: a payload without it does not deserialize and is
/// treated as not yet parseable. When `passed` is false the producer is asked
/// to leave `suggested_translation` and `partner_reply` empty; this is
/// tolerated, not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioFeedback {
    pub passed: bool,
    #[serde(default)]
    pub reply: String,
    #[serde(default)]
    pub suggested_translation: String,
    #[serde(default)]
    pub partner_reply: String,
    #[serde(default)]
    pub corrections: Vec<Correction>,
    #[serde(default)]
    pub new_vocabulary: Vec<VocabEntry>,
}

impl From<ScenarioFeedback> for StructuredFeedback {
    fn from(value: ScenarioFeedback) -> Self {
        Self {
            reply: value.reply,
            corrections: value.corrections,
            new_vocabulary: value.new_vocabulary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_feedback_requires_passed() {
        let missing = serde_json::from_str::<ScenarioFeedback>(r#"{"reply":"ok"}"#);
        assert!(missing.is_err());

        let present: ScenarioFeedback =
            serde_json::from_str(r#"{"passed":false,"reply":"ちょっと違います"}"#).unwrap();
        assert!(!present.passed);
        assert!(present.partner_reply.is_empty());
        assert!(present.corrections.is_empty());
    }

    #[test]
    fn headword_falls_back_to_kana() {
        let with_kanji = VocabEntry {
            kanji: Some("週末".to_string()),
            kana: "しゅうまつ".to_string(),
            meaning: "週末".to_string(),
        };
        let blank_kanji = VocabEntry {
            kanji: Some(String::new()),
            kana: "ひま".to_string(),
            meaning: "有空".to_string(),
        };
        assert_eq!(with_kanji.headword(), "週末");
        assert_eq!(blank_kanji.headword(), "ひま");
    }
}
