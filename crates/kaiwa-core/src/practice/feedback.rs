//! Side-panel projection of the latest corrections and vocabulary.
//!
//! Read-only with respect to turn advancement: it tracks whatever parsed most
//! recently, finalized or not.

use kaiwa_types::{Correction, MessageId, ScenarioFeedback, StructuredFeedback, VocabEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatestFeedback {
    Free(StructuredFeedback),
    Scenario(ScenarioFeedback),
}

impl LatestFeedback {
    pub fn corrections(&self) -> &[Correction] {
        match self {
            LatestFeedback::Free(f) => &f.corrections,
            LatestFeedback::Scenario(f) => &f.corrections,
        }
    }

    pub fn new_vocabulary(&self) -> &[VocabEntry] {
        match self {
            LatestFeedback::Free(f) => &f.new_vocabulary,
            LatestFeedback::Scenario(f) => &f.new_vocabulary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackView<'a> {
    /// Nothing parsed yet.
    Empty,
    /// Latest payload had no corrections and no vocabulary.
    AllClear,
    Feedback {
        corrections: &'a [Correction],
        vocabulary: &'a [VocabEntry],
        suggested_translation: Option<&'a str>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct FeedbackProjection {
    latest: Option<LatestFeedback>,
    /// Response the latest payload was parsed from.
    source: Option<MessageId>,
}

impl FeedbackProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a parsed payload; the newest arrival always wins.
    pub fn observe(&mut self, source: &MessageId, feedback: LatestFeedback) {
        self.latest = Some(feedback);
        self.source = Some(source.clone());
    }

    /// The latest payload, only if it was parsed from response `id`.
    pub fn latest_for(&self, id: &MessageId) -> Option<&LatestFeedback> {
        self.latest
            .as_ref()
            .filter(|_| self.source.as_ref() == Some(id))
    }

    pub fn view(&self) -> FeedbackView<'_> {
        let Some(latest) = &self.latest else {
            return FeedbackView::Empty;
        };
        let corrections = latest.corrections();
        let vocabulary = latest.new_vocabulary();
        let suggested_translation = match latest {
            LatestFeedback::Scenario(f) if !f.suggested_translation.trim().is_empty() => {
                Some(f.suggested_translation.as_str())
            }
            _ => None,
        };
        if corrections.is_empty() && vocabulary.is_empty() && suggested_translation.is_none() {
            return FeedbackView::AllClear;
        }
        FeedbackView::Feedback {
            corrections,
            vocabulary,
            suggested_translation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free(reply: &str, corrections: usize) -> LatestFeedback {
        LatestFeedback::Free(StructuredFeedback {
            reply: reply.to_string(),
            corrections: (0..corrections)
                .map(|i| Correction {
                    original: format!("o{i}"),
                    corrected: format!("c{i}"),
                    explanation: String::new(),
                })
                .collect(),
            new_vocabulary: Vec::new(),
        })
    }

    #[test]
    fn view_reflects_latest_arrival() {
        let mut projection = FeedbackProjection::new();
        assert_eq!(projection.view(), FeedbackView::Empty);

        projection.observe(&MessageId::from("r1"), free("a", 2));
        assert!(matches!(
            projection.view(),
            FeedbackView::Feedback { corrections, .. } if corrections.len() == 2
        ));

        projection.observe(&MessageId::from("r2"), free("b", 0));
        assert_eq!(projection.view(), FeedbackView::AllClear);
    }

    #[test]
    fn latest_for_matches_only_its_source_response() {
        let mut projection = FeedbackProjection::new();
        let first = MessageId::from("r1");
        assert!(projection.latest_for(&first).is_none());

        projection.observe(&first, free("a", 1));
        assert!(projection.latest_for(&first).is_some());
        assert!(projection.latest_for(&MessageId::from("r2")).is_none());
    }

    #[test]
    fn scenario_view_includes_suggested_translation() {
        let mut projection = FeedbackProjection::new();
        projection.observe(
            &MessageId::from("r1"),
            LatestFeedback::Scenario(ScenarioFeedback {
                passed: true,
                reply: "好".to_string(),
                suggested_translation: "土曜日、暇？".to_string(),
                partner_reply: String::new(),
                corrections: Vec::new(),
                new_vocabulary: Vec::new(),
            }),
        );
        assert_eq!(
            projection.view(),
            FeedbackView::Feedback {
                corrections: &[],
                vocabulary: &[],
                suggested_translation: Some("土曜日、暇？"),
            }
        );
    }
}
