//! Read-only script preview with per-line status.

use kaiwa_types::{Scenario, Speaker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Past,
    Active,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewLine {
    pub index: usize,
    pub speaker: Speaker,
    pub speaker_name: String,
    pub text: String,
    pub is_mine: bool,
    pub status: LineStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioPreview {
    pub title: String,
    pub lines: Vec<PreviewLine>,
}

impl ScenarioPreview {
    /// Lines before the current user line are past; everything is past once completed.
    pub fn build(scenario: &Scenario, role: Speaker, cursor: usize, completed: bool) -> Self {
        let active = if completed {
            None
        } else {
            scenario.user_line(role, cursor).map(|(idx, _)| idx)
        };
        let lines = scenario
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let status = match active {
                    None => LineStatus::Past,
                    Some(active) if index < active => LineStatus::Past,
                    Some(active) if index == active => LineStatus::Active,
                    Some(_) => LineStatus::Upcoming,
                };
                PreviewLine {
                    index,
                    speaker: line.speaker,
                    speaker_name: scenario.role_name(line.speaker).to_string(),
                    text: line.text.clone(),
                    is_mine: line.speaker == role,
                    status,
                }
            })
            .collect();
        Self {
            title: scenario.title.clone(),
            lines,
        }
    }

    pub fn active_line(&self) -> Option<&PreviewLine> {
        self.lines
            .iter()
            .find(|line| line.status == LineStatus::Active)
    }
}
