//! Scripted practice scenarios.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the two roles in a scenario script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    A,
    B,
}

impl Speaker {
    pub fn other(self) -> Self {
        match self {
            Speaker::A => Speaker::B,
            Speaker::B => Speaker::A,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Speaker::A => "A",
            Speaker::B => "B",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Speaker {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "A" | "a" => Ok(Speaker::A),
            "B" | "b" => Ok(Speaker::B),
            other => Err(format!("Unknown role: {other} (expected A or B)")),
        }
    }
}

/// Display names of both roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleNames {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
}

/// A line of the script, identified by its position (original index).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioLine {
    pub speaker: Speaker,
    pub text: String,
}

/// A static scenario: loaded once and immutable for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub roles: RoleNames,
    pub lines: Vec<ScenarioLine>,
}

impl Scenario {
    pub fn role_name(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::A => &self.roles.a,
            Speaker::B => &self.roles.b,
        }
    }

    pub fn total_user_lines(&self, role: Speaker) -> usize {
        self.lines.iter().filter(|line| line.speaker == role).count()
    }

    /// The `cursor`-th line spoken by `role`, with its original index.
    ///
    /// Lines of the other role are never returned.
    pub fn user_line(&self, role: Speaker, cursor: usize) -> Option<(usize, &ScenarioLine)> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.speaker == role)
            .nth(cursor)
    }

    /// The partner's line answering the `cursor`-th user line.
    ///
    /// Only the line immediately following the user line counts; when the
    /// user speaks twice in a row there is no partner reply in between.
    pub fn partner_next_line(&self, role: Speaker, cursor: usize) -> Option<&ScenarioLine> {
        let (idx, _) = self.user_line(role, cursor)?;
        self.lines
            .get(idx + 1)
            .filter(|line| line.speaker == role.other())
    }

    /// Full script as plain text, one `A（name）: text` line per entry.
    pub fn script_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| {
                format!(
                    "{}（{}）: {}",
                    line.speaker,
                    self.role_name(line.speaker),
                    line.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(speaker: Speaker, text: &str) -> ScenarioLine {
        ScenarioLine {
            speaker,
            text: text.to_string(),
        }
    }

    fn sample() -> Scenario {
        Scenario {
            id: "cafe".to_string(),
            title: "Cafe".to_string(),
            description: String::new(),
            roles: RoleNames {
                a: "店員".to_string(),
                b: "客".to_string(),
            },
            lines: vec![
                line(Speaker::A, "歡迎光臨"),
                line(Speaker::B, "一杯咖啡"),
                line(Speaker::A, "內用嗎"),
                line(Speaker::A, "還是外帶"),
                line(Speaker::B, "外帶"),
            ],
        }
    }

    #[test]
    fn user_line_skips_other_role() {
        let scenario = sample();
        let a_indices: Vec<usize> = (0..scenario.total_user_lines(Speaker::A))
            .filter_map(|cursor| scenario.user_line(Speaker::A, cursor).map(|(idx, _)| idx))
            .collect();
        assert_eq!(a_indices, vec![0, 2, 3]);

        let (idx, line) = scenario.user_line(Speaker::B, 1).unwrap();
        assert_eq!(idx, 4);
        assert_eq!(line.text, "外帶");
        assert!(scenario.user_line(Speaker::B, 2).is_none());
    }

    #[test]
    fn partner_next_line_only_when_partner_follows() {
        let scenario = sample();
        assert_eq!(
            scenario.partner_next_line(Speaker::A, 0).map(|l| l.text.as_str()),
            Some("一杯咖啡")
        );
        // Consecutive user lines: no partner reply in between.
        assert!(scenario.partner_next_line(Speaker::A, 1).is_none());
        assert_eq!(
            scenario.partner_next_line(Speaker::A, 2).map(|l| l.text.as_str()),
            Some("外帶")
        );
        // Last line of the script.
        assert!(scenario.partner_next_line(Speaker::B, 1).is_none());
    }

    #[test]
    fn script_text_labels_roles() {
        let text = sample().script_text();
        assert!(text.starts_with("A（店員）: 歡迎光臨\nB（客）: 一杯咖啡"));
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn speaker_parses_case_insensitively() {
        assert_eq!("b".parse::<Speaker>().unwrap(), Speaker::B);
        assert!("C".parse::<Speaker>().is_err());
    }
}
