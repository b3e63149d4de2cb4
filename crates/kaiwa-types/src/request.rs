//! Request shapes sent to the model transport.

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::scenario::Speaker;

/// Out-of-band scenario parameters for one turn.
///
/// Passed explicitly into the send call alongside the model-facing messages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScenarioParams {
    pub current_line: Option<String>,
    pub user_role: Option<Speaker>,
    pub scenario_context: Option<String>,
    pub partner_next_line: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Free,
    Scenario,
}

/// `{ messages, currentLine?, userRole?, scenarioContext?, partnerNextLine? }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeRequest {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_role: Option<Speaker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_next_line: Option<String>,
}

impl PracticeRequest {
    pub fn free(messages: Vec<Message>) -> Self {
        Self {
            messages,
            current_line: None,
            user_role: None,
            scenario_context: None,
            partner_next_line: None,
        }
    }

    pub fn scenario(messages: Vec<Message>, params: ScenarioParams) -> Self {
        Self {
            messages,
            current_line: params.current_line,
            user_role: params.user_role,
            scenario_context: params.scenario_context,
            partner_next_line: params.partner_next_line,
        }
    }

    /// A request carrying a role or a current line is a scenario request.
    pub fn kind(&self) -> RequestKind {
        if self.user_role.is_some() || self.current_line.is_some() {
            RequestKind::Scenario
        } else {
            RequestKind::Free
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageId, Role};

    #[test]
    fn scenario_request_uses_camel_case_and_skips_missing_fields() {
        let request = PracticeRequest::scenario(
            vec![Message::with_id(MessageId::from("u1"), Role::User, "はい")],
            ScenarioParams {
                current_line: Some("好".to_string()),
                user_role: Some(Speaker::B),
                scenario_context: None,
                partner_next_line: None,
            },
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["currentLine"], "好");
        assert_eq!(json["userRole"], "B");
        assert!(json.get("scenarioContext").is_none());
        assert!(json.get("partnerNextLine").is_none());
        assert_eq!(request.kind(), RequestKind::Scenario);
    }

    #[test]
    fn free_request_has_only_messages() {
        let request = PracticeRequest::free(vec![]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({ "messages": [] }));
        assert_eq!(request.kind(), RequestKind::Free);
    }
}
