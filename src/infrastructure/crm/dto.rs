use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::entities::{ConversationId, ConversationStatus, User, UserId, UserRole};

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// Error body of the backend. `message` is a string or a list of validation messages.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorResponse {
    #[must_use]
    pub fn summary(&self) -> Option<String> {
        match &self.message {
            Some(Value::String(message)) => Some(message.clone()),
            Some(Value::Array(items)) => {
                let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                (!parts.is_empty()).then(|| parts.join("; "))
            }
            _ => self.error.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignBody {
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: ConversationStatus,
}

#[derive(Debug, Serialize)]
pub struct RoleBody {
    pub role: UserRole,
}

#[derive(Debug, Default, Serialize)]
pub struct StatusQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ConversationStatus>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_summary_variants() {
        let single: ErrorResponse =
            serde_json::from_str(r#"{"statusCode":404,"message":"Conversation not found"}"#)
                .unwrap();
        assert_eq!(single.summary().as_deref(), Some("Conversation not found"));

        let list: ErrorResponse =
            serde_json::from_str(r#"{"message":["content should not be empty","bad phone"]}"#)
                .unwrap();
        assert_eq!(
            list.summary().as_deref(),
            Some("content should not be empty; bad phone")
        );

        let bare: ErrorResponse = serde_json::from_str(r#"{"error":"Forbidden"}"#).unwrap();
        assert_eq!(bare.summary().as_deref(), Some("Forbidden"));
    }

    #[test]
    fn test_login_response_accepts_both_spellings() {
        let user = r#"{"id":1,"email":"a@b.c","fullName":"A"}"#;
        let snake = format!(r#"{{"access_token":"x.y.z","user":{user}}}"#);
        let camel = format!(r#"{{"accessToken":"x.y.z","user":{user}}}"#);

        for body in [snake, camel] {
            let parsed: LoginResponse = serde_json::from_str(&body).unwrap();
            assert_eq!(parsed.access_token, "x.y.z");
        }
    }
}
