use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

/// Identifier of the remote conversation session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ChatError::Setup("empty conversation id".to_string()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of the setup calls
#[derive(Debug, Clone, Serialize)]
pub struct UserRequest {
    #[serde(rename = "UserID")]
    pub user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Streaming,
}

/// Body of a streamed chat query
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    #[serde(rename = "AppConversationID")]
    pub conversation_id: String,
    #[serde(rename = "Query")]
    pub query: String,
    #[serde(rename = "UserID")]
    pub user_id: String,
    #[serde(rename = "ResponseMode")]
    pub response_mode: ResponseMode,
    #[serde(rename = "QueryExtends")]
    pub query_extends: serde_json::Map<String, serde_json::Value>,
}

impl QueryRequest {
    pub fn streaming(conversation_id: &ConversationId, query: &str, user_id: &str) -> Self {
        Self {
            conversation_id: conversation_id.as_str().to_string(),
            query: query.to_string(),
            user_id: user_id.to_string(),
            response_mode: ResponseMode::Streaming,
            query_extends: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateConversationData {
    #[serde(rename = "Conversation")]
    pub conversation: ConversationInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationInfo {
    #[serde(rename = "AppConversationID")]
    pub app_conversation_id: String,
}

/// Agent name and greeting shown before the first turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppPreview {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "OpenMessage", default)]
    pub opening_message: String,
}

/// Setup responses arrive either wrapped as `{code, message, data}` or bare
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped {
        code: i64,
        #[serde(default)]
        message: Option<String>,
        data: Option<T>,
    },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_data(self) -> Result<T> {
        match self {
            Envelope::Bare(data) => Ok(data),
            Envelope::Wrapped {
                code,
                message,
                data,
            } => {
                if !(200..300).contains(&code) {
                    return Err(ChatError::Upstream {
                        status: u16::try_from(code).unwrap_or(0),
                        message: message.unwrap_or_else(|| "request failed".to_string()),
                    });
                }
                data.ok_or_else(|| ChatError::Upstream {
                    status: u16::try_from(code).unwrap_or(0),
                    message: "response envelope has no data".to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_request_wire_shape() {
        let id = ConversationId::new("conv-123").unwrap();
        let req = QueryRequest::streaming(&id, "How do I prepare?", "1");
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(
            value,
            json!({
                "AppConversationID": "conv-123",
                "Query": "How do I prepare?",
                "UserID": "1",
                "ResponseMode": "streaming",
                "QueryExtends": {}
            })
        );
    }

    #[test]
    fn test_wrapped_envelope_success() {
        let body = r#"{"code":200,"message":"ok","data":{"Conversation":{"AppConversationID":"abc"}}}"#;
        let envelope: Envelope<CreateConversationData> = serde_json::from_str(body).unwrap();
        let data = envelope.into_data().unwrap();
        assert_eq!(data.conversation.app_conversation_id, "abc");
    }

    #[test]
    fn test_bare_envelope() {
        let body = r#"{"Name":"Interview Aid","OpenMessage":"Ask me anything"}"#;
        let envelope: Envelope<AppPreview> = serde_json::from_str(body).unwrap();
        let preview = envelope.into_data().unwrap();
        assert_eq!(preview.name, "Interview Aid");
        assert_eq!(preview.opening_message, "Ask me anything");
    }

    #[test]
    fn test_wrapped_envelope_error_code() {
        let body = r#"{"code":500,"message":"database unavailable","data":null}"#;
        let envelope: Envelope<AppPreview> = serde_json::from_str(body).unwrap();
        let err = envelope.into_data().unwrap_err();
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("database unavailable"));
    }

    #[test]
    fn test_empty_conversation_id_rejected() {
        assert!(ConversationId::new("  ").is_err());
        assert_eq!(ConversationId::new("x").unwrap().to_string(), "x");
    }
}
