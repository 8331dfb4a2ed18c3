use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::models::{
    AppPreview, ConversationId, CreateConversationData, Envelope, QueryRequest, UserRequest,
};
use crate::provider::{ByteStream, ChatService, ServiceFuture};

const STREAM_ACCEPT: &str = "application/json, text/event-stream";

/// `ChatService` over the agent backend's HTTP API
pub struct HttpChatService {
    client: Client,
    base_url: String,
}

impl HttpChatService {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        // No overall timeout: answers stream for as long as the model talks.
        // Stalls are caught by the controller's idle timeout instead.
        let client = Client::builder()
            .connect_timeout(config.stream.connect_timeout())
            .build()
            .map_err(|e| ChatError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&config.server.base_url),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn build_query_request(&self, request: &QueryRequest) -> RequestBuilder {
        self.client
            .post(self.endpoint("v1/chat_query_v2"))
            .header(ACCEPT, STREAM_ACCEPT)
            .json(request)
    }

    fn build_setup_request(&self, path: &str, user_id: &str) -> RequestBuilder {
        self.client.post(self.endpoint(path)).json(&UserRequest {
            user_id: user_id.to_string(),
        })
    }
}

impl ChatService for HttpChatService {
    fn create_conversation(&self, user_id: &str) -> ServiceFuture<ConversationId> {
        let request = self.build_setup_request("create_conversation", user_id);

        Box::pin(async move {
            let data: CreateConversationData = send_setup(request).await?;
            let id = ConversationId::new(data.conversation.app_conversation_id)?;
            info!(conversation_id = %id, "Conversation created");
            Ok(id)
        })
    }

    fn app_preview(&self, user_id: &str) -> ServiceFuture<AppPreview> {
        let request = self.build_setup_request("get_app_config_preview", user_id);
        Box::pin(async move { send_setup(request).await })
    }

    fn send_query(&self, request: QueryRequest) -> ServiceFuture<ByteStream> {
        let builder = self.build_query_request(&request);
        let query_len = request.query.len();

        Box::pin(async move {
            info!(
                conversation_id = %request.conversation_id,
                query_len,
                "Sending streamed query"
            );

            let response = check_status(builder.send().await?).await?;
            debug!(status = %response.status(), "Query accepted");

            let body = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| ChatError::Transport(e.to_string())));
            Ok(Box::pin(body) as ByteStream)
        })
    }

    fn name(&self) -> &str {
        "agent-http"
    }
}

async fn send_setup<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = check_status(request.send().await?).await?;
    let body = response.bytes().await?;
    decode_envelope(&body)
}

fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let envelope: Envelope<T> = serde_json::from_slice(body)?;
    envelope.into_data()
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ChatError::Upstream {
        status: status.as_u16(),
        message: body,
    })
}

fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServerConfig, StreamConfig};

    fn service(base_url: &str) -> HttpChatService {
        let config = ChatConfig {
            server: ServerConfig {
                base_url: base_url.to_string(),
                user_id: "1".to_string(),
            },
            stream: StreamConfig::default(),
        };
        HttpChatService::new(&config).expect("client")
    }

    #[test]
    fn test_endpoint_strips_trailing_slashes() {
        let svc = service("http://192.168.2.225:3000//");
        assert_eq!(
            svc.endpoint("create_conversation"),
            "http://192.168.2.225:3000/api/create_conversation"
        );
        assert_eq!(
            svc.endpoint("/get_app_config_preview"),
            "http://192.168.2.225:3000/api/get_app_config_preview"
        );
    }

    #[test]
    fn test_query_request_targets_stream_endpoint() {
        let svc = service("https://agents.example.com");
        let id = ConversationId::new("conv-1").unwrap();
        let request = svc
            .build_query_request(&QueryRequest::streaming(&id, "hello", "1"))
            .build()
            .expect("request");

        assert_eq!(request.method(), "POST");
        assert_eq!(
            request.url().as_str(),
            "https://agents.example.com/api/v1/chat_query_v2"
        );
        assert_eq!(request.headers()[ACCEPT], STREAM_ACCEPT);

        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(value["Query"], "hello");
        assert_eq!(value["ResponseMode"], "streaming");
    }

    #[test]
    fn test_setup_request_body() {
        let svc = service("http://localhost:3000");
        let request = svc
            .build_setup_request("create_conversation", "7")
            .build()
            .expect("request");

        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, br#"{"UserID":"7"}"#);
    }

    #[test]
    fn test_decode_envelope_invalid_json_is_json_error() {
        let err = decode_envelope::<AppPreview>(b"<html>gateway</html>").unwrap_err();
        assert!(matches!(err, ChatError::JsonError(_)));
    }

    #[test]
    fn test_decode_envelope_wrapped_and_bare() {
        let wrapped = br#"{"code":200,"message":"ok","data":{"Conversation":{"AppConversationID":"c-9"}}}"#;
        let data: CreateConversationData = decode_envelope(wrapped).unwrap();
        assert_eq!(data.conversation.app_conversation_id, "c-9");

        let preview: AppPreview = decode_envelope(br#"{"Name":"Aid"}"#).unwrap();
        assert_eq!(preview.name, "Aid");
    }
}
