use bytes::Bytes;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::models::{AppPreview, ConversationId, QueryRequest};

/// Response body of a streamed query, chunk by chunk
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Future returned by every service call
pub type ServiceFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// Remote chat service the conversation controller talks to
pub trait ChatService: Send + Sync {
    /// Open a new remote conversation for a user
    fn create_conversation(&self, user_id: &str) -> ServiceFuture<ConversationId>;

    /// Fetch the agent's display name and opening message
    fn app_preview(&self, user_id: &str) -> ServiceFuture<AppPreview>;

    /// Send a query and resolve once the service accepted it.
    ///
    /// The returned stream yields the raw response body; a stream error means
    /// the connection failed while the answer was being delivered.
    fn send_query(&self, request: QueryRequest) -> ServiceFuture<ByteStream>;

    /// Get the service name for logging
    fn name(&self) -> &str;
}
