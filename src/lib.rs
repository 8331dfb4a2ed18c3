//! # Agent Chat Stream
//!
//! Client-side core for chatting with a remote agent over a streamed HTTP
//! response.
//!
//! ## Overview
//!
//! The agent service answers a query with a chunked body of `data: {...}`
//! lines. This crate turns that body into a live conversation transcript:
//! - **Reassembly** - UTF-8 decoding that survives characters split across chunks
//! - **Framing** - extraction of complete `data:` lines from a carry-over buffer
//! - **Classification** - mapping each frame to `message_start` / `message` /
//!   generic plus the answer text it carries
//! - **Conversation control** - one in-flight turn at a time, cancellation, and
//!   a watch channel the UI renders from
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use agent_chat_stream::{ChatConfig, ConversationController, HttpChatService};
//!
//! # async fn run() -> agent_chat_stream::Result<()> {
//! let config = ChatConfig::from_env()?;
//! config.validate()?;
//!
//! let service = Arc::new(HttpChatService::new(&config)?);
//! let mut controller = ConversationController::start(service, &config).await?;
//!
//! let outcome = controller.submit("How should I prepare for an interview?").await?;
//! println!("{:?}: {}", outcome, controller.current_answer());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Error types and handling
//! - [`models`] - Wire types for the agent service API
//! - [`provider`] - The `ChatService` seam between controller and transport
//! - [`client`] - HTTP implementation of `ChatService`
//! - [`streaming`] - Byte reassembly, framing and event classification
//! - [`transcript`] - Append-only turn store
//! - [`controller`] - Conversation state machine

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod streaming;
pub mod transcript;
pub mod validation;

pub use client::HttpChatService;
pub use config::ChatConfig;
pub use controller::{
    CancelHandle, ConversationController, ConversationView, Phase, Session, StreamEnd,
    TurnOutcome,
};
pub use error::{ChatError, Result};
pub use provider::ChatService;
pub use transcript::{Role, Transcript, Turn};
