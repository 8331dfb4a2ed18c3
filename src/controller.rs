//! Conversation state machine.
//!
//! One controller owns one remote conversation: its id, its transcript and
//! the lifecycle of the single request that may be in flight. The UI drives it
//! through [`ConversationController::submit`], stops a stream through a
//! [`CancelHandle`], and renders from [`ConversationController::subscribe`].

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::metrics::{ControllerMetrics, MetricsSnapshot, StreamStats};
use crate::models::{AppPreview, ConversationId, QueryRequest};
use crate::provider::{ByteStream, ChatService};
use crate::streaming::{EventKind, StreamDecoder, StreamEvent};
use crate::transcript::{Transcript, Turn};
use crate::validation::validate_query;

/// Request lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Query submitted, waiting for the service to accept it
    Sending,
    /// Response body is being read
    Streaming,
}

/// Everything the presentation layer needs to render the conversation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationView {
    pub transcript: Vec<Turn>,
    pub current_answer: String,
    pub in_flight: bool,
    pub phase: Phase,
    pub error: Option<String>,
}

/// How a submitted turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Cancelled,
    Failed(String),
    /// Another turn was in flight; nothing changed
    Busy,
}

/// Why a stream stopped
#[derive(Debug)]
pub enum StreamEnd {
    Completed,
    Cancelled,
    Failed(ChatError),
}

/// Data fixed at conversation setup
#[derive(Debug, Clone)]
pub struct Session {
    pub conversation_id: ConversationId,
    pub user_id: String,
    pub preview: AppPreview,
}

/// Cloneable handle that stops the in-flight stream from another task
#[derive(Clone, Default)]
pub struct CancelHandle {
    slot: Arc<ArcSwapOption<CancellationToken>>,
}

impl CancelHandle {
    /// Request cancellation of the current turn.
    ///
    /// Returns `false` when nothing is in flight or cancellation was already
    /// requested, in which case nothing changes.
    pub fn cancel(&self) -> bool {
        match self.slot.load_full() {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.slot
            .load_full()
            .is_some_and(|token| !token.is_cancelled())
    }

    fn arm(&self) {
        self.slot.store(Some(Arc::new(CancellationToken::new())));
    }

    fn release(&self) {
        self.slot.store(None);
    }

    fn current(&self) -> CancellationToken {
        self.slot
            .load_full()
            .map(|token| (*token).clone())
            .unwrap_or_default()
    }
}

pub struct ConversationController {
    service: Arc<dyn ChatService>,
    session: Session,
    idle_timeout: Option<Duration>,
    transcript: Transcript,
    phase: Phase,
    /// Answer text of the current stream; holds deltas that arrive before
    /// `message_start` until an answer turn opens
    current_answer: String,
    error: Option<String>,
    cancel: CancelHandle,
    view: watch::Sender<ConversationView>,
    metrics: ControllerMetrics,
}

impl ConversationController {
    /// Create the remote conversation and fetch the agent preview.
    ///
    /// Both calls run concurrently; either failing is a setup error and no
    /// controller is returned.
    pub async fn start(service: Arc<dyn ChatService>, config: &ChatConfig) -> Result<Self> {
        let user_id = config.server.user_id.clone();

        let (conversation_id, preview) = futures::try_join!(
            service.create_conversation(&user_id),
            service.app_preview(&user_id)
        )
        .map_err(|e| ChatError::Setup(e.to_string()))?;

        info!(
            service = service.name(),
            conversation_id = %conversation_id,
            agent = %preview.name,
            "Conversation ready"
        );

        let session = Session {
            conversation_id,
            user_id,
            preview,
        };
        Ok(Self::with_session(
            service,
            session,
            config.stream.idle_timeout(),
        ))
    }

    /// Build a controller for an already established session
    pub fn with_session(
        service: Arc<dyn ChatService>,
        session: Session,
        idle_timeout: Option<Duration>,
    ) -> Self {
        let (view, _) = watch::channel(ConversationView::default());
        Self {
            service,
            session,
            idle_timeout,
            transcript: Transcript::new(),
            phase: Phase::Idle,
            current_answer: String::new(),
            error: None,
            cancel: CancelHandle::default(),
            view,
            metrics: ControllerMetrics::new(),
        }
    }

    /// Submit a user turn and stream the answer to completion.
    ///
    /// Empty input is rejected before any network activity. Transport failures
    /// and cancellation are reported through the outcome, never as `Err`.
    pub async fn submit(&mut self, input: &str) -> Result<TurnOutcome> {
        let Some(request) = self.begin_turn(input)? else {
            return Ok(TurnOutcome::Busy);
        };

        let token = self.cancel.current();
        let mut decoder = StreamDecoder::new();
        let turn_id = Uuid::new_v4();
        debug!(%turn_id, "Turn started");

        let end = self.drive(request, &token, &mut decoder).await;
        let stats = decoder.stats();
        debug!(%turn_id, %stats, "Turn stream closed");

        Ok(self.finish(end, stats).unwrap_or(TurnOutcome::Busy))
    }

    async fn drive(
        &mut self,
        request: QueryRequest,
        token: &CancellationToken,
        decoder: &mut StreamDecoder,
    ) -> StreamEnd {
        let accepted = tokio::select! {
            biased;
            _ = token.cancelled() => return StreamEnd::Cancelled,
            result = with_idle_timeout(self.idle_timeout, self.service.send_query(request)) => result,
        };

        let mut body: ByteStream = match accepted.and_then(|r| r) {
            Ok(body) => body,
            Err(e) => return StreamEnd::Failed(e),
        };
        self.stream_opened();

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return StreamEnd::Cancelled,
                next = next_chunk(&mut body, self.idle_timeout) => next,
            };

            match next {
                Ok(Some(chunk)) => {
                    for event in decoder.feed(&chunk) {
                        self.apply(&event);
                    }
                }
                Ok(None) => {
                    self.flush(decoder);
                    return StreamEnd::Completed;
                }
                Err(e) => {
                    // Frames already received still belong to the partial answer
                    self.flush(decoder);
                    return StreamEnd::Failed(e);
                }
            }
        }
    }

    fn flush(&mut self, decoder: &mut StreamDecoder) {
        for event in decoder.finish() {
            self.apply(&event);
        }
    }

    /// `Idle → Sending`: record the user turn and build the query.
    ///
    /// Returns `Ok(None)` without touching any state when a turn is already in
    /// flight.
    pub fn begin_turn(&mut self, input: &str) -> Result<Option<QueryRequest>> {
        if self.phase != Phase::Idle {
            self.metrics.record_rejected();
            debug!(phase = ?self.phase, "Ignoring submit while a turn is in flight");
            return Ok(None);
        }

        let query = validate_query(input)?;

        self.transcript.append(Turn::ask(query));
        self.phase = Phase::Sending;
        self.current_answer.clear();
        self.error = None;
        self.cancel.arm();
        self.publish();

        Ok(Some(QueryRequest::streaming(
            &self.session.conversation_id,
            query,
            &self.session.user_id,
        )))
    }

    /// `Sending → Streaming`: the service accepted the query
    pub fn stream_opened(&mut self) -> bool {
        if self.phase != Phase::Sending {
            return false;
        }
        self.phase = Phase::Streaming;
        self.publish();
        true
    }

    /// Apply one classified event to the transcript.
    ///
    /// Returns whether anything visible changed.
    pub fn apply(&mut self, event: &StreamEvent) -> bool {
        if self.phase != Phase::Streaming {
            debug!(kind = ?event.kind, "Ignoring event outside of a stream");
            return false;
        }

        let mut changed = false;

        match event.kind {
            EventKind::Start => {
                let initial = if self.transcript.has_open_answer() {
                    debug!("message_start while an answer is open, starting a new answer");
                    String::new()
                } else {
                    std::mem::take(&mut self.current_answer)
                };
                self.transcript.append(Turn::answer(initial.clone()));
                self.current_answer = initial;
                changed = true;
            }
            EventKind::MessageBegin => {
                debug!("Answer text delivery started");
            }
            EventKind::Generic => {}
        }

        if event.has_delta() {
            self.current_answer.push_str(&event.delta);
            if self.transcript.append_to_last(&event.delta).is_none() {
                debug!(
                    size = event.delta.len(),
                    "Buffering delta until message_start"
                );
            }
            changed = true;
        }

        if changed {
            self.publish();
        }
        changed
    }

    /// `Sending | Streaming → Idle`: freeze the answer and release the stream.
    ///
    /// Returns `None` if no turn was in flight.
    pub fn finish(&mut self, end: StreamEnd, stats: StreamStats) -> Option<TurnOutcome> {
        if self.phase == Phase::Idle {
            return None;
        }

        if self.transcript.freeze().is_none() && !self.current_answer.is_empty() {
            warn!(
                size = self.current_answer.len(),
                "Stream ended without message_start, answer text dropped"
            );
        }

        self.cancel.release();
        self.phase = Phase::Idle;

        let outcome = match end {
            StreamEnd::Completed => {
                self.metrics.record_completed(&stats);
                info!(%stats, "Answer completed");
                TurnOutcome::Completed
            }
            StreamEnd::Cancelled => {
                self.metrics.record_cancelled(&stats);
                info!(%stats, "Answer cancelled");
                TurnOutcome::Cancelled
            }
            StreamEnd::Failed(e) => {
                self.metrics.record_failed(&stats);
                warn!(error = %e, %stats, "Answer failed");
                let message = e.to_string();
                self.error = Some(message.clone());
                TurnOutcome::Failed(message)
            }
        };

        self.publish();
        Some(outcome)
    }

    /// Cancel the in-flight turn, if any
    pub fn cancel(&self) -> bool {
        self.cancel.cancel()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversationView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> ConversationView {
        ConversationView {
            transcript: self.transcript.snapshot(),
            current_answer: self.current_answer.clone(),
            in_flight: self.is_in_flight(),
            phase: self.phase,
            error: self.error.clone(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_in_flight(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn current_answer(&self) -> &str {
        &self.current_answer
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn publish(&self) {
        self.view.send_replace(self.view());
    }
}

async fn with_idle_timeout<F: std::future::Future>(
    limit: Option<Duration>,
    future: F,
) -> Result<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| ChatError::StreamStalled(limit)),
        None => Ok(future.await),
    }
}

async fn next_chunk(body: &mut ByteStream, idle_timeout: Option<Duration>) -> Result<Option<Bytes>> {
    with_idle_timeout(idle_timeout, body.next()).await?.transpose()
}
