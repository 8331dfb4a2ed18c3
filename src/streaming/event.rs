use serde_json::Value;

use super::framer::Frame;

/// Kind of a classified frame, taken from its `event` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `message_start`: open a new answer turn
    Start,
    /// `message`: incremental text delivery begins
    MessageBegin,
    /// Any other or missing `event` value
    Generic,
}

impl EventKind {
    fn from_event_name(name: Option<&str>) -> Self {
        match name {
            Some("message_start") => EventKind::Start,
            Some("message") => EventKind::MessageBegin,
            _ => EventKind::Generic,
        }
    }
}

/// A frame mapped to its kind plus the answer text it carries.
///
/// The two are independent on the wire: a `message_start` frame may already
/// carry the first piece of the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub kind: EventKind,
    pub delta: String,
}

impl StreamEvent {
    pub fn is_start(&self) -> bool {
        self.kind == EventKind::Start
    }

    pub fn has_delta(&self) -> bool {
        !self.delta.is_empty()
    }
}

/// Classify a frame, returning `None` when its payload is not a JSON object
pub fn classify(frame: &Frame) -> Option<StreamEvent> {
    let value = match serde_json::from_str::<Value>(&frame.payload) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, payload = %frame.payload, "Dropping malformed frame");
            return None;
        }
    };

    let Value::Object(fields) = value else {
        tracing::warn!(payload = %frame.payload, "Dropping frame with non-object payload");
        return None;
    };

    let kind = EventKind::from_event_name(fields.get("event").and_then(Value::as_str));
    let delta = fields
        .get("answer")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    Some(StreamEvent { kind, delta })
}
