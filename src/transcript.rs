use serde::Serialize;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Ask,
    Answer,
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn ask(text: impl Into<String>) -> Self {
        Self {
            role: Role::Ask,
            text: text.into(),
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            role: Role::Answer,
            text: text.into(),
        }
    }
}

/// Append-only conversation transcript.
///
/// Turns are never removed or reordered. Only the last turn can grow, and only
/// while it is the open answer turn.
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
    /// Index of the answer turn currently receiving deltas
    open: Option<usize>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn, freezing any open answer first.
    ///
    /// An appended answer turn becomes the open turn.
    pub fn append(&mut self, turn: Turn) -> usize {
        self.freeze();
        let index = self.turns.len();
        if turn.role == Role::Answer {
            self.open = Some(index);
        }
        self.turns.push(turn);
        index
    }

    /// Append a delta to the open answer turn.
    ///
    /// Returns the new length of the answer text, or `None` when no answer is
    /// open and the delta was not applied.
    pub fn append_to_last(&mut self, delta: &str) -> Option<usize> {
        let index = self.open?;
        if index + 1 != self.turns.len() {
            return None;
        }

        let turn = &mut self.turns[index];
        turn.text.push_str(delta);
        Some(turn.text.len())
    }

    /// Close the open answer turn; its text no longer changes
    pub fn freeze(&mut self) -> Option<&Turn> {
        let index = self.open.take()?;
        self.turns.get(index)
    }

    pub fn open_answer(&self) -> Option<&Turn> {
        self.open.and_then(|index| self.turns.get(index))
    }

    pub fn has_open_answer(&self) -> bool {
        self.open.is_some()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Owned copy of all turns for rendering
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_answer_opens_it() {
        let mut transcript = Transcript::new();
        transcript.append(Turn::ask("What is a closure?"));
        assert!(!transcript.has_open_answer());

        let idx = transcript.append(Turn::answer(""));
        assert_eq!(idx, 1);
        assert!(transcript.has_open_answer());

        assert_eq!(transcript.append_to_last("A closure"), Some(9));
        assert_eq!(transcript.append_to_last(" captures."), Some(19));
        assert_eq!(transcript.last().unwrap().text, "A closure captures.");
    }

    #[test]
    fn test_delta_without_open_answer_is_rejected() {
        let mut transcript = Transcript::new();
        assert_eq!(transcript.append_to_last("lost"), None);

        transcript.append(Turn::ask("question"));
        assert_eq!(transcript.append_to_last("lost"), None);
        assert_eq!(transcript.last().unwrap().text, "question");
    }

    #[test]
    fn test_frozen_answer_does_not_grow() {
        let mut transcript = Transcript::new();
        transcript.append(Turn::answer("partial"));

        let frozen = transcript.freeze().cloned();
        assert_eq!(frozen, Some(Turn::answer("partial")));
        assert!(transcript.freeze().is_none());

        assert_eq!(transcript.append_to_last(" more"), None);
        assert_eq!(transcript.snapshot(), vec![Turn::answer("partial")]);
    }

    #[test]
    fn test_appending_turn_freezes_open_answer() {
        let mut transcript = Transcript::new();
        transcript.append(Turn::answer("first"));
        transcript.append(Turn::ask("next question"));

        assert!(!transcript.has_open_answer());
        assert_eq!(transcript.append_to_last("x"), None);
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(Turn::ask("hi")).unwrap();
        assert_eq!(json["role"], "ask");
        assert_eq!(json["text"], "hi");
    }
}
