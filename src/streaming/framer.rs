const DATA_PREFIX: &str = "data:";

/// One complete `data: {...}` line, holding the JSON payload text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: String,
}

/// Extracts `data:` frames from decoded stream text.
///
/// Text is kept in a carry-over buffer that always starts at a line boundary.
/// Each push only scans the newly appended text for line terminators, so total
/// work stays linear in the size of the stream.
#[derive(Debug, Default)]
pub struct FrameExtractor {
    pending: String,
    scanned: usize,
}

impl FrameExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append decoded text and drain every frame completed by it.
    ///
    /// Lines end at `\n`, `\r\n` or a lone `\r`. A `\r` at the very end of
    /// the buffer is held until the next push shows whether `\n` follows.
    pub fn push(&mut self, text: &str) -> Vec<Frame> {
        self.pending.push_str(text);

        let mut frames = Vec::new();
        let mut line_start = 0;
        let mut cursor = self.scanned;

        while let Some(offset) = self.pending[cursor..].find(['\r', '\n']) {
            let line_end = cursor + offset;
            let bytes = self.pending.as_bytes();
            let next = match (bytes[line_end], bytes.get(line_end + 1)) {
                (b'\r', Some(b'\n')) => line_end + 2,
                (b'\r', None) => break,
                _ => line_end + 1,
            };

            if let Some(frame) = take_line(&self.pending[line_start..line_end]) {
                frames.push(frame);
            }

            line_start = next;
            cursor = next;
        }

        if line_start > 0 {
            self.pending.drain(..line_start);
        }
        // Rescan a held `\r` once more text arrives
        self.scanned = self.pending.len() - usize::from(self.pending.ends_with('\r'));

        frames
    }

    /// Drain the unterminated tail at end of stream.
    ///
    /// A tail that is itself a whole `data: {...}` line still counts as a
    /// frame; any other leftover text is discarded.
    pub fn finish(&mut self) -> Option<Frame> {
        let tail = std::mem::take(&mut self.pending);
        self.scanned = 0;

        let frame = parse_frame_line(&tail);
        if frame.is_none() && !tail.trim().is_empty() {
            tracing::debug!(
                size = tail.len(),
                "Discarding incomplete frame at end of stream"
            );
        }
        frame
    }

    /// Size of the retained partial line
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn take_line(line: &str) -> Option<Frame> {
    let frame = parse_frame_line(line);
    if frame.is_none() && !line.trim().is_empty() {
        tracing::debug!(line = %line, "Skipping non-frame line");
    }
    frame
}

fn parse_frame_line(line: &str) -> Option<Frame> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();

    if payload.starts_with('{') && payload.ends_with('}') {
        Some(Frame {
            payload: payload.to_string(),
        })
    } else {
        None
    }
}
