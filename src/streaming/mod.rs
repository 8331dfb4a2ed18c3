pub mod decoder;
pub mod event;
pub mod framer;

pub use decoder::Utf8Reassembler;
pub use event::{EventKind, StreamEvent, classify};
pub use framer::{Frame, FrameExtractor};

use crate::metrics::StreamStats;

/// Full decode pipeline for one response body: bytes → text → frames → events
#[derive(Debug, Default)]
pub struct StreamDecoder {
    text: Utf8Reassembler,
    frames: FrameExtractor,
    stats: StreamStats,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk and return the events it completes, in order
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.stats.chunks += 1;
        self.stats.bytes += chunk.len() as u64;

        let text = self.text.push(chunk);
        let frames = self.frames.push(&text);
        self.classify_all(frames)
    }

    /// Flush both buffers at end of stream
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let text = self.text.finish();
        let mut frames = self.frames.push(&text);
        frames.extend(self.frames.finish());
        self.classify_all(frames)
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    fn classify_all(&mut self, frames: Vec<Frame>) -> Vec<StreamEvent> {
        let mut events = Vec::with_capacity(frames.len());

        for frame in frames {
            self.stats.frames += 1;
            match classify(&frame) {
                Some(event) => {
                    if event.has_delta() {
                        self.stats.deltas += 1;
                    }
                    events.push(event);
                }
                None => self.stats.malformed_frames += 1,
            }
        }

        events
    }
}
