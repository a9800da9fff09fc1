//! Incremental `text/event-stream` decoder.
//!
//! Bytes arrive in arbitrary chunks; frames are emitted once their terminating
//! blank line has been seen. Comment lines (`: ping`) are dropped.

use dutyboard_core::error::{DutyBoardError, Result};

/// Largest unterminated line or pending frame the decoder will hold.
pub const MAX_PENDING_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event name, `"message"` when the frame had no `event:` field.
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    data_len: usize,
    last_id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every frame it completes.
    ///
    /// Fails once an unterminated line or a pending frame outgrows
    /// [`MAX_PENDING_BYTES`]; the decoder is cleared and the stream should be dropped.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseFrame>> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(rel) = self.buf[start..].iter().position(|b| *b == b'\n') {
            let end = start + rel;
            let raw = &self.buf[start..end];
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            let line = String::from_utf8_lossy(raw).into_owned();
            start = end + 1;
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        self.buf.drain(..start);

        if self.buf.len() > MAX_PENDING_BYTES || self.data_len > MAX_PENDING_BYTES {
            let pending = self.buf.len().max(self.data_len);
            self.reset();
            return Err(DutyBoardError::Transport(format!(
                "event stream sent {pending} bytes without completing a frame"
            )));
        }
        Ok(frames)
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.event = None;
        self.data.clear();
        self.data_len = 0;
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => {
                self.data_len += value.len();
                self.data.push(value.to_string());
            }
            "id" => self.last_id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = self.data.join("\n");
        self.data.clear();
        self.data_len = 0;
        Some(SseFrame {
            event: event.filter(|e| !e.is_empty()).unwrap_or_else(|| "message".to_string()),
            data,
            id: self.last_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: doctor_up").unwrap().is_empty());
        assert!(decoder.feed(b"date\ndata: {\"doctor_id\":").unwrap().is_empty());
        let frames = decoder.feed(b" 7}\n\n").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "doctor_update");
        assert_eq!(frames[0].data, r#"{"doctor_id": 7}"#);
    }

    #[test]
    fn test_heartbeats_and_crlf() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b": ping\r\n\r\nevent: closure_update\r\ndata: {}\r\n\r\n: ping\n\n").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "closure_update");
    }

    #[test]
    fn test_multiline_data_and_default_event() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"id: 3\ndata: a\ndata: b\n\n").unwrap();
        assert_eq!(
            frames,
            vec![SseFrame {
                event: "message".into(),
                data: "a\nb".into(),
                id: Some("3".into()),
            }]
        );
    }

    #[test]
    fn test_unterminated_line_is_capped() {
        let mut decoder = SseDecoder::new();
        let junk = vec![b'x'; MAX_PENDING_BYTES / 2];
        assert!(decoder.feed(b"data: ").unwrap().is_empty());
        assert!(decoder.feed(&junk).unwrap().is_empty());
        assert!(matches!(decoder.feed(&junk), Err(DutyBoardError::Transport(_))));

        // Cleared after the failure; a fresh frame decodes normally.
        let frames = decoder.feed(b"event: closure_update\ndata: {}\n\n").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "closure_update");
    }

    #[test]
    fn test_many_lines_in_one_chunk() {
        let mut decoder = SseDecoder::new();
        let mut chunk = Vec::new();
        for i in 0..2000 {
            chunk.extend_from_slice(format!("event: doctor_update\ndata: {i}\n\n").as_bytes());
        }
        chunk.extend_from_slice(b"data: tail");
        let frames = decoder.feed(&chunk).unwrap();
        assert_eq!(frames.len(), 2000);
        assert_eq!(frames[1999].data, "1999");
        let frames = decoder.feed(b"\n\n").unwrap();
        assert_eq!(frames[0].data, "tail");
    }
}
