//! Incremental `text/event-stream` parser.
//!
//! Bytes are buffered until a full line is available, so UTF-8 sequences and
//! fields split across network reads are reassembled before decoding.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// `event:` field; `None` means the default `message` type.
    pub event: Option<String>,
    /// Last `id:` seen on the stream.
    pub id: Option<String>,
    /// All `data:` fields of the event joined with `\n`.
    pub data: String,
}

impl SseEvent {
    /// True for events an `onmessage` listener would receive.
    pub fn is_message(&self) -> bool {
        matches!(self.event.as_deref(), None | Some("message"))
    }
}

#[derive(Debug, Default)]
pub struct SseParser {
    buf: Vec<u8>,
    data: String,
    event: Option<String>,
    last_id: Option<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line = self.buf.drain(..=pos).collect::<Vec<u8>>();
            line.pop();
            if line.ends_with(b"\r") {
                line.pop();
            }

            let line = String::from_utf8_lossy(&line);
            if let Some(ev) = self.process_line(&line) {
                out.push(ev);
            }
        }

        out
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            // comment / keep-alive
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "event" => self.event = Some(value.to_string()),
            "id" => self.last_id = Some(value.to_string()),
            // retry: and unknown fields are ignored.
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }

        let mut data = std::mem::take(&mut self.data);
        if data.ends_with('\n') {
            data.pop();
        }
        Some(SseEvent {
            event,
            id: self.last_id.clone(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_event_on_blank_line() {
        let mut p = SseParser::new();
        assert!(p.push(b"data: {\"a\":1}\n").is_empty());
        let evs = p.push(b"\n");
        assert_eq!(evs.len(), 1);
        assert_eq!(evs[0].data, "{\"a\":1}");
        assert!(evs[0].is_message());
    }

    #[test]
    fn joins_multiline_data_and_handles_crlf() {
        let mut p = SseParser::new();
        let evs = p.push(b"data: first\r\ndata: second\r\n\r\n");
        assert_eq!(evs.len(), 1);
        assert_eq!(evs[0].data, "first\nsecond");
    }

    #[test]
    fn reassembles_split_utf8_and_lines() {
        let payload = "data: {\"text\":\"héllo\"}\n\n".as_bytes();
        // split inside the two-byte 'é'
        let cut = payload.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut p = SseParser::new();
        assert!(p.push(&payload[..cut]).is_empty());
        let evs = p.push(&payload[cut..]);
        assert_eq!(evs[0].data, "{\"text\":\"héllo\"}");
    }

    #[test]
    fn ignores_comments_and_empty_events() {
        let mut p = SseParser::new();
        let evs = p.push(b": keep-alive\n\nretry: 3000\n\n");
        assert!(evs.is_empty());
    }

    #[test]
    fn tracks_event_type_and_id() {
        let mut p = SseParser::new();
        let evs = p.push(b"id: 7\nevent: ping\ndata: x\n\ndata: y\n\n");
        assert_eq!(evs.len(), 2);
        assert_eq!(evs[0].event.as_deref(), Some("ping"));
        assert!(!evs[0].is_message());
        assert_eq!(evs[1].id.as_deref(), Some("7"));
        assert!(evs[1].is_message());
    }
}
