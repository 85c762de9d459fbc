//! Newline-delimited record splitter for streamed response bodies.

/// Buffers raw bytes across reads and yields complete, non-blank lines.
///
/// Decoding happens per line, so a multi-byte character or a JSON record cut
/// by a chunk boundary is only decoded once its line is complete.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line = self.buf.drain(..=pos).collect::<Vec<u8>>();
            if let Some(line) = decode_line(&line[..line.len() - 1]) {
                out.push(line);
            }
        }

        out
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        decode_line(&rest)
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    let line = String::from_utf8_lossy(bytes);
    if line.trim().is_empty() {
        None
    } else {
        Some(line.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_drops_blank_lines() {
        let mut d = LineDecoder::new();
        let lines = d.push(b"{\"a\":1}\n\n   \n{\"b\":2}\r\n");
        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}"]);
        assert_eq!(d.finish(), None);
    }

    #[test]
    fn holds_partial_line_until_newline() {
        let mut d = LineDecoder::new();
        assert!(d.push(b"{\"data\":{\"te").is_empty());
        assert_eq!(d.push(b"xt\":\"a\"}}\n"), vec!["{\"data\":{\"text\":\"a\"}}"]);
    }

    #[test]
    fn multibyte_char_across_chunks() {
        let bytes = "{\"t\":\"日本\"}\n".as_bytes();
        let mut d = LineDecoder::new();
        // cut in the middle of the first three-byte character
        assert!(d.push(&bytes[..8]).is_empty());
        assert_eq!(d.push(&bytes[8..]), vec!["{\"t\":\"日本\"}"]);
    }

    #[test]
    fn finish_returns_unterminated_tail() {
        let mut d = LineDecoder::new();
        assert!(d.push(b"{\"x\":true}").is_empty());
        assert_eq!(d.finish().as_deref(), Some("{\"x\":true}"));
        assert_eq!(d.finish(), None);
    }
}
