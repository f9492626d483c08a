/// Splits an upstream byte stream into newline-terminated lines.
///
/// Chunk boundaries may fall anywhere, including inside a multi-byte UTF-8
/// sequence; incomplete input is held back until the next push.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
    buffer: String,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes as much of `chunk` as forms complete UTF-8. Invalid sequences
    /// become U+FFFD.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();
        loop {
            let (valid, invalid) = match std::str::from_utf8(&self.pending) {
                Ok(_) => (self.pending.len(), None),
                Err(err) => (err.valid_up_to(), Some(err.error_len())),
            };
            out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
            match invalid {
                None => {
                    self.pending.clear();
                    return out;
                }
                // Truncated sequence at the end: wait for more bytes.
                Some(None) => {
                    self.pending.drain(..valid);
                    return out;
                }
                Some(Some(len)) => {
                    out.push(char::REPLACEMENT_CHARACTER);
                    self.pending.drain(..valid + len);
                }
            }
        }
    }

    /// Appends already-decoded text and returns every line it completed.
    pub fn push_str(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);
        let mut lines = Vec::new();

        while let Some(pos) = self.buffer.find('\n') {
            let mut line = self.buffer[..pos].to_string();
            self.buffer.drain(..=pos);

            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }

        lines
    }

    /// Flushes held-back bytes and returns the unterminated tail, if any.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            let rest = String::from_utf8_lossy(&self.pending).to_string();
            self.pending.clear();
            self.buffer.push_str(&rest);
        }
        if self.buffer.is_empty() {
            return None;
        }
        let mut line = std::mem::take(&mut self.buffer);
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_line_is_reassembled() {
        let mut framer = LineFramer::new();
        assert!(framer.push_str("data: {\"val").is_empty());
        let lines = framer.push_str("ue\":\"hi\"}\ndata: x");
        assert_eq!(lines, vec!["data: {\"value\":\"hi\"}".to_string()]);
        assert_eq!(framer.finish(), Some("data: x".to_string()));
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn crlf_is_stripped_and_empty_lines_kept() {
        let mut framer = LineFramer::new();
        let lines = framer.push_str("a\r\n\r\nb\n");
        assert_eq!(lines, vec!["a".to_string(), String::new(), "b".to_string()]);
    }

    #[test]
    fn multibyte_char_split_across_chunks() {
        let mut framer = LineFramer::new();
        let bytes = "héllo\n".as_bytes();
        // 'é' is two bytes; cut between them.
        let first = framer.decode(&bytes[..2]);
        assert_eq!(first, "h");
        let rest = framer.decode(&bytes[2..]);
        let second = framer.push_str(&format!("{first}{rest}"));
        assert_eq!(second, vec!["héllo".to_string()]);
    }

    #[test]
    fn invalid_bytes_become_replacement_chars() {
        let mut framer = LineFramer::new();
        let text = framer.decode(&[b'a', 0xff, b'b']);
        assert_eq!(text, "a\u{fffd}b");
    }
}
