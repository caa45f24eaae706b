// Incremental decoder for `text/event-stream` bodies.
//
// Only `data:` fields are of interest; each data line carries one complete JSON
// chunk. Comment lines, event names and ids are ignored.

const DATA_FIELD: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning the data payloads of every line completed
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(payload) = Self::data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a trailing line that was not newline-terminated
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        Self::data_payload(&line)
    }

    fn data_payload(line: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches(['\r', '\n']);
        let value = line.strip_prefix(DATA_FIELD)?;
        let value = value.strip_prefix(' ').unwrap_or(value);

        if value.trim().is_empty() || value.trim() == DONE_MARKER {
            return None;
        }
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembles_lines_split_across_reads() {
        let mut decoder = SseDecoder::new();

        assert!(decoder.push(b"data: {\"a\":").is_empty());
        let payloads = decoder.push(b"1}\r\n\r\ndata: {\"b\":2}\n");

        assert_eq!(payloads, vec!["{\"a\":1}".to_string(), "{\"b\":2}".to_string()]);
    }

    #[test]
    fn ignores_non_data_fields_and_done_marker() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b": keep-alive\nevent: message\ndata: [DONE]\n\n");
        assert!(payloads.is_empty());
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data:{\"c\":3}").is_empty());
        assert_eq!(decoder.finish(), Some("{\"c\":3}".to_string()));
        assert_eq!(decoder.finish(), None);
    }
}
