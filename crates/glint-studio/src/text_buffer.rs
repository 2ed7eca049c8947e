/// Most bytes the buffer holds.
pub const TEXT_BUFFER_CAPACITY: usize = 1000;

/// Fixed-capacity ASCII text typed by the user.
#[derive(Debug)]
pub struct TextBuffer {
    bytes: Vec<u8>,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(TEXT_BUFFER_CAPACITY),
        }
    }

    /// Appends the printable ASCII characters of `text`; everything else is ignored.
    pub fn push_str(&mut self, text: &str) {
        for b in text.bytes().filter(|b| (b' '..=b'~').contains(b)) {
            if !self.push(b) {
                break;
            }
        }
    }

    pub fn newline(&mut self) {
        self.push(b'\n');
    }

    pub fn backspace(&mut self) {
        self.bytes.pop();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn push(&mut self, b: u8) -> bool {
        if self.bytes.len() >= TEXT_BUFFER_CAPACITY {
            return false;
        }
        self.bytes.push(b);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_printable_ascii_is_kept() {
        let mut buf = TextBuffer::new();
        buf.push_str("hi\t\u{8}é!");
        assert_eq!(buf.as_bytes(), b"hi!");
    }

    #[test]
    fn backspace_and_newline_edit_the_tail() {
        let mut buf = TextBuffer::new();
        buf.push_str("ab");
        buf.newline();
        buf.push_str("c");
        assert_eq!(buf.as_bytes(), b"ab\nc");

        buf.backspace();
        buf.backspace();
        assert_eq!(buf.as_bytes(), b"ab");

        let mut empty = TextBuffer::new();
        empty.backspace();
        assert!(empty.as_bytes().is_empty());
    }

    #[test]
    fn input_past_capacity_is_dropped() {
        let mut buf = TextBuffer::new();
        buf.push_str(&"x".repeat(TEXT_BUFFER_CAPACITY + 10));
        assert_eq!(buf.as_bytes().len(), TEXT_BUFFER_CAPACITY);

        buf.newline();
        assert_eq!(buf.as_bytes().len(), TEXT_BUFFER_CAPACITY);
        assert_eq!(buf.as_bytes().last(), Some(&b'x'));
    }
}
