//! Request staging
//!
//! Writes to the creation and subscribe surfaces arrive as raw bytes, usually
//! with a trailing newline (`echo news > .../new_topic`). Staging bounds the
//! input to `max_message_len`, records how many bytes were consumed for the
//! transport acknowledgement, and strips trailing delimiters from the body.
//! Each call stages into its own borrowed slice; nothing is shared.

/// A bounded, delimiter-stripped request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Staged<'a> {
    body: &'a [u8],
    received: usize,
}

impl<'a> Staged<'a> {
    pub fn new(raw: &'a [u8], max_len: usize) -> Self {
        let received = raw.len().min(max_len);
        let mut body = &raw[..received];
        while let [rest @ .., last] = body {
            if matches!(last, b'\n' | b'\r' | b'\0') {
                body = rest;
            } else {
                break;
            }
        }
        Self { body, received }
    }

    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// Bytes acknowledged to the transport, independent of whether the body
    /// is valid.
    pub fn received(&self) -> usize {
        self.received
    }

    pub fn lossy(&self) -> String {
        String::from_utf8_lossy(self.body).into_owned()
    }
}
