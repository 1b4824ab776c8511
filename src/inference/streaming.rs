//! Token stream handling
//!
//! Folding engine fragments into a single completion, and reassembling UTF-8
//! text from raw token bytes.

use crate::inference::engine::{EngineError, TokenStream};

/// Concatenate every fragment of `stream`
///
/// The first error stops the fold and the partial text is dropped; the
/// stream is not polled again after it fails.
pub fn collect_stream(mut stream: TokenStream<'_>) -> Result<String, EngineError> {
    stream.try_fold(String::new(), |mut text, fragment| {
        text.push_str(&fragment?);
        Ok(text)
    })
}

/// Buffers token bytes until they form complete UTF-8 characters
///
/// A single token may carry part of a multi-byte character, so bytes are held
/// back until the character completes. Invalid sequences are replaced with
/// U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Assembler {
    pending: Vec<u8>,
}

impl Utf8Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return whatever text is complete
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            // incomplete trailing character
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush bytes left at the end of the stream
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}
