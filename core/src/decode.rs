//! Incremental UTF-8 decoding for byte streams.
//!
//! # Design
//! HTTP chunk boundaries fall anywhere, including inside a multi-byte UTF-8
//! sequence. `Utf8ChunkDecoder` carries the incomplete tail of each chunk
//! into the next `feed` call so characters split across chunks decode to a
//! single correct character instead of replacement glyphs. Genuinely invalid
//! sequences (as opposed to incomplete ones) are reported as errors, never
//! papered over with lossy decoding.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input contained a byte sequence that can never form valid UTF-8.
    #[error("invalid UTF-8 sequence: {0}")]
    Invalid(std::str::Utf8Error),

    /// The stream ended while a multi-byte sequence was still incomplete.
    #[error("stream ended mid UTF-8 sequence")]
    Truncated,
}

/// Stateful UTF-8 decoder that tolerates chunk boundaries splitting
/// multi-byte sequences.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    carry: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next raw chunk, returning the complete text it yields.
    ///
    /// An incomplete multi-byte tail (at most 3 bytes) is withheld and
    /// prepended to the next chunk, so the returned string may be shorter
    /// than the input — or empty when the chunk ends mid-character.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<String, DecodeError> {
        let mut bytes = std::mem::take(&mut self.carry);
        bytes.extend_from_slice(chunk);

        match std::str::from_utf8(&bytes) {
            Ok(text) => Ok(text.to_string()),
            Err(e) => {
                // error_len() is None only for an incomplete sequence at the
                // very end of the input; anything else is a hard error.
                if e.error_len().is_some() {
                    return Err(DecodeError::Invalid(e));
                }
                let valid = e.valid_up_to();
                self.carry = bytes[valid..].to_vec();
                // The prefix up to `valid` was just validated.
                let text = std::str::from_utf8(&bytes[..valid]).unwrap_or_default();
                Ok(text.to_string())
            }
        }
    }

    /// Signal end of stream. Fails if bytes of an unfinished character are
    /// still buffered.
    pub fn finish(&mut self) -> Result<(), DecodeError> {
        if self.carry.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::Truncated)
        }
    }
}
