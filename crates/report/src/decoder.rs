//! Scan decoders - interchangeable strategies that turn a frame into raw text
//!
//! Decoders run in registration order; the first one producing a non-blank
//! value wins. The rest of the flow never learns which one ran.

use std::sync::Arc;
use thiserror::Error;

/// Input handed to decoders: a captured image and/or text typed by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub image: Option<Vec<u8>>,
    pub manual_text: Option<String>,
}

impl Frame {
    pub fn image(bytes: Vec<u8>) -> Self {
        Self {
            image: Some(bytes),
            manual_text: None,
        }
    }

    pub fn manual(text: impl Into<String>) -> Self {
        Self {
            image: None,
            manual_text: Some(text.into()),
        }
    }
}

/// A decoding strategy
pub trait ScanDecoder: Send + Sync {
    fn name(&self) -> &str;

    /// `None` when this strategy cannot read the frame
    fn try_decode(&self, frame: &Frame) -> Option<String>;
}

/// Uses whatever the user typed
pub struct ManualEntryDecoder;

impl ScanDecoder for ManualEntryDecoder {
    fn name(&self) -> &str {
        "manual_entry"
    }

    fn try_decode(&self, frame: &Frame) -> Option<String> {
        frame.manual_text.clone()
    }
}

/// Adapts a closure, e.g. a binding to an image decoding library
pub struct FnDecoder<F> {
    name: String,
    decode: F,
}

impl<F> FnDecoder<F>
where
    F: Fn(&Frame) -> Option<String> + Send + Sync,
{
    pub fn new(name: impl Into<String>, decode: F) -> Self {
        Self {
            name: name.into(),
            decode,
        }
    }
}

impl<F> ScanDecoder for FnDecoder<F>
where
    F: Fn(&Frame) -> Option<String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn try_decode(&self, frame: &Frame) -> Option<String> {
        (self.decode)(frame)
    }
}

/// No decoder produced a usable value
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Could not read a code from the scan ({attempted} decoders tried)")]
pub struct DecodeFailure {
    pub attempted: usize,
}

/// A decoded value and the decoder that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub value: String,
    pub decoder: String,
}

/// Ordered fallback over several decoders
#[derive(Clone, Default)]
pub struct DecoderChain {
    decoders: Vec<Arc<dyn ScanDecoder>>,
}

impl DecoderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decoder; earlier decoders are tried first
    pub fn with(mut self, decoder: Arc<dyn ScanDecoder>) -> Self {
        self.decoders.push(decoder);
        self
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    pub fn decode(&self, frame: &Frame) -> Result<Decoded, DecodeFailure> {
        for decoder in &self.decoders {
            match decoder.try_decode(frame) {
                Some(value) if !value.trim().is_empty() => {
                    tracing::debug!(decoder = decoder.name(), "Frame decoded");
                    return Ok(Decoded {
                        value,
                        decoder: decoder.name().to_string(),
                    });
                }
                _ => tracing::debug!(decoder = decoder.name(), "Decoder produced nothing, falling back"),
            }
        }

        Err(DecodeFailure {
            attempted: self.decoders.len(),
        })
    }
}
