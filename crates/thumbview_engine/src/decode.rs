use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

/// How to turn raw archive entry names into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameEncoding {
    /// Guess non-UTF-8 names with chardetng.
    #[default]
    Detect,
    /// The archive declares (or the user asserts) this encoding for non-UTF-8 names.
    Declared(&'static Encoding),
}

impl NameEncoding {
    /// Resolves a WHATWG label such as `"shift_jis"`; unknown labels fall back to detection.
    pub fn from_label(label: &str) -> Self {
        Encoding::for_label(label.trim().as_bytes())
            .map(NameEncoding::Declared)
            .unwrap_or(NameEncoding::Detect)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedName {
    pub name: String,
    pub encoding_label: &'static str,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode entry name with {encoding}: {lossy}")]
    DecodeFailure { encoding: String, lossy: String },
}

/// Decode a raw entry name: valid UTF-8 as-is -> declared encoding -> chardetng guess.
pub fn decode_entry_name(raw: &[u8], encoding: NameEncoding) -> Result<DecodedName, DecodeError> {
    // 1) Names that already are UTF-8 never need a guess.
    if let Ok(name) = std::str::from_utf8(raw) {
        return Ok(DecodedName {
            name: name.to_owned(),
            encoding_label: UTF_8.name(),
        });
    }

    // 2) Declared encoding wins over detection.
    let enc = match encoding {
        NameEncoding::Declared(enc) => enc,
        // 3) chardetng over the name bytes alone; UTF-8 is already ruled out.
        NameEncoding::Detect => {
            let mut detector = EncodingDetector::new();
            detector.feed(raw, true);
            detector.guess(None, false)
        }
    };
    decode_with(raw, enc)
}

fn decode_with(raw: &[u8], enc: &'static Encoding) -> Result<DecodedName, DecodeError> {
    let (text, had_errors) = enc.decode_without_bom_handling(raw);
    if had_errors {
        return Err(DecodeError::DecodeFailure {
            encoding: enc.name().to_string(),
            lossy: text.into_owned(),
        });
    }
    Ok(DecodedName {
        name: text.into_owned(),
        encoding_label: enc.name(),
    })
}
