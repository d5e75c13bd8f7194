//! Error types for resource registration, decoding and envelope updates.

use thiserror::Error;

/// Why a sample resource could not be registered.
///
/// All of these are configuration errors: the instrument cannot claim to
/// support the affected pitch, so initialization must stop.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource name `{name}` does not match `<prefix>_<note>_<tag>`")]
    MalformedName { name: String },

    #[error("resource `{name}` has prefix `{found}`, expected `{expected}`")]
    UnexpectedPrefix {
        name: String,
        found: String,
        expected: String,
    },

    #[error("MIDI note {note} is outside 0..=127")]
    InvalidNote { note: u32 },

    #[error("resource `{name}` names note {named} but was registered for note {requested}")]
    NoteMismatch { name: String, named: u8, requested: u8 },

    #[error("MIDI note {note} already has resource `{existing}`")]
    DuplicateNote { note: u8, existing: String },

    #[error("failed to decode `{name}`: {source}")]
    Decode {
        name: String,
        #[source]
        source: DecodeError,
    },

    #[error(
        "`{name}` decoded as {found_rate} Hz / {found_depth}-bit, \
         expected {expected_rate} Hz / {expected_depth}-bit"
    )]
    FormatMismatch {
        name: String,
        found_rate: u32,
        found_depth: u16,
        expected_rate: u32,
        expected_depth: u16,
    },
}

/// Failure inside the audio decoder.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported audio format `{0}`")]
    UnsupportedFormat(String),

    #[error("WAV decode error: {0}")]
    Wav(#[from] hound::Error),

    #[error("MP3 decode error: {0}")]
    Mp3(String),

    #[error("decoded no audio from {0} bytes")]
    Empty(usize),
}

/// A rejected envelope parameter. The previous value of the field is kept.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ParameterError {
    #[error("{parameter} time must be a non-negative number of seconds, got {value}")]
    InvalidTime { parameter: &'static str, value: f32 },

    #[error("sustain level must be a number")]
    InvalidSustain,
}
