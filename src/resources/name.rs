//! Parsing of bundled resource names: `<prefix>_<midi-note>_<tag>`.
//!
//! The tag is the source file extension, e.g. `sample_60_wav` for a file
//! originally called `sample_60.wav`.

use crate::error::ResourceError;

/// Highest valid MIDI note number.
pub const MAX_MIDI_NOTE: u8 = 127;

/// The three parts of a resource name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceName<'a> {
    pub prefix: &'a str,
    pub midi_note: u8,
    pub tag: &'a str,
}

impl<'a> ResourceName<'a> {
    /// Parse `name` and check that its prefix is `expected_prefix`.
    pub fn parse(name: &'a str, expected_prefix: &str) -> Result<Self, ResourceError> {
        let malformed = || ResourceError::MalformedName {
            name: name.to_string(),
        };

        let mut parts = name.split('_');
        let (Some(prefix), Some(digits), Some(tag), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };

        if prefix.is_empty() || tag.is_empty() {
            return Err(malformed());
        }
        if prefix != expected_prefix {
            return Err(ResourceError::UnexpectedPrefix {
                name: name.to_string(),
                found: prefix.to_string(),
                expected: expected_prefix.to_string(),
            });
        }
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let note: u32 = digits.parse().map_err(|_| malformed())?;
        if note > MAX_MIDI_NOTE as u32 {
            return Err(ResourceError::InvalidNote { note });
        }

        Ok(Self {
            prefix,
            midi_note: note as u8,
            tag,
        })
    }
}
