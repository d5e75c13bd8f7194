//! Sample resource store: one decoded, immutable sample per MIDI note.

pub mod bank;
pub mod decoder;
pub mod name;

pub use bank::{NamedResource, SAMPLE_BANK, SAMPLE_BIT_DEPTH, SAMPLE_PREFIX, SAMPLE_RATE};
pub use decoder::{DecodedAudio, Decoder, FormatDecoder};
pub use name::{MAX_MIDI_NOTE, ResourceName};

use crate::error::{DecodeError, ResourceError};

/// Number of addressable MIDI notes.
pub const MIDI_NOTE_COUNT: usize = MAX_MIDI_NOTE as usize + 1;

/// Declared format of a source resource. Decoded audio must match it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFormat {
    pub sample_rate: u32,
    pub bit_depth: u16,
}

impl Default for SourceFormat {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            bit_depth: SAMPLE_BIT_DEPTH,
        }
    }
}

/// A decoded sample bound to one MIDI note.
#[derive(Debug, Clone)]
pub struct SampleResource {
    name: String,
    midi_note: u8,
    sample_rate: u32,
    bit_depth: u16,
    channels: u16,
    /// Interleaved PCM.
    samples: Vec<f32>,
}

impl SampleResource {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn midi_note(&self) -> u8 {
        self.midi_note
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn bit_depth(&self) -> u16 {
        self.bit_depth
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn num_frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Read one sample. Output channels past the source's last channel reuse
    /// the last one, so mono sources feed every output channel.
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.channels as usize;
        let ch = channel.min(channels - 1);
        self.samples[frame * channels + ch]
    }

    /// Linearly interpolated read at a fractional frame position.
    ///
    /// `position` must be below `num_frames()`. The neighbour frame is
    /// clamped to the last frame, so the buffer is never read past its end.
    #[inline]
    pub fn interpolated(&self, position: f64, channel: usize) -> f32 {
        let idx0 = position as usize;
        let idx1 = (idx0 + 1).min(self.num_frames() - 1);
        let frac = (position - idx0 as f64) as f32;
        let s0 = self.sample(idx0, channel);
        let s1 = self.sample(idx1, channel);
        s0 + (s1 - s0) * frac
    }
}

/// Fixed pitch-indexed table of sample resources.
pub struct ResourceStore {
    prefix: String,
    resources: Vec<Option<SampleResource>>,
    len: usize,
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::with_prefix(SAMPLE_PREFIX)
    }
}

impl ResourceStore {
    /// Create an empty store whose resource names must start with `prefix`.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            resources: (0..MIDI_NOTE_COUNT).map(|_| None).collect(),
            len: 0,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Decode `data` and store it under `midi_note`.
    ///
    /// The name must parse as `<prefix>_<midi_note>_<tag>`; the tag selects
    /// the decoder format. A note that already has a resource is rejected and
    /// keeps its first registration.
    pub fn register(
        &mut self,
        name: &str,
        data: &[u8],
        format: SourceFormat,
        midi_note: u8,
        decoder: &impl Decoder,
    ) -> Result<&SampleResource, ResourceError> {
        if midi_note > MAX_MIDI_NOTE {
            return Err(ResourceError::InvalidNote {
                note: midi_note as u32,
            });
        }

        let parsed = ResourceName::parse(name, &self.prefix)?;
        if parsed.midi_note != midi_note {
            return Err(ResourceError::NoteMismatch {
                name: name.to_string(),
                named: parsed.midi_note,
                requested: midi_note,
            });
        }

        if let Some(existing) = &self.resources[midi_note as usize] {
            return Err(ResourceError::DuplicateNote {
                note: midi_note,
                existing: existing.name.clone(),
            });
        }

        let audio = decoder
            .decode(parsed.tag, data)
            .map_err(|source| ResourceError::Decode {
                name: name.to_string(),
                source,
            })?;
        if audio.num_frames() == 0 {
            return Err(ResourceError::Decode {
                name: name.to_string(),
                source: DecodeError::Empty(data.len()),
            });
        }

        if audio.sample_rate != format.sample_rate || audio.bit_depth != format.bit_depth {
            return Err(ResourceError::FormatMismatch {
                name: name.to_string(),
                found_rate: audio.sample_rate,
                found_depth: audio.bit_depth,
                expected_rate: format.sample_rate,
                expected_depth: format.bit_depth,
            });
        }

        let resource = SampleResource {
            name: name.to_string(),
            midi_note,
            sample_rate: audio.sample_rate,
            bit_depth: audio.bit_depth,
            channels: audio.channels,
            samples: audio.samples,
        };
        log::info!(
            "[Resources] Registered {} for note {}: {} frames, {} ch @ {} Hz",
            resource.name,
            midi_note,
            resource.num_frames(),
            resource.channels,
            resource.sample_rate
        );

        self.len += 1;
        Ok(self.resources[midi_note as usize].insert(resource))
    }

    /// Resource registered for `midi_note`, if any.
    #[inline]
    pub fn lookup(&self, midi_note: u8) -> Option<&SampleResource> {
        self.resources.get(midi_note as usize)?.as_ref()
    }

    /// Take the resource out of `midi_note`'s slot, freeing it for a new
    /// registration.
    pub fn remove(&mut self, midi_note: u8) -> Option<SampleResource> {
        let removed = self.resources.get_mut(midi_note as usize)?.take();
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Registered resources in ascending pitch order.
    pub fn iter(&self) -> impl Iterator<Item = &SampleResource> {
        self.resources.iter().filter_map(Option::as_ref)
    }
}
