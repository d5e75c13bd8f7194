//! Audio decoding for bundled sample resources.
//!
//! Decoding only ever runs while resources are being registered, never on the
//! audio thread.

use std::io::Cursor;

use crate::error::DecodeError;

/// Decoded PCM, interleaved `f32` in -1.0..=1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
    pub bit_depth: u16,
}

impl DecodedAudio {
    /// Number of sample frames (samples per channel).
    pub fn num_frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }
}

/// Turns raw resource bytes into frames. `tag` names the container format.
pub trait Decoder {
    fn decode(&self, tag: &str, bytes: &[u8]) -> Result<DecodedAudio, DecodeError>;
}

/// Decoder for the formats the instrument ships with: WAV (via `hound`) and
/// MP3 (via `minimp3`).
#[derive(Debug, Default, Clone, Copy)]
pub struct FormatDecoder;

impl Decoder for FormatDecoder {
    fn decode(&self, tag: &str, bytes: &[u8]) -> Result<DecodedAudio, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty(0));
        }
        let audio = match tag.to_ascii_lowercase().as_str() {
            "wav" | "wave" => decode_wav(bytes)?,
            "mp3" => decode_mp3(bytes)?,
            other => return Err(DecodeError::UnsupportedFormat(other.to_string())),
        };
        if audio.num_frames() == 0 {
            return Err(DecodeError::Empty(bytes.len()));
        }
        Ok(audio)
    }
}

/// Decode WAV bytes to interleaved f32 samples.
fn decode_wav(bytes: &[u8]) -> Result<DecodedAudio, DecodeError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(DecodedAudio {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bit_depth: spec.bits_per_sample,
    })
}

/// Decode MP3 bytes to interleaved f32 samples.
///
/// The stream format is taken from the first frame; minimp3 always yields
/// 16-bit PCM.
fn decode_mp3(bytes: &[u8]) -> Result<DecodedAudio, DecodeError> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(bytes));
    let mut samples = Vec::new();
    let mut format: Option<(u16, u32)> = None;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                format.get_or_insert((frame.channels as u16, frame.sample_rate as u32));
                samples.extend(frame.data.iter().map(|&s| s as f32 / 32768.0));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(DecodeError::Mp3(format!("{e:?}"))),
        }
    }

    let (channels, sample_rate) = format.ok_or(DecodeError::Empty(bytes.len()))?;
    Ok(DecodedAudio {
        samples,
        channels,
        sample_rate,
        bit_depth: 16,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode `samples` (interleaved) as 16-bit PCM WAV in memory.
    pub(crate) fn wav_bytes(samples: &[f32], channels: u16, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample((s * 32767.0) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_16bit_mono_wav() {
        let bytes = wav_bytes(&[0.0, 0.5, -0.5, 1.0], 1, 44100);
        let audio = FormatDecoder.decode("wav", &bytes).unwrap();
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.bit_depth, 16);
        assert_eq!(audio.num_frames(), 4);
        assert!((audio.samples[1] - 0.5).abs() < 1e-3);
        assert!((audio.samples[2] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn decodes_stereo_wav_interleaved() {
        let bytes = wav_bytes(&[0.25, -0.25, 0.5, -0.5], 2, 48000);
        let audio = FormatDecoder.decode("WAV", &bytes).unwrap();
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.sample_rate, 48000);
        assert_eq!(audio.num_frames(), 2);
        assert!((audio.samples[3] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn unknown_tag_is_unsupported() {
        let err = FormatDecoder.decode("flac", &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedFormat(ref t) if t == "flac"));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(FormatDecoder.decode("wav", &[]), Err(DecodeError::Empty(0))));
    }

    #[test]
    fn garbage_wav_is_rejected() {
        assert!(matches!(
            FormatDecoder.decode("wav", b"definitely not a riff file"),
            Err(DecodeError::Wav(_))
        ));
    }

    #[test]
    fn garbage_mp3_is_rejected() {
        assert!(FormatDecoder.decode("mp3", &[0u8; 64]).is_err());
    }

    #[test]
    fn wav_without_frames_is_empty() {
        let bytes = wav_bytes(&[], 1, 44100);
        assert!(matches!(FormatDecoder.decode("wav", &bytes), Err(DecodeError::Empty(_))));
    }
}
