use nih_plug::prelude::*;

use crate::midi;
use crate::sampler::SamplerEngine;

/// Main audio processing entry point. Called once per process block.
///
/// Host events are pulled lazily while the engine renders, so nothing is
/// buffered or allocated here.
pub fn process_block(
    buffer: &mut Buffer,
    context: &mut impl ProcessContext<crate::SampleKeysPlugin>,
    engine: &mut SamplerEngine,
) {
    let events = std::iter::from_fn(|| context.next_event());
    render_block(buffer.as_slice(), events, engine);
}

/// Clear `output`, then render every channel's full length with the given
/// host events.
pub fn render_block(
    output: &mut [&mut [f32]],
    events: impl IntoIterator<Item = NoteEvent<()>>,
    engine: &mut SamplerEngine,
) {
    let num_samples = output.iter().map(|channel| channel.len()).min().unwrap_or(0);
    for channel in output.iter_mut() {
        channel.fill(0.0);
    }
    if num_samples == 0 {
        return;
    }

    let events = events
        .into_iter()
        .filter_map(|event| midi::translate_event(&event));
    engine.render_next_block(output, events, 0, num_samples);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{FormatDecoder, SAMPLE_BANK, SourceFormat};
    use crate::sampler::EnvelopeParameters;

    fn bank_engine() -> SamplerEngine {
        let mut engine = SamplerEngine::new(crate::plugin::MAX_VOICES);
        engine
            .register_bank(SAMPLE_BANK, SourceFormat::default(), 0.0, 0.0, &FormatDecoder)
            .unwrap();
        engine
            .set_envelope_parameters(EnvelopeParameters {
                attack: 0.0,
                decay: 0.0,
                sustain: 1.0,
                release: 0.0,
            })
            .unwrap();
        engine
    }

    fn note_on(timing: u32, note: u8) -> NoteEvent<()> {
        NoteEvent::NoteOn {
            timing,
            voice_id: None,
            channel: 0,
            note,
            velocity: 1.0,
        }
    }

    #[test]
    fn stale_output_is_cleared() {
        let mut engine = bank_engine();
        let mut left = vec![0.7f32; 256];
        let mut right = vec![-0.7f32; 256];
        render_block(&mut [&mut left[..], &mut right[..]], Vec::new(), &mut engine);
        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
    }

    #[test]
    fn bundled_note_sounds_from_its_offset() {
        let mut engine = bank_engine();
        let mut left = vec![0.0f32; 512];
        let mut right = vec![0.0f32; 512];
        render_block(&mut [&mut left[..], &mut right[..]], vec![note_on(100, 60)], &mut engine);

        assert!(left[..100].iter().all(|&s| s == 0.0));
        let energy: f32 = left[100..].iter().map(|s| s * s).sum();
        assert!(energy > 0.0, "bundled sample should be audible");
        assert_eq!(left, right, "mono sample feeds both channels");
    }

    #[test]
    fn note_without_sample_is_silent() {
        let mut engine = bank_engine();
        let mut left = vec![0.0f32; 128];
        let mut right = vec![0.0f32; 128];
        render_block(&mut [&mut left[..], &mut right[..]], vec![note_on(0, 61)], &mut engine);
        assert_eq!(engine.active_voice_count(), 0);
        assert!(left.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn all_notes_off_cc_hard_stops() {
        let mut engine = bank_engine();
        let mut left = vec![0.0f32; 128];
        let mut right = vec![0.0f32; 128];
        let events = vec![
            note_on(0, 60),
            note_on(0, 64),
            NoteEvent::MidiCC {
                timing: 64,
                channel: 0,
                cc: midi::CC_ALL_NOTES_OFF,
                value: 0.0,
            },
        ];
        render_block(&mut [&mut left[..], &mut right[..]], events, &mut engine);
        assert_eq!(engine.active_voice_count(), 0);
        assert!(left[64..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn renders_into_a_single_mono_channel() {
        let mut engine = bank_engine();
        let mut mono = vec![0.0f32; 256];
        render_block(&mut [&mut mono[..]], vec![note_on(32, 60)], &mut engine);

        let mut left = vec![0.0f32; 256];
        let mut right = vec![0.0f32; 256];
        let mut reference = bank_engine();
        render_block(&mut [&mut left[..], &mut right[..]], vec![note_on(32, 60)], &mut reference);

        assert!(mono[..32].iter().all(|&s| s == 0.0));
        assert!(mono[32..].iter().any(|&s| s != 0.0));
        assert_eq!(mono, left, "mono output carries the same signal as each stereo side");
        assert_eq!(engine.active_voice_count(), 1);
    }
}
