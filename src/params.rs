use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use nih_plug::prelude::*;

use crate::sampler::EnvelopeParameters;

/// Longest attack, decay or release the host can automate, in seconds.
pub const MAX_ENVELOPE_TIME: f32 = 10.0;

/// The four ADSR controls exposed to the host.
///
/// Every change raises `envelope_dirty`; the plugin publishes the new
/// snapshot off the audio thread.
#[derive(Params)]
pub struct SampleKeysParams {
    #[id = "sample_attack_time"]
    pub attack: FloatParam,

    #[id = "sample_decay_time"]
    pub decay: FloatParam,

    #[id = "sample_sustain_level"]
    pub sustain: FloatParam,

    #[id = "sample_release_time"]
    pub release: FloatParam,
}

impl Default for SampleKeysParams {
    fn default() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)))
    }
}

impl SampleKeysParams {
    pub fn new(envelope_dirty: Arc<AtomicBool>) -> Self {
        let defaults = EnvelopeParameters::default();
        let mark_dirty: Arc<dyn Fn(f32) + Send + Sync> = Arc::new(move |_| {
            envelope_dirty.store(true, Ordering::Release);
        });

        Self {
            attack: time_param("Attack", defaults.attack).with_callback(mark_dirty.clone()),
            decay: time_param("Decay", defaults.decay).with_callback(mark_dirty.clone()),
            sustain: FloatParam::new(
                "Sustain",
                defaults.sustain,
                FloatRange::Linear { min: 0.0, max: 1.0 },
            )
            .with_value_to_string(formatters::v2s_f32_percentage(0))
            .with_string_to_value(formatters::s2v_f32_percentage())
            .with_unit("%")
            .with_callback(mark_dirty.clone()),
            release: time_param("Release", defaults.release).with_callback(mark_dirty),
        }
    }

    /// Current values as one envelope snapshot.
    pub fn envelope_parameters(&self) -> EnvelopeParameters {
        EnvelopeParameters {
            attack: self.attack.value(),
            decay: self.decay.value(),
            sustain: self.sustain.value(),
            release: self.release.value(),
        }
    }
}

fn time_param(name: &str, default: f32) -> FloatParam {
    FloatParam::new(
        name,
        default,
        FloatRange::Skewed {
            min: 0.0,
            max: MAX_ENVELOPE_TIME,
            factor: FloatRange::skew_factor(-2.0),
        },
    )
    .with_unit(" s")
    .with_step_size(0.001)
}
