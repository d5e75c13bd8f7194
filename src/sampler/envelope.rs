//! ADSR envelope: shared parameter snapshot and per-voice generator.
//!
//! The control thread publishes whole [`EnvelopeParameters`] snapshots through
//! [`SharedEnvelope`]; the render thread loads one snapshot per block and
//! feeds it to each voice's [`EnvelopeGenerator`]. All ramps are linear.

use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use serde::{Deserialize, Serialize};

use crate::error::ParameterError;

/// Time over which a live sustain change may sweep the full 0..1 range.
pub const SUSTAIN_SLEW_SECONDS: f32 = 0.005;

/// The four ADSR values. Times are in seconds, sustain is a level in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeParameters {
    #[serde(rename = "sampleAttackTime")]
    pub attack: f32,
    #[serde(rename = "sampleDecayTime")]
    pub decay: f32,
    #[serde(rename = "sampleSustainLevel")]
    pub sustain: f32,
    #[serde(rename = "sampleReleaseTime")]
    pub release: f32,
}

impl Default for EnvelopeParameters {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.8,
            release: 0.3,
        }
    }
}

impl EnvelopeParameters {
    /// Merge `requested` over `self`, keeping any field that fails validation.
    ///
    /// Returns the merged value and the first rejection, if any.
    fn merged(
        &self,
        requested: &EnvelopeParameters,
    ) -> (EnvelopeParameters, Option<ParameterError>) {
        let mut error = None;
        let mut time = |name: &'static str, prev: f32, value: f32| {
            if value.is_finite() && value >= 0.0 {
                value
            } else {
                error.get_or_insert(ParameterError::InvalidTime {
                    parameter: name,
                    value,
                });
                prev
            }
        };

        let attack = time("attack", self.attack, requested.attack);
        let decay = time("decay", self.decay, requested.decay);
        let release = time("release", self.release, requested.release);

        let sustain = if requested.sustain.is_nan() {
            error.get_or_insert(ParameterError::InvalidSustain);
            self.sustain
        } else {
            requested.sustain.clamp(0.0, 1.0)
        };

        (
            EnvelopeParameters {
                attack,
                decay,
                sustain,
                release,
            },
            error,
        )
    }
}

/// Atomically replaced envelope snapshot, shared by the control and render
/// threads.
pub struct SharedEnvelope {
    current: ArcSwap<EnvelopeParameters>,
}

impl Default for SharedEnvelope {
    fn default() -> Self {
        Self::new(EnvelopeParameters::default())
    }
}

impl SharedEnvelope {
    pub fn new(params: EnvelopeParameters) -> Self {
        let (params, _) = EnvelopeParameters::default().merged(&params);
        Self {
            current: ArcSwap::from_pointee(params),
        }
    }

    /// Lock-free read of the latest snapshot, for the render thread.
    #[inline]
    pub fn load(&self) -> Guard<Arc<EnvelopeParameters>> {
        self.current.load()
    }

    pub fn current_parameters(&self) -> EnvelopeParameters {
        **self.current.load()
    }

    /// Publish a new snapshot.
    ///
    /// Sustain is clamped to 0..=1. A negative or non-finite time keeps the
    /// previous value for that field while the remaining fields still apply;
    /// the rejection is reported as the error.
    pub fn set_parameters(&self, requested: EnvelopeParameters) -> Result<(), ParameterError> {
        let mut error = None;
        self.current.rcu(|prev| {
            let (next, err) = prev.merged(&requested);
            error = err;
            next
        });
        error.map_or(Ok(()), Err)
    }

    /// Replace attack and release, keeping decay and sustain.
    pub fn set_attack_and_release(&self, attack: f32, release: f32) -> Result<(), ParameterError> {
        let mut error = None;
        self.current.rcu(|prev| {
            let requested = EnvelopeParameters {
                attack,
                release,
                ..**prev
            };
            let (next, err) = prev.merged(&requested);
            error = err;
            next
        });
        error.map_or(Ok(()), Err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeStage {
    #[default]
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Per-voice envelope state.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeGenerator {
    stage: EnvelopeStage,
    level: f32,
    release_start: f32,
}

impl EnvelopeGenerator {
    /// Restart from level 0 in the attack stage.
    pub fn trigger(&mut self) {
        self.stage = EnvelopeStage::Attack;
        self.level = 0.0;
        self.release_start = 0.0;
    }

    /// Enter release from the current level. No-op when idle or already
    /// releasing.
    pub fn release(&mut self) {
        if matches!(
            self.stage,
            EnvelopeStage::Attack | EnvelopeStage::Decay | EnvelopeStage::Sustain
        ) {
            self.stage = EnvelopeStage::Release;
            self.release_start = self.level;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_idle(&self) -> bool {
        self.stage == EnvelopeStage::Idle
    }

    /// Level for the current sample, then advance by one sample.
    ///
    /// A stage shorter than one sample completes at once: the level snaps to
    /// the stage target and the next stage is evaluated for the same sample.
    #[inline]
    pub fn next_level(&mut self, params: &EnvelopeParameters, sample_rate: f32) -> f32 {
        loop {
            match self.stage {
                EnvelopeStage::Idle => return 0.0,
                EnvelopeStage::Attack => {
                    let samples = params.attack * sample_rate;
                    if samples < 1.0 {
                        self.level = 1.0;
                        self.stage = EnvelopeStage::Decay;
                        continue;
                    }
                    let out = self.level;
                    self.level += 1.0 / samples;
                    if self.level >= 1.0 {
                        self.level = 1.0;
                        self.stage = EnvelopeStage::Decay;
                    }
                    return out;
                }
                EnvelopeStage::Decay => {
                    let target = params.sustain;
                    if self.level <= target {
                        // Sustain was raised above us; the sustain slew takes over.
                        self.stage = EnvelopeStage::Sustain;
                        continue;
                    }
                    let samples = params.decay * sample_rate;
                    if samples < 1.0 {
                        self.level = target;
                        self.stage = EnvelopeStage::Sustain;
                        continue;
                    }
                    let out = self.level;
                    self.level -= (1.0 - target) / samples;
                    if self.level <= target {
                        self.level = target;
                        self.stage = EnvelopeStage::Sustain;
                    }
                    return out;
                }
                EnvelopeStage::Sustain => {
                    let out = self.level;
                    let max_step = 1.0 / (SUSTAIN_SLEW_SECONDS * sample_rate).max(1.0);
                    self.level += (params.sustain - self.level).clamp(-max_step, max_step);
                    return out;
                }
                EnvelopeStage::Release => {
                    let samples = params.release * sample_rate;
                    if samples < 1.0 || self.release_start <= 0.0 {
                        self.level = 0.0;
                        self.stage = EnvelopeStage::Idle;
                        continue;
                    }
                    let out = self.level;
                    self.level -= self.release_start / samples;
                    if self.level <= 0.0 {
                        self.level = 0.0;
                        self.stage = EnvelopeStage::Idle;
                    }
                    return out;
                }
            }
        }
    }
}
