use serde::{Deserialize, Serialize};

use crate::error::ParameterError;
use crate::sampler::{EnvelopeParameters, SharedEnvelope};

/// Envelope values as a flat JSON document.
///
/// Holds the four envelope values under
/// `sampleAttackTime`, `sampleDecayTime`, `sampleSustainLevel` and
/// `sampleReleaseTime`. Missing keys take their defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvelopeState {
    pub envelope: EnvelopeParameters,
}

impl From<EnvelopeParameters> for EnvelopeState {
    fn from(envelope: EnvelopeParameters) -> Self {
        Self { envelope }
    }
}

impl EnvelopeState {
    /// Capture the currently published envelope.
    pub fn capture(shared: &SharedEnvelope) -> Self {
        shared.current_parameters().into()
    }

    /// Serialize the state to JSON bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        serde_json::from_slice(data).ok()
    }

    /// Re-initialize the shared envelope from these values.
    pub fn apply_to(&self, shared: &SharedEnvelope) -> Result<(), ParameterError> {
        shared.set_parameters(self.envelope)
    }
}
