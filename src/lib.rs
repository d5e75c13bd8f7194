//! SampleKeys VSTi: polyphonic one-sample-per-key instrument.
//!
//! Each MIDI note plays its own bundled sample through a voice with a shared
//! ADSR envelope. Note events are applied at their exact sample offset.

use nih_plug::prelude::*;

pub mod audio;
pub mod error;
pub mod midi;
pub mod params;
pub mod plugin;
pub mod resources;
pub mod sampler;
pub mod state;

pub use plugin::SampleKeysPlugin;

nih_export_clap!(SampleKeysPlugin);
nih_export_vst3!(SampleKeysPlugin);
