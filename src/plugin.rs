use nih_plug::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::params::SampleKeysParams;
use crate::resources::{FormatDecoder, SAMPLE_BANK, SourceFormat};
use crate::sampler::{EnvelopeParameters, SamplerEngine, SharedEnvelope};
use crate::state::EnvelopeState;

/// Size of the pre-allocated voice pool.
pub const MAX_VOICES: usize = 64;

/// Work the audio thread hands off to the background thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginTask {
    /// Read the host parameters and publish a new envelope snapshot.
    PublishEnvelope,
}

/// The SampleKeys instrument plugin.
pub struct SampleKeysPlugin {
    params: Arc<SampleKeysParams>,
    /// Sample bank, voice pool and shared envelope.
    engine: SamplerEngine,
    /// Raised by parameter callbacks, cleared by the background task that
    /// publishes the change.
    envelope_dirty: Arc<AtomicBool>,
    /// Whether the sample bank has been registered.
    bank_loaded: bool,
}

impl Default for SampleKeysPlugin {
    fn default() -> Self {
        let envelope_dirty = Arc::new(AtomicBool::new(false));
        Self {
            params: Arc::new(SampleKeysParams::new(envelope_dirty.clone())),
            engine: SamplerEngine::new(MAX_VOICES),
            envelope_dirty,
            bank_loaded: false,
        }
    }
}

/// Push the host parameter values into the shared envelope.
///
/// The dirty flag is cleared before the parameters are read, so an edit that
/// lands while publishing raises it again and is picked up next block.
fn publish_envelope(params: &SampleKeysParams, envelope: &SharedEnvelope, dirty: &AtomicBool) {
    dirty.store(false, Ordering::Release);
    let requested = EnvelopeState::from(params.envelope_parameters());
    if let Err(e) = requested.apply_to(envelope) {
        log::warn!("[Plugin] Envelope update partly rejected: {e}");
    }
}

impl Plugin for SampleKeysPlugin {
    const NAME: &'static str = "SampleKeys";
    const VENDOR: &'static str = "SampleKeys Contributors";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: None,
            main_output_channels: NonZeroU32::new(2),
            ..AudioIOLayout::const_default()
        },
        AudioIOLayout {
            main_input_channels: None,
            main_output_channels: NonZeroU32::new(1),
            ..AudioIOLayout::const_default()
        },
    ];
    const MIDI_INPUT: MidiConfig = MidiConfig::MidiCCs;
    const MIDI_OUTPUT: MidiConfig = MidiConfig::None;
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = PluginTask;

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn task_executor(&mut self) -> TaskExecutor<Self> {
        let params = self.params.clone();
        let envelope = self.engine.envelope();
        let dirty = self.envelope_dirty.clone();
        Box::new(move |task| match task {
            PluginTask::PublishEnvelope => publish_envelope(&params, &envelope, &dirty),
        })
    }

    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        context: &mut impl InitContext<Self>,
    ) -> bool {
        self.engine
            .set_current_playback_sample_rate(buffer_config.sample_rate);

        if !self.bank_loaded {
            let defaults = EnvelopeParameters::default();
            match self.engine.register_bank(
                SAMPLE_BANK,
                SourceFormat::default(),
                defaults.attack,
                defaults.release,
                &FormatDecoder,
            ) {
                Ok(count) => {
                    log::info!("[Plugin] Loaded {count} samples");
                    self.bank_loaded = true;
                }
                Err(e) => {
                    log::error!("[Plugin] Sample bank failed to load: {e}");
                    return false;
                }
            }
        }

        // Host parameters are authoritative once restored.
        context.execute(PluginTask::PublishEnvelope);

        true
    }

    fn reset(&mut self) {
        self.engine.reset();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        // Re-queued every block until the task runs, so a dropped task only
        // delays the update.
        if self.envelope_dirty.load(Ordering::Acquire) {
            context.execute_background(PluginTask::PublishEnvelope);
        }

        crate::audio::process_block(buffer, context, &mut self.engine);

        ProcessStatus::Normal
    }
}

impl ClapPlugin for SampleKeysPlugin {
    const CLAP_ID: &'static str = "org.samplekeys.vsti";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Polyphonic one-sample-per-key instrument with a shared ADSR envelope");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::Instrument,
        ClapFeature::Sampler,
        ClapFeature::Stereo,
    ];
}

impl Vst3Plugin for SampleKeysPlugin {
    const VST3_CLASS_ID: [u8; 16] = *b"SampleKeysVSTi__";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] = &[
        Vst3SubCategory::Instrument,
        Vst3SubCategory::Sampler,
        Vst3SubCategory::Stereo,
    ];
}
