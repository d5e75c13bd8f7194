//! Real-time sampler engine.
//!
//! The engine owns the resource store, the shared envelope and the voice pool.
//! `render_next_block` is the only method the audio thread calls; it splits
//! the block at every event so note changes land on their exact sample.

pub mod envelope;
pub mod voice;

use std::sync::Arc;

pub use envelope::{EnvelopeGenerator, EnvelopeParameters, EnvelopeStage, SharedEnvelope};
pub use voice::{Voice, VoicePool};

use crate::error::{ParameterError, ResourceError};
use crate::resources::{Decoder, NamedResource, ResourceName, ResourceStore, SourceFormat};

/// Sample rate assumed until the host reports one.
pub const DEFAULT_SAMPLE_RATE: f32 = 44_100.0;

/// A note message with its position in the destination buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedEvent {
    /// Sample index into the destination buffer.
    pub timing: u32,
    pub message: NoteMessage,
}

impl TimedEvent {
    pub fn new(timing: u32, message: NoteMessage) -> Self {
        Self { timing, message }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteMessage {
    NoteOn { note: u8, velocity: f32 },
    NoteOff { note: u8 },
    /// Hard stop of every voice, no release tail.
    AllNotesOff,
}

pub struct SamplerEngine {
    store: ResourceStore,
    envelope: Arc<SharedEnvelope>,
    pool: VoicePool,
    sample_rate: f32,
}

impl SamplerEngine {
    pub fn new(max_voices: usize) -> Self {
        Self::with_store(ResourceStore::default(), max_voices)
    }

    pub fn with_store(store: ResourceStore, max_voices: usize) -> Self {
        Self {
            store,
            envelope: Arc::new(SharedEnvelope::default()),
            pool: VoicePool::new(max_voices),
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    /// Decode and register one resource, then apply the initial attack and
    /// release to the shared envelope.
    #[allow(clippy::too_many_arguments)]
    pub fn register_resource(
        &mut self,
        name: &str,
        data: &[u8],
        format: SourceFormat,
        midi_note: u8,
        initial_attack: f32,
        initial_release: f32,
        decoder: &impl Decoder,
    ) -> Result<(), ResourceError> {
        self.store.register(name, data, format, midi_note, decoder)?;
        if let Err(e) = self
            .envelope
            .set_attack_and_release(initial_attack, initial_release)
        {
            log::warn!("[Sampler] Initial envelope for {name} rejected: {e}");
        }
        Ok(())
    }

    /// Register every entry of `bank`, deriving each note from its name.
    ///
    /// Stops at the first failure and removes the entries this call already
    /// registered, so a retry reports the same error again.
    pub fn register_bank(
        &mut self,
        bank: &[NamedResource],
        format: SourceFormat,
        initial_attack: f32,
        initial_release: f32,
        decoder: &impl Decoder,
    ) -> Result<usize, ResourceError> {
        let mut registered = Vec::with_capacity(bank.len());
        for entry in bank {
            let result = ResourceName::parse(entry.name, self.store.prefix())
                .map(|name| name.midi_note)
                .and_then(|note| {
                    self.register_resource(
                        entry.name,
                        entry.data,
                        format,
                        note,
                        initial_attack,
                        initial_release,
                        decoder,
                    )
                    .map(|()| note)
                });
            match result {
                Ok(note) => registered.push(note),
                Err(e) => {
                    for note in registered {
                        self.store.remove(note);
                    }
                    return Err(e);
                }
            }
        }
        log::info!(
            "[Sampler] Bank ready: {} resources, {} voices",
            self.store.len(),
            self.pool.capacity()
        );
        Ok(bank.len())
    }

    /// Set the output rate. Active voices re-derive their playback increment.
    pub fn set_current_playback_sample_rate(&mut self, sample_rate: f32) {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            log::warn!("[Sampler] Ignoring invalid sample rate {sample_rate}");
            return;
        }
        self.sample_rate = sample_rate;

        let Self { store, pool, .. } = self;
        for voice in pool.active_voices_mut() {
            match store.lookup(voice.note()) {
                Some(resource) => voice.set_sample_rate(resource, sample_rate),
                None => voice.stop(),
            }
        }
    }

    pub fn set_envelope_parameters(
        &self,
        params: EnvelopeParameters,
    ) -> Result<(), ParameterError> {
        self.envelope.set_parameters(params)
    }

    /// Handle for publishing envelope changes from another thread.
    pub fn envelope(&self) -> Arc<SharedEnvelope> {
        Arc::clone(&self.envelope)
    }

    /// Render `output[..][start_sample..start_sample + num_samples]`, applying
    /// `events` in order at their sample positions. Output is mixed into the
    /// existing buffer content.
    ///
    /// Event timings are clamped into the unrendered part of the block, so an
    /// out-of-order or late event applies as soon as possible instead of
    /// being lost.
    pub fn render_next_block(
        &mut self,
        output: &mut [&mut [f32]],
        events: impl IntoIterator<Item = TimedEvent>,
        start_sample: usize,
        num_samples: usize,
    ) {
        let params = **self.envelope.load();
        let buffer_len = output
            .iter()
            .map(|channel| channel.len())
            .min()
            .unwrap_or(usize::MAX);
        let end = (start_sample + num_samples).min(buffer_len);
        let mut cursor = start_sample.min(end);

        for event in events {
            let at = (event.timing as usize).clamp(cursor, end);
            self.render_voices(output, cursor, at - cursor, &params);
            cursor = at;
            self.handle_message(event.message);
        }
        self.render_voices(output, cursor, end - cursor, &params);
    }

    /// Hard-stop every voice.
    pub fn all_notes_off(&mut self) {
        self.pool.stop_all();
    }

    pub fn reset(&mut self) {
        self.all_notes_off();
    }

    pub fn active_voice_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn active_voices(&self) -> impl Iterator<Item = &Voice> {
        self.pool.active_voices()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn resources(&self) -> &ResourceStore {
        &self.store
    }

    fn handle_message(&mut self, message: NoteMessage) {
        match message {
            NoteMessage::NoteOn { note, velocity } => {
                // Unregistered pitches are dropped.
                let Some(resource) = self.store.lookup(note) else {
                    return;
                };
                self.pool.allocate(note, velocity, resource, self.sample_rate);
            }
            NoteMessage::NoteOff { note } => self.pool.release(note),
            NoteMessage::AllNotesOff => self.pool.stop_all(),
        }
    }

    fn render_voices(
        &mut self,
        output: &mut [&mut [f32]],
        start: usize,
        num_samples: usize,
        params: &EnvelopeParameters,
    ) {
        if num_samples == 0 {
            return;
        }
        let Self {
            store,
            pool,
            sample_rate,
            ..
        } = self;
        for voice in pool.active_voices_mut() {
            let Some(resource) = store.lookup(voice.note()) else {
                voice.stop();
                continue;
            };
            voice.render_into(output, start, num_samples, resource, params, *sample_rate);
        }
    }
}
