use super::envelope::{EnvelopeGenerator, EnvelopeParameters, EnvelopeStage};
use crate::resources::SampleResource;

/// One playing instance of a sample, held in the pre-allocated pool.
#[derive(Debug, Clone, Default)]
pub struct Voice {
    /// Whether this voice is currently sounding.
    active: bool,
    /// MIDI note that triggered this voice.
    note: u8,
    /// Velocity, 0.0 to 1.0.
    velocity: f32,
    /// Playback position in source frames.
    position: f64,
    /// Source frames advanced per output sample.
    increment: f64,
    envelope: EnvelopeGenerator,
    /// Start order, used to pick the oldest voice when stealing.
    started_at: u64,
}

impl Voice {
    /// Start playing `resource` from its first frame, envelope in attack.
    pub fn start(
        &mut self,
        note: u8,
        resource: &SampleResource,
        sample_rate: f32,
        velocity: f32,
        serial: u64,
    ) {
        self.active = true;
        self.note = note;
        self.velocity = velocity;
        self.position = 0.0;
        self.started_at = serial;
        self.set_sample_rate(resource, sample_rate);
        self.envelope.trigger();
    }

    /// Move into release from wherever the envelope currently is.
    pub fn note_off(&mut self) {
        self.envelope.release();
    }

    /// Silence immediately and free the slot.
    pub fn stop(&mut self) {
        self.active = false;
        self.envelope.reset();
    }

    /// Re-derive the playback increment for a new engine rate.
    pub fn set_sample_rate(&mut self, resource: &SampleResource, sample_rate: f32) {
        self.increment = resource.sample_rate() as f64 / sample_rate as f64;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn increment(&self) -> f64 {
        self.increment
    }

    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    pub fn envelope_stage(&self) -> EnvelopeStage {
        self.envelope.stage()
    }

    pub fn is_releasing(&self) -> bool {
        self.envelope.stage() == EnvelopeStage::Release
    }

    /// Mix this voice into `output[..][start..start + num_samples]`.
    ///
    /// Returns `true` once the voice is silent, either because the envelope
    /// finished or the sample data ran out. A silent voice is stopped.
    pub fn render_into(
        &mut self,
        output: &mut [&mut [f32]],
        start: usize,
        num_samples: usize,
        resource: &SampleResource,
        params: &EnvelopeParameters,
        sample_rate: f32,
    ) -> bool {
        let total_frames = resource.num_frames() as f64;

        for i in start..start + num_samples {
            if self.envelope.is_idle() || self.position >= total_frames {
                self.stop();
                return true;
            }

            let gain = self.envelope.next_level(params, sample_rate) * self.velocity;
            for (channel, buffer) in output.iter_mut().enumerate() {
                buffer[i] += resource.interpolated(self.position, channel) * gain;
            }
            self.position += self.increment;
        }

        if self.envelope.is_idle() || self.position >= total_frames {
            self.stop();
            return true;
        }
        false
    }
}

/// Fixed-size voice pool with oldest-first stealing.
pub struct VoicePool {
    voices: Vec<Voice>,
    next_serial: u64,
}

impl VoicePool {
    pub fn new(max_polyphony: usize) -> Self {
        Self {
            voices: vec![Voice::default(); max_polyphony],
            next_serial: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.voices.len()
    }

    /// Start a voice for a new note. Takes a free slot, or steals the voice
    /// that started earliest when every slot is busy. `None` only for an
    /// empty pool.
    pub fn allocate(
        &mut self,
        note: u8,
        velocity: f32,
        resource: &SampleResource,
        sample_rate: f32,
    ) -> Option<&mut Voice> {
        let idx = match self.voices.iter().position(|v| !v.active) {
            Some(idx) => idx,
            None => self
                .voices
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.started_at)
                .map(|(i, _)| i)?,
        };

        let serial = self.next_serial;
        self.next_serial += 1;

        let voice = &mut self.voices[idx];
        voice.stop();
        voice.start(note, resource, sample_rate, velocity, serial);
        Some(voice)
    }

    /// Release all voices playing the given note.
    pub fn release(&mut self, note: u8) {
        for voice in self.active_voices_mut().filter(|v| v.note == note) {
            voice.note_off();
        }
    }

    /// Hard-stop every voice.
    pub fn stop_all(&mut self) {
        for voice in &mut self.voices {
            voice.stop();
        }
    }

    pub fn active_voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter().filter(|v| v.active)
    }

    pub fn active_voices_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices.iter_mut().filter(|v| v.active)
    }

    pub fn active_count(&self) -> usize {
        self.active_voices().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::tests::FixedDecoder;
    use crate::resources::{ResourceStore, SourceFormat};

    fn store_with(notes: &[u8], samples: Vec<f32>) -> ResourceStore {
        let mut store = ResourceStore::default();
        let decoder = FixedDecoder::mono(samples);
        for &note in notes {
            let name = format!("sample_{note}_wav");
            store.register(&name, &[], SourceFormat::default(), note, &decoder).unwrap();
        }
        store
    }

    fn identity() -> EnvelopeParameters {
        EnvelopeParameters {
            attack: 0.0,
            decay: 0.0,
            sustain: 1.0,
            release: 0.0,
        }
    }

    #[test]
    fn voice_pool_allocate_and_release() {
        let store = store_with(&[60, 64], vec![0.5; 16]);
        let mut pool = VoicePool::new(4);
        assert_eq!(pool.active_count(), 0);

        pool.allocate(60, 0.8, store.lookup(60).unwrap(), 44100.0);
        pool.allocate(64, 0.7, store.lookup(64).unwrap(), 44100.0);
        assert_eq!(pool.active_count(), 2);

        pool.release(60);
        let releasing: Vec<_> = pool.active_voices().filter(|v| v.is_releasing()).collect();
        assert_eq!(releasing.len(), 1);
        assert_eq!(releasing[0].note(), 60);
    }

    #[test]
    fn voice_pool_steals_oldest_when_full() {
        let store = store_with(&[60, 64, 67], vec![0.5; 16]);
        let mut pool = VoicePool::new(2);
        pool.allocate(60, 0.8, store.lookup(60).unwrap(), 44100.0);
        pool.allocate(64, 0.7, store.lookup(64).unwrap(), 44100.0);

        pool.allocate(67, 0.9, store.lookup(67).unwrap(), 44100.0);
        assert_eq!(pool.active_count(), 2);
        let mut notes: Vec<u8> = pool.active_voices().map(Voice::note).collect();
        notes.sort_unstable();
        assert_eq!(notes, vec![64, 67], "the voice started first should be stolen");

        pool.allocate(60, 0.9, store.lookup(60).unwrap(), 44100.0);
        let mut notes: Vec<u8> = pool.active_voices().map(Voice::note).collect();
        notes.sort_unstable();
        assert_eq!(notes, vec![60, 67]);
    }

    #[test]
    fn empty_pool_allocates_nothing() {
        let store = store_with(&[60], vec![0.5; 16]);
        let mut pool = VoicePool::new(0);
        assert!(pool.allocate(60, 1.0, store.lookup(60).unwrap(), 44100.0).is_none());
    }

    #[test]
    fn voice_pool_stop_all() {
        let store = store_with(&[60, 64, 67], vec![0.5; 16]);
        let mut pool = VoicePool::new(4);
        for note in [60, 64, 67] {
            pool.allocate(note, 0.5, store.lookup(note).unwrap(), 44100.0);
        }
        pool.stop_all();
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn increment_follows_rate_ratio() {
        let store = store_with(&[60], vec![0.5; 16]);
        let res = store.lookup(60).unwrap();
        let mut voice = Voice::default();
        voice.start(60, res, 88200.0, 1.0, 0);
        assert_eq!(voice.increment(), 0.5);
        voice.set_sample_rate(res, 22050.0);
        assert_eq!(voice.increment(), 2.0);
    }

    #[test]
    fn identity_envelope_reproduces_sample_data() {
        let samples: Vec<f32> = (0..32).map(|i| i as f32 / 32.0).collect();
        let store = store_with(&[60], samples.clone());
        let res = store.lookup(60).unwrap();

        let mut left = vec![0.0f32; 64];
        let mut right = vec![0.0f32; 64];
        let mut voice = Voice::default();
        voice.start(60, res, 44100.0, 1.0, 0);
        let silent = {
            let mut output = [left.as_mut_slice(), right.as_mut_slice()];
            voice.render_into(&mut output, 0, 64, res, &identity(), 44100.0)
        };

        assert!(silent);
        assert!(!voice.is_active());
        assert_eq!(&left[..32], samples.as_slice());
        assert_eq!(&right[..32], samples.as_slice());
        assert!(left[32..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn exhausted_sample_retires_mid_sustain() {
        let store = store_with(&[60], vec![0.25; 100]);
        let res = store.lookup(60).unwrap();
        let params = EnvelopeParameters {
            attack: 0.0,
            decay: 0.0,
            sustain: 1.0,
            release: 5.0,
        };

        let mut buf = vec![0.0f32; 256];
        let mut voice = Voice::default();
        voice.start(60, res, 44100.0, 1.0, 0);
        let mut output = [buf.as_mut_slice()];
        assert!(!voice.render_into(&mut output, 0, 50, res, &params, 44100.0));
        assert_eq!(voice.envelope_stage(), EnvelopeStage::Sustain);
        assert!(voice.render_into(&mut output, 50, 206, res, &params, 44100.0));
        assert!(buf[..100].iter().all(|&s| s == 0.25));
        assert!(buf[100..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn exhausted_sample_retires_mid_release() {
        let store = store_with(&[60], vec![1.0; 100]);
        let res = store.lookup(60).unwrap();
        let params = EnvelopeParameters {
            attack: 0.0,
            decay: 0.0,
            sustain: 1.0,
            release: 5.0,
        };

        let mut buf = vec![0.0f32; 256];
        let mut voice = Voice::default();
        voice.start(60, res, 44100.0, 1.0, 0);
        let mut output = [buf.as_mut_slice()];
        voice.render_into(&mut output, 0, 10, res, &params, 44100.0);
        voice.note_off();
        assert!(voice.is_releasing());
        assert!(voice.render_into(&mut output, 10, 246, res, &params, 44100.0));
        assert!(buf[99] > 0.99, "release should barely have started");
        assert!(buf[100..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn velocity_scales_output() {
        let store = store_with(&[60], vec![0.5; 16]);
        let res = store.lookup(60).unwrap();
        let mut buf = vec![0.0f32; 8];
        let mut voice = Voice::default();
        voice.start(60, res, 44100.0, 0.5, 0);
        voice.render_into(&mut [buf.as_mut_slice()], 0, 8, res, &identity(), 44100.0);
        assert!(buf.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn render_adds_into_existing_content() {
        let store = store_with(&[60], vec![0.5; 16]);
        let res = store.lookup(60).unwrap();
        let mut buf = vec![0.1f32; 8];
        let mut voice = Voice::default();
        voice.start(60, res, 44100.0, 1.0, 0);
        voice.render_into(&mut [buf.as_mut_slice()], 0, 8, res, &identity(), 44100.0);
        assert!(buf.iter().all(|&s| (s - 0.6).abs() < 1e-6));
    }
}
