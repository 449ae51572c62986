//! A cloud of grains: a set of voices, triggered in turn at a rate derived from the grain
//! duration and overlap.

mod handle;
mod parameters;
mod spatial;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crossbeam_queue::ArrayQueue;
use rand::{rngs::SmallRng, Rng};
use strum::EnumCount;

use crate::{
    config::EngineConfig,
    envelope::{EnvelopeTables, EnvelopeType, WindowType},
    resolver::PositionResolver,
    sample::SampleSet,
    utils::{buffer::InterleavedBufferMut, time::RenderTime, unique_usize_id},
    voice::{GrainDirection, Voice, VoiceParameters},
    Error,
};

pub use handle::ClusterHandle;
pub use parameters::{ClusterParameters, DirectionMode};
pub use spatial::SpatialMode;

use spatial::Spatializer;

// -------------------------------------------------------------------------------------------------

/// A unique ID for a newly created cluster.
pub type ClusterId = usize;

// -------------------------------------------------------------------------------------------------

/// Control messages, sent from a [`ClusterHandle`] to its [`Cluster`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ClusterMessage {
    SetDurationMs(f32),
    SetOverlap(f32),
    SetPitch(f32),
    SetPitchLfoFreq(f32),
    SetPitchLfoAmount(f32),
    SetDirection(DirectionMode),
    SetWindow(WindowType),
    SetSpatialMode(SpatialMode, Option<usize>),
    SetVolumeDb(f32),
    AddVoice,
    RemoveVoice,
}

// -------------------------------------------------------------------------------------------------

/// Renders a cloud of grains from a shared sample set.
///
/// A cluster owns a fixed pool of [`Voice`]s, of which the first `voice_count` ones are in use.
/// Every "bang time" samples the next voice in round-robin order gets triggered with fresh start
/// positions from the cluster's [`PositionResolver`]. When that voice is still busy with its
/// previous grain, the trigger is retried on every following sub-block until it succeeds.
/// Retries keep the resolved start positions, but step the spatialization on every attempt.
///
/// The cluster itself lives on the render thread. Use the [`ClusterHandle`], which gets created
/// along with it, to change parameters from other threads. Parameter setters on the cluster
/// itself are meant for single threaded or offline use.
pub struct Cluster {
    id: ClusterId,
    sample_rate: u32,
    channel_count: usize,
    parameters: ClusterParameters,
    active: Arc<AtomicBool>,
    voices: Vec<Voice>,
    voice_count: usize,
    next_voice: usize,
    elapsed: f64,
    bang_time: f64,
    overlap_factor: f64,
    awaiting_play: bool,
    spatializer: Spatializer,
    channel_gains: Vec<f32>,
    start_positions: Vec<f64>,
    start_volumes: Vec<f32>,
    resolver: Box<dyn PositionResolver>,
    rng: SmallRng,
    message_queue: Arc<ArrayQueue<ClusterMessage>>,
}

impl Cluster {
    /// Create a new cluster with `voice_count` voices, rendering with the given config's output
    /// layout. Randomness is seeded from the config's seed, when present.
    ///
    /// Returns the cluster, which should be moved to the render thread, and its control handle.
    pub fn new(
        config: &EngineConfig,
        samples: SampleSet,
        envelopes: Arc<EnvelopeTables>,
        voice_count: usize,
        resolver: impl PositionResolver,
    ) -> Result<(Self, ClusterHandle), Error> {
        Self::with_rng(
            config,
            samples,
            envelopes,
            voice_count,
            Box::new(resolver),
            config.create_rng(0),
        )
    }

    /// Create a new cluster with an explicit random number generator.
    pub fn with_rng(
        config: &EngineConfig,
        samples: SampleSet,
        envelopes: Arc<EnvelopeTables>,
        voice_count: usize,
        resolver: Box<dyn PositionResolver>,
        rng: SmallRng,
    ) -> Result<(Self, ClusterHandle), Error> {
        config.validate()?;
        if voice_count == 0 || voice_count > config.max_voices {
            return Err(Error::ParameterError(format!(
                "cluster voice count must be in range 1..={}, but is '{voice_count}'",
                config.max_voices
            )));
        }

        let id = unique_usize_id();
        let sample_count = samples.len();
        let channel_count = config.channel_count;
        let sample_rate = config.sample_rate;
        let parameters = ClusterParameters::default();
        let active = Arc::new(AtomicBool::new(true));
        let message_queue = Arc::new(ArrayQueue::new(config.message_queue_size));

        let mut cluster = Self {
            id,
            sample_rate,
            channel_count,
            parameters,
            active: Arc::clone(&active),
            voices: Vec::with_capacity(config.max_voices),
            voice_count,
            next_voice: 0,
            elapsed: f64::INFINITY,
            bang_time: 0.0,
            overlap_factor: 1.0,
            awaiting_play: false,
            spatializer: Spatializer::new(channel_count),
            channel_gains: vec![1.0; channel_count],
            start_positions: vec![-1.0; sample_count],
            start_volumes: vec![0.0; sample_count],
            resolver,
            rng,
            message_queue: Arc::clone(&message_queue),
        };

        for _ in 0..config.max_voices {
            let voice_parameters = cluster.new_voice_parameters();
            cluster.voices.push(Voice::new(
                samples.clone(),
                Arc::clone(&envelopes),
                sample_rate,
                channel_count,
                voice_parameters,
            ));
        }
        cluster.update_bang_time();

        log::debug!(
            "Created cluster #{id} with {voice_count} voices and {sample_count} samples"
        );

        let handle = ClusterHandle::new(
            id,
            parameters,
            voice_count,
            config.max_voices,
            active,
            message_queue,
        );
        Ok((cluster, handle))
    }

    /// The cluster's unique id.
    pub fn id(&self) -> ClusterId {
        self.id
    }

    /// Number of voices in use.
    pub fn voice_count(&self) -> usize {
        self.voice_count
    }

    /// Upper limit for the voice count.
    pub fn max_voices(&self) -> usize {
        self.voices.len()
    }

    /// Current parameter set.
    pub fn parameters(&self) -> &ClusterParameters {
        &self.parameters
    }

    /// Interval between two grain triggers in samples.
    pub fn bang_time(&self) -> f64 {
        self.bang_time
    }

    /// Grain density multiplier, derived from overlap and voice count.
    pub fn overlap_factor(&self) -> f64 {
        self.overlap_factor
    }

    /// Inactive clusters render nothing and keep all their state.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn set_active(&mut self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    /// Flip the active state. Returns the new state.
    pub fn toggle_active(&mut self) -> bool {
        !self.active.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn set_duration_ms(&mut self, duration_ms: f32) {
        self.parameters.set_duration_ms(duration_ms);
        let duration_ms = self.parameters.duration_ms() as f64;
        for voice in &mut self.voices {
            voice.set_duration_ms(duration_ms);
        }
        self.update_bang_time();
    }

    pub fn set_overlap(&mut self, overlap: f32) {
        self.parameters.set_overlap(overlap);
        self.update_bang_time();
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.parameters.set_pitch(pitch);
        let pitch = self.parameters.pitch() as f64;
        for voice in &mut self.voices {
            voice.set_pitch(pitch);
        }
    }

    pub fn set_pitch_lfo_freq(&mut self, freq: f32) {
        self.parameters.set_pitch_lfo_freq(freq);
    }

    pub fn set_pitch_lfo_amount(&mut self, amount: f32) {
        self.parameters.set_pitch_lfo_amount(amount);
    }

    /// Set the direction of all voices. With [`DirectionMode::Random`], every voice picks its
    /// own direction.
    pub fn set_direction(&mut self, direction: DirectionMode) {
        self.parameters.set_direction(direction);
        for index in 0..self.voices.len() {
            let direction = self.next_grain_direction();
            self.voices[index].set_direction(direction);
        }
    }

    /// Set the window of all voices. With [`WindowType::Random`], every voice picks its own
    /// envelope.
    pub fn set_window(&mut self, window: WindowType) {
        self.parameters.set_window(window);
        for index in 0..self.voices.len() {
            let envelope = self.next_envelope();
            self.voices[index].set_window(envelope);
        }
    }

    /// Set the spatialization mode and an optional fixed output channel, which overrides the
    /// mode while it's in range.
    pub fn set_spatial_mode(&mut self, mode: SpatialMode, channel: Option<usize>) {
        self.parameters.set_spatial_mode(mode, channel);
    }

    pub fn set_volume_db(&mut self, volume_db: f32) {
        self.parameters.set_volume_db(volume_db);
        let volume = self.parameters.volume();
        for voice in &mut self.voices {
            voice.set_volume(volume);
        }
    }

    /// Mix the cluster's grains into the given interleaved buffer.
    ///
    /// `output` must have the cluster's channel layout and gets added to, so it should be
    /// cleared before rendering the first cluster into it. `time` is the render clock position
    /// of the buffer's first frame, which drives the pitch LFO.
    pub fn render(&mut self, output: &mut [f32], time: &RenderTime) {
        let channel_count = self.channel_count;
        let frame_count = output.len() / channel_count;
        if frame_count == 0 {
            return;
        }
        let block_size = (frame_count / 2).max(1);
        let mut offset = 0;
        while offset < frame_count {
            let block_frames = block_size.min(frame_count - offset);
            self.process_messages();
            if self.is_active() {
                if self.elapsed > self.bang_time || self.awaiting_play {
                    self.trigger_next_voice(time.seconds_at(offset));
                }
                self.elapsed += block_frames as f64;
                let block = output.frame_range_mut(channel_count, offset, block_frames);
                for voice in &mut self.voices[..self.voice_count] {
                    voice.render(block);
                }
            }
            offset += block_frames;
        }
    }

    fn trigger_next_voice(&mut self, time_in_seconds: f64) {
        if !self.awaiting_play {
            self.start_positions.fill(-1.0);
            self.start_volumes.fill(0.0);
            self.resolver.resolve(
                self.next_voice,
                self.parameters.duration_ms(),
                &mut self.start_positions,
                &mut self.start_volumes,
            );
        }
        self.spatializer.next_gains(
            self.parameters.spatial_mode(),
            self.parameters.spatial_channel(),
            &mut self.channel_gains,
        );

        let pitch = self.current_pitch(time_in_seconds);
        let voice = &mut self.voices[self.next_voice];
        voice.set_pitch(pitch);
        voice.set_channel_gains(&self.channel_gains);
        self.awaiting_play = voice.trigger(&self.start_positions, &self.start_volumes);
        if !self.awaiting_play {
            self.next_voice = (self.next_voice + 1) % self.voice_count;
            self.elapsed = 0.0;
        }
    }

    fn current_pitch(&self, time_in_seconds: f64) -> f64 {
        let pitch = self.parameters.pitch() as f64;
        let lfo_freq = self.parameters.pitch_lfo_freq() as f64;
        let lfo_amount = self.parameters.pitch_lfo_amount() as f64;
        if lfo_freq > 0.0 && lfo_amount > 0.0 {
            let lfo = (2.0 * std::f64::consts::PI * lfo_freq * time_in_seconds).sin();
            (pitch + lfo_amount * lfo)
                .abs()
                .max(ClusterParameters::MIN_PITCH as f64)
        } else {
            pitch
        }
    }

    fn process_messages(&mut self) {
        while let Some(message) = self.message_queue.pop() {
            match message {
                ClusterMessage::SetDurationMs(duration_ms) => self.set_duration_ms(duration_ms),
                ClusterMessage::SetOverlap(overlap) => self.set_overlap(overlap),
                ClusterMessage::SetPitch(pitch) => self.set_pitch(pitch),
                ClusterMessage::SetPitchLfoFreq(freq) => self.set_pitch_lfo_freq(freq),
                ClusterMessage::SetPitchLfoAmount(amount) => self.set_pitch_lfo_amount(amount),
                ClusterMessage::SetDirection(direction) => self.set_direction(direction),
                ClusterMessage::SetWindow(window) => self.set_window(window),
                ClusterMessage::SetSpatialMode(mode, channel) => {
                    self.set_spatial_mode(mode, channel)
                }
                ClusterMessage::SetVolumeDb(volume_db) => self.set_volume_db(volume_db),
                ClusterMessage::AddVoice => self.add_voice(),
                ClusterMessage::RemoveVoice => self.remove_voice(),
            }
        }
    }

    fn add_voice(&mut self) {
        if self.voice_count >= self.voices.len() {
            log::debug!("Cluster #{}: ignoring voice add, limit reached", self.id);
            return;
        }
        let direction = self.next_grain_direction();
        let envelope = self.next_envelope();
        let voice = &mut self.voices[self.voice_count];
        voice.reset();
        voice.set_direction(direction);
        voice.set_window(envelope);
        self.voice_count += 1;
        self.update_bang_time();
    }

    fn remove_voice(&mut self) {
        if self.voice_count <= 1 {
            log::debug!("Cluster #{}: ignoring removal of the last voice", self.id);
            return;
        }
        self.voice_count -= 1;
        self.voices[self.voice_count].reset();
        if self.next_voice >= self.voice_count {
            // the pending voice is gone: start over with fresh positions
            self.next_voice = 0;
            self.awaiting_play = false;
        }
        self.update_bang_time();
    }

    fn update_bang_time(&mut self) {
        self.overlap_factor = self.parameters.overlap_factor(self.voice_count);
        self.bang_time = self
            .parameters
            .bang_time(self.voice_count, self.sample_rate);
    }

    fn next_grain_direction(&mut self) -> GrainDirection {
        match self.parameters.direction() {
            DirectionMode::Forward => GrainDirection::Forward,
            DirectionMode::Backward => GrainDirection::Backward,
            DirectionMode::Random => {
                if self.rng.random_bool(0.5) {
                    GrainDirection::Backward
                } else {
                    GrainDirection::Forward
                }
            }
        }
    }

    fn next_envelope(&mut self) -> EnvelopeType {
        match self.parameters.window().envelope() {
            Some(envelope) => envelope,
            None => {
                let index = self.rng.random_range(0..EnvelopeType::COUNT);
                EnvelopeType::from_repr(index as u8).unwrap_or(EnvelopeType::Hanning)
            }
        }
    }

    fn new_voice_parameters(&mut self) -> VoiceParameters {
        let mut voice_parameters = VoiceParameters::new(self.channel_count);
        voice_parameters.pitch = self.parameters.pitch() as f64;
        voice_parameters.duration_ms = self.parameters.duration_ms() as f64;
        voice_parameters.direction = self.next_grain_direction();
        voice_parameters.envelope = self.next_envelope();
        voice_parameters.volume = self.parameters.volume();
        voice_parameters
    }
}

// -------------------------------------------------------------------------------------------------
