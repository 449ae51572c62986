//! A single grain voice: plays one windowed, pitched excerpt of all triggered samples at a time.

use std::sync::Arc;

use assume::assume;

use crate::{
    envelope::{EnvelopeTables, EnvelopeType},
    sample::SampleSet,
    utils::buffer::InterleavedBufferMut,
};

// -------------------------------------------------------------------------------------------------

/// Playback direction of a single grain.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    strum::VariantNames,
)]
#[repr(u8)]
pub enum GrainDirection {
    #[default]
    Forward,
    Backward,
}

impl GrainDirection {
    /// Playhead increment sign.
    #[inline]
    pub fn sign(&self) -> f64 {
        match self {
            GrainDirection::Forward => 1.0,
            GrainDirection::Backward => -1.0,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// The complete parameter set of a [`Voice`].
///
/// A voice holds two of these: the active set, which the grain in flight uses, and a queued set
/// which setters write to. The queued set replaces the active one as a whole when the next grain
/// gets triggered.
#[derive(Debug, PartialEq)]
pub struct VoiceParameters {
    /// Playback rate multiplier.
    pub pitch: f64,
    /// Grain length in milliseconds.
    pub duration_ms: f64,
    pub direction: GrainDirection,
    pub envelope: EnvelopeType,
    /// Linear gain applied to the whole grain.
    pub volume: f32,
    /// Linear gain per output channel.
    pub channel_gains: Vec<f32>,
}

impl VoiceParameters {
    pub fn new(channel_count: usize) -> Self {
        Self {
            pitch: 1.0,
            duration_ms: 500.0,
            direction: GrainDirection::Forward,
            envelope: EnvelopeType::Hanning,
            volume: 1.0,
            channel_gains: vec![1.0; channel_count],
        }
    }
}

impl Clone for VoiceParameters {
    fn clone(&self) -> Self {
        Self {
            pitch: self.pitch,
            duration_ms: self.duration_ms,
            direction: self.direction,
            envelope: self.envelope,
            volume: self.volume,
            channel_gains: self.channel_gains.clone(),
        }
    }

    // reuses the channel gain buffer: applied in the audio thread
    fn clone_from(&mut self, source: &Self) {
        self.pitch = source.pitch;
        self.duration_ms = source.duration_ms;
        self.direction = source.direction;
        self.envelope = source.envelope;
        self.volume = source.volume;
        self.channel_gains.clone_from(&source.channel_gains);
    }
}

// -------------------------------------------------------------------------------------------------

/// The reusable playback unit of a cluster, rendering one grain at a time.
///
/// A voice is either idle or playing. [`trigger`](Self::trigger) starts a new grain on an idle
/// voice. The grain ends by itself as soon as the envelope has been read through completely.
///
/// Parameter setters never touch the grain in flight: they only change the queued parameter set,
/// which becomes active with the next trigger.
pub struct Voice {
    samples: SampleSet,
    envelopes: Arc<EnvelopeTables>,
    sample_rate: u32,
    channel_count: usize,
    playing: bool,
    active_samples: Vec<usize>,
    play_positions: Vec<f64>,
    play_volumes: Vec<f32>,
    window_reader: f64,
    window_increment: f64,
    parameters: VoiceParameters,
    queued_parameters: VoiceParameters,
    parameters_changed: bool,
}

impl Voice {
    /// Create a new idle voice for the given sample set and output layout.
    pub fn new(
        samples: SampleSet,
        envelopes: Arc<EnvelopeTables>,
        sample_rate: u32,
        channel_count: usize,
        parameters: VoiceParameters,
    ) -> Self {
        debug_assert!(sample_rate > 0, "Invalid sample rate");
        debug_assert_eq!(
            parameters.channel_gains.len(),
            channel_count,
            "Channel gains must match the output channel count"
        );
        let sample_count = samples.len();
        let queued_parameters = parameters.clone();
        let mut voice = Self {
            samples,
            envelopes,
            sample_rate,
            channel_count,
            playing: false,
            active_samples: Vec::with_capacity(sample_count),
            play_positions: vec![-1.0; sample_count],
            play_volumes: vec![0.0; sample_count],
            window_reader: 0.0,
            window_increment: 0.0,
            parameters,
            queued_parameters,
            parameters_changed: false,
        };
        voice.update_window_increment();
        voice
    }

    /// True while a grain is in flight.
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// The parameters the current (or last) grain plays with.
    pub fn parameters(&self) -> &VoiceParameters {
        &self.parameters
    }

    /// The parameters the next grain will play with.
    pub fn queued_parameters(&self) -> &VoiceParameters {
        &self.queued_parameters
    }

    /// True when queued parameters are waiting for the next trigger.
    pub fn has_pending_parameters(&self) -> bool {
        self.parameters_changed
    }

    /// Grain length of the active parameter set in samples.
    pub fn duration_in_samples(&self) -> f64 {
        (self.parameters.duration_ms * self.sample_rate as f64 * 0.001)
            .ceil()
            .max(1.0)
    }

    pub fn set_pitch(&mut self, pitch: f64) {
        if self.queued_parameters.pitch != pitch {
            self.queued_parameters.pitch = pitch;
            self.parameters_changed = true;
        }
    }

    pub fn set_duration_ms(&mut self, duration_ms: f64) {
        let duration_ms = duration_ms.abs();
        if self.queued_parameters.duration_ms != duration_ms {
            self.queued_parameters.duration_ms = duration_ms;
            self.parameters_changed = true;
        }
    }

    pub fn set_direction(&mut self, direction: GrainDirection) {
        if self.queued_parameters.direction != direction {
            self.queued_parameters.direction = direction;
            self.parameters_changed = true;
        }
    }

    pub fn set_window(&mut self, envelope: EnvelopeType) {
        if self.queued_parameters.envelope != envelope {
            self.queued_parameters.envelope = envelope;
            self.parameters_changed = true;
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        let volume = volume.abs();
        if self.queued_parameters.volume != volume {
            self.queued_parameters.volume = volume;
            self.parameters_changed = true;
        }
    }

    /// Set the per output channel gains. Missing channels keep their previous gain.
    pub fn set_channel_gains(&mut self, gains: &[f32]) {
        let count = gains.len().min(self.queued_parameters.channel_gains.len());
        self.queued_parameters.channel_gains[..count].copy_from_slice(&gains[..count]);
        self.parameters_changed = true;
    }

    /// Start a new grain.
    ///
    /// `start_positions` holds a normalized start position for every sample in the sample set.
    /// Negative positions leave the sample out. `start_volumes` holds the sample's gains.
    ///
    /// Returns `true` when the voice is still busy playing the previous grain: the trigger then
    /// got refused and should be retried later.
    pub fn trigger(&mut self, start_positions: &[f64], start_volumes: &[f32]) -> bool {
        if self.playing {
            return true;
        }
        if self.parameters_changed {
            self.apply_queued_parameters();
        }

        self.active_samples.clear();
        for (index, sample) in self.samples.iter().enumerate() {
            let position = start_positions.get(index).copied().unwrap_or(-1.0);
            if position.is_nan() || position < 0.0 || sample.frame_count() == 0 {
                self.play_positions[index] = -1.0;
                continue;
            }
            let last_frame = (sample.frame_count() - 1) as f64;
            self.active_samples.push(index);
            self.play_positions[index] = (position.min(1.0) * last_frame).floor();
            self.play_volumes[index] = start_volumes.get(index).copied().unwrap_or(0.0);
        }

        self.window_reader = 0.0;
        self.playing = true;
        false
    }

    /// Stop the grain in flight immediately, without any fade out.
    pub fn reset(&mut self) {
        self.playing = false;
        self.window_reader = 0.0;
        self.active_samples.clear();
    }

    /// Mix the grain in flight into the given interleaved buffer.
    ///
    /// Every written sample gets hard-clipped to \[-1, 1\]. When the envelope runs out within
    /// the buffer, the remaining frames are left untouched and the voice turns idle.
    pub fn render(&mut self, output: &mut [f32]) {
        if !self.playing {
            return;
        }

        let envelopes = &*self.envelopes;
        let envelope = self.parameters.envelope;
        let last_table_index = (envelopes.len() - 1) as f64;
        let playhead_increment = self.parameters.pitch * self.parameters.direction.sign();
        let volume = self.parameters.volume;
        let channel_gains = &self.parameters.channel_gains;

        for frame in output.frames_mut(self.channel_count) {
            if self.window_reader > last_table_index {
                self.window_reader = 0.0;
                self.playing = false;
                self.active_samples.clear();
                return;
            }
            let window_value = envelopes.sample(envelope, self.window_reader);
            self.window_reader += self.window_increment;

            let mut mono = 0.0;
            let mut left = 0.0;
            let mut right = 0.0;
            for &sample_index in &self.active_samples {
                let position = self.play_positions[sample_index];
                if position < 0.0 {
                    continue;
                }
                let sample = &self.samples[sample_index];
                let amplitude = window_value * self.play_volumes[sample_index];
                let frame_count = sample.frame_count();
                let buffer = sample.buffer();
                match sample.channel_count() {
                    1 => match interpolate(buffer, 1, 0, frame_count, position) {
                        Some(value) => {
                            mono += value * amplitude;
                            self.play_positions[sample_index] += playhead_increment;
                        }
                        None => self.play_positions[sample_index] = -1.0,
                    },
                    2 => match (
                        interpolate(buffer, 2, 0, frame_count, position),
                        interpolate(buffer, 2, 1, frame_count, position),
                    ) {
                        (Some(l), Some(r)) => {
                            left += l * amplitude;
                            right += r * amplitude;
                            self.play_positions[sample_index] += playhead_increment;
                        }
                        _ => self.play_positions[sample_index] = -1.0,
                    },
                    _ => (),
                }
            }

            for (channel, (output, gain)) in frame.iter_mut().zip(channel_gains).enumerate() {
                let value = if channel % 2 == 0 {
                    left + mono
                } else {
                    right + mono
                };
                *output = (*output + value * gain * volume).clamp(-1.0, 1.0);
            }
        }
    }

    fn apply_queued_parameters(&mut self) {
        self.parameters.clone_from(&self.queued_parameters);
        self.update_window_increment();
        self.parameters_changed = false;
    }

    fn update_window_increment(&mut self) {
        self.window_increment = self.envelopes.len() as f64 / self.duration_in_samples();
    }
}

// -------------------------------------------------------------------------------------------------

/// Linearly interpolated read of a single channel at a fractional frame position.
/// Returns `None` when the position is outside of `0..=frame_count - 1`.
#[inline]
fn interpolate(
    buffer: &[f32],
    channel_count: usize,
    channel: usize,
    frame_count: usize,
    position: f64,
) -> Option<f32> {
    if position < 0.0 || frame_count == 0 || position > (frame_count - 1) as f64 {
        return None;
    }
    let index = position as usize;
    let fraction = (position - index as f64) as f32;
    let current_index = index * channel_count + channel;
    assume!(unsafe: current_index < buffer.len(), "position is checked against frame count");
    let current = buffer[current_index];
    if index + 1 < frame_count {
        let next_index = current_index + channel_count;
        assume!(unsafe: next_index < buffer.len(), "next frame is checked against frame count");
        Some((1.0 - fraction) * current + fraction * buffer[next_index])
    } else {
        Some(current)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{sample::Sample, Error};

    const SAMPLE_RATE: u32 = 1000;

    fn sample_set(samples: Vec<Sample>) -> SampleSet {
        samples.into()
    }

    fn new_voice(samples: SampleSet, channel_count: usize, duration_ms: f64) -> Voice {
        let mut parameters = VoiceParameters::new(channel_count);
        parameters.duration_ms = duration_ms;
        parameters.envelope = EnvelopeType::Triangle;
        Voice::new(
            samples,
            Arc::new(EnvelopeTables::new(64)),
            SAMPLE_RATE,
            channel_count,
            parameters,
        )
    }

    #[test]
    fn trigger_refused_while_playing() -> Result<(), Error> {
        let samples = sample_set(vec![Sample::new("ones", 1, SAMPLE_RATE, vec![1.0; 100])?]);
        let mut voice = new_voice(samples, 1, 10.0);
        assert!(!voice.is_playing());
        assert!(!voice.trigger(&[0.0], &[1.0]));
        assert!(voice.is_playing());
        assert!(voice.trigger(&[0.0], &[1.0]));

        // 10 ms at 1 kHz: the grain lasts exactly 10 frames
        let mut output = vec![0.0; 10];
        voice.render(&mut output);
        assert!(voice.is_playing());
        let mut output = vec![0.0; 1];
        voice.render(&mut output);
        assert!(!voice.is_playing());
        assert_eq!(output[0], 0.0);
        assert!(!voice.trigger(&[0.5], &[1.0]));
        Ok(())
    }

    #[test]
    fn queued_parameters_apply_on_trigger() -> Result<(), Error> {
        let samples = sample_set(vec![Sample::new("ramp", 1, SAMPLE_RATE, vec![0.5; 100])?]);
        let mut voice = new_voice(samples, 2, 10.0);
        voice.trigger(&[0.0], &[1.0]);

        voice.set_pitch(2.0);
        voice.set_duration_ms(20.0);
        voice.set_direction(GrainDirection::Backward);
        voice.set_window(EnvelopeType::Hanning);
        voice.set_volume(0.5);
        voice.set_channel_gains(&[0.0, 1.0]);
        assert!(voice.has_pending_parameters());
        assert_eq!(voice.parameters().pitch, 1.0);
        assert_eq!(voice.queued_parameters().pitch, 2.0);

        // grain in flight keeps its parameters
        let mut output = vec![0.0; 2 * 5];
        voice.render(&mut output);
        assert_eq!(voice.parameters().duration_ms, 10.0);
        assert_eq!(voice.parameters().envelope, EnvelopeType::Triangle);
        assert_eq!(output[2], output[3]);

        let mut output = vec![0.0; 2 * 20];
        voice.render(&mut output);
        assert!(!voice.is_playing());

        voice.trigger(&[1.0], &[1.0]);
        assert!(!voice.has_pending_parameters());
        assert_eq!(voice.parameters(), voice.queued_parameters());
        assert_eq!(voice.parameters().direction, GrainDirection::Backward);
        assert_eq!(voice.duration_in_samples(), 20.0);

        let mut output = vec![0.0; 2 * 10];
        voice.render(&mut output);
        for frame in output.chunks(2) {
            assert_eq!(frame[0], 0.0);
        }
        assert!(output.iter().skip(3).step_by(2).any(|v| *v > 0.0));
        Ok(())
    }

    #[test]
    fn mono_and_stereo_accumulation() -> Result<(), Error> {
        let samples = sample_set(vec![
            Sample::new("mono", 1, SAMPLE_RATE, vec![0.25; 100])?,
            Sample::from_planar("stereo", SAMPLE_RATE, &[vec![0.1; 100], vec![-0.1; 100]])?,
        ]);
        let mut voice = new_voice(samples, 2, 10.0);
        voice.set_window(EnvelopeType::ExpDecay);
        voice.trigger(&[0.0, 0.0], &[1.0, 1.0]);

        let mut output = vec![0.0; 2];
        voice.render(&mut output);
        // exp decay starts at 1.0
        assert!((output[0] - 0.35).abs() < 1e-6);
        assert!((output[1] - 0.15).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn hard_clipping() -> Result<(), Error> {
        let samples = sample_set(vec![Sample::new("loud", 1, SAMPLE_RATE, vec![1.0; 100])?]);
        let mut voice = new_voice(samples, 1, 10.0);
        voice.set_window(EnvelopeType::ExpDecay);
        voice.trigger(&[0.0], &[4.0]);
        let mut output = vec![0.5; 10];
        voice.render(&mut output);
        assert!(output.iter().all(|v| (-1.0..=1.0).contains(v)));
        assert_eq!(output[0], 1.0);
        Ok(())
    }

    #[test]
    fn playhead_leaves_sample() -> Result<(), Error> {
        let samples = sample_set(vec![Sample::new("short", 1, SAMPLE_RATE, vec![1.0; 4])?]);
        let mut voice = new_voice(samples, 1, 10.0);
        voice.set_window(EnvelopeType::ExpDecay);
        voice.trigger(&[0.0], &[1.0]);
        let mut output = vec![0.0; 10];
        voice.render(&mut output);
        assert!(output[..4].iter().all(|v| *v > 0.0));
        assert!(output[4..].iter().all(|v| *v == 0.0));
        // still playing the silent rest of the envelope
        assert!(voice.is_playing());
        Ok(())
    }

    #[test]
    fn negative_positions_skip_samples() -> Result<(), Error> {
        let samples = sample_set(vec![
            Sample::new("a", 1, SAMPLE_RATE, vec![1.0; 100])?,
            Sample::new("b", 1, SAMPLE_RATE, vec![1.0; 100])?,
        ]);
        let mut voice = new_voice(samples, 1, 10.0);
        voice.set_window(EnvelopeType::ExpDecay);
        voice.trigger(&[-1.0, 0.5], &[1.0, 0.5]);
        let mut output = vec![0.0; 1];
        voice.render(&mut output);
        assert!((output[0] - 0.5).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn early_finishing_voice_does_not_affect_others() -> Result<(), Error> {
        let samples = sample_set(vec![Sample::new("ones", 1, SAMPLE_RATE, vec![0.25; 200])?]);
        let mut short_voice = new_voice(samples.clone(), 1, 10.0);
        let mut long_voice = new_voice(samples, 1, 50.0);

        let mut short_output = vec![0.0; 32];
        let mut long_output = vec![0.0; 32];
        let mut mixed_output = vec![0.0; 32];

        short_voice.trigger(&[0.0], &[1.0]);
        long_voice.trigger(&[0.0], &[1.0]);
        short_voice.render(&mut short_output);
        long_voice.render(&mut long_output);

        short_voice.reset();
        long_voice.reset();
        short_voice.trigger(&[0.0], &[1.0]);
        long_voice.trigger(&[0.0], &[1.0]);
        short_voice.render(&mut mixed_output);
        long_voice.render(&mut mixed_output);

        assert!(!short_voice.is_playing());
        assert!(long_voice.is_playing());
        assert!(short_output[10..].iter().all(|v| *v == 0.0));
        assert!(long_output[10..].iter().any(|v| *v > 0.0));
        for ((mixed, short), long) in mixed_output.iter().zip(&short_output).zip(&long_output) {
            assert!((mixed - (short + long)).abs() < 1e-6);
        }
        Ok(())
    }
}
