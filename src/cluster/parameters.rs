use strum::EnumCount;

use super::spatial::SpatialMode;
use crate::{envelope::WindowType, utils::db_to_linear};

// -------------------------------------------------------------------------------------------------

/// Playback direction selection for all grains of a cluster.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::Display,
    strum::VariantNames,
    strum::EnumIter,
    strum::EnumCount,
    strum::FromRepr,
)]
#[repr(u8)]
pub enum DirectionMode {
    #[default]
    Forward = 0,
    Backward = 1,
    /// Each voice picks a direction at random.
    Random = 2,
}

impl DirectionMode {
    /// Step through all modes, wrapping around at both ends.
    pub fn cycled(self, steps: isize) -> Self {
        let index = (self as isize + steps).rem_euclid(Self::COUNT as isize);
        Self::from_repr(index as u8).unwrap_or(self)
    }
}

// -------------------------------------------------------------------------------------------------

/// All user facing parameters of a cluster.
///
/// Setters clamp their values into the valid ranges and ignore NaN values, so a parameter set
/// is always valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParameters {
    duration_ms: f32,
    overlap: f32,
    pitch: f32,
    pitch_lfo_freq: f32,
    pitch_lfo_amount: f32,
    direction: DirectionMode,
    window: WindowType,
    spatial_mode: SpatialMode,
    spatial_channel: Option<usize>,
    volume_db: f32,
}

impl Default for ClusterParameters {
    fn default() -> Self {
        Self {
            duration_ms: 500.0,
            overlap: 1.0,
            pitch: 1.0,
            pitch_lfo_freq: 0.01,
            pitch_lfo_amount: 0.0,
            direction: DirectionMode::Forward,
            window: WindowType::Hanning,
            spatial_mode: SpatialMode::Unity,
            spatial_channel: None,
            volume_db: 0.0,
        }
    }
}

impl ClusterParameters {
    /// Shortest grain duration in milliseconds.
    pub const MIN_DURATION_MS: f32 = 1.0;
    /// Lowest playback rate.
    pub const MIN_PITCH: f32 = 0.0001;
    pub const MIN_VOLUME_DB: f32 = -60.0;
    pub const MAX_VOLUME_DB: f32 = 6.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Grain duration in milliseconds.
    pub fn duration_ms(&self) -> f32 {
        self.duration_ms
    }
    pub fn set_duration_ms(&mut self, duration_ms: f32) {
        if !duration_ms.is_nan() {
            self.duration_ms = duration_ms.max(Self::MIN_DURATION_MS);
        }
    }

    /// Normalized grain overlap in range `0..=1`.
    pub fn overlap(&self) -> f32 {
        self.overlap
    }
    pub fn set_overlap(&mut self, overlap: f32) {
        if !overlap.is_nan() {
            self.overlap = overlap.clamp(0.0, 1.0);
        }
    }

    /// Playback rate of the grains.
    pub fn pitch(&self) -> f32 {
        self.pitch
    }
    pub fn set_pitch(&mut self, pitch: f32) {
        if !pitch.is_nan() {
            self.pitch = pitch.max(Self::MIN_PITCH);
        }
    }

    /// Pitch LFO frequency in Hz.
    pub fn pitch_lfo_freq(&self) -> f32 {
        self.pitch_lfo_freq
    }
    pub fn set_pitch_lfo_freq(&mut self, freq: f32) {
        if !freq.is_nan() {
            self.pitch_lfo_freq = freq.abs();
        }
    }

    /// Pitch LFO depth, added to and subtracted from the pitch.
    pub fn pitch_lfo_amount(&self) -> f32 {
        self.pitch_lfo_amount
    }
    pub fn set_pitch_lfo_amount(&mut self, amount: f32) {
        if !amount.is_nan() {
            self.pitch_lfo_amount = amount.max(0.0);
        }
    }

    pub fn direction(&self) -> DirectionMode {
        self.direction
    }
    pub fn set_direction(&mut self, direction: DirectionMode) {
        self.direction = direction;
    }

    pub fn window(&self) -> WindowType {
        self.window
    }
    pub fn set_window(&mut self, window: WindowType) {
        self.window = window;
    }

    pub fn spatial_mode(&self) -> SpatialMode {
        self.spatial_mode
    }
    /// Fixed output channel, which overrides the spatial mode when set.
    pub fn spatial_channel(&self) -> Option<usize> {
        self.spatial_channel
    }
    pub fn set_spatial_mode(&mut self, mode: SpatialMode, channel: Option<usize>) {
        self.spatial_mode = mode;
        self.spatial_channel = channel;
    }

    /// Cluster volume in decibels.
    pub fn volume_db(&self) -> f32 {
        self.volume_db
    }
    /// Cluster volume as linear gain.
    pub fn volume(&self) -> f32 {
        db_to_linear(self.volume_db)
    }
    pub fn set_volume_db(&mut self, volume_db: f32) {
        if !volume_db.is_nan() {
            self.volume_db = volume_db.clamp(Self::MIN_VOLUME_DB, Self::MAX_VOLUME_DB);
        }
    }

    /// Density multiplier for the given number of voices: `exp(ln(voices) * overlap)`.
    ///
    /// With an overlap of 0 grains play back to back, with an overlap of 1 all voices play
    /// at the same time.
    pub fn overlap_factor(&self, voice_count: usize) -> f64 {
        debug_assert!(voice_count > 0, "Invalid voice count");
        ((voice_count.max(1) as f64).ln() * self.overlap as f64).exp()
    }

    /// Interval between two grain triggers in samples.
    pub fn bang_time(&self, voice_count: usize, sample_rate: u32) -> f64 {
        self.duration_ms as f64 * sample_rate as f64 * 0.001 / self.overlap_factor(voice_count)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let parameters = ClusterParameters::default();
        assert_eq!(parameters.duration_ms(), 500.0);
        assert_eq!(parameters.overlap(), 1.0);
        assert_eq!(parameters.pitch(), 1.0);
        assert_eq!(parameters.pitch_lfo_freq(), 0.01);
        assert_eq!(parameters.pitch_lfo_amount(), 0.0);
        assert_eq!(parameters.direction(), DirectionMode::Forward);
        assert_eq!(parameters.window(), WindowType::Hanning);
        assert_eq!(parameters.spatial_mode(), SpatialMode::Unity);
        assert_eq!(parameters.spatial_channel(), None);
        assert_eq!(parameters.volume_db(), 0.0);
        assert_eq!(parameters.volume(), 1.0);
    }

    #[test]
    fn clamping() {
        let mut parameters = ClusterParameters::new();
        parameters.set_volume_db(100.0);
        assert_eq!(parameters.volume_db(), 6.0);
        parameters.set_volume_db(-1000.0);
        assert_eq!(parameters.volume_db(), -60.0);
        parameters.set_overlap(2.0);
        assert_eq!(parameters.overlap(), 1.0);
        parameters.set_overlap(-1.0);
        assert_eq!(parameters.overlap(), 0.0);
        parameters.set_duration_ms(0.1);
        assert_eq!(parameters.duration_ms(), 1.0);
        parameters.set_pitch(0.0);
        assert_eq!(parameters.pitch(), ClusterParameters::MIN_PITCH);
        parameters.set_pitch_lfo_freq(-2.0);
        assert_eq!(parameters.pitch_lfo_freq(), 2.0);
        parameters.set_pitch_lfo_amount(-0.5);
        assert_eq!(parameters.pitch_lfo_amount(), 0.0);
        parameters.set_pitch(f32::NAN);
        assert_eq!(parameters.pitch(), ClusterParameters::MIN_PITCH);

        // clamping is idempotent
        let clamped = parameters;
        parameters.set_volume_db(clamped.volume_db());
        parameters.set_overlap(clamped.overlap());
        parameters.set_duration_ms(clamped.duration_ms());
        parameters.set_pitch(clamped.pitch());
        assert_eq!(parameters, clamped);
    }

    #[test]
    fn trigger_interval() {
        let mut parameters = ClusterParameters::new();
        parameters.set_duration_ms(500.0);
        parameters.set_overlap(0.0);
        assert_eq!(parameters.overlap_factor(8), 1.0);
        assert!((parameters.bang_time(8, 44100) - 22050.0).abs() < 1e-9);

        parameters.set_overlap(1.0);
        assert!((parameters.overlap_factor(8) - 8.0).abs() < 1e-9);
        assert!((parameters.bang_time(8, 44100) - 2756.25).abs() < 1e-6);

        parameters.set_overlap(0.5);
        assert!((parameters.overlap_factor(4) - 2.0).abs() < 1e-9);
        // a single voice is never overlapped
        assert_eq!(parameters.overlap_factor(1), 1.0);
    }

    #[test]
    fn cycled_directions() {
        assert_eq!(DirectionMode::Forward.cycled(-1), DirectionMode::Random);
        assert_eq!(DirectionMode::Random.cycled(1), DirectionMode::Forward);
        assert_eq!(DirectionMode::Forward.to_string(), "Forward");
    }
}
