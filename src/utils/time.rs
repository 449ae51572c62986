use std::time::Duration;

// -------------------------------------------------------------------------------------------------

pub type SampleTime = u64;

// -------------------------------------------------------------------------------------------------

/// Position of the render clock at the start of a rendered buffer.
///
/// The clock counts sample frames since the engine started rendering, so the time of any frame
/// within the buffer can be derived without accumulating floating point errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTime {
    /// Frames rendered before the current buffer.
    pub pos_in_frames: SampleTime,
    /// Output sample rate.
    pub sample_rate: u32,
}

impl RenderTime {
    pub fn new(pos_in_frames: SampleTime, sample_rate: u32) -> Self {
        debug_assert!(sample_rate > 0, "Invalid sample rate");
        Self {
            pos_in_frames,
            sample_rate,
        }
    }

    /// Time in seconds at the start of the buffer.
    #[inline]
    pub fn seconds(&self) -> f64 {
        self.seconds_at(0)
    }

    /// Time in seconds of the given frame offset within the buffer.
    #[inline]
    pub fn seconds_at(&self, frame_offset: usize) -> f64 {
        (self.pos_in_frames + frame_offset as SampleTime) as f64 / self.sample_rate as f64
    }

    /// Time of the buffer start as duration.
    pub fn duration(&self) -> Duration {
        Self::sample_time_to_duration(self.pos_in_frames, self.sample_rate)
    }

    /// Convert a duration to sample frames with the given sample rate.
    pub fn duration_to_sample_time(duration: Duration, sample_rate: u32) -> SampleTime {
        debug_assert!(sample_rate > 0, "Invalid sample rate");
        (duration.as_secs_f64() * sample_rate as f64) as SampleTime
    }

    /// Convert sample frames to a duration with the given sample rate.
    pub fn sample_time_to_duration(sample_time: SampleTime, sample_rate: u32) -> Duration {
        debug_assert!(sample_rate > 0, "Invalid sample rate");
        Duration::from_secs_f64(sample_time as f64 / sample_rate as f64)
    }
}

// -------------------------------------------------------------------------------------------------
