//! Immutable, preloaded sample material which grains are read from.

use std::sync::Arc;

use crate::{utils::buffer::planar_to_interleaved, Error};

// -------------------------------------------------------------------------------------------------

/// A shared, read-only collection of samples. Voices and clusters only hold clones of the `Arc`.
pub type SampleSet = Arc<[Sample]>;

// -------------------------------------------------------------------------------------------------

/// Decoded PCM sample data with 1 or 2 interleaved channels.
///
/// Samples are never resampled: a sample with a native rate that differs from the engine's
/// rate plays back pitch-shifted.
#[derive(Debug, Clone)]
pub struct Sample {
    name: String,
    channel_count: usize,
    frame_count: usize,
    sample_rate: u32,
    buffer: Arc<[f32]>,
}

impl Sample {
    /// Create a new sample from an interleaved buffer.
    pub fn new<S: Into<String>>(
        name: S,
        channel_count: usize,
        sample_rate: u32,
        buffer: Vec<f32>,
    ) -> Result<Self, Error> {
        let name = name.into();
        if !(1..=2).contains(&channel_count) {
            return Err(Error::SampleError(format!(
                "'{name}' has {channel_count} channels, but only mono and stereo are supported"
            )));
        }
        if sample_rate == 0 {
            return Err(Error::SampleError(format!("'{name}' has a zero sample rate")));
        }
        if buffer.len() % channel_count != 0 {
            return Err(Error::SampleError(format!(
                "'{name}' buffer length {} is not a multiple of its channel count",
                buffer.len()
            )));
        }
        let frame_count = buffer.len() / channel_count;
        Ok(Self {
            name,
            channel_count,
            frame_count,
            sample_rate,
            buffer: buffer.into(),
        })
    }

    /// Create a new sample from planar (one buffer per channel) data.
    pub fn from_planar<S: Into<String>>(
        name: S,
        sample_rate: u32,
        planar: &[Vec<f32>],
    ) -> Result<Self, Error> {
        let name = name.into();
        let frame_count = planar.first().map(|c| c.len()).unwrap_or(0);
        if planar.iter().any(|channel| channel.len() != frame_count) {
            return Err(Error::SampleError(format!(
                "'{name}' planar channels have different lengths"
            )));
        }
        let mut interleaved = vec![0.0; frame_count * planar.len()];
        planar_to_interleaved(planar, &mut interleaved);
        Self::new(name, planar.len(), sample_rate, interleaved)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The interleaved PCM data.
    #[inline]
    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction() -> Result<(), Error> {
        let mono = Sample::new("mono", 1, 44100, vec![0.0; 100])?;
        assert_eq!(mono.frame_count(), 100);
        assert_eq!(mono.channel_count(), 1);
        assert_eq!(mono.name(), "mono");

        let stereo = Sample::from_planar("stereo", 48000, &[vec![1.0; 10], vec![-1.0; 10]])?;
        assert_eq!(stereo.frame_count(), 10);
        assert_eq!(stereo.channel_count(), 2);
        assert_eq!(&stereo.buffer()[..4], &[1.0, -1.0, 1.0, -1.0]);
        Ok(())
    }

    #[test]
    fn invalid_layouts() {
        assert!(Sample::new("surround", 6, 44100, vec![0.0; 60]).is_err());
        assert!(Sample::new("odd", 2, 44100, vec![0.0; 11]).is_err());
        assert!(Sample::new("no rate", 1, 0, vec![0.0; 11]).is_err());
        assert!(Sample::from_planar("ragged", 44100, &[vec![0.0; 2], vec![0.0; 3]]).is_err());
    }
}
