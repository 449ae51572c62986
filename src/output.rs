//! Drivers which pull audio from an [`AudioRenderer`].

#[cfg(feature = "wav-output")]
pub mod wav;

use crate::engine::Engine;

// -------------------------------------------------------------------------------------------------

/// Something which fills interleaved output buffers on demand, with a fixed channel layout and
/// sample rate.
pub trait AudioRenderer: Send {
    /// Channel count of the rendered buffers.
    fn channel_count(&self) -> usize;
    /// Sample rate of the rendered buffers.
    fn sample_rate(&self) -> u32;
    /// Overwrite the given buffer with the next block of audio.
    fn render(&mut self, output: &mut [f32]);
}

impl AudioRenderer for Engine {
    fn channel_count(&self) -> usize {
        Engine::channel_count(self)
    }

    fn sample_rate(&self) -> u32 {
        Engine::sample_rate(self)
    }

    fn render(&mut self, output: &mut [f32]) {
        Engine::render(self, output)
    }
}
