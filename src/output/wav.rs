use std::{fs::File, io::BufWriter, path::Path, time::Duration};

use hound::{SampleFormat, WavSpec, WavWriter};

use super::AudioRenderer;
use crate::{utils::time::RenderTime, Error};

// -------------------------------------------------------------------------------------------------

const BUFFER_SIZE_FRAMES: usize = 1024;

// -------------------------------------------------------------------------------------------------

/// Offline output, which renders audio as fast as possible into a wav file.
///
/// Wav files contents are always saved as 32bit floats. The file gets finalized when calling
/// [`finalize`](Self::finalize), or when the output is dropped.
pub struct WavOutput {
    writer: Option<WavWriter<BufWriter<File>>>,
    channel_count: usize,
    sample_rate: u32,
    buffer: Vec<f32>,
    frames_written: u64,
}

impl WavOutput {
    /// Create a new wav file with the given specs.
    ///
    /// * `file_path`: Target file path. Should end with ".wav" extension.
    /// * `sample_rate`: The wav file's and renderer's sample rate.
    /// * `channel_count`: The wav file's and renderer's channel layout.
    pub fn open<P: AsRef<Path>>(
        file_path: P,
        sample_rate: u32,
        channel_count: usize,
    ) -> Result<Self, Error> {
        if channel_count == 0 || channel_count > u16::MAX as usize {
            return Err(Error::ParameterError(format!(
                "invalid wav channel count '{channel_count}'"
            )));
        }
        let spec = WavSpec {
            channels: channel_count as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let writer = WavWriter::create(file_path, spec)?;
        Ok(Self {
            writer: Some(writer),
            channel_count,
            sample_rate,
            buffer: vec![0.0; BUFFER_SIZE_FRAMES * channel_count],
            frames_written: 0,
        })
    }

    /// Create a new wav file with the renderer's sample rate and channel layout.
    pub fn open_for<P: AsRef<Path>, R: AudioRenderer>(
        file_path: P,
        renderer: &R,
    ) -> Result<Self, Error> {
        Self::open(file_path, renderer.sample_rate(), renderer.channel_count())
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Render the given duration of audio from the renderer into the file, in blocks of
    /// `BUFFER_SIZE_FRAMES`. Returns the number of frames written.
    pub fn write<R: AudioRenderer>(
        &mut self,
        renderer: &mut R,
        duration: Duration,
    ) -> Result<u64, Error> {
        if renderer.channel_count() != self.channel_count
            || renderer.sample_rate() != self.sample_rate
        {
            return Err(Error::ParameterError(format!(
                "renderer layout ({} channels, {} Hz) does not match the wav file's layout \
                ({} channels, {} Hz)",
                renderer.channel_count(),
                renderer.sample_rate(),
                self.channel_count,
                self.sample_rate
            )));
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::OutputError("wav file already got finalized".into()))?;

        let total_frames = RenderTime::duration_to_sample_time(duration, self.sample_rate);
        let mut frames_left = total_frames;
        while frames_left > 0 {
            let frame_count = (frames_left as usize).min(BUFFER_SIZE_FRAMES);
            let buffer = &mut self.buffer[..frame_count * self.channel_count];
            renderer.render(buffer);
            for sample in buffer.iter() {
                writer.write_sample(*sample)?;
            }
            frames_left -= frame_count as u64;
            self.frames_written += frame_count as u64;
        }
        log::debug!(
            "Wrote {total_frames} frames, {} frames in total",
            self.frames_written
        );
        Ok(total_frames)
    }

    /// Flush and close the wav file.
    pub fn finalize(mut self) -> Result<(), Error> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
        }
        Ok(())
    }
}

impl Drop for WavOutput {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(err) = writer.finalize() {
                log::error!("Failed to finalize WAV file: {err}");
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------
