// -------------------------------------------------------------------------------------------------

/// Frame-wise access to a mutable interleaved sample buffer.
pub trait InterleavedBufferMut {
    /// Iterate over all frames in the buffer, with `channel_count` samples per frame.
    fn frames_mut(&mut self, channel_count: usize) -> std::slice::ChunksExactMut<'_, f32>;

    /// Access the frame range `offset..offset + frame_count` as a flat interleaved slice.
    fn frame_range_mut(
        &mut self,
        channel_count: usize,
        offset: usize,
        frame_count: usize,
    ) -> &mut [f32];
}

impl InterleavedBufferMut for [f32] {
    #[inline]
    fn frames_mut(&mut self, channel_count: usize) -> std::slice::ChunksExactMut<'_, f32> {
        debug_assert!(channel_count > 0, "Invalid channel count");
        debug_assert!(
            self.len() % channel_count == 0,
            "Buffer length must be a multiple of the channel count"
        );
        self.chunks_exact_mut(channel_count)
    }

    #[inline]
    fn frame_range_mut(
        &mut self,
        channel_count: usize,
        offset: usize,
        frame_count: usize,
    ) -> &mut [f32] {
        &mut self[offset * channel_count..(offset + frame_count) * channel_count]
    }
}

// -------------------------------------------------------------------------------------------------

/// Fill the given buffer with silence.
#[inline]
pub fn clear_buffer(buffer: &mut [f32]) {
    buffer.fill(0.0);
}

// -------------------------------------------------------------------------------------------------

/// Copy the given planar buffer into an interleaved one.
/// The planar buffer's layout defines layout of the interleaved buffer (channel and frame count).
pub fn planar_to_interleaved(planar: &[Vec<f32>], interleaved: &mut [f32]) {
    let channel_count = planar.len();
    match channel_count {
        0 => (),
        1 => {
            for (i, p) in interleaved.iter_mut().zip(planar[0].iter()) {
                *i = *p;
            }
        }
        2 => {
            for (frame, (l, r)) in interleaved
                .frames_mut(2)
                .zip(planar[0].iter().zip(planar[1].iter()))
            {
                frame[0] = *l;
                frame[1] = *r;
            }
        }
        _ => {
            for (channel_index, channel_values) in planar.iter().enumerate() {
                for (frame_index, value) in channel_values.iter().enumerate() {
                    interleaved[frame_index * channel_count + channel_index] = *value;
                }
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar_interleaved() {
        // mono
        let planar_mono = vec![vec![1.0, 2.0, 3.0, 4.0]];
        let mut interleaved_mono = vec![0.0; 4];
        planar_to_interleaved(&planar_mono, &mut interleaved_mono);
        assert_eq!(interleaved_mono, vec![1.0, 2.0, 3.0, 4.0]);

        // stereo
        let planar_stereo = vec![vec![1.0, 2.0, 3.0, 4.0], vec![4.0, 3.0, 2.0, 1.0]];
        let mut interleaved_stereo = vec![0.0; 8];
        planar_to_interleaved(&planar_stereo, &mut interleaved_stereo);
        assert_eq!(
            interleaved_stereo,
            vec![1.0, 4.0, 2.0, 3.0, 3.0, 2.0, 4.0, 1.0]
        );

        // general
        let planar_general = vec![
            vec![1.0, 2.0, 3.0, 4.0],
            vec![4.0, 3.0, 2.0, 1.0],
            vec![2.0, 1.0, 4.0, 3.0],
        ];
        let mut interleaved_general = vec![0.0; 12];
        planar_to_interleaved(&planar_general, &mut interleaved_general);
        assert_eq!(
            interleaved_general,
            vec![1.0, 4.0, 2.0, 2.0, 3.0, 1.0, 3.0, 2.0, 4.0, 4.0, 1.0, 3.0]
        );
    }

    #[test]
    fn frame_ranges() {
        let mut buffer = vec![0.0; 10];
        buffer
            .frame_range_mut(2, 1, 3)
            .iter_mut()
            .for_each(|s| *s = 1.0);
        assert_eq!(buffer, vec![0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
        assert_eq!(buffer.frames_mut(2).count(), 5);
        clear_buffer(&mut buffer);
        assert!(buffer.iter().all(|s| *s == 0.0));
    }
}
