use strum::EnumCount;

// -------------------------------------------------------------------------------------------------

/// How a cluster distributes its grains across the output channels.
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
pub enum SpatialMode {
    /// Every grain plays on all channels with full gain.
    #[default]
    Unity = 0,
    /// Grains alternate between the even (left) and odd (right) channels.
    AlternatingStereo = 1,
    /// Each grain plays on a single channel, walking around all channels.
    AroundRobin = 2,
}

impl SpatialMode {
    /// Step through all modes, wrapping around at both ends.
    pub fn cycled(self, steps: isize) -> Self {
        let index = (self as isize + steps).rem_euclid(Self::COUNT as isize);
        Self::from_repr(index as u8).unwrap_or(self)
    }
}

// -------------------------------------------------------------------------------------------------

/// Calculates per channel gains for successive grains of a cluster.
#[derive(Debug, Clone)]
pub(crate) struct Spatializer {
    channel_count: usize,
    right_side: bool,
    around_step: usize,
}

impl Spatializer {
    pub fn new(channel_count: usize) -> Self {
        debug_assert!(channel_count > 0, "Invalid channel count");
        Self {
            channel_count,
            right_side: true,
            around_step: 0,
        }
    }

    /// Fill `gains` for the next grain and advance the mode's state.
    ///
    /// A `fixed_channel` within the output layout overrides the mode: the grain then plays on
    /// that channel only.
    pub fn next_gains(
        &mut self,
        mode: SpatialMode,
        fixed_channel: Option<usize>,
        gains: &mut [f32],
    ) {
        debug_assert_eq!(gains.len(), self.channel_count, "Invalid gain buffer size");
        if let Some(channel) = fixed_channel.filter(|c| *c < self.channel_count) {
            gains.fill(0.0);
            gains[channel] = 1.0;
            return;
        }
        match mode {
            SpatialMode::Unity => gains.fill(1.0),
            SpatialMode::AlternatingStereo => {
                self.right_side = !self.right_side;
                let active_parity = if self.right_side { 1 } else { 0 };
                for (channel, gain) in gains.iter_mut().enumerate() {
                    *gain = if channel % 2 == active_parity { 1.0 } else { 0.0 };
                }
            }
            SpatialMode::AroundRobin => {
                let channel = around_robin_channel(self.around_step, self.channel_count);
                self.around_step = (self.around_step + 1) % self.channel_count;
                gains.fill(0.0);
                gains[channel] = 1.0;
            }
        }
    }
}

/// Channel of the given step in the around-robin walk: odd channels ascending, then even
/// channels descending. `1 3 5 7 6 4 2 0` for 8 channels.
pub(crate) fn around_robin_channel(step: usize, channel_count: usize) -> usize {
    debug_assert!(channel_count > 0, "Invalid channel count");
    let step = step % channel_count;
    let odd_count = channel_count / 2;
    if step < odd_count {
        2 * step + 1
    } else {
        let even_count = channel_count - odd_count;
        2 * (even_count - 1 - (step - odd_count))
    }
}

// -------------------------------------------------------------------------------------------------
