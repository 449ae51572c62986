//! Precomputed grain envelope (window) tables.

use std::sync::{Arc, LazyLock};

use assume::assume;
use strum::EnumCount;

// -------------------------------------------------------------------------------------------------

/// Amplitude envelope shapes which get applied to grains.
#[derive(
    Clone,
    Copy,
    Debug,
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
pub enum EnvelopeType {
    /// Raised cosine.
    Hanning = 0,
    /// Linear rise to the midpoint and linear fall.
    Triangle = 1,
    /// Exponential decay, starting at full amplitude.
    ExpDecay = 2,
    /// Time-reversed exponential decay, ending at full amplitude.
    ReverseExpDecay = 3,
    /// Absolute sinc with a fixed number of zero crossings.
    Sinc = 4,
}

// -------------------------------------------------------------------------------------------------

/// Window selection for a cluster: either a concrete envelope or a random pick per voice.
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
pub enum WindowType {
    #[default]
    Hanning = 0,
    Triangle = 1,
    ExpDecay = 2,
    ReverseExpDecay = 3,
    Sinc = 4,
    /// Each voice picks one of the concrete envelopes at random.
    Random = 5,
}

impl WindowType {
    /// The concrete envelope of this selection, `None` for [`WindowType::Random`].
    pub fn envelope(&self) -> Option<EnvelopeType> {
        match self {
            WindowType::Hanning => Some(EnvelopeType::Hanning),
            WindowType::Triangle => Some(EnvelopeType::Triangle),
            WindowType::ExpDecay => Some(EnvelopeType::ExpDecay),
            WindowType::ReverseExpDecay => Some(EnvelopeType::ReverseExpDecay),
            WindowType::Sinc => Some(EnvelopeType::Sinc),
            WindowType::Random => None,
        }
    }

    /// Step through all window types, wrapping around at both ends.
    pub fn cycled(self, steps: isize) -> Self {
        let index = (self as isize + steps).rem_euclid(Self::COUNT as isize);
        Self::from_repr(index as u8).unwrap_or(self)
    }
}

impl From<EnvelopeType> for WindowType {
    fn from(envelope: EnvelopeType) -> Self {
        match envelope {
            EnvelopeType::Hanning => WindowType::Hanning,
            EnvelopeType::Triangle => WindowType::Triangle,
            EnvelopeType::ExpDecay => WindowType::ExpDecay,
            EnvelopeType::ReverseExpDecay => WindowType::ReverseExpDecay,
            EnvelopeType::Sinc => WindowType::Sinc,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Precomputed, read-only envelope tables of a fixed length, shared by all voices.
#[derive(Debug)]
pub struct EnvelopeTables {
    length: usize,
    tables: [Box<[f32]>; EnvelopeType::COUNT],
}

/// Lazily created default tables, for consumers which don't need custom table settings.
static SHARED_ENVELOPE_TABLES: LazyLock<Arc<EnvelopeTables>> =
    LazyLock::new(|| Arc::new(EnvelopeTables::new(EnvelopeTables::DEFAULT_LENGTH)));

impl EnvelopeTables {
    /// Default table length in samples.
    pub const DEFAULT_LENGTH: usize = 2048;
    /// Default time constant of the exponential decay tables in samples.
    pub const DEFAULT_DECAY_TAU: f64 = 512.0;
    /// Default number of zero crossings in the sinc table.
    pub const DEFAULT_SINC_ZERO_CROSSINGS: usize = 8;

    /// Create tables of the given length with default decay and sinc settings.
    pub fn new(length: usize) -> Self {
        Self::with_options(
            length,
            Self::DEFAULT_DECAY_TAU,
            Self::DEFAULT_SINC_ZERO_CROSSINGS,
        )
    }

    /// Create tables of the given length, decay time constant and sinc zero crossings.
    ///
    /// # Panics
    ///
    /// When `length` is less than 2, `decay_tau` is not positive or `sinc_zero_crossings` is
    /// zero. Use [`EngineConfig::validate`](crate::EngineConfig::validate) to check settings
    /// up front.
    pub fn with_options(length: usize, decay_tau: f64, sinc_zero_crossings: usize) -> Self {
        assert!(length >= 2, "Envelope tables need at least 2 samples");
        assert!(decay_tau > 0.0, "Decay time constant must be > 0");
        assert!(sinc_zero_crossings > 0, "Sinc zero crossings must be > 0");

        let hanning = Self::hanning(length);
        let triangle = Self::triangle(length);
        let exp_decay = Self::exp_decay(length, decay_tau);
        let reverse_exp_decay = exp_decay.iter().rev().copied().collect::<Box<[f32]>>();
        let sinc = Self::sinc(length, sinc_zero_crossings);

        Self {
            length,
            tables: [hanning, triangle, exp_decay, reverse_exp_decay, sinc],
        }
    }

    /// Process-wide default tables, created on first use.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED_ENVELOPE_TABLES)
    }

    /// Length of every table in samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Always false: tables have at least two samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Read-only access to the table of the given envelope type.
    #[inline]
    pub fn get(&self, envelope: EnvelopeType) -> &[f32] {
        &self.tables[envelope as usize]
    }

    /// Linearly interpolated table value at the given fractional table index.
    /// Indices beyond the table bounds are clamped to the last sample.
    #[inline]
    pub fn sample(&self, envelope: EnvelopeType, reader: f64) -> f32 {
        let table = self.get(envelope);
        let last = self.length - 1;
        let reader = reader.clamp(0.0, last as f64);
        let index = reader as usize;
        let next_index = (index + 1).min(last);
        let fraction = (reader - index as f64) as f32;
        assume!(unsafe: index < table.len(), "reader is clamped to table bounds");
        assume!(unsafe: next_index < table.len(), "next index is clamped to table bounds");
        table[index] * (1.0 - fraction) + table[next_index] * fraction
    }

    fn hanning(length: usize) -> Box<[f32]> {
        let delta = 2.0 * std::f64::consts::PI / length as f64;
        (0..length)
            .map(|i| (0.5 * (1.0 - (delta * i as f64).cos())) as f32)
            .collect()
    }

    fn triangle(length: usize) -> Box<[f32]> {
        let center = (length - 1) as f64 / 2.0;
        (0..length)
            .map(|i| (1.0 - (i as f64 - center).abs() / center) as f32)
            .collect()
    }

    fn exp_decay(length: usize, tau: f64) -> Box<[f32]> {
        (0..length)
            .map(|i| (-(i as f64) / tau).exp() as f32)
            .collect()
    }

    // NB: odd zero crossing counts shift the main lobe off center
    fn sinc(length: usize, zero_crossings: usize) -> Box<[f32]> {
        let increment = zero_crossings as f64 / length as f64;
        let start = -(zero_crossings as f64) / 2.0;
        (0..length)
            .map(|i| {
                let x = start + i as f64 * increment;
                if x.abs() < 1e-12 {
                    1.0
                } else {
                    let pi_x = std::f64::consts::PI * x;
                    (pi_x.sin() / pi_x).abs() as f32
                }
            })
            .collect()
    }
}

impl Default for EnvelopeTables {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LENGTH)
    }
}

// -------------------------------------------------------------------------------------------------
