use rand::{rngs::SmallRng, SeedableRng};

use crate::{envelope::EnvelopeTables, Error};

// -------------------------------------------------------------------------------------------------

/// Options to set up an [`Engine`](crate::Engine) and its clusters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// By default 44100. Output sample rate in Hz.
    pub sample_rate: u32,
    /// By default 2. Number of interleaved output channels.
    pub channel_count: usize,
    /// By default 2048. Length of the grain envelope tables in samples.
    pub envelope_length: usize,
    /// By default 512. Time constant of the exponential decay envelopes in samples.
    pub envelope_decay_tau: f64,
    /// By default 8. Number of zero crossings in the sinc envelope.
    pub sinc_zero_crossings: usize,
    /// By default 64. Maximum number of voices a single cluster can play.
    pub max_voices: usize,
    /// By default 32. Maximum number of clusters an engine can play.
    pub max_clusters: usize,
    /// By default 256. Capacity of the control message queues.
    pub message_queue_size: usize,
    /// By default None: when set, all random decisions are reproducible.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channel_count: 2,
            envelope_length: EnvelopeTables::DEFAULT_LENGTH,
            envelope_decay_tau: EnvelopeTables::DEFAULT_DECAY_TAU,
            sinc_zero_crossings: EnvelopeTables::DEFAULT_SINC_ZERO_CROSSINGS,
            max_voices: 64,
            max_clusters: 32,
            message_queue_size: 256,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn channel_count(mut self, channel_count: usize) -> Self {
        self.channel_count = channel_count;
        self
    }

    pub fn envelope_length(mut self, length: usize) -> Self {
        self.envelope_length = length;
        self
    }

    pub fn envelope_decay_tau(mut self, tau: f64) -> Self {
        self.envelope_decay_tau = tau;
        self
    }

    pub fn sinc_zero_crossings(mut self, zero_crossings: usize) -> Self {
        self.sinc_zero_crossings = zero_crossings;
        self
    }

    pub fn max_voices(mut self, max_voices: usize) -> Self {
        self.max_voices = max_voices;
        self
    }

    pub fn max_clusters(mut self, max_clusters: usize) -> Self {
        self.max_clusters = max_clusters;
        self
    }

    pub fn message_queue_size(mut self, size: usize) -> Self {
        self.message_queue_size = size;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate all parameters. Returns Error::ParameterError on errors.
    pub fn validate(&self) -> Result<(), Error> {
        if self.sample_rate == 0 {
            return Err(Error::ParameterError(
                "engine config 'sample_rate' must be > 0".to_string(),
            ));
        }
        if self.channel_count == 0 {
            return Err(Error::ParameterError(
                "engine config 'channel_count' must be > 0".to_string(),
            ));
        }
        if self.envelope_length < 2 {
            return Err(Error::ParameterError(format!(
                "engine config 'envelope_length' must be >= 2, but is '{}'",
                self.envelope_length
            )));
        }
        if self.envelope_decay_tau.is_nan() || self.envelope_decay_tau <= 0.0 {
            return Err(Error::ParameterError(format!(
                "engine config 'envelope_decay_tau' must be > 0, but is '{}'",
                self.envelope_decay_tau
            )));
        }
        if self.sinc_zero_crossings == 0 {
            return Err(Error::ParameterError(
                "engine config 'sinc_zero_crossings' must be > 0".to_string(),
            ));
        }
        if self.max_voices == 0 {
            return Err(Error::ParameterError(
                "engine config 'max_voices' must be > 0".to_string(),
            ));
        }
        if self.max_clusters == 0 {
            return Err(Error::ParameterError(
                "engine config 'max_clusters' must be > 0".to_string(),
            ));
        }
        if self.message_queue_size == 0 {
            return Err(Error::ParameterError(
                "engine config 'message_queue_size' must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Create envelope tables with this config's table settings. Default settings share the
    /// process wide default tables.
    pub fn create_envelope_tables(&self) -> std::sync::Arc<EnvelopeTables> {
        if self.envelope_length == EnvelopeTables::DEFAULT_LENGTH
            && self.envelope_decay_tau == EnvelopeTables::DEFAULT_DECAY_TAU
            && self.sinc_zero_crossings == EnvelopeTables::DEFAULT_SINC_ZERO_CROSSINGS
        {
            EnvelopeTables::shared()
        } else {
            std::sync::Arc::new(EnvelopeTables::with_options(
                self.envelope_length,
                self.envelope_decay_tau,
                self.sinc_zero_crossings,
            ))
        }
    }

    /// Create a random number generator for the given stream. With a seed, every stream gets
    /// its own reproducible sequence, else the generator is seeded from the OS.
    pub fn create_rng(&self, stream: u64) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(stream)),
            None => SmallRng::from_os_rng(),
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::Rng;

    use super::*;

    #[test]
    fn validation() {
        assert!(EngineConfig::default().validate().is_ok());
        assert!(EngineConfig::new().sample_rate(0).validate().is_err());
        assert!(EngineConfig::new().channel_count(0).validate().is_err());
        assert!(EngineConfig::new().envelope_length(1).validate().is_err());
        assert!(EngineConfig::new().envelope_decay_tau(f64::NAN).validate().is_err());
        assert!(EngineConfig::new().sinc_zero_crossings(0).validate().is_err());
        assert!(EngineConfig::new().max_voices(0).validate().is_err());
        assert!(EngineConfig::new().max_clusters(0).validate().is_err());
        assert!(EngineConfig::new().message_queue_size(0).validate().is_err());
        assert!(EngineConfig::new()
            .channel_count(8)
            .envelope_length(2)
            .validate()
            .is_ok());
    }

    #[test]
    fn envelope_tables() {
        let config = EngineConfig::default();
        assert!(Arc::ptr_eq(
            &config.create_envelope_tables(),
            &EnvelopeTables::shared()
        ));
        let tables = config.envelope_length(64).create_envelope_tables();
        assert_eq!(tables.len(), 64);
    }

    #[test]
    fn seeded_rngs() {
        let config = EngineConfig::new().seed(42);
        let a = config.create_rng(0).random::<u64>();
        let b = config.create_rng(0).random::<u64>();
        let c = config.create_rng(1).random::<u64>();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
