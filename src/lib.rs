#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod cluster;
mod config;
mod engine;
mod error;
mod resolver;
mod sample;

// public, flat re-exports
pub use error::Error;

pub use config::EngineConfig;
pub use engine::{Engine, EngineHandle};
pub use sample::{Sample, SampleSet};

pub use cluster::{
    Cluster, ClusterHandle, ClusterId, ClusterParameters, DirectionMode, SpatialMode,
};
pub use envelope::{EnvelopeTables, EnvelopeType, WindowType};
pub use resolver::{FixedPositions, PositionResolver, ScatteredPositions};
pub use voice::{GrainDirection, Voice, VoiceParameters};

pub use output::AudioRenderer;

// public mods
pub mod envelope;
pub mod output;
pub mod utils;
pub mod voice;

pub mod outputs {
    //! Offline audio outputs.

    #[cfg(feature = "wav-output")]
    pub use super::output::wav::WavOutput;
}
