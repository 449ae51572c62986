//! Mixes all clusters into the output buffer on the render thread, and manages clusters from
//! the control thread.

use std::sync::Arc;

use basedrop::{Collector, Owned};
use crossbeam_queue::ArrayQueue;

use crate::{
    cluster::{Cluster, ClusterHandle, ClusterId},
    config::EngineConfig,
    envelope::EnvelopeTables,
    resolver::PositionResolver,
    sample::SampleSet,
    utils::{
        buffer::clear_buffer,
        time::{RenderTime, SampleTime},
    },
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Structural changes, sent from an [`EngineHandle`] to its [`Engine`].
pub(crate) enum EngineMessage {
    AddCluster(Owned<Cluster>),
    RemoveCluster(ClusterId),
}

// -------------------------------------------------------------------------------------------------

/// The render side of the granular engine.
///
/// Fills interleaved output buffers with the mix of all its clusters. Move it to the audio
/// thread and call [`render`](Self::render) from the audio callback. Rendering never blocks
/// and never allocates: clusters get added and removed via messages from the [`EngineHandle`],
/// and removed clusters are dropped on the control thread.
pub struct Engine {
    sample_rate: u32,
    channel_count: usize,
    clusters: Vec<Owned<Cluster>>,
    message_queue: Arc<ArrayQueue<EngineMessage>>,
    pos_in_frames: SampleTime,
}

impl Engine {
    /// Create a new engine for the given samples and its control handle.
    pub fn new(config: EngineConfig, samples: SampleSet) -> Result<(Self, EngineHandle), Error> {
        config.validate()?;
        let message_queue = Arc::new(ArrayQueue::new(config.message_queue_size));
        let engine = Self {
            sample_rate: config.sample_rate,
            channel_count: config.channel_count,
            clusters: Vec::with_capacity(config.max_clusters),
            message_queue: Arc::clone(&message_queue),
            pos_in_frames: 0,
        };
        log::info!(
            "Created engine with {} Hz, {} channels and {} samples",
            config.sample_rate,
            config.channel_count,
            samples.len()
        );
        let handle = EngineHandle {
            envelopes: config.create_envelope_tables(),
            config,
            samples,
            collector: Collector::new(),
            message_queue,
            cluster_ids: Vec::with_capacity(config.max_clusters),
            clusters_created: 0,
        };
        Ok((engine, handle))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Number of clusters the engine currently renders.
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Render clock position in frames.
    pub fn pos_in_frames(&self) -> SampleTime {
        self.pos_in_frames
    }

    /// Render clock position in seconds.
    pub fn time_in_seconds(&self) -> f64 {
        RenderTime::new(self.pos_in_frames, self.sample_rate).seconds()
    }

    /// Overwrite the given interleaved buffer with the next block of audio.
    ///
    /// The buffer's length must be a multiple of the channel count.
    pub fn render(&mut self, output: &mut [f32]) {
        Self::assert_no_alloc(|| self.process(output))
    }

    fn process(&mut self, output: &mut [f32]) {
        debug_assert!(
            output.len() % self.channel_count == 0,
            "Buffer length must be a multiple of the channel count"
        );
        clear_buffer(output);
        self.process_messages();

        let time = RenderTime::new(self.pos_in_frames, self.sample_rate);
        for cluster in &mut self.clusters {
            cluster.render(output, &time);
        }
        self.pos_in_frames += (output.len() / self.channel_count) as SampleTime;
    }

    fn process_messages(&mut self) {
        while let Some(message) = self.message_queue.pop() {
            match message {
                EngineMessage::AddCluster(cluster) => {
                    debug_assert!(
                        self.clusters.len() < self.clusters.capacity(),
                        "Cluster limit must be checked by the handle"
                    );
                    if self.clusters.len() < self.clusters.capacity() {
                        self.clusters.push(cluster);
                    }
                }
                EngineMessage::RemoveCluster(id) => {
                    self.clusters.retain(|cluster| cluster.id() != id);
                }
            }
        }
    }

    fn assert_no_alloc<T, F: FnOnce() -> T>(func: F) -> T {
        #[cfg(feature = "assert-allocs")]
        return assert_no_alloc::assert_no_alloc::<T, F>(func);

        #[cfg(not(feature = "assert-allocs"))]
        return func();
    }
}

// -------------------------------------------------------------------------------------------------

/// The control side of the granular engine: adds and removes clusters.
///
/// Clusters which got removed from the engine are freed by
/// [`collect_garbage`](Self::collect_garbage), which also runs whenever clusters get added or
/// removed.
pub struct EngineHandle {
    config: EngineConfig,
    samples: SampleSet,
    envelopes: Arc<EnvelopeTables>,
    collector: Collector,
    message_queue: Arc<ArrayQueue<EngineMessage>>,
    cluster_ids: Vec<ClusterId>,
    clusters_created: u64,
}

impl EngineHandle {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    /// Envelope tables, shared by all clusters of the engine.
    pub fn envelopes(&self) -> &Arc<EnvelopeTables> {
        &self.envelopes
    }

    /// Number of clusters which got added and not yet removed.
    pub fn cluster_count(&self) -> usize {
        self.cluster_ids.len()
    }

    /// Ids of all clusters which got added and not yet removed.
    pub fn cluster_ids(&self) -> &[ClusterId] {
        &self.cluster_ids
    }

    /// Create a new cluster with the given number of voices and start rendering it.
    /// Returns the new cluster's control handle.
    pub fn add_cluster(
        &mut self,
        voice_count: usize,
        resolver: impl PositionResolver,
    ) -> Result<ClusterHandle, Error> {
        self.collect_garbage();
        if self.cluster_ids.len() >= self.config.max_clusters {
            log::warn!("Can't add more than {} clusters", self.config.max_clusters);
            return Err(Error::ParameterError(format!(
                "engine cluster limit of {} reached",
                self.config.max_clusters
            )));
        }
        let (cluster, handle) = Cluster::with_rng(
            &self.config,
            self.samples.clone(),
            Arc::clone(&self.envelopes),
            voice_count,
            Box::new(resolver),
            self.config.create_rng(self.clusters_created),
        )?;
        self.clusters_created += 1;

        let id = cluster.id();
        let cluster = Owned::new(&self.collector.handle(), cluster);
        self.message_queue
            .push(EngineMessage::AddCluster(cluster))
            .map_err(|_msg| Error::SendError("engine message queue is full".to_string()))?;
        self.cluster_ids.push(id);
        log::info!("Added cluster #{id} with {voice_count} voices");
        Ok(handle)
    }

    /// Stop rendering the given cluster and free it.
    pub fn remove_cluster(&mut self, id: ClusterId) -> Result<(), Error> {
        let index = self
            .cluster_ids
            .iter()
            .position(|cluster_id| *cluster_id == id)
            .ok_or(Error::ClusterNotFoundError(id))?;
        self.message_queue
            .push(EngineMessage::RemoveCluster(id))
            .map_err(|_msg| Error::SendError("engine message queue is full".to_string()))?;
        self.cluster_ids.remove(index);
        log::info!("Removed cluster #{id}");
        self.collect_garbage();
        Ok(())
    }

    /// Free clusters which got dropped by the engine. Call this regularly when clusters get
    /// removed often.
    pub fn collect_garbage(&mut self) {
        self.collector.collect();
    }
}

// -------------------------------------------------------------------------------------------------
