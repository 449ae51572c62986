use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crossbeam_queue::ArrayQueue;

use super::{ClusterId, ClusterMessage, ClusterParameters, DirectionMode, SpatialMode};
use crate::{envelope::WindowType, Error};

// -------------------------------------------------------------------------------------------------

/// Controls a [`Cluster`](super::Cluster) from outside of the render thread.
///
/// The handle keeps a mirror of the cluster's parameters for the getters. Setters clamp their
/// values just like the cluster does and forward them as messages, which the cluster applies
/// on its next rendered sub-block. When the message queue is full, a setter fails with
/// [`Error::SendError`] and the mirrored parameters stay untouched.
pub struct ClusterHandle {
    id: ClusterId,
    parameters: ClusterParameters,
    voice_count: usize,
    max_voices: usize,
    active: Arc<AtomicBool>,
    message_queue: Arc<ArrayQueue<ClusterMessage>>,
}

impl ClusterHandle {
    pub(crate) fn new(
        id: ClusterId,
        parameters: ClusterParameters,
        voice_count: usize,
        max_voices: usize,
        active: Arc<AtomicBool>,
        message_queue: Arc<ArrayQueue<ClusterMessage>>,
    ) -> Self {
        Self {
            id,
            parameters,
            voice_count,
            max_voices,
            active,
            message_queue,
        }
    }

    /// The controlled cluster's id.
    pub fn id(&self) -> ClusterId {
        self.id
    }

    /// All parameters, as last sent to the cluster.
    pub fn parameters(&self) -> &ClusterParameters {
        &self.parameters
    }

    /// Number of voices, as last requested. The cluster picks up changes with its next render
    /// call.
    pub fn voice_count(&self) -> usize {
        self.voice_count
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices
    }

    pub fn duration_ms(&self) -> f32 {
        self.parameters.duration_ms()
    }
    pub fn set_duration_ms(&mut self, duration_ms: f32) -> Result<(), Error> {
        self.update(
            |p| p.set_duration_ms(duration_ms),
            |p| ClusterMessage::SetDurationMs(p.duration_ms()),
        )
    }

    pub fn overlap(&self) -> f32 {
        self.parameters.overlap()
    }
    pub fn set_overlap(&mut self, overlap: f32) -> Result<(), Error> {
        self.update(
            |p| p.set_overlap(overlap),
            |p| ClusterMessage::SetOverlap(p.overlap()),
        )
    }

    pub fn pitch(&self) -> f32 {
        self.parameters.pitch()
    }
    pub fn set_pitch(&mut self, pitch: f32) -> Result<(), Error> {
        self.update(
            |p| p.set_pitch(pitch),
            |p| ClusterMessage::SetPitch(p.pitch()),
        )
    }

    pub fn pitch_lfo_freq(&self) -> f32 {
        self.parameters.pitch_lfo_freq()
    }
    pub fn set_pitch_lfo_freq(&mut self, freq: f32) -> Result<(), Error> {
        self.update(
            |p| p.set_pitch_lfo_freq(freq),
            |p| ClusterMessage::SetPitchLfoFreq(p.pitch_lfo_freq()),
        )
    }

    pub fn pitch_lfo_amount(&self) -> f32 {
        self.parameters.pitch_lfo_amount()
    }
    pub fn set_pitch_lfo_amount(&mut self, amount: f32) -> Result<(), Error> {
        self.update(
            |p| p.set_pitch_lfo_amount(amount),
            |p| ClusterMessage::SetPitchLfoAmount(p.pitch_lfo_amount()),
        )
    }

    pub fn direction(&self) -> DirectionMode {
        self.parameters.direction()
    }
    pub fn set_direction(&mut self, direction: DirectionMode) -> Result<(), Error> {
        self.update(
            |p| p.set_direction(direction),
            |p| ClusterMessage::SetDirection(p.direction()),
        )
    }

    pub fn window(&self) -> WindowType {
        self.parameters.window()
    }
    pub fn set_window(&mut self, window: WindowType) -> Result<(), Error> {
        self.update(
            |p| p.set_window(window),
            |p| ClusterMessage::SetWindow(p.window()),
        )
    }

    pub fn spatial_mode(&self) -> SpatialMode {
        self.parameters.spatial_mode()
    }
    pub fn spatial_channel(&self) -> Option<usize> {
        self.parameters.spatial_channel()
    }
    pub fn set_spatial_mode(
        &mut self,
        mode: SpatialMode,
        channel: Option<usize>,
    ) -> Result<(), Error> {
        self.update(
            |p| p.set_spatial_mode(mode, channel),
            |p| ClusterMessage::SetSpatialMode(p.spatial_mode(), p.spatial_channel()),
        )
    }

    pub fn volume_db(&self) -> f32 {
        self.parameters.volume_db()
    }
    pub fn set_volume_db(&mut self, volume_db: f32) -> Result<(), Error> {
        self.update(
            |p| p.set_volume_db(volume_db),
            |p| ClusterMessage::SetVolumeDb(p.volume_db()),
        )
    }

    /// Add a voice to the cluster. Fails when the cluster already plays its maximum number of
    /// voices.
    pub fn add_voice(&mut self) -> Result<(), Error> {
        if self.voice_count >= self.max_voices {
            log::warn!(
                "Cluster #{}: can't add more than {} voices",
                self.id,
                self.max_voices
            );
            return Err(Error::ParameterError(format!(
                "cluster voice limit of {} reached",
                self.max_voices
            )));
        }
        self.send(ClusterMessage::AddVoice)?;
        self.voice_count += 1;
        Ok(())
    }

    /// Remove the most recently added voice from the cluster. A grain it still plays gets cut.
    /// Fails when only one voice is left.
    pub fn remove_voice(&mut self) -> Result<(), Error> {
        if self.voice_count <= 1 {
            log::warn!("Cluster #{}: refusing to remove the last voice", self.id);
            return Err(Error::ParameterError(
                "a cluster needs at least one voice".to_string(),
            ));
        }
        self.send(ClusterMessage::RemoveVoice)?;
        self.voice_count -= 1;
        Ok(())
    }

    /// Inactive clusters render nothing and keep all their state.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    /// Flip the active state. Returns the new state.
    pub fn toggle_active(&self) -> bool {
        !self.active.fetch_xor(true, Ordering::Relaxed)
    }

    fn update<U, M>(&mut self, update: U, message: M) -> Result<(), Error>
    where
        U: FnOnce(&mut ClusterParameters),
        M: FnOnce(&ClusterParameters) -> ClusterMessage,
    {
        let mut parameters = self.parameters;
        update(&mut parameters);
        self.send(message(&parameters))?;
        self.parameters = parameters;
        Ok(())
    }

    fn send(&self, message: ClusterMessage) -> Result<(), Error> {
        self.message_queue.push(message).map_err(|_msg| {
            log::warn!("Cluster #{}: control message queue is full", self.id);
            Error::SendError(format!("cluster #{} message queue is full", self.id))
        })
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn new_handle(queue_size: usize) -> ClusterHandle {
        ClusterHandle::new(
            1,
            ClusterParameters::default(),
            1,
            4,
            Arc::new(AtomicBool::new(true)),
            Arc::new(ArrayQueue::new(queue_size)),
        )
    }

    #[test]
    fn mirrored_parameters() -> Result<(), Error> {
        let mut handle = new_handle(16);
        handle.set_volume_db(100.0)?;
        assert_eq!(handle.volume_db(), 6.0);
        handle.set_overlap(2.0)?;
        assert_eq!(handle.overlap(), 1.0);
        handle.set_spatial_mode(SpatialMode::AlternatingStereo, None)?;
        assert_eq!(handle.spatial_mode(), SpatialMode::AlternatingStereo);
        assert_eq!(handle.message_queue.len(), 3);
        assert_eq!(
            handle.message_queue.pop(),
            Some(ClusterMessage::SetVolumeDb(6.0))
        );
        Ok(())
    }

    #[test]
    fn full_queues() -> Result<(), Error> {
        let mut handle = new_handle(1);
        handle.set_pitch(2.0)?;
        assert!(matches!(handle.set_pitch(3.0), Err(Error::SendError(_))));
        assert_eq!(handle.pitch(), 2.0);
        assert!(handle.add_voice().is_err());
        assert_eq!(handle.voice_count(), 1);
        Ok(())
    }

    #[test]
    fn toggle_active() {
        let handle = new_handle(1);
        assert!(!handle.toggle_active());
        assert!(handle.toggle_active());
        handle.set_active(false);
        assert!(!handle.is_active());
    }
}
