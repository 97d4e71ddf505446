use crate::media::track::{RemoteTrack, TrackKind};
use std::sync::{Arc, Mutex, MutexGuard};

/// The viewer's single playable stream. Tracks accumulate here as they
/// arrive, so audio and video end up on the same surface.
#[derive(Debug, Clone, Default)]
pub struct MediaSurface {
    tracks: Arc<Mutex<Vec<RemoteTrack>>>,
}

impl MediaSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if a track with the same id is already on the surface.
    pub fn add_track(&self, track: RemoteTrack) -> bool {
        let mut tracks = self.lock();
        if tracks.iter().any(|t| t.id == track.id) {
            return false;
        }
        tracks.push(track);
        true
    }

    pub fn remove_track(&self, id: &str) -> bool {
        let mut tracks = self.lock();
        let before = tracks.len();
        tracks.retain(|t| t.id != id);
        tracks.len() != before
    }

    pub fn tracks(&self) -> Vec<RemoteTrack> {
        self.lock().clone()
    }

    pub fn kinds(&self) -> Vec<TrackKind> {
        self.lock().iter().map(|t| t.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RemoteTrack>> {
        // A panic while holding the lock leaves a plain Vec behind, still usable.
        self.tracks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
