use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use crate::annotation::domain::frame_annotations::FrameAnnotations;
use crate::remote::domain::video_service::{ServiceError, VideoService};
use crate::shared::geometry::SourceRect;
use crate::shared::region::FaceRegion;

/// A change to the annotations that is waiting on the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    Add { frame: u32 },
    Remove { frame: u32, index: usize },
    Clear { frame: u32 },
    Refresh,
}

impl std::fmt::Display for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mutation::Add { frame } => write!(f, "add on frame {frame}"),
            Mutation::Remove { frame, index } => write!(f, "remove #{index} on frame {frame}"),
            Mutation::Clear { frame } => write!(f, "clear frame {frame}"),
            Mutation::Refresh => write!(f, "refresh"),
        }
    }
}

/// How the local copy relates to the service's.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// Matches the last response from the service.
    Synced,
    InFlight(Mutation),
    /// The service may hold changes the local copy has not seen. Index-based
    /// edits are refused until a refresh succeeds.
    Stale,
}

#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("another annotation change is still in flight ({0})")]
    MutationInFlight(Mutation),
    #[error("local annotations are out of date; refresh before editing by index")]
    Stale,
    #[error("frame {frame} has no face #{index} ({len} present)")]
    IndexOutOfRange { frame: u32, index: usize, len: usize },
    #[error(transparent)]
    Service(#[from] ServiceError),
}

struct Inner {
    annotations: FrameAnnotations,
    sync: SyncState,
}

/// Write-through cache of the per-frame face regions.
///
/// The service is the only authority: every confirmed add or remove is
/// followed by a full re-fetch instead of patching the local copy, so the
/// indices the editor shows are always the service's indices. Mutations are
/// serialized; a second one issued while the first is outstanding is
/// rejected rather than queued.
pub struct AnnotationStore {
    service: Arc<dyn VideoService>,
    session_id: String,
    inner: Mutex<Inner>,
}

impl AnnotationStore {
    pub fn new(
        service: Arc<dyn VideoService>,
        session_id: impl Into<String>,
        annotations: FrameAnnotations,
    ) -> Self {
        Self {
            service,
            session_id: session_id.into(),
            inner: Mutex::new(Inner {
                annotations,
                sync: SyncState::Synced,
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, frame: u32) -> Vec<FaceRegion> {
        self.inner().annotations.get(frame).to_vec()
    }

    pub fn snapshot(&self) -> FrameAnnotations {
        self.inner().annotations.clone()
    }

    pub fn sync_state(&self) -> SyncState {
        self.inner().sync
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.sync_state(), SyncState::InFlight(_))
    }

    /// `(frames with faces, total regions)`.
    pub fn counts(&self) -> (usize, usize) {
        let inner = self.inner();
        (
            inner.annotations.frames_with_faces(),
            inner.annotations.total_regions(),
        )
    }

    fn begin(&self, mutation: Mutation, require_synced: bool) -> Result<Pending<'_>, AnnotationError> {
        let mut inner = self.inner();
        let previous = match inner.sync {
            SyncState::InFlight(other) => return Err(AnnotationError::MutationInFlight(other)),
            SyncState::Stale if require_synced => return Err(AnnotationError::Stale),
            state => state,
        };
        inner.sync = SyncState::InFlight(mutation);
        Ok(Pending {
            store: self,
            previous,
            settled: false,
        })
    }

    /// Replaces the local copy with the service's current mapping.
    pub async fn refresh(&self) -> Result<(), AnnotationError> {
        let pending = self.begin(Mutation::Refresh, false)?;
        self.reload(pending).await
    }

    /// Adds a manual face on `frame`. The local copy only changes once the
    /// service has accepted the face and been re-read.
    pub async fn add_region(&self, frame: u32, rect: SourceRect) -> Result<(), AnnotationError> {
        let pending = self.begin(Mutation::Add { frame }, false)?;
        let face = rect.rounded();
        log::debug!("Adding face {face:?} to frame {frame}");
        if let Err(e) = self.service.add_face(&self.session_id, frame, face).await {
            pending.fail(&e);
            return Err(e.into());
        }
        self.reload(pending).await
    }

    /// Removes the face at `index` in the frame's current sequence.
    pub async fn remove_region(&self, frame: u32, index: usize) -> Result<(), AnnotationError> {
        let pending = self.begin(Mutation::Remove { frame, index }, true)?;
        let len = self.inner().annotations.get(frame).len();
        if index >= len {
            pending.restore();
            return Err(AnnotationError::IndexOutOfRange { frame, index, len });
        }
        log::debug!("Removing face #{index} from frame {frame}");
        if let Err(e) = self.service.remove_face(&self.session_id, frame, index).await {
            pending.fail(&e);
            return Err(e.into());
        }
        self.reload(pending).await
    }

    /// Clears every face on `frame` and pushes the whole mapping to the
    /// service as a replacement.
    ///
    /// Returns the number of faces cleared. Clearing an empty frame is a
    /// no-op that issues no request.
    pub async fn clear_frame(&self, frame: u32) -> Result<usize, AnnotationError> {
        // A bulk replace overwrites the service, so it must start from its data.
        if self.sync_state() == SyncState::Stale {
            self.refresh().await?;
        }
        let pending = self.begin(Mutation::Clear { frame }, true)?;
        let (removed, snapshot) = {
            let mut inner = self.inner();
            let removed = inner.annotations.take(frame);
            (removed, inner.annotations.clone())
        };
        if removed.is_empty() {
            pending.restore();
            return Ok(0);
        }

        let cleared = removed.len();
        match self
            .service
            .replace_annotations(&self.session_id, &snapshot)
            .await
        {
            Ok(()) => {
                log::debug!("Cleared {cleared} faces from frame {frame}");
                pending.settle(SyncState::Synced);
                Ok(cleared)
            }
            Err(e) => {
                self.inner().annotations.set(frame, removed);
                pending.settle(SyncState::Stale);
                Err(e.into())
            }
        }
    }

    async fn reload(&self, pending: Pending<'_>) -> Result<(), AnnotationError> {
        match self.service.analysis(&self.session_id).await {
            Ok(snapshot) => {
                self.inner().annotations = snapshot.annotations;
                pending.settle(SyncState::Synced);
                Ok(())
            }
            Err(e) => {
                log::warn!("Annotation refresh failed, marking local copy stale: {e}");
                pending.settle(SyncState::Stale);
                Err(e.into())
            }
        }
    }
}

/// Marks the store in flight for the lifetime of one operation.
///
/// If the owning future is dropped before the outcome is known, the store
/// is left `Stale` so the next index-based edit forces a re-read.
struct Pending<'a> {
    store: &'a AnnotationStore,
    previous: SyncState,
    settled: bool,
}

impl Pending<'_> {
    fn settle(mut self, state: SyncState) {
        self.store.inner().sync = state;
        self.settled = true;
    }

    fn restore(self) {
        let previous = self.previous;
        self.settle(previous);
    }

    /// A rejected request left the service untouched; a lost one may not have.
    fn fail(self, error: &ServiceError) {
        match error {
            ServiceError::Api { .. } => self.restore(),
            _ => self.settle(SyncState::Stale),
        }
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.store.inner().sync = SyncState::Stale;
        }
    }
}
