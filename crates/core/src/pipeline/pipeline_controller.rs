use std::sync::Arc;
use std::time::Instant;

use crate::annotation::annotation_store::{AnnotationStore, SyncState};
use crate::annotation::domain::coordinate_mapper::{CoordinateMapper, MappingError};
use crate::editor::region_editor::RegionEditor;
use crate::pipeline::activity::{Activity, ActivityGuard, ActivitySlot};
use crate::pipeline::error::{PipelineError, ValidationError};
use crate::pipeline::job_poller::JobPoller;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::pipeline_state::PipelineState;
use crate::remote::domain::download_token::{DownloadToken, ResultReference};
use crate::remote::domain::job_status::{JobPhase, JobStatus};
use crate::remote::domain::video_service::{ProcessRequest, VideoService, VideoUpload};
use crate::shared::constants::{BLUR_STRENGTH_MAX, BLUR_STRENGTH_MIN, PROCESSED_FILE_PREFIX};
use crate::shared::settings::ClientSettings;
use crate::shared::video_session::VideoSession;

/// Detection results at the moment editing begins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub total_frames: u32,
    pub frames_with_faces: usize,
    pub total_faces: usize,
}

/// Drives one video through upload, analysis, editing, processing and
/// download against the remote service.
///
/// Each step checks the current [`PipelineState`] before doing anything, and
/// upload, analysis and processing share one [`ActivitySlot`] so that only
/// one remote job is ever in progress.
pub struct PipelineController {
    service: Arc<dyn VideoService>,
    settings: ClientSettings,
    logger: Box<dyn PipelineLogger>,
    poller: JobPoller,
    activity: ActivitySlot,
    state: PipelineState,
    session: Option<VideoSession>,
    mapper: Option<Result<CoordinateMapper, MappingError>>,
    store: Option<Arc<AnnotationStore>>,
    editor: Option<RegionEditor>,
    last_status: Option<JobStatus>,
    result_version: u64,
    result: Option<ResultReference>,
}

impl PipelineController {
    pub fn new(
        service: Arc<dyn VideoService>,
        settings: ClientSettings,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        let poller = JobPoller::new(settings.poll_interval());
        Self {
            service,
            settings,
            logger,
            poller,
            activity: ActivitySlot::default(),
            state: PipelineState::Upload,
            session: None,
            mapper: None,
            store: None,
            editor: None,
            last_status: None,
            result_version: 0,
            result: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn session(&self) -> Option<&VideoSession> {
        self.session.as_ref()
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Handle on the in-progress slot, for observers that grey out controls.
    pub fn activity(&self) -> ActivitySlot {
        self.activity.clone()
    }

    pub fn last_status(&self) -> Option<&JobStatus> {
        self.last_status.as_ref()
    }

    pub fn result_version(&self) -> u64 {
        self.result_version
    }

    pub fn download_reference(&self) -> Option<&ResultReference> {
        self.result.as_ref()
    }

    pub fn log_summary(&self) {
        self.logger.summary();
    }

    fn ensure_can(&self, next: PipelineState) -> Result<(), PipelineError> {
        if self.state.can_transition_to(next) {
            Ok(())
        } else {
            Err(PipelineError::InvalidTransition {
                from: self.state,
                to: next,
            })
        }
    }

    fn transition(&mut self, next: PipelineState) -> Result<(), PipelineError> {
        self.ensure_can(next)?;
        log::debug!("Pipeline {} -> {next}", self.state);
        self.state = next;
        Ok(())
    }

    fn begin(&self, activity: Activity) -> Result<ActivityGuard, PipelineError> {
        self.activity
            .begin(activity)
            .map_err(|current| PipelineError::Busy(current.as_str()))
    }

    fn validate_upload(&self, upload: &VideoUpload) -> Result<(), ValidationError> {
        if !upload.is_video() {
            return Err(ValidationError::BadMimeType {
                filename: upload.filename.clone(),
                content_type: upload.content_type.clone(),
            });
        }
        let max = self.settings.max_upload_bytes;
        if upload.size() > max {
            return Err(ValidationError::TooLarge {
                size: upload.size(),
                max,
            });
        }
        Ok(())
    }

    /// Sends the video to the service and moves to analysis.
    ///
    /// A video whose size cannot be mapped onto the display is still
    /// accepted here; it is refused when editing would begin.
    pub async fn upload(&mut self, upload: VideoUpload) -> Result<VideoSession, PipelineError> {
        self.ensure_can(PipelineState::Analyze)?;
        self.validate_upload(&upload)?;
        let _busy = self.begin(Activity::Uploading)?;

        let started = Instant::now();
        let session = self.service.upload(&upload).await?;
        self.logger
            .timing("upload", started.elapsed().as_secs_f64() * 1000.0);
        self.logger.info(&session.summary(upload.size()));

        let mapper = CoordinateMapper::new(
            self.settings.display_width as f64,
            self.settings.display_height as f64,
            session.width as f64,
            session.height as f64,
        );
        if let Err(e) = &mapper {
            log::warn!("Video {} cannot be edited: {e}", session.id);
        }

        self.mapper = Some(mapper);
        self.session = Some(session.clone());
        self.transition(PipelineState::Analyze)?;
        Ok(session)
    }

    /// Runs face detection and opens the editor on its results.
    ///
    /// On a remote failure the pipeline stays in analysis so the call can
    /// simply be repeated.
    pub async fn analyze(&mut self) -> Result<AnalysisSummary, PipelineError> {
        let session = self.session.clone().ok_or(PipelineError::NoSession)?;
        self.ensure_can(PipelineState::Edit)?;
        let _busy = self.begin(Activity::Analyzing)?;

        let started = Instant::now();
        self.service.start_analysis(&session.id).await?;
        let status = self.watch("analysis", &session.id).await?;
        match status.phase {
            JobPhase::Analyzed => {}
            JobPhase::Error => {
                return Err(PipelineError::RemoteJob {
                    stage: "analysis",
                    message: status.failure_message(),
                })
            }
            other => {
                return Err(PipelineError::RemoteJob {
                    stage: "analysis",
                    message: format!("job ended as '{other}'"),
                })
            }
        }

        let snapshot = self.service.analysis(&session.id).await?;
        let mapper = match &self.mapper {
            Some(Ok(mapper)) => *mapper,
            Some(Err(e)) => return Err(e.clone().into()),
            None => return Err(PipelineError::NoSession),
        };
        let total_frames = snapshot
            .total_frames
            .filter(|&n| n > 0)
            .unwrap_or(session.total_frames);

        let summary = AnalysisSummary {
            total_frames,
            frames_with_faces: snapshot.annotations.frames_with_faces(),
            total_faces: snapshot.annotations.total_regions(),
        };
        self.logger
            .timing("analysis", started.elapsed().as_secs_f64() * 1000.0);
        self.logger
            .metric("faces_detected", summary.total_faces as f64);
        self.logger
            .metric("frames_with_faces", summary.frames_with_faces as f64);
        self.logger.info(&format!(
            "Detected {} faces across {} of {} frames",
            summary.total_faces, summary.frames_with_faces, total_frames
        ));

        let store = Arc::new(AnnotationStore::new(
            Arc::clone(&self.service),
            session.id.clone(),
            snapshot.annotations,
        ));
        self.editor = Some(RegionEditor::new(
            Arc::clone(&self.service),
            Arc::clone(&store),
            session.id,
            mapper,
            total_frames,
        ));
        self.store = Some(store);
        self.transition(PipelineState::Edit)?;
        Ok(summary)
    }

    async fn watch(&mut self, stage: &'static str, session_id: &str) -> Result<JobStatus, PipelineError> {
        let service = Arc::clone(&self.service);
        let logger = &mut self.logger;
        let status = self
            .poller
            .watch(
                || service.status(session_id),
                |s| logger.progress(stage, s.progress, &s.message),
            )
            .await?;
        self.last_status = Some(status.clone());
        Ok(status)
    }

    /// The region editor, available while editing.
    pub fn editor(&mut self) -> Result<&mut RegionEditor, PipelineError> {
        if self.state != PipelineState::Edit {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to: PipelineState::Edit,
            });
        }
        self.editor.as_mut().ok_or(PipelineError::NoSession)
    }

    /// Leaves the editor; used both for "save edits" and "skip editing".
    ///
    /// Every edit was already confirmed by the service, so there is nothing
    /// left to flush.
    pub fn finish_editing(&mut self) -> Result<(), PipelineError> {
        self.transition(PipelineState::Process)?;
        if let Some(store) = &self.store {
            let (frames, faces) = store.counts();
            self.logger
                .info(&format!("Editing done: {faces} faces on {frames} frames"));
        }
        Ok(())
    }

    /// Blurs the current annotations into a new video.
    ///
    /// Can be repeated from `Complete` with a different strength; each
    /// completed run gets a fresh download reference.
    pub async fn process(&mut self, blur_strength: u32) -> Result<ResultReference, PipelineError> {
        if !matches!(self.state, PipelineState::Process | PipelineState::Complete) {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to: PipelineState::Process,
            });
        }
        if !(BLUR_STRENGTH_MIN..=BLUR_STRENGTH_MAX).contains(&blur_strength) {
            return Err(ValidationError::BlurStrengthOutOfRange {
                value: blur_strength,
                min: BLUR_STRENGTH_MIN,
                max: BLUR_STRENGTH_MAX,
            }
            .into());
        }
        let session = self.session.clone().ok_or(PipelineError::NoSession)?;
        let store = self.store.clone().ok_or(PipelineError::NoSession)?;
        let _busy = self.begin(Activity::Processing)?;

        if store.sync_state() == SyncState::Stale {
            store.refresh().await?;
        }
        if self.state == PipelineState::Complete {
            self.transition(PipelineState::Process)?;
        }

        let started = Instant::now();
        let request = ProcessRequest {
            masks: store.snapshot(),
            blur_strength,
        };
        log::info!(
            "Processing {} with {} masks at strength {blur_strength}",
            session.filename,
            request.masks.total_regions()
        );
        self.service.start_processing(&session.id, &request).await?;
        let status = self.watch("processing", &session.id).await?;
        match status.phase {
            JobPhase::Completed => {}
            JobPhase::Error => {
                return Err(PipelineError::RemoteJob {
                    stage: "processing",
                    message: status.failure_message(),
                })
            }
            other => {
                return Err(PipelineError::RemoteJob {
                    stage: "processing",
                    message: format!("job ended as '{other}'"),
                })
            }
        }

        self.result_version += 1;
        let token = DownloadToken::new(self.result_version);
        let reference = ResultReference {
            url: self.service.download_url(&session.id, &token),
            filename: format!("{PROCESSED_FILE_PREFIX}{}", session.filename),
            token,
        };
        self.logger
            .timing("processing", started.elapsed().as_secs_f64() * 1000.0);
        self.logger
            .info(&format!("Processed video ready: {}", reference.url));

        self.result = Some(reference.clone());
        self.transition(PipelineState::Complete)?;
        Ok(reference)
    }

    /// Fetches the processed video for the latest completed run.
    pub async fn download(&self) -> Result<Vec<u8>, PipelineError> {
        let session = self.session.as_ref().ok_or(PipelineError::NoSession)?;
        let reference = match (&self.result, self.state) {
            (Some(reference), PipelineState::Complete) => reference,
            _ => {
                return Err(PipelineError::InvalidTransition {
                    from: self.state,
                    to: PipelineState::Complete,
                })
            }
        };
        let bytes = self.service.download(&session.id, &reference.token).await?;
        log::info!("Downloaded {} ({} bytes)", reference.filename, bytes.len());
        Ok(bytes)
    }

    /// Drops the session and returns to upload.
    ///
    /// Refused while a remote job is in progress. The result version is
    /// kept so references from a later video never repeat an earlier one.
    pub fn reset(&mut self) -> Result<(), PipelineError> {
        let current = self.activity.current();
        if current != Activity::Idle {
            return Err(PipelineError::Busy(current.as_str()));
        }
        self.poller.cancel();
        self.transition(PipelineState::Upload)?;
        self.session = None;
        self.mapper = None;
        self.store = None;
        self.editor = None;
        self.last_status = None;
        self.result = None;
        Ok(())
    }
}
