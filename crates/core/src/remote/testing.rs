//! In-memory [`VideoService`] used by unit tests across the crate.

use std::collections::{HashSet, VecDeque};
use std::io::Cursor;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::annotation::domain::frame_annotations::FrameAnnotations;
use crate::remote::domain::download_token::DownloadToken;
use crate::remote::domain::job_status::{JobPhase, JobStatus};
use crate::remote::domain::video_service::{
    AnalysisSnapshot, ProcessRequest, ServiceError, VideoService, VideoUpload,
};
use crate::shared::geometry::PixelBox;
use crate::shared::region::FaceRegion;
use crate::shared::video_session::VideoSession;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Upload(String),
    StartAnalysis,
    Status,
    Analysis,
    Replace(FrameAnnotations),
    AddFace(u32, PixelBox),
    RemoveFace(u32, usize),
    FrameImage(u32),
    StartProcessing(ProcessRequest),
    Download(u64),
}

pub enum Scripted {
    Status(JobStatus),
    TransportFailure,
}

pub struct StubState {
    pub session: VideoSession,
    pub annotations: FrameAnnotations,
    pub total_frames: Option<u32>,
    pub script: VecDeque<Scripted>,
    pub last_status: JobStatus,
    pub calls: Vec<Call>,
    /// Operation names that answer with HTTP 500.
    pub failing: HashSet<&'static str>,
    /// Latency applied to add/remove/replace before they take effect.
    pub mutation_delay: Option<Duration>,
    pub frame_png: Vec<u8>,
}

pub struct StubVideoService {
    state: Mutex<StubState>,
}

pub fn session_720p() -> VideoSession {
    VideoSession {
        id: "session-1".to_string(),
        filename: "street.mp4".to_string(),
        width: 1280,
        height: 720,
        fps: 30.0,
        duration: 10.0,
        total_frames: 300,
    }
}

pub fn status(phase: JobPhase, progress: f64) -> JobStatus {
    JobStatus::new(phase, progress, format!("{phase} {progress}"))
}

fn png(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([40, 40, 40, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("encode test frame");
    out.into_inner()
}

impl StubVideoService {
    pub fn new() -> Self {
        Self::with_session(session_720p())
    }

    pub fn with_session(session: VideoSession) -> Self {
        Self {
            state: Mutex::new(StubState {
                total_frames: Some(session.total_frames),
                session,
                annotations: FrameAnnotations::new(),
                script: VecDeque::new(),
                last_status: status(JobPhase::Queued, 0.0),
                calls: Vec::new(),
                failing: HashSet::new(),
                mutation_delay: None,
                frame_png: png(64, 36),
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap()
    }

    pub fn with_annotations(self, annotations: FrameAnnotations) -> Self {
        self.state().annotations = annotations;
        self
    }

    pub fn script(&self, entries: impl IntoIterator<Item = Scripted>) {
        self.state().script.extend(entries);
    }

    pub fn fail(&self, operation: &'static str) {
        self.state().failing.insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.state().failing.remove(operation);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }

    fn record(&self, operation: &'static str, call: Call) -> Result<(), ServiceError> {
        let mut state = self.state();
        state.calls.push(call);
        if state.failing.contains(operation) {
            return Err(ServiceError::Api {
                operation,
                status: 500,
                body: format!("{operation} exploded"),
            });
        }
        Ok(())
    }

    async fn mutation_latency(&self) {
        let delay = self.state().mutation_delay;
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
    }
}

#[async_trait]
impl VideoService for StubVideoService {
    async fn upload(&self, upload: &VideoUpload) -> Result<VideoSession, ServiceError> {
        self.record("upload video", Call::Upload(upload.filename.clone()))?;
        Ok(self.state().session.clone())
    }

    async fn start_analysis(&self, _session_id: &str) -> Result<(), ServiceError> {
        self.record("start analysis", Call::StartAnalysis)
    }

    async fn status(&self, _session_id: &str) -> Result<JobStatus, ServiceError> {
        self.record("poll status", Call::Status)?;
        let mut state = self.state();
        match state.script.pop_front() {
            Some(Scripted::Status(s)) => {
                state.last_status = s.clone();
                Ok(s)
            }
            Some(Scripted::TransportFailure) => Err(ServiceError::Api {
                operation: "poll status",
                status: 502,
                body: "bad gateway".to_string(),
            }),
            None => Ok(state.last_status.clone()),
        }
    }

    async fn analysis(&self, _session_id: &str) -> Result<AnalysisSnapshot, ServiceError> {
        self.record("fetch analysis", Call::Analysis)?;
        let state = self.state();
        Ok(AnalysisSnapshot {
            total_frames: state.total_frames,
            annotations: state.annotations.clone(),
        })
    }

    async fn replace_annotations(
        &self,
        _session_id: &str,
        annotations: &FrameAnnotations,
    ) -> Result<(), ServiceError> {
        self.mutation_latency().await;
        self.record("bulk update analysis", Call::Replace(annotations.clone()))?;
        self.state().annotations = annotations.clone();
        Ok(())
    }

    async fn add_face(
        &self,
        _session_id: &str,
        frame: u32,
        face: PixelBox,
    ) -> Result<(), ServiceError> {
        self.mutation_latency().await;
        self.record("add face", Call::AddFace(frame, face))?;
        let mut state = self.state();
        let mut regions = state.annotations.get(frame).to_vec();
        regions.push(FaceRegion::manual(face.x, face.y, face.width, face.height));
        state.annotations.set(frame, regions);
        Ok(())
    }

    async fn remove_face(
        &self,
        _session_id: &str,
        frame: u32,
        index: usize,
    ) -> Result<(), ServiceError> {
        self.mutation_latency().await;
        self.record("remove face", Call::RemoveFace(frame, index))?;
        let mut state = self.state();
        let mut regions = state.annotations.get(frame).to_vec();
        if index >= regions.len() {
            return Err(ServiceError::Api {
                operation: "remove face",
                status: 404,
                body: "Face not found".to_string(),
            });
        }
        regions.remove(index);
        state.annotations.set(frame, regions);
        Ok(())
    }

    async fn frame_image(&self, _session_id: &str, frame: u32) -> Result<Vec<u8>, ServiceError> {
        self.record("fetch frame image", Call::FrameImage(frame))?;
        Ok(self.state().frame_png.clone())
    }

    async fn start_processing(
        &self,
        _session_id: &str,
        request: &ProcessRequest,
    ) -> Result<(), ServiceError> {
        self.record("start processing", Call::StartProcessing(request.clone()))
    }

    fn download_url(&self, session_id: &str, token: &DownloadToken) -> String {
        format!("stub://download/{session_id}?{}", token.query())
    }

    async fn download(
        &self,
        _session_id: &str,
        token: &DownloadToken,
    ) -> Result<Vec<u8>, ServiceError> {
        self.record("download processed video", Call::Download(token.version))?;
        Ok(format!("video v{}", token.version).into_bytes())
    }
}
