use async_trait::async_trait;
use thiserror::Error;

use crate::annotation::domain::frame_annotations::FrameAnnotations;
use crate::remote::domain::download_token::DownloadToken;
use crate::remote::domain::job_status::JobStatus;
use crate::shared::constants::VIDEO_MIME_TYPES;
use crate::shared::geometry::PixelBox;
use crate::shared::video_session::VideoSession;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// The request never produced a response (network, DNS, TLS, ...).
    #[error("{operation}: request failed: {source}")]
    Request {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// The service answered with a non-success status.
    #[error("{operation}: service returned {status}: {body}")]
    Api {
        operation: &'static str,
        status: u16,
        body: String,
    },
    /// The response arrived but could not be understood.
    #[error("{operation}: unexpected response: {detail}")]
    Decode {
        operation: &'static str,
        detail: String,
    },
}

/// A video file selected for upload.
#[derive(Clone, Debug)]
pub struct VideoUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl VideoUpload {
    /// Content type is looked up from the file extension; unknown
    /// extensions get `application/octet-stream`.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = video_mime_type(&filename)
            .unwrap_or("application/octet-stream")
            .to_string();
        Self {
            filename,
            content_type,
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_video(&self) -> bool {
        self.content_type.starts_with("video/")
    }
}

pub fn video_mime_type(filename: &str) -> Option<&'static str> {
    let ext = std::path::Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    VIDEO_MIME_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Detection results as stored by the service.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnalysisSnapshot {
    /// Frame count reported alongside the results, when present.
    pub total_frames: Option<u32>,
    pub annotations: FrameAnnotations,
}

/// Parameters for a blur-processing run.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessRequest {
    pub masks: FrameAnnotations,
    pub blur_strength: u32,
}

/// The remote face-detection and blur service.
///
/// Every coordinate passed across this boundary is in source-video pixels.
#[async_trait]
pub trait VideoService: Send + Sync {
    async fn upload(&self, upload: &VideoUpload) -> Result<VideoSession, ServiceError>;

    async fn start_analysis(&self, session_id: &str) -> Result<(), ServiceError>;

    async fn status(&self, session_id: &str) -> Result<JobStatus, ServiceError>;

    async fn analysis(&self, session_id: &str) -> Result<AnalysisSnapshot, ServiceError>;

    /// Replaces the service's entire frame → faces mapping.
    async fn replace_annotations(
        &self,
        session_id: &str,
        annotations: &FrameAnnotations,
    ) -> Result<(), ServiceError>;

    /// Appends a manual face to `frame`.
    async fn add_face(&self, session_id: &str, frame: u32, face: PixelBox)
        -> Result<(), ServiceError>;

    /// Removes the face at `index` in the service's current sequence for `frame`.
    async fn remove_face(&self, session_id: &str, frame: u32, index: usize)
        -> Result<(), ServiceError>;

    /// Encoded image bytes for a single frame.
    async fn frame_image(&self, session_id: &str, frame: u32) -> Result<Vec<u8>, ServiceError>;

    async fn start_processing(
        &self,
        session_id: &str,
        request: &ProcessRequest,
    ) -> Result<(), ServiceError>;

    /// Location of the processed video for the given cache-busting token.
    fn download_url(&self, session_id: &str, token: &DownloadToken) -> String;

    async fn download(&self, session_id: &str, token: &DownloadToken)
        -> Result<Vec<u8>, ServiceError>;
}
