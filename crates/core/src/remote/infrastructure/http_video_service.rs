//! HTTP client for the face-blur service's REST endpoints.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::annotation::domain::frame_annotations::FrameAnnotations;
use crate::remote::domain::download_token::DownloadToken;
use crate::remote::domain::job_status::JobStatus;
use crate::remote::domain::video_service::{
    AnalysisSnapshot, ProcessRequest, ServiceError, VideoService, VideoUpload,
};
use crate::remote::infrastructure::wire::{
    encode_annotations, AddFaceBody, AnalysisResponse, BulkUpdateBody, ProcessBody,
    StatusResponse, UploadResponse,
};
use crate::shared::geometry::PixelBox;
use crate::shared::video_session::VideoSession;

pub struct HttpVideoService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVideoService {
    /// * `base_url` - Service root, e.g. `http://127.0.0.1:8000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuses an existing [`reqwest::Client`] and its connection pool.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn upload_request(
        &self,
        upload: &VideoUpload,
    ) -> Result<reqwest::RequestBuilder, ServiceError> {
        let part = reqwest::multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.filename.clone())
            .mime_str(&upload.content_type)
            .map_err(|source| ServiceError::Request {
                operation: "upload video",
                source,
            })?;
        let form = reqwest::multipart::Form::new().part("file", part);
        Ok(self.client.post(self.url("/api/upload")).multipart(form))
    }

    fn replace_request(
        &self,
        session_id: &str,
        annotations: &FrameAnnotations,
    ) -> reqwest::RequestBuilder {
        let body = BulkUpdateBody {
            faces_by_frame: encode_annotations(annotations),
        };
        self.client
            .post(self.url(&format!("/api/analysis/{session_id}/update")))
            .json(&body)
    }

    fn add_face_request(
        &self,
        session_id: &str,
        frame: u32,
        face: PixelBox,
    ) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(&format!("/api/frame/{session_id}/{frame}/add_face")))
            .json(&AddFaceBody::from(face))
    }

    fn remove_face_request(
        &self,
        session_id: &str,
        frame: u32,
        index: usize,
    ) -> reqwest::RequestBuilder {
        self.client.delete(self.url(&format!(
            "/api/frame/{session_id}/{frame}/remove_face/{index}"
        )))
    }

    fn process_request(
        &self,
        session_id: &str,
        request: &ProcessRequest,
    ) -> reqwest::RequestBuilder {
        let body = ProcessBody {
            masks: encode_annotations(&request.masks),
            blur_strength: request.blur_strength,
        };
        self.client
            .post(self.url(&format!("/api/process/{session_id}")))
            .json(&body)
    }

    async fn send(
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ServiceError> {
        let response = request
            .send()
            .await
            .map_err(|source| ServiceError::Request { operation, source })?;
        Self::ensure_success(operation, response).await
    }

    /// Turns a non-2xx response into [`ServiceError::Api`] carrying the body text.
    async fn ensure_success(
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ServiceError::Api {
                operation,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ServiceError> {
        Self::send(operation, request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ServiceError::Decode {
                operation,
                detail: e.to_string(),
            })
    }

    async fn bytes(
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Vec<u8>, ServiceError> {
        let body = Self::send(operation, request)
            .await?
            .bytes()
            .await
            .map_err(|source| ServiceError::Request { operation, source })?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl VideoService for HttpVideoService {
    async fn upload(&self, upload: &VideoUpload) -> Result<VideoSession, ServiceError> {
        let request = self.upload_request(upload)?;
        let response: UploadResponse = Self::json("upload video", request).await?;
        Ok(response.into_session(&upload.filename))
    }

    async fn start_analysis(&self, session_id: &str) -> Result<(), ServiceError> {
        let request = self
            .client
            .post(self.url(&format!("/api/analyze/{session_id}")));
        Self::send("start analysis", request).await?;
        Ok(())
    }

    async fn status(&self, session_id: &str) -> Result<JobStatus, ServiceError> {
        const OP: &str = "poll status";
        let request = self.client.get(self.url(&format!("/api/status/{session_id}")));
        let response: StatusResponse = Self::json(OP, request).await?;
        response.into_status().map_err(|detail| ServiceError::Decode {
            operation: OP,
            detail,
        })
    }

    async fn analysis(&self, session_id: &str) -> Result<AnalysisSnapshot, ServiceError> {
        const OP: &str = "fetch analysis";
        let request = self
            .client
            .get(self.url(&format!("/api/analysis/{session_id}")));
        let response: AnalysisResponse = Self::json(OP, request).await?;
        response.into_snapshot().map_err(|detail| ServiceError::Decode {
            operation: OP,
            detail,
        })
    }

    async fn replace_annotations(
        &self,
        session_id: &str,
        annotations: &FrameAnnotations,
    ) -> Result<(), ServiceError> {
        let request = self.replace_request(session_id, annotations);
        Self::send("bulk update analysis", request).await?;
        Ok(())
    }

    async fn add_face(
        &self,
        session_id: &str,
        frame: u32,
        face: PixelBox,
    ) -> Result<(), ServiceError> {
        let request = self.add_face_request(session_id, frame, face);
        Self::send("add face", request).await?;
        Ok(())
    }

    async fn remove_face(
        &self,
        session_id: &str,
        frame: u32,
        index: usize,
    ) -> Result<(), ServiceError> {
        let request = self.remove_face_request(session_id, frame, index);
        Self::send("remove face", request).await?;
        Ok(())
    }

    async fn frame_image(&self, session_id: &str, frame: u32) -> Result<Vec<u8>, ServiceError> {
        let request = self
            .client
            .get(self.url(&format!("/api/frame/{session_id}/{frame}")));
        Self::bytes("fetch frame image", request).await
    }

    async fn start_processing(
        &self,
        session_id: &str,
        request: &ProcessRequest,
    ) -> Result<(), ServiceError> {
        let request = self.process_request(session_id, request);
        Self::send("start processing", request).await?;
        Ok(())
    }

    fn download_url(&self, session_id: &str, token: &DownloadToken) -> String {
        self.url(&format!("/api/download/{session_id}?{}", token.query()))
    }

    async fn download(
        &self,
        session_id: &str,
        token: &DownloadToken,
    ) -> Result<Vec<u8>, ServiceError> {
        let request = self.client.get(self.download_url(session_id, token));
        Self::bytes("download processed video", request).await
    }
}
