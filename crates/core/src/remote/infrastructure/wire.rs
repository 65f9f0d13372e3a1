//! JSON shapes exchanged with the service and their conversions into
//! domain types.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::annotation::domain::frame_annotations::FrameAnnotations;
use crate::remote::domain::job_status::{JobPhase, JobStatus};
use crate::remote::domain::video_service::AnalysisSnapshot;
use crate::shared::geometry::PixelBox;
use crate::shared::region::FaceRegion;
use crate::shared::video_session::VideoSession;

#[derive(Debug, Default, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub fps: f64,
    #[serde(default)]
    pub total_frames: u32,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub video_id: String,
    #[serde(default)]
    pub video_info: Option<VideoInfo>,
}

impl UploadResponse {
    /// Builds the session, falling back to the local file name when the
    /// service does not echo one back.
    pub fn into_session(self, local_filename: &str) -> VideoSession {
        let info = self.video_info.unwrap_or_default();
        VideoSession {
            id: self.video_id,
            filename: info.filename.unwrap_or_else(|| local_filename.to_string()),
            width: info.width,
            height: info.height,
            fps: info.fps,
            duration: info.duration,
            total_frames: info.total_frames,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn into_status(self) -> Result<JobStatus, String> {
        let phase = JobPhase::parse(&self.status)
            .ok_or_else(|| format!("unknown job status '{}'", self.status))?;
        let mut status = JobStatus::new(phase, self.progress, self.message);
        status.download_url = self.download_url;
        status.error = self.error;
        Ok(status)
    }
}

/// A face box on the wire. Detector output may carry fractional pixels;
/// they are rounded on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    #[serde(deserialize_with = "round_to_i32")]
    pub x: i32,
    #[serde(deserialize_with = "round_to_i32")]
    pub y: i32,
    #[serde(deserialize_with = "round_to_i32")]
    pub width: i32,
    #[serde(deserialize_with = "round_to_i32")]
    pub height: i32,
    #[serde(default)]
    pub manual: bool,
}

fn round_to_i32<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
    let v = f64::deserialize(d)?;
    Ok(v.round() as i32)
}

impl From<&FaceRegion> for FaceBox {
    fn from(r: &FaceRegion) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
            manual: r.manual,
        }
    }
}

impl From<FaceBox> for FaceRegion {
    fn from(b: FaceBox) -> Self {
        Self {
            x: b.x,
            y: b.y,
            width: b.width,
            height: b.height,
            manual: b.manual,
        }
    }
}

pub type FacesByFrame = BTreeMap<String, Vec<FaceBox>>;

pub fn encode_annotations(annotations: &FrameAnnotations) -> FacesByFrame {
    annotations
        .iter()
        .map(|(frame, regions)| (frame.to_string(), regions.iter().map(FaceBox::from).collect()))
        .collect()
}

pub fn decode_annotations(faces: FacesByFrame) -> Result<FrameAnnotations, String> {
    faces
        .into_iter()
        .map(|(key, boxes)| -> Result<(u32, Vec<FaceRegion>), String> {
            let frame = key
                .parse::<u32>()
                .map_err(|_| format!("invalid frame key '{key}'"))?;
            Ok((frame, boxes.into_iter().map(FaceRegion::from).collect()))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub video_info: Option<VideoInfo>,
    #[serde(default)]
    pub faces_by_frame: FacesByFrame,
}

impl AnalysisResponse {
    pub fn into_snapshot(self) -> Result<AnalysisSnapshot, String> {
        Ok(AnalysisSnapshot {
            total_frames: self.video_info.map(|i| i.total_frames),
            annotations: decode_annotations(self.faces_by_frame)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct BulkUpdateBody {
    pub faces_by_frame: FacesByFrame,
}

#[derive(Debug, Serialize)]
pub struct AddFaceBody {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl From<PixelBox> for AddFaceBody {
    fn from(b: PixelBox) -> Self {
        Self {
            x: b.x,
            y: b.y,
            width: b.width,
            height: b.height,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProcessBody {
    pub masks: FacesByFrame,
    pub blur_strength: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upload_response_reports_video_info() {
        let raw = json!({
            "video_id": "0b7f",
            "status": "uploaded",
            "message": "Video uploaded successfully",
            "video_info": {
                "filename": "street.mp4",
                "fps": 30.0,
                "total_frames": 300,
                "duration": 10.0,
                "width": 1280,
                "height": 720
            }
        });
        let resp: UploadResponse = serde_json::from_value(raw).unwrap();
        let session = resp.into_session("local.mp4");

        assert_eq!(session.id, "0b7f");
        assert_eq!(session.filename, "street.mp4");
        assert_eq!((session.width, session.height), (1280, 720));
        assert_eq!(session.total_frames, 300);
        assert_eq!(session.duration, 10.0);
    }

    #[test]
    fn test_upload_response_without_info_uses_local_name() {
        let resp: UploadResponse = serde_json::from_value(json!({"video_id": "x"})).unwrap();
        let session = resp.into_session("local.mp4");
        assert_eq!(session.filename, "local.mp4");
        assert_eq!(session.width, 0);
    }

    #[test]
    fn test_status_response_maps_server_vocabulary() {
        let raw = json!({
            "video_id": "x",
            "status": "processing",
            "progress": 75.0,
            "message": "Processing... 50.0%",
            "download_url": null,
            "error": null
        });
        let status = serde_json::from_value::<StatusResponse>(raw)
            .unwrap()
            .into_status()
            .unwrap();
        assert_eq!(status.phase, JobPhase::Running);
        assert_eq!(status.progress, 75.0);
    }

    #[test]
    fn test_status_response_rejects_unknown_status() {
        let resp: StatusResponse = serde_json::from_value(json!({"status": "melted"})).unwrap();
        assert!(resp.into_status().unwrap_err().contains("melted"));
    }

    #[test]
    fn test_analysis_response_decodes_frames_and_rounds() {
        let raw = json!({
            "video_info": {"total_frames": 120, "width": 640, "height": 360},
            "faces_by_frame": {
                "0": [{"x": 10.6, "y": 20, "width": 30, "height": 40}],
                "12": [
                    {"x": 1, "y": 2, "width": 3, "height": 4},
                    {"x": 5, "y": 6, "width": 7, "height": 8, "manual": true}
                ]
            },
            "analysis_settings": {"sample_rate": 1}
        });
        let snapshot = serde_json::from_value::<AnalysisResponse>(raw)
            .unwrap()
            .into_snapshot()
            .unwrap();

        assert_eq!(snapshot.total_frames, Some(120));
        assert_eq!(snapshot.annotations.get(0), &[FaceRegion::detected(11, 20, 30, 40)]);
        assert_eq!(snapshot.annotations.get(12).len(), 2);
        assert!(snapshot.annotations.get(12)[1].manual);
    }

    #[test]
    fn test_analysis_response_rejects_bad_frame_key() {
        let raw = json!({"faces_by_frame": {"first": []}});
        let resp: AnalysisResponse = serde_json::from_value(raw).unwrap();
        assert!(resp.into_snapshot().is_err());
    }

    #[test]
    fn test_encode_annotations_uses_string_keys() {
        let annotations: FrameAnnotations = [(4, vec![FaceRegion::manual(1, 2, 3, 4)])]
            .into_iter()
            .collect();
        let body = BulkUpdateBody {
            faces_by_frame: encode_annotations(&annotations),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({"faces_by_frame": {"4": [
                {"x": 1, "y": 2, "width": 3, "height": 4, "manual": true}
            ]}})
        );
    }

    #[test]
    fn test_process_body_shape() {
        let body = ProcessBody {
            masks: FacesByFrame::new(),
            blur_strength: 20,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"masks": {}, "blur_strength": 20})
        );
    }
}
