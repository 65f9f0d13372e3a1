use thiserror::Error;

use crate::annotation::annotation_store::{AnnotationError, Mutation};
use crate::annotation::domain::coordinate_mapper::MappingError;
use crate::pipeline::job_poller::PollError;
use crate::pipeline::pipeline_state::PipelineState;
use crate::remote::domain::video_service::ServiceError;
use crate::shared::frame_image::FrameDecodeError;

/// Input rejected before anything is sent to the service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("'{filename}' is not a video (content type '{content_type}')")]
    BadMimeType {
        filename: String,
        content_type: String,
    },
    #[error("file is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },
    #[error("blur strength {value} is outside {min}..={max}")]
    BlurStrengthOutOfRange { value: u32, min: u32, max: u32 },
    #[error("frame {frame} has no face #{index} ({len} present)")]
    IndexOutOfRange { frame: u32, index: usize, len: usize },
    #[error("frame {frame} is outside 0..={last}")]
    FrameOutOfRange { frame: u32, last: u32 },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("transport error: {0}")]
    Transport(#[from] ServiceError),
    #[error("{stage} failed on the server: {message}")]
    RemoteJob { stage: &'static str, message: String },
    #[error("configuration error: {0}")]
    Configuration(#[from] MappingError),
    #[error("cannot go from {from} to {to}")]
    InvalidTransition {
        from: PipelineState,
        to: PipelineState,
    },
    #[error("another operation is already in progress ({0})")]
    Busy(&'static str),
    #[error("an annotation change is still in flight ({0})")]
    MutationInFlight(Mutation),
    #[error("annotations are out of date with the server; refresh first")]
    StaleAnnotations,
    #[error("no video has been uploaded")]
    NoSession,
    #[error("status polling was replaced by a newer job")]
    Superseded,
    #[error(transparent)]
    FrameDecode(#[from] FrameDecodeError),
}

impl From<AnnotationError> for PipelineError {
    fn from(e: AnnotationError) -> Self {
        match e {
            AnnotationError::MutationInFlight(m) => Self::MutationInFlight(m),
            AnnotationError::Stale => Self::StaleAnnotations,
            AnnotationError::IndexOutOfRange { frame, index, len } => {
                ValidationError::IndexOutOfRange { frame, index, len }.into()
            }
            AnnotationError::Service(e) => Self::Transport(e),
        }
    }
}

impl From<PollError> for PipelineError {
    fn from(e: PollError) -> Self {
        match e {
            PollError::Transport(e) => Self::Transport(e),
            PollError::Superseded => Self::Superseded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_errors_map_onto_pipeline_taxonomy() {
        let err: PipelineError = AnnotationError::Stale.into();
        assert!(matches!(err, PipelineError::StaleAnnotations));

        let err: PipelineError = AnnotationError::IndexOutOfRange {
            frame: 3,
            index: 5,
            len: 2,
        }
        .into();
        assert!(matches!(
            err,
            PipelineError::Validation(ValidationError::IndexOutOfRange { index: 5, .. })
        ));
    }

    #[test]
    fn test_remote_job_message_is_reported() {
        let err = PipelineError::RemoteJob {
            stage: "analysis",
            message: "Video file not found".to_string(),
        };
        assert_eq!(err.to_string(), "analysis failed on the server: Video file not found");
    }

    #[test]
    fn test_invalid_transition_names_states() {
        let err = PipelineError::InvalidTransition {
            from: PipelineState::Process,
            to: PipelineState::Edit,
        };
        assert_eq!(err.to_string(), "cannot go from process to edit");
    }
}
