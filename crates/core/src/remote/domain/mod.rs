pub mod download_token;
pub mod job_status;
pub mod video_service;
