pub mod http_video_service;
mod wire;
