pub mod constants;
pub mod frame_image;
pub mod geometry;
pub mod region;
pub mod settings;
pub mod video_session;
