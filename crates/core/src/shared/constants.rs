use std::time::Duration;

/// Uploads larger than this are rejected before any bytes leave the client.
pub const MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub const DISPLAY_WIDTH: u32 = 800;
pub const DISPLAY_HEIGHT: u32 = 450;

/// Drawn rectangles narrower or shorter than this (display pixels) are
/// treated as accidental clicks.
pub const MIN_DRAW_SIZE: f64 = 20.0;

pub const BLUR_STRENGTH_MIN: u32 = 1;
pub const BLUR_STRENGTH_MAX: u32 = 50;
pub const DEFAULT_BLUR_STRENGTH: u32 = 20;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Extension → MIME type for the video containers the service accepts.
pub const VIDEO_MIME_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("mpeg", "video/mpeg"),
    ("mpg", "video/mpeg"),
];

pub const PROCESSED_FILE_PREFIX: &str = "blurred_";
