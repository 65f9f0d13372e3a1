/// One uploaded video, as reported by the service.
///
/// Created on a successful upload and left untouched until the pipeline
/// is reset.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoSession {
    pub id: String,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration: f64,
    pub total_frames: u32,
}

impl VideoSession {
    pub fn last_frame(&self) -> u32 {
        self.total_frames.saturating_sub(1)
    }

    /// Human-readable upload summary shown after the upload step.
    pub fn summary(&self, size_bytes: u64) -> String {
        format!(
            "File: {} | Size: {} | Duration: {:.1}s | Resolution: {}x{}",
            self.filename,
            format_file_size(size_bytes),
            self.duration,
            self.width,
            self.height
        )
    }
}

/// Formats a byte count with binary units and at most two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[exp])
}
