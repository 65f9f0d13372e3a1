/// Lifecycle phase of a remote job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobPhase {
    Queued,
    Running,
    Analyzed,
    Completed,
    Error,
}

impl JobPhase {
    /// Parses the status vocabulary used by the service.
    ///
    /// The server reports `uploaded` before any job starts and names running
    /// jobs after their stage (`analyzing`, `processing`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "queued" | "uploaded" => Some(Self::Queued),
            "running" | "analyzing" | "processing" => Some(Self::Running),
            "analyzed" => Some(Self::Analyzed),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Analyzed | Self::Completed | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Analyzed => "analyzed",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status report for a session's current job.
#[derive(Clone, Debug, PartialEq)]
pub struct JobStatus {
    pub phase: JobPhase,
    /// Percent complete, clamped to `0.0..=100.0`.
    pub progress: f64,
    pub message: String,
    pub download_url: Option<String>,
    pub error: Option<String>,
}

impl JobStatus {
    pub fn new(phase: JobPhase, progress: f64, message: impl Into<String>) -> Self {
        Self {
            phase,
            progress: clamp_progress(progress),
            message: message.into(),
            download_url: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Progress line in the form the operator sees: `"42% - Detecting faces..."`.
    pub fn progress_text(&self) -> String {
        format!("{}% - {}", self.progress.round() as u32, self.message)
    }

    /// Best available explanation for a failed job.
    pub fn failure_message(&self) -> String {
        if !self.message.is_empty() {
            self.message.clone()
        } else {
            self.error.clone().unwrap_or_else(|| "unknown error".to_string())
        }
    }
}

fn clamp_progress(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 100.0)
    }
}
