use std::time::{SystemTime, UNIX_EPOCH};

/// Cache-busting token for the processed artifact.
///
/// Each completed processing run bumps `version`, so a reference issued
/// after a new run can never resolve to a previously cached download.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DownloadToken {
    pub version: u64,
    pub issued_at_ms: u128,
}

impl DownloadToken {
    pub fn new(version: u64) -> Self {
        let issued_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        Self {
            version,
            issued_at_ms,
        }
    }

    pub fn query(&self) -> String {
        format!("v={}&t={}", self.version, self.issued_at_ms)
    }
}

/// Where and under which version a processed video can be fetched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultReference {
    pub token: DownloadToken,
    pub url: String,
    pub filename: String,
}
