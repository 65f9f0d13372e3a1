use std::sync::{Arc, Mutex, MutexGuard};

/// The remote job the controller is currently waiting on, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Activity {
    #[default]
    Idle,
    Uploading,
    Analyzing,
    Processing,
}

impl Activity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Analyzing => "analyzing",
            Self::Processing => "processing",
        }
    }
}

/// Single in-progress slot shared by upload, analysis and processing.
#[derive(Clone, Debug, Default)]
pub struct ActivitySlot {
    current: Arc<Mutex<Activity>>,
}

impl ActivitySlot {
    fn lock(&self) -> MutexGuard<'_, Activity> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current(&self) -> Activity {
        *self.lock()
    }

    pub fn is_idle(&self) -> bool {
        self.current() == Activity::Idle
    }

    /// Claims the slot, or returns what already holds it.
    ///
    /// The slot is released when the returned guard drops, on success, error
    /// or cancellation alike.
    pub fn begin(&self, activity: Activity) -> Result<ActivityGuard, Activity> {
        let mut current = self.lock();
        if *current != Activity::Idle {
            return Err(*current);
        }
        *current = activity;
        Ok(ActivityGuard {
            slot: self.clone(),
        })
    }
}

pub struct ActivityGuard {
    slot: ActivitySlot,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        *self.slot.lock() = Activity::Idle;
    }
}
