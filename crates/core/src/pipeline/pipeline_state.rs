/// Stage of the upload → analyze → edit → process → complete workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Upload,
    Analyze,
    Edit,
    Process,
    Complete,
}

impl PipelineState {
    /// Whether the workflow may move from `self` to `next`.
    ///
    /// Going back to `Upload` is always allowed; the caller still has to make
    /// sure no remote job is running.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (_, Upload)
                | (Upload, Analyze)
                | (Analyze, Edit)
                | (Edit, Process)
                | (Process, Complete)
                | (Complete, Process)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Analyze => "analyze",
            Self::Edit => "edit",
            Self::Process => "process",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
