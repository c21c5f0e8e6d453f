use strum_macros::{Display, EnumIter};

/// Where an application is in its lifecycle.
///
/// ```text
/// Built ── start ──▶ Starting ──▶ Running ── stop ──▶ Stopping ──▶ Stopped
///                       │
///                       └─ hook failed ─▶ StoppingAfterFailure ──▶ FailedToStart
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ContainerState {
    Built,
    Starting,
    Running,
    StoppingAfterFailure,
    Stopping,
    Stopped,
    FailedToStart,
}

impl ContainerState {
    /// No further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::FailedToStart)
    }
}
