//! Health status reported by the service.

use serde::{Deserialize, Serialize};

use crate::shutdown::ShutdownPhase;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Health {
    /// Accepting submissions
    #[default]
    Ready,
    /// Listener closing, accepted work still completing
    Stopping,
    /// All accepted work has been published
    Stopped,
}

impl From<ShutdownPhase> for Health {
    fn from(phase: ShutdownPhase) -> Self {
        match phase {
            ShutdownPhase::Running => Health::Ready,
            ShutdownPhase::Stopping => Health::Stopping,
            ShutdownPhase::Stopped => Health::Stopped,
        }
    }
}
