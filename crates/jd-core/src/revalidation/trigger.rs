use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Why a refetch was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevalidationTrigger {
    /// Subscriber count for the key went from 0 to 1.
    Mount,
    /// The application regained foreground focus.
    FocusRegained,
    /// Connectivity came back after a loss.
    Reconnected,
    /// Explicit refresh, e.g. pull-to-refresh.
    Manual,
    /// Re-armed by the coordinator after reconciling a mutation.
    AfterMutation,
}

impl RevalidationTrigger {
    /// Background triggers are subject to the dedupe interval.
    pub fn is_background(&self) -> bool {
        matches!(self, Self::Mount | Self::FocusRegained | Self::Reconnected)
    }
}

impl Display for RevalidationTrigger {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Mount => "mount",
            Self::FocusRegained => "focus_regained",
            Self::Reconnected => "reconnected",
            Self::Manual => "manual",
            Self::AfterMutation => "after_mutation",
        };
        f.write_str(name)
    }
}
