use std::fmt::{Display, Formatter, Result};

use serde::{Deserialize, Serialize};

/// Lifecycle of a delivery task.
///
/// `Queued -> Sending -> {Delivered | Retrying -> Sending | Failed}`, with
/// `Cancelled` reachable from any non-terminal state on shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    Queued,
    Sending,
    Retrying,
    Delivered,
    Failed,
    Cancelled,
}

impl DeliveryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliveryState::Delivered | DeliveryState::Failed | DeliveryState::Cancelled
        )
    }
}

impl Display for DeliveryState {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            DeliveryState::Queued => write!(f, "queued"),
            DeliveryState::Sending => write!(f, "sending"),
            DeliveryState::Retrying => write!(f, "retrying"),
            DeliveryState::Delivered => write!(f, "delivered"),
            DeliveryState::Failed => write!(f, "failed"),
            DeliveryState::Cancelled => write!(f, "cancelled"),
        }
    }
}
