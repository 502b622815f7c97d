//! Order status.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Order status as understood by the commerce backend.
///
/// Orders recorded only in the local ledger start as [`OrderStatus::Pending`].
/// The core never changes an order's status; a remote-sync collaborator may.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    OnHold,
    Completed,
    Cancelled,
    Refunded,
    Failed,
}

impl OrderStatus {
    /// Status as the backend spells it.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::OnHold => "on-hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::Failed => "failed",
        }
    }

    /// Parse a backend status string, returning `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "on-hold" => Some(Self::OnHold),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "refunded" => Some(Self::Refunded),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_matches_backend_spelling() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::OnHold).unwrap(),
            "\"on-hold\""
        );
        assert_eq!(OrderStatus::parse("on-hold"), Some(OrderStatus::OnHold));
        assert_eq!(OrderStatus::parse("shipped"), None);
    }
}
