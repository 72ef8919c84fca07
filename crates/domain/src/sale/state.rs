//! Sale status.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The status recorded on a persisted sale.
///
/// The fulfillment workflow only ever writes `Completed`; the other values
/// exist so records written by other tooling can be read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    /// Paid and fulfilled (terminal state).
    #[default]
    Completed,

    /// Recorded but not yet settled.
    Pending,

    /// Voided after creation (terminal state).
    Cancelled,
}

impl SaleStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SaleStatus::Completed | SaleStatus::Cancelled)
    }

    /// Returns the status label used in storage and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
            SaleStatus::Pending => "pending",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SaleStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(SaleStatus::Completed),
            "pending" => Ok(SaleStatus::Pending),
            "cancelled" => Ok(SaleStatus::Cancelled),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_completed() {
        assert_eq!(SaleStatus::default(), SaleStatus::Completed);
    }

    #[test]
    fn test_terminal_states() {
        assert!(SaleStatus::Completed.is_terminal());
        assert!(!SaleStatus::Pending.is_terminal());
        assert!(SaleStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_parse_labels() {
        for status in [
            SaleStatus::Completed,
            SaleStatus::Pending,
            SaleStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<SaleStatus>().unwrap(), status);
        }
        assert!(matches!(
            "paid".parse::<SaleStatus>(),
            Err(DomainError::UnknownStatus(_))
        ));
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&SaleStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }
}
