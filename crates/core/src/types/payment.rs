//! Payment gateway order status.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Status of a BOG payment order, as reported in `order_status.key`.
///
/// Keys the gateway adds later deserialize as [`PaymentStatus::Unknown`]
/// instead of failing the whole callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Order created, customer not yet on the payment page.
    #[default]
    Created,
    Processing,
    Completed,
    Rejected,
    RefundRequested,
    Refunded,
    RefundedPartially,
    AuthRequested,
    Blocked,
    PartialCompleted,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Parse a gateway status key. Unrecognized keys map to `Unknown`.
    #[must_use]
    pub fn from_bog_key(key: &str) -> Self {
        match key.trim() {
            "created" => Self::Created,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "rejected" => Self::Rejected,
            "refund_requested" => Self::RefundRequested,
            "refunded" => Self::Refunded,
            "refunded_partially" => Self::RefundedPartially,
            "auth_requested" => Self::AuthRequested,
            "blocked" => Self::Blocked,
            "partial_completed" => Self::PartialCompleted,
            _ => Self::Unknown,
        }
    }

    /// The gateway key, also the value stored in `order.payment_status`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::RefundRequested => "refund_requested",
            Self::Refunded => "refunded",
            Self::RefundedPartially => "refunded_partially",
            Self::AuthRequested => "auth_requested",
            Self::Blocked => "blocked",
            Self::PartialCompleted => "partial_completed",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the money has been captured and the order can ship.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for PaymentStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for PaymentStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let key = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::from_bog_key(key))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for PaymentStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bog_key_round_trips_known_keys() {
        for status in [
            PaymentStatus::Created,
            PaymentStatus::Processing,
            PaymentStatus::Completed,
            PaymentStatus::Rejected,
            PaymentStatus::RefundRequested,
            PaymentStatus::Refunded,
            PaymentStatus::RefundedPartially,
            PaymentStatus::AuthRequested,
            PaymentStatus::Blocked,
            PaymentStatus::PartialCompleted,
        ] {
            assert_eq!(PaymentStatus::from_bog_key(status.as_str()), status);
        }
        assert_eq!(PaymentStatus::from_bog_key("chargeback"), PaymentStatus::Unknown);
    }

    #[test]
    fn test_only_completed_is_paid() {
        assert!(PaymentStatus::Completed.is_paid());
        assert!(!PaymentStatus::PartialCompleted.is_paid());
        assert!(!PaymentStatus::Processing.is_paid());
        assert!(!PaymentStatus::Rejected.is_paid());
    }

    #[test]
    fn test_deserialize_unknown_key() {
        let status: PaymentStatus = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(status, PaymentStatus::Unknown);
        let status: PaymentStatus = serde_json::from_str("\"refund_requested\"").unwrap();
        assert_eq!(status, PaymentStatus::RefundRequested);
    }
}
