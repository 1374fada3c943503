//! Status enums shared between the API and the storefront.
//!
//! Order and payment transitions are owned by the AutoParts API; these types
//! only name the values it reports so templates can label and colour them.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::money::Ksh;

/// Error returned when a status string is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownStatus {
    kind: &'static str,
    value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in display order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire value as the API sends it.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(UnknownStatus {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

// =============================================================================
// Orders
// =============================================================================

/// Fulfillment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

string_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// CSS modifier for the status badge.
    #[must_use]
    pub const fn badge_class(self) -> &'static str {
        match self {
            Self::Pending => "badge-warning",
            Self::Confirmed | Self::Processing => "badge-info",
            Self::Shipped => "badge-primary",
            Self::Delivered => "badge-success",
            Self::Cancelled => "badge-danger",
        }
    }

    /// Whether the order can no longer change.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Pending,
    Paid,
    Failed,
    Refunded,
}

string_enum!(PaymentStatus, "payment status", {
    Unpaid => "unpaid",
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
});

impl PaymentStatus {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unpaid => "Unpaid",
            Self::Pending => "Awaiting payment",
            Self::Paid => "Paid",
            Self::Failed => "Failed",
            Self::Refunded => "Refunded",
        }
    }

    /// CSS modifier for the status badge.
    #[must_use]
    pub const fn badge_class(self) -> &'static str {
        match self {
            Self::Unpaid | Self::Pending => "badge-warning",
            Self::Paid => "badge-success",
            Self::Failed => "badge-danger",
            Self::Refunded => "badge-muted",
        }
    }

    /// Whether polling for this payment can stop.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Paid | Self::Failed | Self::Refunded)
    }
}

// =============================================================================
// Delivery
// =============================================================================

/// Delivery speed offered at checkout, each with a flat fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryTier {
    Economy,
    #[default]
    Standard,
    Express,
}

string_enum!(DeliveryTier, "delivery tier", {
    Economy => "economy",
    Standard => "standard",
    Express => "express",
});

impl DeliveryTier {
    /// Flat delivery fee.
    #[must_use]
    pub fn fee(self) -> Ksh {
        Ksh::from_shillings(match self {
            Self::Economy => 500,
            Self::Standard => 1_500,
            Self::Express => 3_000,
        })
    }

    /// Estimated delivery window in days, `(earliest, latest)`.
    #[must_use]
    pub const fn estimated_days(self) -> (u32, u32) {
        match self {
            Self::Economy => (5, 7),
            Self::Standard => (2, 3),
            Self::Express => (0, 1),
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Economy => "Economy",
            Self::Standard => "Standard",
            Self::Express => "Express",
        }
    }

    /// Short description of the delivery window.
    #[must_use]
    pub const fn window(self) -> &'static str {
        match self {
            Self::Economy => "5-7 business days",
            Self::Standard => "2-3 business days",
            Self::Express => "Same or next day",
        }
    }

    /// CSS modifier for the tier badge.
    #[must_use]
    pub const fn badge_class(self) -> &'static str {
        match self {
            Self::Economy => "badge-muted",
            Self::Standard => "badge-info",
            Self::Express => "badge-primary",
        }
    }
}

// =============================================================================
// Addresses
// =============================================================================

/// Kind of delivery address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    #[default]
    Home,
    Work,
    Other,
}

string_enum!(AddressType, "address type", {
    Home => "home",
    Work => "work",
    Other => "other",
});

impl AddressType {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Work => "Work",
            Self::Other => "Other",
        }
    }

    /// CSS modifier for the address badge.
    #[must_use]
    pub const fn badge_class(self) -> &'static str {
        match self {
            Self::Home => "badge-info",
            Self::Work => "badge-primary",
            Self::Other => "badge-muted",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::Shipped).unwrap();
        assert_eq!(json, "\"shipped\"");
        let parsed: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, OrderStatus::Cancelled);
    }

    #[test]
    fn test_from_str_matches_serde() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
        for status in PaymentStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn test_unknown_status() {
        let err = "lost".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown order status: lost");
    }

    #[test]
    fn test_delivery_fees() {
        assert_eq!(DeliveryTier::Economy.fee(), Ksh::from_shillings(500));
        assert_eq!(DeliveryTier::Standard.fee(), Ksh::from_shillings(1_500));
        assert_eq!(DeliveryTier::Express.fee(), Ksh::from_shillings(3_000));
    }

    #[test]
    fn test_delivery_days() {
        assert_eq!(DeliveryTier::Economy.estimated_days(), (5, 7));
        assert_eq!(DeliveryTier::Express.estimated_days(), (0, 1));
    }

    #[test]
    fn test_payment_settled() {
        assert!(PaymentStatus::Paid.is_settled());
        assert!(!PaymentStatus::Pending.is_settled());
        assert!(!PaymentStatus::Unpaid.is_settled());
    }
}
