//! Booking status machine. Transitions are allowed per (current status, caller
//! role); anything not listed here is rejected. Promotion to `confirmed` never
//! goes through this table: it happens only inside the verified payment
//! callback transaction.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Tourist,
    Guide,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tourist" => Some(Self::Tourist),
            "guide" => Some(Self::Guide),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tourist => "tourist",
            Self::Guide => "guide",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
    Confirmed,
    Completed,
}

impl BookingStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            "confirmed" => Some(Self::Confirmed),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled | Self::Completed)
    }
}

/// Transitions a caller may request through the status update route.
pub fn allowed_transitions(current: BookingStatus, role: Role) -> &'static [BookingStatus] {
    use BookingStatus::*;
    match (current, role) {
        (Pending, Role::Tourist) => &[Cancelled],
        (Pending, Role::Guide) => &[Accepted, Rejected],
        (Pending, Role::Admin) => &[Accepted, Rejected, Cancelled],
        (Confirmed, Role::Admin) => &[Completed],
        _ => &[],
    }
}

pub fn transition_allowed(current: BookingStatus, next: BookingStatus, role: Role) -> bool {
    allowed_transitions(current, role).contains(&next)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleDecision {
    /// Complete the payment and confirm the booking in one transaction.
    Settle,
    /// The attempt already settled; redirect without touching either row.
    Replay,
    /// The booking is not awaiting payment; reject the callback.
    Reject,
}

/// Decides what a verified success callback does, given the recorded payment
/// attempt status and the booking status. At most one callback per tran id can
/// ever return `Settle`: once the row is `completed`, every later callback is
/// a `Replay`.
pub fn settle_decision(payment_status: &str, booking: BookingStatus) -> SettleDecision {
    if payment_status.trim().eq_ignore_ascii_case("completed") {
        SettleDecision::Replay
    } else if booking == BookingStatus::Accepted {
        SettleDecision::Settle
    } else {
        SettleDecision::Reject
    }
}
