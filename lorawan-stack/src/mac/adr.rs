//! ADR link-loss backoff.
//!
//! While ADR is enabled the device counts uplinks that saw no downlink.
//! At `adr_ack_limit` it starts asking for a confirmation (ADR-ACK-Req);
//! every `adr_ack_delay` further silent uplinks it sheds one datarate
//! step, and once at the floor it falls back to the regional defaults.
use crate::region::constants::{ADR_ACK_DELAY, ADR_ACK_LIMIT};

#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdrBackoff {
    ack_cnt: u32,
}

/// What the MAC must do for the uplink being prepared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AdrAction {
    None,
    /// Set ADR-ACK-Req in the FCtrl.
    RequestAck,
    /// Set ADR-ACK-Req and shed one datarate step (or, at the floor,
    /// restore the default channel mask and maximum TX power).
    StepDown,
}

impl AdrBackoff {
    /// Accounts for one uplink about to be sent with ADR enabled.
    pub(crate) fn uplink_prepared(&mut self) -> AdrAction {
        let cnt = self.ack_cnt;
        self.ack_cnt += 1;
        if cnt < ADR_ACK_LIMIT {
            AdrAction::None
        } else if (cnt - ADR_ACK_LIMIT) % ADR_ACK_DELAY == 0 && cnt > ADR_ACK_LIMIT {
            AdrAction::StepDown
        } else {
            AdrAction::RequestAck
        }
    }

    /// Any downlink proves the network still hears us.
    pub(crate) fn downlink_received(&mut self) {
        self.ack_cnt = 0;
    }
}
