//! The SF12..SF7/125 kHz + SF7/250 kHz datarate ladder shared by the
//! EU-shaped regions (EU868, EU433, CN779).
use super::{Bandwidth, Datarate, SpreadingFactor};

pub(crate) const EU_DATARATES: [Option<Datarate>; 16] = [
    Some(Datarate {
        spreading_factor: SpreadingFactor::_12,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 51,
        max_mac_payload_size_with_dwell_time: 51,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_11,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 51,
        max_mac_payload_size_with_dwell_time: 51,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_10,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 51,
        max_mac_payload_size_with_dwell_time: 51,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_9,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 115,
        max_mac_payload_size_with_dwell_time: 115,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_8,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 242,
        max_mac_payload_size_with_dwell_time: 242,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_7,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 242,
        max_mac_payload_size_with_dwell_time: 242,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_7,
        bandwidth: Bandwidth::_250KHz,
        max_mac_payload_size: 242,
        max_mac_payload_size_with_dwell_time: 242,
    }),
    // DR7 is FSK, which this stack does not modulate
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    None,
];
