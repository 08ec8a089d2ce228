use super::*;

/// AS 923 MHz band. Dwell-time limited (400 ms) by default, no regulatory
/// duty cycle; channel access is listen-before-talk.
#[derive(Default, Clone)]
pub(crate) struct AS923Region;

const MAX_EIRP: i8 = 16;

const DEFAULT_CHANNELS: [Channel; 2] = [
    Channel {
        id: 0,
        frequency: 923_200_000,
        rx1_frequency: 0,
        dr_range: DataRateRange::new_range(DR::_0, DR::_5),
        band: 0,
    },
    Channel {
        id: 1,
        frequency: 923_400_000,
        rx1_frequency: 0,
        dr_range: DataRateRange::new_range(DR::_0, DR::_5),
        band: 0,
    },
];

const BANDS: [BandDef; 1] = [BandDef::new(100, 915_000_000, 928_000_000)];

/// RX1 offsets 6 and 7 *raise* the downlink datarate.
const EFFECTIVE_RX1_DR_OFFSET: [i8; 8] = [0, 1, 2, 3, 4, 5, -1, -2];

impl ChannelRegion for AS923Region {
    fn datarates() -> &'static [Option<Datarate>; 16] {
        &DATARATES
    }

    fn max_tx_power_index() -> u8 {
        7
    }
}

impl DynamicChannelRegion for AS923Region {
    fn default_channels() -> &'static [Channel] {
        &DEFAULT_CHANNELS
    }

    fn bands() -> &'static [BandDef] {
        &BANDS
    }

    fn rx2_defaults() -> (u32, DR) {
        (923_200_000, DR::_2)
    }

    fn frequency_valid(freq: u32) -> bool {
        (915_000_000..=928_000_000).contains(&freq)
    }

    fn default_max_eirp() -> i8 {
        MAX_EIRP
    }

    fn min_dr() -> DR {
        DR::_0
    }

    fn max_dr() -> DR {
        DR::_6
    }

    fn default_dr() -> DR {
        DR::_2
    }

    fn max_rx1_dr_offset() -> u8 {
        7
    }

    fn apply_dr_offset(dr: DR, offset: u8) -> DR {
        let effective = EFFECTIVE_RX1_DR_OFFSET[(offset & 0x07) as usize];
        let shifted = (dr as i8 - effective).clamp(DR::_0 as i8, DR::_6 as i8);
        DR::try_from(shifted as u8).unwrap()
    }

    fn duty_cycle_default() -> bool {
        false
    }

    fn lbt() -> Option<LbtConfig> {
        Some(LbtConfig { rssi_threshold_dbm: -85, sense_time_ms: 6 })
    }

    fn accepts_tx_param_setup() -> bool {
        true
    }

    fn dwell_time_default() -> (bool, bool) {
        (true, true)
    }
}

pub(crate) const DATARATES: [Option<Datarate>; 16] = [
    Some(Datarate {
        spreading_factor: SpreadingFactor::_12,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 51,
        max_mac_payload_size_with_dwell_time: 0,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_11,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 51,
        max_mac_payload_size_with_dwell_time: 0,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_10,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 51,
        max_mac_payload_size_with_dwell_time: 11,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_9,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 115,
        max_mac_payload_size_with_dwell_time: 53,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_8,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 242,
        max_mac_payload_size_with_dwell_time: 125,
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
