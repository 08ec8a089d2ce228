use super::*;

/// KR 920-923 MHz band. Listen-before-talk with a -65 dBm threshold; EIRP
/// is capped at 10 dBm below 922.1 MHz and 14 dBm at or above it.
#[derive(Default, Clone)]
pub(crate) struct KR920Region;

const MAX_EIRP_HIGH: i8 = 14;
const MAX_EIRP_LOW: i8 = 10;
const EIRP_SPLIT_FREQ: u32 = 922_100_000;

const DEFAULT_CHANNELS: [Channel; 3] = [
    Channel {
        id: 0,
        frequency: 922_100_000,
        rx1_frequency: 0,
        dr_range: DataRateRange::new_range(DR::_0, DR::_5),
        band: 0,
    },
    Channel {
        id: 1,
        frequency: 922_300_000,
        rx1_frequency: 0,
        dr_range: DataRateRange::new_range(DR::_0, DR::_5),
        band: 0,
    },
    Channel {
        id: 2,
        frequency: 922_500_000,
        rx1_frequency: 0,
        dr_range: DataRateRange::new_range(DR::_0, DR::_5),
        band: 0,
    },
];

const BANDS: [BandDef; 1] = [BandDef::new(1, 920_900_000, 923_300_000)];

impl ChannelRegion for KR920Region {
    fn datarates() -> &'static [Option<Datarate>; 16] {
        &DATARATES
    }

    fn max_tx_power_index() -> u8 {
        7
    }
}

impl DynamicChannelRegion for KR920Region {
    fn default_channels() -> &'static [Channel] {
        &DEFAULT_CHANNELS
    }

    fn bands() -> &'static [BandDef] {
        &BANDS
    }

    fn rx2_defaults() -> (u32, DR) {
        (921_900_000, DR::_0)
    }

    fn frequency_valid(freq: u32) -> bool {
        (920_900_000..=923_300_000).contains(&freq)
    }

    fn default_max_eirp() -> i8 {
        MAX_EIRP_HIGH
    }

    fn min_dr() -> DR {
        DR::_0
    }

    fn max_dr() -> DR {
        DR::_5
    }

    fn duty_cycle_default() -> bool {
        false
    }

    fn lbt() -> Option<LbtConfig> {
        Some(LbtConfig { rssi_threshold_dbm: -65, sense_time_ms: 6 })
    }

    fn max_eirp_for_frequency(freq: u32) -> Option<i8> {
        Some(if freq >= EIRP_SPLIT_FREQ {
            MAX_EIRP_HIGH
        } else {
            MAX_EIRP_LOW
        })
    }
}

pub(crate) const DATARATES: [Option<Datarate>; 16] = [
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
    None,
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
