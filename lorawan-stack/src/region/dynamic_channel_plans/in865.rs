use super::*;

/// IN 865-867 MHz band.
#[derive(Default, Clone)]
pub(crate) struct IN865Region;

const MAX_EIRP: i8 = 30;

const DEFAULT_CHANNELS: [Channel; 3] = [
    Channel {
        id: 0,
        frequency: 865_062_500,
        rx1_frequency: 0,
        dr_range: DataRateRange::new_range(DR::_0, DR::_5),
        band: 0,
    },
    Channel {
        id: 1,
        frequency: 865_402_500,
        rx1_frequency: 0,
        dr_range: DataRateRange::new_range(DR::_0, DR::_5),
        band: 0,
    },
    Channel {
        id: 2,
        frequency: 865_985_000,
        rx1_frequency: 0,
        dr_range: DataRateRange::new_range(DR::_0, DR::_5),
        band: 0,
    },
];

// no duty-cycle limit in the Indian band
const BANDS: [BandDef; 1] = [BandDef::new(1, 865_000_000, 867_000_000)];

/// RX1 offsets 6 and 7 *raise* the downlink datarate.
const EFFECTIVE_RX1_DR_OFFSET: [i8; 8] = [0, 1, 2, 3, 4, 5, -1, -2];

impl ChannelRegion for IN865Region {
    fn datarates() -> &'static [Option<Datarate>; 16] {
        &DATARATES
    }

    fn max_tx_power_index() -> u8 {
        10
    }
}

impl DynamicChannelRegion for IN865Region {
    fn default_channels() -> &'static [Channel] {
        &DEFAULT_CHANNELS
    }

    fn bands() -> &'static [BandDef] {
        &BANDS
    }

    fn rx2_defaults() -> (u32, DR) {
        (866_550_000, DR::_2)
    }

    fn frequency_valid(freq: u32) -> bool {
        (865_000_000..=867_000_000).contains(&freq)
    }

    fn default_max_eirp() -> i8 {
        MAX_EIRP
    }

    fn min_dr() -> DR {
        DR::_0
    }

    fn max_dr() -> DR {
        DR::_5
    }

    fn max_rx1_dr_offset() -> u8 {
        7
    }

    fn apply_dr_offset(dr: DR, offset: u8) -> DR {
        let effective = EFFECTIVE_RX1_DR_OFFSET[(offset & 0x07) as usize];
        let shifted = (dr as i8 - effective).clamp(DR::_0 as i8, DR::_5 as i8);
        DR::try_from(shifted as u8).unwrap()
    }

    fn duty_cycle_default() -> bool {
        false
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
    // DR6 is unassigned and DR7 is FSK in this region
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
