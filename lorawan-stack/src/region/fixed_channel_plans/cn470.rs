use super::*;

/// CN 470-510 MHz: 96 x 125 kHz uplink channels, 48 downlink channels.
#[derive(Default, Clone)]
pub(crate) struct CN470Region;

const FIRST_UPLINK_FREQ: u32 = 470_300_000;
const FIRST_RX1_FREQ: u32 = 500_300_000;
const STEP: u32 = 200_000;

const MAX_EIRP: i8 = 19;

impl ChannelRegion for CN470Region {
    fn datarates() -> &'static [Option<Datarate>; 16] {
        &DATARATES
    }

    fn max_tx_power_index() -> u8 {
        7
    }
}

impl FixedChannelRegion for CN470Region {
    const NUM_CHANNELS: usize = 96;
    const NUM_500K: usize = 0;

    fn uplink_frequency(channel: u8) -> u32 {
        FIRST_UPLINK_FREQ + channel as u32 * STEP
    }

    fn downlink_frequency(channel: u8) -> u32 {
        FIRST_RX1_FREQ + (channel as u32 % 48) * STEP
    }

    fn channel_dr_range(_channel: u8) -> DataRateRange {
        DataRateRange::new_range(DR::_0, DR::_5)
    }

    fn rx2_defaults() -> (u32, DR) {
        (505_300_000, DR::_0)
    }

    fn rx1_datarate(tx_dr: DR, offset: u8) -> DR {
        tx_dr.offset_sub(offset).clamp(DR::_0, DR::_5)
    }

    fn max_rx1_dr_offset() -> u8 {
        5
    }

    fn frequency_valid(freq: u32) -> bool {
        (470_000_000..=510_000_000).contains(&freq)
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

    fn join_dr_for_trial(_nb_trials: u8) -> DR {
        DR::_0
    }

    fn is_500k_dr(_dr: DR) -> bool {
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
