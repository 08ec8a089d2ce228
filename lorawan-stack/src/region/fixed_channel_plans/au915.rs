use super::*;

/// AU 915-928 MHz: the US915 grid shape shifted up, with SF12..SF7 on the
/// 125 kHz channels and DR6 on the 500 kHz ones.
#[derive(Default, Clone)]
pub(crate) struct AU915Region;

const FIRST_125K_FREQ: u32 = 915_200_000;
const STEP_125K: u32 = 200_000;
const FIRST_500K_FREQ: u32 = 915_900_000;
const STEP_500K: u32 = 1_600_000;
const FIRST_RX1_FREQ: u32 = 923_300_000;
const STEP_RX1: u32 = 600_000;

const MAX_EIRP: i8 = 30;

const RX1_DATARATES: [[DR; 6]; 7] = [
    [DR::_8, DR::_8, DR::_8, DR::_8, DR::_8, DR::_8],
    [DR::_9, DR::_8, DR::_8, DR::_8, DR::_8, DR::_8],
    [DR::_10, DR::_9, DR::_8, DR::_8, DR::_8, DR::_8],
    [DR::_11, DR::_10, DR::_9, DR::_8, DR::_8, DR::_8],
    [DR::_12, DR::_11, DR::_10, DR::_9, DR::_8, DR::_8],
    [DR::_13, DR::_12, DR::_11, DR::_10, DR::_9, DR::_8],
    [DR::_13, DR::_13, DR::_12, DR::_11, DR::_10, DR::_9],
];

impl ChannelRegion for AU915Region {
    fn datarates() -> &'static [Option<Datarate>; 16] {
        &DATARATES
    }

    fn max_tx_power_index() -> u8 {
        10
    }
}

impl FixedChannelRegion for AU915Region {
    const NUM_CHANNELS: usize = 72;
    const NUM_500K: usize = 8;

    fn uplink_frequency(channel: u8) -> u32 {
        if (channel as usize) < Self::first_500k_channel() {
            FIRST_125K_FREQ + channel as u32 * STEP_125K
        } else {
            FIRST_500K_FREQ + (channel as u32 - 64) * STEP_500K
        }
    }

    fn downlink_frequency(channel: u8) -> u32 {
        FIRST_RX1_FREQ + (channel as u32 % 8) * STEP_RX1
    }

    fn channel_dr_range(channel: u8) -> DataRateRange {
        if (channel as usize) < Self::first_500k_channel() {
            DataRateRange::new_range(DR::_0, DR::_5)
        } else {
            DataRateRange::new_range(DR::_6, DR::_6)
        }
    }

    fn rx2_defaults() -> (u32, DR) {
        (923_300_000, DR::_8)
    }

    fn rx1_datarate(tx_dr: DR, offset: u8) -> DR {
        let row = (tx_dr as usize).min(RX1_DATARATES.len() - 1);
        let col = (offset as usize).min(5);
        RX1_DATARATES[row][col]
    }

    fn max_rx1_dr_offset() -> u8 {
        5
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

    fn join_dr_for_trial(nb_trials: u8) -> DR {
        if nb_trials % 2 == 1 {
            DR::_0
        } else {
            DR::_6
        }
    }

    fn is_500k_dr(dr: DR) -> bool {
        dr == DR::_6
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
    Some(Datarate {
        spreading_factor: SpreadingFactor::_8,
        bandwidth: Bandwidth::_500KHz,
        max_mac_payload_size: 242,
        max_mac_payload_size_with_dwell_time: 242,
    }),
    None,
    // downlink-only datarates
    Some(Datarate {
        spreading_factor: SpreadingFactor::_12,
        bandwidth: Bandwidth::_500KHz,
        max_mac_payload_size: 53,
        max_mac_payload_size_with_dwell_time: 53,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_11,
        bandwidth: Bandwidth::_500KHz,
        max_mac_payload_size: 129,
        max_mac_payload_size_with_dwell_time: 129,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_10,
        bandwidth: Bandwidth::_500KHz,
        max_mac_payload_size: 242,
        max_mac_payload_size_with_dwell_time: 242,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_9,
        bandwidth: Bandwidth::_500KHz,
        max_mac_payload_size: 242,
        max_mac_payload_size_with_dwell_time: 242,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_8,
        bandwidth: Bandwidth::_500KHz,
        max_mac_payload_size: 242,
        max_mac_payload_size_with_dwell_time: 242,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_7,
        bandwidth: Bandwidth::_500KHz,
        max_mac_payload_size: 242,
        max_mac_payload_size_with_dwell_time: 242,
    }),
    None,
    None,
];
