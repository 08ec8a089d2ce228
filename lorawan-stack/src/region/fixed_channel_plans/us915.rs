use super::*;

/// US 902-928 MHz: 64 x 125 kHz + 8 x 500 kHz uplink channels, eight
/// 500 kHz downlink channels.
#[derive(Default, Clone)]
pub(crate) struct US915Region;

/// US915 restricted to a single sub-band of eight 125 kHz channels plus
/// its 500 kHz companion, for gateways that only listen there.
#[cfg(feature = "region-us915-hybrid")]
#[derive(Default, Clone)]
pub(crate) struct US915HybridRegion;

const FIRST_125K_FREQ: u32 = 902_300_000;
const STEP_125K: u32 = 200_000;
const FIRST_500K_FREQ: u32 = 903_000_000;
const STEP_500K: u32 = 1_600_000;
const FIRST_RX1_FREQ: u32 = 923_300_000;
const STEP_RX1: u32 = 600_000;

const MAX_EIRP: i8 = 30;

const RX1_DATARATES: [[DR; 4]; 5] = [
    [DR::_10, DR::_9, DR::_8, DR::_8],
    [DR::_11, DR::_10, DR::_9, DR::_8],
    [DR::_12, DR::_11, DR::_10, DR::_9],
    [DR::_13, DR::_12, DR::_11, DR::_10],
    [DR::_13, DR::_13, DR::_12, DR::_11],
];

impl ChannelRegion for US915Region {
    fn datarates() -> &'static [Option<Datarate>; 16] {
        &DATARATES
    }

    fn max_tx_power_index() -> u8 {
        10
    }
}

impl FixedChannelRegion for US915Region {
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
            DataRateRange::new_range(DR::_0, DR::_3)
        } else {
            DataRateRange::new_range(DR::_4, DR::_4)
        }
    }

    fn rx2_defaults() -> (u32, DR) {
        (923_300_000, DR::_8)
    }

    fn rx1_datarate(tx_dr: DR, offset: u8) -> DR {
        let row = (tx_dr as usize).min(RX1_DATARATES.len() - 1);
        let col = (offset as usize).min(3);
        RX1_DATARATES[row][col]
    }

    fn max_rx1_dr_offset() -> u8 {
        3
    }

    fn frequency_valid(freq: u32) -> bool {
        (902_000_000..=928_000_000).contains(&freq)
    }

    fn default_max_eirp() -> i8 {
        MAX_EIRP
    }

    fn min_dr() -> DR {
        DR::_0
    }

    fn max_dr() -> DR {
        DR::_4
    }

    fn join_dr_for_trial(nb_trials: u8) -> DR {
        if nb_trials % 2 == 1 {
            DR::_0
        } else {
            DR::_4
        }
    }

    fn is_500k_dr(dr: DR) -> bool {
        dr == DR::_4
    }
}

#[cfg(feature = "region-us915-hybrid")]
impl ChannelRegion for US915HybridRegion {
    fn datarates() -> &'static [Option<Datarate>; 16] {
        US915Region::datarates()
    }

    fn max_tx_power_index() -> u8 {
        US915Region::max_tx_power_index()
    }
}

#[cfg(feature = "region-us915-hybrid")]
impl FixedChannelRegion for US915HybridRegion {
    const NUM_CHANNELS: usize = US915Region::NUM_CHANNELS;
    const NUM_500K: usize = US915Region::NUM_500K;

    fn uplink_frequency(channel: u8) -> u32 {
        US915Region::uplink_frequency(channel)
    }

    fn downlink_frequency(channel: u8) -> u32 {
        US915Region::downlink_frequency(channel)
    }

    fn channel_dr_range(channel: u8) -> DataRateRange {
        US915Region::channel_dr_range(channel)
    }

    fn rx2_defaults() -> (u32, DR) {
        US915Region::rx2_defaults()
    }

    fn rx1_datarate(tx_dr: DR, offset: u8) -> DR {
        US915Region::rx1_datarate(tx_dr, offset)
    }

    fn max_rx1_dr_offset() -> u8 {
        US915Region::max_rx1_dr_offset()
    }

    fn frequency_valid(freq: u32) -> bool {
        US915Region::frequency_valid(freq)
    }

    fn default_max_eirp() -> i8 {
        US915Region::default_max_eirp()
    }

    fn min_dr() -> DR {
        DR::_0
    }

    fn max_dr() -> DR {
        DR::_4
    }

    fn join_dr_for_trial(nb_trials: u8) -> DR {
        US915Region::join_dr_for_trial(nb_trials)
    }

    fn is_500k_dr(dr: DR) -> bool {
        US915Region::is_500k_dr(dr)
    }

    /// Only sub-band 1 (channels 0-7) and its 500 kHz companion.
    fn default_channel_mask() -> PlanMask {
        let mut mask = PlanMask::empty();
        for i in 0..8 {
            mask.set_channel(i, true);
        }
        mask.set_channel(64, true);
        mask
    }
}

pub(crate) const DATARATES: [Option<Datarate>; 16] = [
    Some(Datarate {
        spreading_factor: SpreadingFactor::_10,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 11,
        max_mac_payload_size_with_dwell_time: 11,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_9,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 53,
        max_mac_payload_size_with_dwell_time: 53,
    }),
    Some(Datarate {
        spreading_factor: SpreadingFactor::_8,
        bandwidth: Bandwidth::_125KHz,
        max_mac_payload_size: 125,
        max_mac_payload_size_with_dwell_time: 125,
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
    None,
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
