use super::*;

/// EU 863-870 MHz.
#[derive(Default, Clone)]
pub(crate) struct EU868Region;

const MAX_EIRP: i8 = 16;

const DEFAULT_CHANNELS: [Channel; 3] = [
    Channel {
        id: 0,
        frequency: 868_100_000,
        rx1_frequency: 0,
        dr_range: DataRateRange::new_range(DR::_0, DR::_5),
        band: 1,
    },
    Channel {
        id: 1,
        frequency: 868_300_000,
        rx1_frequency: 0,
        dr_range: DataRateRange::new_range(DR::_0, DR::_5),
        band: 1,
    },
    Channel {
        id: 2,
        frequency: 868_500_000,
        rx1_frequency: 0,
        dr_range: DataRateRange::new_range(DR::_0, DR::_5),
        band: 1,
    },
];

// ETSI EN 300 220 sub-bands and their duty-cycle caps
const BANDS: [BandDef; 5] = [
    BandDef::new(1000, 863_000_000, 864_999_999),
    BandDef::new(100, 865_000_000, 868_600_000),
    BandDef::new(1000, 868_700_000, 869_200_000),
    BandDef::new(10, 869_400_000, 869_650_000),
    BandDef::new(100, 869_700_000, 870_000_000),
];

impl ChannelRegion for EU868Region {
    fn datarates() -> &'static [Option<Datarate>; 16] {
        &super::datarates::EU_DATARATES
    }

    fn max_tx_power_index() -> u8 {
        7
    }
}

impl DynamicChannelRegion for EU868Region {
    fn default_channels() -> &'static [Channel] {
        &DEFAULT_CHANNELS
    }

    fn bands() -> &'static [BandDef] {
        &BANDS
    }

    fn rx2_defaults() -> (u32, DR) {
        (869_525_000, DR::_0)
    }

    fn frequency_valid(freq: u32) -> bool {
        (863_000_000..=870_000_000).contains(&freq)
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

    fn duty_cycle_default() -> bool {
        true
    }
}
