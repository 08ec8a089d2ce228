use super::*;

/// EU 433 MHz ISM band. Shares the EU868 datarate shape with its own
/// channels and a single 1% band.
#[derive(Default, Clone)]
pub(crate) struct EU433Region;

const MAX_EIRP: i8 = 12;

const DEFAULT_CHANNELS: [Channel; 3] = [
    Channel {
        id: 0,
        frequency: 433_175_000,
        rx1_frequency: 0,
        dr_range: DataRateRange::new_range(DR::_0, DR::_5),
        band: 0,
    },
    Channel {
        id: 1,
        frequency: 433_375_000,
        rx1_frequency: 0,
        dr_range: DataRateRange::new_range(DR::_0, DR::_5),
        band: 0,
    },
    Channel {
        id: 2,
        frequency: 433_575_000,
        rx1_frequency: 0,
        dr_range: DataRateRange::new_range(DR::_0, DR::_5),
        band: 0,
    },
];

const BANDS: [BandDef; 1] = [BandDef::new(100, 433_175_000, 434_665_000)];

impl ChannelRegion for EU433Region {
    fn datarates() -> &'static [Option<Datarate>; 16] {
        &super::datarates::EU_DATARATES
    }

    fn max_tx_power_index() -> u8 {
        5
    }
}

impl DynamicChannelRegion for EU433Region {
    fn default_channels() -> &'static [Channel] {
        &DEFAULT_CHANNELS
    }

    fn bands() -> &'static [BandDef] {
        &BANDS
    }

    fn rx2_defaults() -> (u32, DR) {
        (434_665_000, DR::_0)
    }

    fn frequency_valid(freq: u32) -> bool {
        (433_175_000..=434_665_000).contains(&freq)
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
