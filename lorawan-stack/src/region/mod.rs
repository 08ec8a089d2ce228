//! Regional PHY policies (EU868, US915, AS923, ...).
//!
//! Every region couples a channel plan (dynamic, CFList-extensible plans in
//! most of the world; fixed 64+8 grids in the Americas and China) with the
//! regional tables: datarates, payload caps, TX-power ladder, RX-window
//! derivation and duty-cycle rules. The MAC drives all of them through
//! [`Configuration`], which dispatches on the region chosen at
//! construction.
use lora_modulation::{BaseBandModulationParams, Bandwidth, CodingRate, SpreadingFactor};
use lorawan_codec::keys::CryptoFactory;
use lorawan_codec::parser::DecryptedJoinAcceptPayload;
use lorawan_codec::types::{ChannelMask, DataRateRange};
use rand_core::RngCore;

use crate::mac::{Frame, Window};
use crate::radio::{LbtConfig, RfConfig, TxConfig};

pub(crate) mod backoff;
pub(crate) mod constants;
use backoff::BandDef;
use constants::*;

pub use lorawan_codec::types::DR;

#[cfg(not(any(
    feature = "region-as923",
    feature = "region-au915",
    feature = "region-cn470",
    feature = "region-cn779",
    feature = "region-eu433",
    feature = "region-eu868",
    feature = "region-in865",
    feature = "region-kr920",
    feature = "region-us915",
    feature = "region-us915-hybrid",
)))]
compile_error!("You must enable at least one region! eg: `region-eu868`, `region-us915`...");

#[cfg(any(
    feature = "region-as923",
    feature = "region-cn779",
    feature = "region-eu433",
    feature = "region-eu868",
    feature = "region-in865",
    feature = "region-kr920",
))]
mod dynamic_channel_plans;
#[cfg(feature = "region-as923")]
pub(crate) use dynamic_channel_plans::AS923;
#[cfg(feature = "region-cn779")]
pub(crate) use dynamic_channel_plans::CN779;
#[cfg(feature = "region-eu433")]
pub(crate) use dynamic_channel_plans::EU433;
#[cfg(feature = "region-eu868")]
pub(crate) use dynamic_channel_plans::EU868;
#[cfg(feature = "region-in865")]
pub(crate) use dynamic_channel_plans::IN865;
#[cfg(feature = "region-kr920")]
pub(crate) use dynamic_channel_plans::KR920;

#[cfg(any(
    feature = "region-au915",
    feature = "region-cn470",
    feature = "region-us915",
    feature = "region-us915-hybrid",
))]
mod fixed_channel_plans;
#[cfg(feature = "region-au915")]
pub(crate) use fixed_channel_plans::AU915;
#[cfg(feature = "region-cn470")]
pub(crate) use fixed_channel_plans::CN470;
#[cfg(feature = "region-us915")]
pub(crate) use fixed_channel_plans::US915;
#[cfg(feature = "region-us915-hybrid")]
pub(crate) use fixed_channel_plans::US915Hybrid;

/// Upper bound on channels of any regional plan (CN470's 96).
pub const MAX_CHANNELS: usize = 96;

/// Channel-mask width covering [`MAX_CHANNELS`] channels.
pub(crate) type PlanMask = ChannelMask<12>;

/// Regions supported by this crate, each individually feature-gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Region {
    #[cfg(feature = "region-as923")]
    AS923,
    #[cfg(feature = "region-au915")]
    AU915,
    #[cfg(feature = "region-cn470")]
    CN470,
    #[cfg(feature = "region-cn779")]
    CN779,
    #[cfg(feature = "region-eu433")]
    EU433,
    #[cfg(feature = "region-eu868")]
    EU868,
    #[cfg(feature = "region-in865")]
    IN865,
    #[cfg(feature = "region-kr920")]
    KR920,
    #[cfg(feature = "region-us915")]
    US915,
    #[cfg(feature = "region-us915-hybrid")]
    US915Hybrid,
}

/// A channel as seen by the application when inspecting the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Channel {
    pub id: u8,
    pub frequency: u32,
    /// Zero derives the RX1 frequency from the uplink channel.
    pub rx1_frequency: u32,
    pub dr_range: DataRateRange,
    pub band: u8,
}

/// The channel picked for the next transmission.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TxChannel {
    pub(crate) index: u8,
    pub(crate) frequency: u32,
    /// Carrier-sense parameters for regions that require listen-before-talk;
    /// the engine probes the channel before transmitting.
    pub(crate) lbt: Option<LbtConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error {
    /// Every candidate channel sits in a band that is cooling down; retry
    /// after the delay.
    DutyCycleRestricted { delay_ms: u32 },
    /// The mask/datarate combination yields no channel at all.
    NoChannelFound,
    /// Channels exist but all were excluded (carrier sense busy).
    NoFreeChannelFound,
    InvalidChannelIndex,
    InvalidFrequency,
    /// Default channels cannot be removed.
    ChannelIsDefault,
    NotSupported,
}

/// Per-datarate modulation parameters and payload caps.
#[derive(Debug, Clone)]
pub(crate) struct Datarate {
    pub(crate) bandwidth: Bandwidth,
    pub(crate) spreading_factor: SpreadingFactor,
    pub(crate) max_mac_payload_size: u8,
    pub(crate) max_mac_payload_size_with_dwell_time: u8,
}

/// Static per-region tables shared by both plan families.
pub(crate) trait ChannelRegion {
    const NUM_DATARATES: u8 = 16;

    fn datarates() -> &'static [Option<Datarate>; 16];

    /// Highest valid TX power index of the regional ladder.
    fn max_tx_power_index() -> u8;

    fn get_max_payload_length(datarate: DR, repeater_compatible: bool, dwell_time: bool) -> u8 {
        let Some(Some(dr)) = Self::datarates().get(datarate as usize) else {
            return 0;
        };
        let max_size = if dwell_time {
            dr.max_mac_payload_size_with_dwell_time
        } else {
            dr.max_mac_payload_size
        };
        if repeater_compatible && max_size > 230 {
            230
        } else {
            max_size
        }
    }
}

/// Everything the MAC asks of a regional policy. Implemented once per plan
/// family; the per-region types only carry tables.
pub(crate) trait RegionHandler {
    fn process_join_accept<T: AsRef<[u8]>, F: CryptoFactory>(
        &mut self,
        join_accept: &DecryptedJoinAcceptPayload<T, F>,
    );

    /// Picks the channel for the next transmission, honoring the channel
    /// mask, per-channel datarate ranges, band time-off and the join
    /// backoff. `exclude` lists channels found busy by carrier sense this
    /// scheduling round.
    fn next_channel<RNG: RngCore>(
        &mut self,
        rng: &mut RNG,
        frame: &Frame,
        datarate: DR,
        now_ms: u32,
        duty_cycle: bool,
        joined: bool,
        exclude: &[u8],
    ) -> Result<TxChannel, Error>;

    /// Books the airtime of a finished transmission against the channel's
    /// band, the aggregated duty cycle and (unjoined) the join backoff.
    fn register_tx_done(
        &mut self,
        channel: u8,
        frame: &Frame,
        joined: bool,
        duty_cycle: bool,
        now_ms: u32,
        time_on_air_ms: u32,
    );

    fn channel_mask_get(&self) -> PlanMask;
    fn channel_mask_set(&mut self, mask: PlanMask);
    /// Applies one `LinkADRReq` mask block to the scratch mask; false marks
    /// a reserved ChMaskCntl value.
    fn channel_mask_update(&self, mask: &mut PlanMask, ctl: u8, bits: ChannelMask<2>) -> bool;
    fn channel_mask_validate(&self, mask: &PlanMask, dr: Option<DR>) -> bool;
    fn restore_default_channel_mask(&mut self);

    fn handle_new_channel(&mut self, index: u8, freq: u32, drr: Option<DataRateRange>)
        -> (bool, bool);
    fn handle_dl_channel(&mut self, index: u8, freq: u32) -> (bool, bool);
    fn add_channel(&mut self, channel: Channel) -> Result<(), Error>;
    fn remove_channel(&mut self, index: u8) -> Result<(), Error>;
    fn drop_channel_list(&mut self);
    fn enabled_channels(&self, out: &mut heapless::Vec<Channel, MAX_CHANNELS>);

    fn get_datarate(&self, dr: u8) -> Option<&'static Datarate>;
    fn get_default_datarate(&self) -> DR;
    fn min_data_rate(&self) -> DR;
    fn max_data_rate(&self) -> DR;
    fn check_data_rate(&self, dr: u8) -> Option<DR>;
    /// The datarate of join attempt number `nb_trials` (1-based).
    fn get_alternate_dr(&self, nb_trials: u8) -> DR;

    fn check_tx_power(&self, index: u8) -> Option<u8>;
    /// Physical dBm of a ladder index before antenna-gain correction.
    fn tx_power_dbm(&self, index: u8, frequency: u32) -> i8;
    fn set_tx_param_setup(&mut self, max_eirp: i8, uplink_dwell: bool, downlink_dwell: bool);
    fn accepts_tx_param_setup(&self) -> bool;
    fn uplink_dwell_time(&self) -> bool;

    fn get_rx_frequency(&self, frame: &Frame, window: &Window) -> u32;
    fn get_rx_datarate(&self, tx_dr: DR, window: &Window) -> DR;
    fn set_rx1_dr_offset(&mut self, offset: u8);
    fn set_rx2_data_rate(&mut self, dr: u8);
    fn set_rx2_frequency(&mut self, freq: u32);
    fn rx1_dr_offset_validate(&self, value: u8) -> Option<u8>;
    /// Validates and, when fully acceptable, applies an `RXParamSetupReq`.
    /// Returns the three status bits of the answer.
    fn accept_rx_param_setup(&mut self, freq: u32, rx1_dr_offset: u8, rx2_dr: u8) -> u8;

    fn set_aggregate_duty_cycle(&mut self, inverse: u32);

    /// Biases join attempts towards one sub-band; only meaningful for the
    /// 64+8 grids whose gateways typically listen on a single sub-band.
    fn set_preferred_join_subband(&mut self, _subband: u8) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    fn frequency_valid(&self, freq: u32) -> bool;
    /// Whether the plan takes `NewChannelReq`/`DlChannelReq` and CFList
    /// frequency lists (dynamic plans do, grid plans do not).
    fn has_custom_channel_plan(&self) -> bool;
    fn get_coding_rate(&self) -> CodingRate {
        DEFAULT_CODING_RATE
    }
    fn lbt_params(&self) -> Option<LbtConfig> {
        None
    }
    fn duty_cycle_default(&self) -> bool;
    fn reset_join_backoff(&mut self);
}

#[derive(Clone)]
enum State {
    #[cfg(feature = "region-as923")]
    AS923(AS923),
    #[cfg(feature = "region-au915")]
    AU915(AU915),
    #[cfg(feature = "region-cn470")]
    CN470(CN470),
    #[cfg(feature = "region-cn779")]
    CN779(CN779),
    #[cfg(feature = "region-eu433")]
    EU433(EU433),
    #[cfg(feature = "region-eu868")]
    EU868(EU868),
    #[cfg(feature = "region-in865")]
    IN865(IN865),
    #[cfg(feature = "region-kr920")]
    KR920(KR920),
    #[cfg(feature = "region-us915")]
    US915(US915),
    #[cfg(feature = "region-us915-hybrid")]
    US915Hybrid(US915Hybrid),
}

impl State {
    fn new(region: Region) -> State {
        match region {
            #[cfg(feature = "region-as923")]
            Region::AS923 => State::AS923(AS923::default()),
            #[cfg(feature = "region-au915")]
            Region::AU915 => State::AU915(AU915::default()),
            #[cfg(feature = "region-cn470")]
            Region::CN470 => State::CN470(CN470::default()),
            #[cfg(feature = "region-cn779")]
            Region::CN779 => State::CN779(CN779::default()),
            #[cfg(feature = "region-eu433")]
            Region::EU433 => State::EU433(EU433::default()),
            #[cfg(feature = "region-eu868")]
            Region::EU868 => State::EU868(EU868::default()),
            #[cfg(feature = "region-in865")]
            Region::IN865 => State::IN865(IN865::default()),
            #[cfg(feature = "region-kr920")]
            Region::KR920 => State::KR920(KR920::default()),
            #[cfg(feature = "region-us915")]
            Region::US915 => State::US915(US915::default()),
            #[cfg(feature = "region-us915-hybrid")]
            Region::US915Hybrid => State::US915Hybrid(US915Hybrid::default()),
        }
    }

    fn region(&self) -> Region {
        match self {
            #[cfg(feature = "region-as923")]
            Self::AS923(_) => Region::AS923,
            #[cfg(feature = "region-au915")]
            Self::AU915(_) => Region::AU915,
            #[cfg(feature = "region-cn470")]
            Self::CN470(_) => Region::CN470,
            #[cfg(feature = "region-cn779")]
            Self::CN779(_) => Region::CN779,
            #[cfg(feature = "region-eu433")]
            Self::EU433(_) => Region::EU433,
            #[cfg(feature = "region-eu868")]
            Self::EU868(_) => Region::EU868,
            #[cfg(feature = "region-in865")]
            Self::IN865(_) => Region::IN865,
            #[cfg(feature = "region-kr920")]
            Self::KR920(_) => Region::KR920,
            #[cfg(feature = "region-us915")]
            Self::US915(_) => Region::US915,
            #[cfg(feature = "region-us915-hybrid")]
            Self::US915Hybrid(_) => Region::US915Hybrid,
        }
    }
}

macro_rules! mut_region_dispatch {
    ($s:expr, $t:tt $(, $arg:expr)*) => {
        match &mut $s.state {
            #[cfg(feature = "region-as923")]
            State::AS923(state) => state.$t($($arg),*),
            #[cfg(feature = "region-au915")]
            State::AU915(state) => state.$t($($arg),*),
            #[cfg(feature = "region-cn470")]
            State::CN470(state) => state.$t($($arg),*),
            #[cfg(feature = "region-cn779")]
            State::CN779(state) => state.$t($($arg),*),
            #[cfg(feature = "region-eu433")]
            State::EU433(state) => state.$t($($arg),*),
            #[cfg(feature = "region-eu868")]
            State::EU868(state) => state.$t($($arg),*),
            #[cfg(feature = "region-in865")]
            State::IN865(state) => state.$t($($arg),*),
            #[cfg(feature = "region-kr920")]
            State::KR920(state) => state.$t($($arg),*),
            #[cfg(feature = "region-us915")]
            State::US915(state) => state.$t($($arg),*),
            #[cfg(feature = "region-us915-hybrid")]
            State::US915Hybrid(state) => state.$t($($arg),*),
        }
    };
}

macro_rules! region_dispatch {
    ($s:expr, $t:tt $(, $arg:expr)*) => {
        match &$s.state {
            #[cfg(feature = "region-as923")]
            State::AS923(state) => state.$t($($arg),*),
            #[cfg(feature = "region-au915")]
            State::AU915(state) => state.$t($($arg),*),
            #[cfg(feature = "region-cn470")]
            State::CN470(state) => state.$t($($arg),*),
            #[cfg(feature = "region-cn779")]
            State::CN779(state) => state.$t($($arg),*),
            #[cfg(feature = "region-eu433")]
            State::EU433(state) => state.$t($($arg),*),
            #[cfg(feature = "region-eu868")]
            State::EU868(state) => state.$t($($arg),*),
            #[cfg(feature = "region-in865")]
            State::IN865(state) => state.$t($($arg),*),
            #[cfg(feature = "region-kr920")]
            State::KR920(state) => state.$t($($arg),*),
            #[cfg(feature = "region-us915")]
            State::US915(state) => state.$t($($arg),*),
            #[cfg(feature = "region-us915-hybrid")]
            State::US915Hybrid(state) => state.$t($($arg),*),
        }
    };
}

macro_rules! region_static_dispatch {
    ($s:expr, $t:tt $(, $arg:expr)*) => {
        match &$s.state {
            #[cfg(feature = "region-as923")]
            State::AS923(_) => dynamic_channel_plans::AS923Region::$t($($arg),*),
            #[cfg(feature = "region-au915")]
            State::AU915(_) => fixed_channel_plans::AU915Region::$t($($arg),*),
            #[cfg(feature = "region-cn470")]
            State::CN470(_) => fixed_channel_plans::CN470Region::$t($($arg),*),
            #[cfg(feature = "region-cn779")]
            State::CN779(_) => dynamic_channel_plans::CN779Region::$t($($arg),*),
            #[cfg(feature = "region-eu433")]
            State::EU433(_) => dynamic_channel_plans::EU433Region::$t($($arg),*),
            #[cfg(feature = "region-eu868")]
            State::EU868(_) => dynamic_channel_plans::EU868Region::$t($($arg),*),
            #[cfg(feature = "region-in865")]
            State::IN865(_) => dynamic_channel_plans::IN865Region::$t($($arg),*),
            #[cfg(feature = "region-kr920")]
            State::KR920(_) => dynamic_channel_plans::KR920Region::$t($($arg),*),
            #[cfg(feature = "region-us915")]
            State::US915(_) => fixed_channel_plans::US915Region::$t($($arg),*),
            #[cfg(feature = "region-us915-hybrid")]
            State::US915Hybrid(_) => fixed_channel_plans::US915Region::$t($($arg),*),
        }
    };
}

/// Region-specific configuration and state; required for creating a device.
#[derive(Clone)]
pub struct Configuration {
    state: State,
}

impl Configuration {
    pub fn new(region: Region) -> Configuration {
        Configuration { state: State::new(region) }
    }

    pub fn get_current_region(&self) -> Region {
        self.state.region()
    }

    pub fn get_max_payload_length(
        &self,
        datarate: DR,
        repeater_compatible: bool,
        dwell_time: bool,
    ) -> u8 {
        region_static_dispatch!(self, get_max_payload_length, datarate, repeater_compatible, dwell_time)
    }

    pub(crate) fn process_join_accept<T: AsRef<[u8]>, F: CryptoFactory>(
        &mut self,
        join_accept: &DecryptedJoinAcceptPayload<T, F>,
    ) {
        mut_region_dispatch!(self, process_join_accept, join_accept)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn next_channel<RNG: RngCore>(
        &mut self,
        rng: &mut RNG,
        frame: &Frame,
        datarate: DR,
        now_ms: u32,
        duty_cycle: bool,
        joined: bool,
        exclude: &[u8],
    ) -> Result<TxChannel, Error> {
        mut_region_dispatch!(self, next_channel, rng, frame, datarate, now_ms, duty_cycle, joined, exclude)
    }

    pub(crate) fn register_tx_done(
        &mut self,
        channel: u8,
        frame: &Frame,
        joined: bool,
        duty_cycle: bool,
        now_ms: u32,
        time_on_air_ms: u32,
    ) {
        mut_region_dispatch!(self, register_tx_done, channel, frame, joined, duty_cycle, now_ms, time_on_air_ms)
    }

    /// Radio parameters for transmitting on `channel` at `datarate` with
    /// ladder index `power_index`.
    pub(crate) fn create_tx_config(
        &self,
        channel: &TxChannel,
        datarate: DR,
        power_index: u8,
    ) -> TxConfig {
        // indices are validated when stored, the table entry exists
        let dr = self.get_datarate(datarate as u8).unwrap();
        TxConfig {
            pw: self.tx_power_dbm(power_index, channel.frequency),
            rf: RfConfig {
                frequency: channel.frequency,
                bb: BaseBandModulationParams::new(
                    dr.spreading_factor,
                    dr.bandwidth,
                    self.get_coding_rate(),
                ),
            },
        }
    }

    /// Radio parameters for the given receive window after an uplink at
    /// `tx_dr`.
    pub(crate) fn get_rx_config(&self, tx_dr: DR, frame: &Frame, window: &Window) -> RfConfig {
        let rx_dr = self.get_rx_datarate(tx_dr, window);
        let dr = self.get_datarate(rx_dr as u8).unwrap();
        RfConfig {
            frequency: self.get_rx_frequency(frame, window),
            bb: BaseBandModulationParams::new(
                dr.spreading_factor,
                dr.bandwidth,
                self.get_coding_rate(),
            ),
        }
    }

    /// Symbol timeout and window offset for the given receive window; the
    /// window is armed `offset` ms relative to its nominal open time and
    /// listens long enough to absorb the clock error budget.
    pub(crate) fn get_rx_window_params(
        &self,
        tx_dr: DR,
        window: &Window,
        rx_error_ms: u32,
        wake_up_time_ms: u32,
    ) -> (u16, i32) {
        let rx_dr = self.get_rx_datarate(tx_dr, window);
        let dr = self.get_datarate(rx_dr as u8).unwrap();
        compute_rx_window_params(
            dr.spreading_factor,
            dr.bandwidth,
            MIN_RX_SYMBOLS,
            rx_error_ms,
            wake_up_time_ms,
        )
    }

    pub(crate) fn channel_mask_get(&self) -> PlanMask {
        region_dispatch!(self, channel_mask_get)
    }

    pub(crate) fn channel_mask_set(&mut self, mask: PlanMask) {
        mut_region_dispatch!(self, channel_mask_set, mask)
    }

    pub(crate) fn channel_mask_update(
        &self,
        mask: &mut PlanMask,
        ctl: u8,
        bits: ChannelMask<2>,
    ) -> bool {
        region_dispatch!(self, channel_mask_update, mask, ctl, bits)
    }

    pub(crate) fn channel_mask_validate(&self, mask: &PlanMask, dr: Option<DR>) -> bool {
        region_dispatch!(self, channel_mask_validate, mask, dr)
    }

    pub(crate) fn restore_default_channel_mask(&mut self) {
        mut_region_dispatch!(self, restore_default_channel_mask)
    }

    pub(crate) fn handle_new_channel(
        &mut self,
        index: u8,
        freq: u32,
        drr: Option<DataRateRange>,
    ) -> (bool, bool) {
        mut_region_dispatch!(self, handle_new_channel, index, freq, drr)
    }

    pub(crate) fn handle_dl_channel(&mut self, index: u8, freq: u32) -> (bool, bool) {
        mut_region_dispatch!(self, handle_dl_channel, index, freq)
    }

    pub fn add_channel(&mut self, channel: Channel) -> Result<(), Error> {
        mut_region_dispatch!(self, add_channel, channel)
    }

    pub fn remove_channel(&mut self, index: u8) -> Result<(), Error> {
        mut_region_dispatch!(self, remove_channel, index)
    }

    pub fn drop_channel_list(&mut self) {
        mut_region_dispatch!(self, drop_channel_list)
    }

    pub fn enabled_channels(&self, out: &mut heapless::Vec<Channel, MAX_CHANNELS>) {
        region_dispatch!(self, enabled_channels, out)
    }

    pub(crate) fn get_datarate(&self, dr: u8) -> Option<&'static Datarate> {
        region_dispatch!(self, get_datarate, dr)
    }

    pub(crate) fn get_default_datarate(&self) -> DR {
        region_dispatch!(self, get_default_datarate)
    }

    pub(crate) fn min_data_rate(&self) -> DR {
        region_dispatch!(self, min_data_rate)
    }

    pub(crate) fn max_data_rate(&self) -> DR {
        region_dispatch!(self, max_data_rate)
    }

    pub(crate) fn check_data_rate(&self, dr: u8) -> Option<DR> {
        region_dispatch!(self, check_data_rate, dr)
    }

    /// One datarate step down, clamping at the regional minimum.
    pub(crate) fn next_lower_data_rate(&self, dr: DR) -> DR {
        let min = self.min_data_rate();
        let mut candidate = dr;
        while candidate > min {
            candidate = candidate.offset_sub(1);
            if self.check_data_rate(candidate as u8).is_some() {
                return candidate;
            }
        }
        min
    }

    pub(crate) fn get_alternate_dr(&self, nb_trials: u8) -> DR {
        region_dispatch!(self, get_alternate_dr, nb_trials)
    }

    pub(crate) fn check_tx_power(&self, index: u8) -> Option<u8> {
        region_dispatch!(self, check_tx_power, index)
    }

    pub(crate) fn tx_power_dbm(&self, index: u8, frequency: u32) -> i8 {
        region_dispatch!(self, tx_power_dbm, index, frequency)
    }

    pub(crate) fn set_tx_param_setup(
        &mut self,
        max_eirp: i8,
        uplink_dwell: bool,
        downlink_dwell: bool,
    ) {
        mut_region_dispatch!(self, set_tx_param_setup, max_eirp, uplink_dwell, downlink_dwell)
    }

    pub(crate) fn accepts_tx_param_setup(&self) -> bool {
        region_dispatch!(self, accepts_tx_param_setup)
    }

    pub(crate) fn uplink_dwell_time(&self) -> bool {
        region_dispatch!(self, uplink_dwell_time)
    }

    pub(crate) fn get_rx_frequency(&self, frame: &Frame, window: &Window) -> u32 {
        region_dispatch!(self, get_rx_frequency, frame, window)
    }

    pub(crate) fn get_rx_datarate(&self, tx_dr: DR, window: &Window) -> DR {
        region_dispatch!(self, get_rx_datarate, tx_dr, window)
    }

    pub(crate) fn set_rx1_dr_offset(&mut self, offset: u8) {
        mut_region_dispatch!(self, set_rx1_dr_offset, offset)
    }

    pub(crate) fn set_rx2_data_rate(&mut self, dr: u8) {
        mut_region_dispatch!(self, set_rx2_data_rate, dr)
    }

    pub(crate) fn set_rx2_frequency(&mut self, freq: u32) {
        mut_region_dispatch!(self, set_rx2_frequency, freq)
    }

    pub(crate) fn rx1_dr_offset_validate(&self, value: u8) -> Option<u8> {
        region_dispatch!(self, rx1_dr_offset_validate, value)
    }

    pub(crate) fn accept_rx_param_setup(&mut self, freq: u32, rx1_dr_offset: u8, rx2_dr: u8) -> u8 {
        mut_region_dispatch!(self, accept_rx_param_setup, freq, rx1_dr_offset, rx2_dr)
    }

    pub(crate) fn set_aggregate_duty_cycle(&mut self, inverse: u32) {
        mut_region_dispatch!(self, set_aggregate_duty_cycle, inverse)
    }

    /// Prefer one sub-band (1-8) for join attempts on the fixed grids.
    pub fn set_preferred_join_subband(&mut self, subband: u8) -> Result<(), Error> {
        mut_region_dispatch!(self, set_preferred_join_subband, subband)
    }

    pub(crate) fn frequency_valid(&self, freq: u32) -> bool {
        region_dispatch!(self, frequency_valid, freq)
    }

    pub(crate) fn has_custom_channel_plan(&self) -> bool {
        region_dispatch!(self, has_custom_channel_plan)
    }

    pub(crate) fn get_coding_rate(&self) -> CodingRate {
        region_dispatch!(self, get_coding_rate)
    }

    pub(crate) fn lbt_params(&self) -> Option<LbtConfig> {
        region_dispatch!(self, lbt_params)
    }

    pub(crate) fn duty_cycle_default(&self) -> bool {
        region_dispatch!(self, duty_cycle_default)
    }

    pub(crate) fn reset_join_backoff(&mut self) {
        mut_region_dispatch!(self, reset_join_backoff)
    }
}

macro_rules! from_region {
    ($r:tt) => {
        impl From<$r> for Configuration {
            fn from(plan: $r) -> Configuration {
                Configuration { state: State::$r(plan) }
            }
        }
    };
}

#[cfg(feature = "region-as923")]
from_region!(AS923);
#[cfg(feature = "region-au915")]
from_region!(AU915);
#[cfg(feature = "region-cn470")]
from_region!(CN470);
#[cfg(feature = "region-cn779")]
from_region!(CN779);
#[cfg(feature = "region-eu433")]
from_region!(EU433);
#[cfg(feature = "region-eu868")]
from_region!(EU868);
#[cfg(feature = "region-in865")]
from_region!(IN865);
#[cfg(feature = "region-kr920")]
from_region!(KR920);
#[cfg(feature = "region-us915")]
from_region!(US915);
#[cfg(feature = "region-us915-hybrid")]
from_region!(US915Hybrid);

/// Symbol timeout and window offset covering the local clock error budget.
///
/// The radio is armed `offset` ms relative to the nominal window open time
/// (negative = earlier) and listens for `timeout` preamble symbols, enough
/// that a downlink preamble drifting by ±`rx_error_ms` still lands inside
/// the window.
pub(crate) fn compute_rx_window_params(
    sf: SpreadingFactor,
    bw: Bandwidth,
    min_rx_symbols: u8,
    rx_error_ms: u32,
    wake_up_time_ms: u32,
) -> (u16, i32) {
    let t_sym_us = (1u32 << sf.factor()) * 1_000_000 / bw.hz();
    let error_symbols = (2 * rx_error_ms * 1000).div_ceil(t_sym_us);
    let timeout =
        core::cmp::max(min_rx_symbols as u32, (2 * min_rx_symbols as u32).saturating_sub(8) + error_symbols);
    let offset_us = 4 * t_sym_us as i64 - (timeout as i64 * t_sym_us as i64) / 2
        - wake_up_time_ms as i64 * 1000;
    (timeout as u16, (offset_us / 1000) as i32)
}
