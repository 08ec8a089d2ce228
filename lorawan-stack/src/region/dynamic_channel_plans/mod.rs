//! Channel plans that start from a handful of default channels and grow
//! through CFList, `NewChannelReq` and the application's channel API.
use core::marker::PhantomData;

use super::backoff::{AggregateDutyCycle, Band, JoinBackoff};
use super::*;
use lorawan_codec::parser::CfList;

#[cfg(any(feature = "region-eu868", feature = "region-eu433", feature = "region-cn779"))]
mod datarates;

#[cfg(feature = "region-as923")]
mod as923;
#[cfg(feature = "region-cn779")]
mod cn779;
#[cfg(feature = "region-eu433")]
mod eu433;
#[cfg(feature = "region-eu868")]
mod eu868;
#[cfg(feature = "region-in865")]
mod in865;
#[cfg(feature = "region-kr920")]
mod kr920;

#[cfg(feature = "region-as923")]
pub(crate) use as923::AS923Region;
#[cfg(feature = "region-cn779")]
pub(crate) use cn779::CN779Region;
#[cfg(feature = "region-eu433")]
pub(crate) use eu433::EU433Region;
#[cfg(feature = "region-eu868")]
pub(crate) use eu868::EU868Region;
#[cfg(feature = "region-in865")]
pub(crate) use in865::IN865Region;
#[cfg(feature = "region-kr920")]
pub(crate) use kr920::KR920Region;

#[cfg(feature = "region-as923")]
pub(crate) type AS923 = DynamicChannelPlan<AS923Region>;
#[cfg(feature = "region-cn779")]
pub(crate) type CN779 = DynamicChannelPlan<CN779Region>;
#[cfg(feature = "region-eu433")]
pub(crate) type EU433 = DynamicChannelPlan<EU433Region>;
#[cfg(feature = "region-eu868")]
pub(crate) type EU868 = DynamicChannelPlan<EU868Region>;
#[cfg(feature = "region-in865")]
pub(crate) type IN865 = DynamicChannelPlan<IN865Region>;
#[cfg(feature = "region-kr920")]
pub(crate) type KR920 = DynamicChannelPlan<KR920Region>;

/// A dynamic plan holds at most 16 channels.
pub(crate) const MAX_DYNAMIC_CHANNELS: usize = 16;

/// Regional tables of a dynamic-plan region.
pub(crate) trait DynamicChannelRegion: ChannelRegion {
    /// Channels every device knows from power-on; these double as the join
    /// channels and cannot be removed.
    fn default_channels() -> &'static [Channel];
    fn bands() -> &'static [BandDef];
    fn rx2_defaults() -> (u32, DR);
    fn frequency_valid(freq: u32) -> bool;
    fn default_max_eirp() -> i8;
    fn min_dr() -> DR;
    fn max_dr() -> DR;

    fn default_dr() -> DR {
        DR::_0
    }

    /// Datarate range assigned to channels learned from a CFList.
    fn cflist_dr_range() -> DataRateRange {
        DataRateRange::new_range(DR::_0, DR::_5)
    }

    fn max_rx1_dr_offset() -> u8 {
        5
    }

    fn apply_dr_offset(dr: DR, offset: u8) -> DR {
        dr.offset_sub(offset).clamp(Self::min_dr(), Self::max_dr())
    }

    /// Join datarate descent: start at the regional ceiling and step down
    /// as attempts accumulate, every eighth attempt reaching one rung
    /// lower, bottoming out at DR0.
    fn get_alternate_dr(nb_trials: u8) -> DR {
        let dr = if nb_trials % 48 == 0 {
            DR::_0
        } else if nb_trials % 32 == 0 {
            DR::_1
        } else if nb_trials % 24 == 0 {
            DR::_2
        } else if nb_trials % 16 == 0 {
            DR::_3
        } else if nb_trials % 8 == 0 {
            DR::_4
        } else {
            DR::_5
        };
        dr.clamp(Self::min_dr(), Self::max_dr())
    }

    fn duty_cycle_default() -> bool;

    fn lbt() -> Option<LbtConfig> {
        None
    }

    fn accepts_tx_param_setup() -> bool {
        false
    }

    /// (uplink, downlink) dwell-time defaults.
    fn dwell_time_default() -> (bool, bool) {
        (false, false)
    }

    /// Regions with a frequency-dependent EIRP limit override this.
    fn max_eirp_for_frequency(_freq: u32) -> Option<i8> {
        None
    }

    fn band_for_frequency(freq: u32) -> Option<u8> {
        Self::bands().iter().position(|b| b.contains(freq)).map(|i| i as u8)
    }
}

#[derive(Clone)]
pub(crate) struct DynamicChannelPlan<R: DynamicChannelRegion> {
    channels: [Option<Channel>; MAX_DYNAMIC_CHANNELS],
    channel_mask: PlanMask,
    bands: [Band; 8],
    rx1_dr_offset: u8,
    rx2_frequency: Option<u32>,
    rx2_data_rate: Option<u8>,
    max_eirp: i8,
    uplink_dwell: bool,
    downlink_dwell: bool,
    aggregate: AggregateDutyCycle,
    join_backoff: JoinBackoff,
    last_tx: u8,
    _region: PhantomData<R>,
}

impl<R: DynamicChannelRegion> Default for DynamicChannelPlan<R> {
    fn default() -> Self {
        let mut channels = [None; MAX_DYNAMIC_CHANNELS];
        for ch in R::default_channels() {
            channels[ch.id as usize] = Some(*ch);
        }
        let (uplink_dwell, downlink_dwell) = R::dwell_time_default();
        let mut plan = Self {
            channels,
            channel_mask: PlanMask::empty(),
            bands: [Band::default(); 8],
            rx1_dr_offset: 0,
            rx2_frequency: None,
            rx2_data_rate: None,
            max_eirp: R::default_max_eirp(),
            uplink_dwell,
            downlink_dwell,
            aggregate: AggregateDutyCycle::default(),
            join_backoff: JoinBackoff::default(),
            last_tx: 0,
            _region: PhantomData,
        };
        plan.restore_default_channel_mask();
        plan
    }
}

impl<R: DynamicChannelRegion> DynamicChannelPlan<R> {
    fn channel_supports_dr(ch: &Channel, datarate: DR) -> bool {
        let dr = datarate as u8;
        ch.dr_range.min_data_rate() <= dr && dr <= ch.dr_range.max_data_rate()
    }

    fn define_channel(&mut self, index: usize, frequency: u32, dr_range: DataRateRange) -> bool {
        let Some(band) = R::band_for_frequency(frequency) else {
            return false;
        };
        self.channels[index] = Some(Channel {
            id: index as u8,
            frequency,
            rx1_frequency: 0,
            dr_range,
            band,
        });
        self.channel_mask.set_channel(index, true);
        true
    }

    fn drr_valid(&self, drr: DataRateRange) -> bool {
        DataRateRange::can_build_from(drr.raw_value()).is_ok()
            && drr.min_data_rate() >= R::min_dr() as u8
            && drr.max_data_rate() <= R::max_dr() as u8
    }
}

impl<R: DynamicChannelRegion> RegionHandler for DynamicChannelPlan<R> {
    fn process_join_accept<T: AsRef<[u8]>, F: CryptoFactory>(
        &mut self,
        join_accept: &DecryptedJoinAcceptPayload<T, F>,
    ) {
        if let Some(CfList::DynamicChannel(cf_list)) = join_accept.c_f_list() {
            let drr = R::cflist_dr_range();
            let first = R::default_channels().len();
            for (i, freq) in cf_list.iter().enumerate() {
                let index = first + i;
                if index >= MAX_DYNAMIC_CHANNELS {
                    break;
                }
                let value = freq.value();
                if value != 0 {
                    self.define_channel(index, value, drr);
                } else {
                    self.channels[index] = None;
                    self.channel_mask.set_channel(index, false);
                }
            }
        }
        self.join_backoff.reset();
    }

    fn next_channel<RNG: RngCore>(
        &mut self,
        rng: &mut RNG,
        frame: &Frame,
        datarate: DR,
        now_ms: u32,
        duty_cycle: bool,
        joined: bool,
        exclude: &[u8],
    ) -> Result<TxChannel, Error> {
        if !joined {
            let wait = self.join_backoff.restriction_ms(now_ms);
            if wait > 0 {
                return Err(Error::DutyCycleRestricted { delay_ms: wait });
            }
        }
        let wait = self.aggregate.restriction_ms(now_ms);
        if wait > 0 {
            return Err(Error::DutyCycleRestricted { delay_ms: wait });
        }

        let join_channels = R::default_channels().len();
        let mut candidates: heapless::Vec<u8, MAX_DYNAMIC_CHANNELS> = heapless::Vec::new();
        let mut min_wait = u32::MAX;
        let mut any_usable = false;

        for (i, slot) in self.channels.iter().enumerate() {
            let Some(ch) = slot else { continue };
            if matches!(frame, Frame::Join) && i >= join_channels {
                continue;
            }
            if !self.channel_mask.is_enabled(i).unwrap_or(false) {
                continue;
            }
            if !Self::channel_supports_dr(ch, datarate) {
                continue;
            }
            any_usable = true;
            if exclude.contains(&(i as u8)) {
                continue;
            }
            let band_wait = if duty_cycle {
                self.bands[ch.band as usize].restriction_ms(now_ms)
            } else {
                0
            };
            if band_wait > 0 {
                min_wait = min_wait.min(band_wait);
                continue;
            }
            let _ = candidates.push(i as u8);
        }

        if !candidates.is_empty() {
            let index = candidates[(rng.next_u32() as usize) % candidates.len()];
            let frequency = self.channels[index as usize].unwrap().frequency;
            self.last_tx = index;
            Ok(TxChannel { index, frequency, lbt: R::lbt() })
        } else if min_wait != u32::MAX {
            Err(Error::DutyCycleRestricted { delay_ms: min_wait })
        } else if any_usable {
            Err(Error::NoFreeChannelFound)
        } else {
            Err(Error::NoChannelFound)
        }
    }

    fn register_tx_done(
        &mut self,
        channel: u8,
        frame: &Frame,
        joined: bool,
        duty_cycle: bool,
        now_ms: u32,
        time_on_air_ms: u32,
    ) {
        if let Some(Some(ch)) = self.channels.get(channel as usize) {
            let band = ch.band as usize;
            let inverse = R::bands()[band].duty_cycle_inverse;
            self.bands[band].register_tx(now_ms, time_on_air_ms, inverse, duty_cycle);
        }
        self.aggregate.register_tx(now_ms, time_on_air_ms);
        if !joined && matches!(frame, Frame::Join) {
            self.join_backoff.register_tx(now_ms, time_on_air_ms);
        }
    }

    fn channel_mask_get(&self) -> PlanMask {
        self.channel_mask.clone()
    }

    fn channel_mask_set(&mut self, mask: PlanMask) {
        self.channel_mask = mask;
    }

    fn channel_mask_update(&self, mask: &mut PlanMask, ctl: u8, bits: ChannelMask<2>) -> bool {
        match ctl {
            0 => {
                mask.set_bank(0, bits.get_index(0));
                mask.set_bank(1, bits.get_index(1));
                true
            }
            6 => {
                // all defined channels on
                for (i, ch) in self.channels.iter().enumerate() {
                    mask.set_channel(i, ch.is_some());
                }
                true
            }
            _ => false,
        }
    }

    fn channel_mask_validate(&self, mask: &PlanMask, dr: Option<DR>) -> bool {
        self.channels.iter().enumerate().any(|(i, slot)| {
            let Some(ch) = slot else {
                return false;
            };
            if !mask.is_enabled(i).unwrap_or(false) {
                return false;
            }
            match dr {
                Some(dr) => Self::channel_supports_dr(ch, dr),
                None => true,
            }
        })
    }

    fn restore_default_channel_mask(&mut self) {
        self.channel_mask = PlanMask::empty();
        for i in 0..R::default_channels().len() {
            self.channel_mask.set_channel(i, true);
        }
    }

    fn handle_new_channel(
        &mut self,
        index: u8,
        freq: u32,
        drr: Option<DataRateRange>,
    ) -> (bool, bool) {
        let index = index as usize;
        // default channels are immutable
        if index < R::default_channels().len() || index >= MAX_DYNAMIC_CHANNELS {
            return (false, false);
        }
        if freq == 0 {
            self.channels[index] = None;
            self.channel_mask.set_channel(index, false);
            return (true, true);
        }
        let freq_ok = R::frequency_valid(freq) && R::band_for_frequency(freq).is_some();
        let drr_ok = drr.is_some_and(|drr| self.drr_valid(drr));
        if freq_ok && drr_ok {
            self.define_channel(index, freq, drr.unwrap());
        }
        (freq_ok, drr_ok)
    }

    fn handle_dl_channel(&mut self, index: u8, freq: u32) -> (bool, bool) {
        let freq_ok = R::frequency_valid(freq);
        let uplink_exists = self
            .channels
            .get(index as usize)
            .and_then(|c| c.as_ref())
            .is_some();
        if freq_ok && uplink_exists {
            if let Some(Some(ch)) = self.channels.get_mut(index as usize) {
                ch.rx1_frequency = freq;
            }
        }
        (freq_ok, uplink_exists)
    }

    fn add_channel(&mut self, channel: Channel) -> Result<(), Error> {
        let index = channel.id as usize;
        if index >= MAX_DYNAMIC_CHANNELS {
            return Err(Error::InvalidChannelIndex);
        }
        if index < R::default_channels().len() {
            return Err(Error::ChannelIsDefault);
        }
        if !R::frequency_valid(channel.frequency) || R::band_for_frequency(channel.frequency).is_none()
        {
            return Err(Error::InvalidFrequency);
        }
        if !self.drr_valid(channel.dr_range) {
            return Err(Error::NotSupported);
        }
        self.define_channel(index, channel.frequency, channel.dr_range);
        if channel.rx1_frequency != 0 {
            if let Some(Some(ch)) = self.channels.get_mut(index) {
                ch.rx1_frequency = channel.rx1_frequency;
            }
        }
        Ok(())
    }

    fn remove_channel(&mut self, index: u8) -> Result<(), Error> {
        let index = index as usize;
        if index >= MAX_DYNAMIC_CHANNELS || self.channels[index].is_none() {
            return Err(Error::InvalidChannelIndex);
        }
        if index < R::default_channels().len() {
            return Err(Error::ChannelIsDefault);
        }
        self.channels[index] = None;
        self.channel_mask.set_channel(index, false);
        Ok(())
    }

    fn drop_channel_list(&mut self) {
        for i in R::default_channels().len()..MAX_DYNAMIC_CHANNELS {
            self.channels[i] = None;
        }
        self.restore_default_channel_mask();
    }

    fn enabled_channels(&self, out: &mut heapless::Vec<Channel, MAX_CHANNELS>) {
        for (i, slot) in self.channels.iter().enumerate() {
            if let Some(ch) = slot {
                if self.channel_mask.is_enabled(i).unwrap_or(false) {
                    let _ = out.push(*ch);
                }
            }
        }
    }

    fn get_datarate(&self, dr: u8) -> Option<&'static Datarate> {
        R::datarates().get(dr as usize)?.as_ref()
    }

    fn get_default_datarate(&self) -> DR {
        R::default_dr()
    }

    fn min_data_rate(&self) -> DR {
        if self.uplink_dwell {
            // dwell-time limits rule out the slowest spreading factors
            let mut dr = R::min_dr();
            while R::get_max_payload_length(dr, false, true) == 0 && dr < R::max_dr() {
                dr = dr.offset_add(1);
            }
            dr
        } else {
            R::min_dr()
        }
    }

    fn max_data_rate(&self) -> DR {
        R::max_dr()
    }

    fn check_data_rate(&self, dr: u8) -> Option<DR> {
        if dr >= R::min_dr() as u8
            && dr <= R::max_dr() as u8
            && R::datarates()[dr as usize].is_some()
        {
            return DR::try_from(dr).ok();
        }
        None
    }

    fn get_alternate_dr(&self, nb_trials: u8) -> DR {
        R::get_alternate_dr(nb_trials)
    }

    fn check_tx_power(&self, index: u8) -> Option<u8> {
        (index <= R::max_tx_power_index()).then_some(index)
    }

    fn tx_power_dbm(&self, index: u8, frequency: u32) -> i8 {
        let ceiling = match R::max_eirp_for_frequency(frequency) {
            Some(limit) => limit.min(self.max_eirp),
            None => self.max_eirp,
        };
        ceiling - 2 * index as i8
    }

    fn set_tx_param_setup(&mut self, max_eirp: i8, uplink_dwell: bool, downlink_dwell: bool) {
        self.max_eirp = max_eirp;
        self.uplink_dwell = uplink_dwell;
        self.downlink_dwell = downlink_dwell;
    }

    fn accepts_tx_param_setup(&self) -> bool {
        R::accepts_tx_param_setup()
    }

    fn uplink_dwell_time(&self) -> bool {
        self.uplink_dwell
    }

    fn get_rx_frequency(&self, _frame: &Frame, window: &Window) -> u32 {
        match window {
            Window::_1 => {
                let ch = self.channels[self.last_tx_channel() as usize]
                    .expect("last TX channel is always defined");
                if ch.rx1_frequency != 0 {
                    ch.rx1_frequency
                } else {
                    ch.frequency
                }
            }
            Window::_2 => self.rx2_frequency.unwrap_or(R::rx2_defaults().0),
        }
    }

    fn get_rx_datarate(&self, tx_dr: DR, window: &Window) -> DR {
        match window {
            Window::_1 => R::apply_dr_offset(tx_dr, self.rx1_dr_offset),
            Window::_2 => match self.rx2_data_rate {
                Some(dr) => DR::try_from(dr).unwrap(),
                None => R::rx2_defaults().1,
            },
        }
    }

    fn set_rx1_dr_offset(&mut self, offset: u8) {
        self.rx1_dr_offset = offset;
    }

    fn set_rx2_data_rate(&mut self, dr: u8) {
        self.rx2_data_rate = Some(dr);
    }

    fn set_rx2_frequency(&mut self, freq: u32) {
        self.rx2_frequency = Some(freq);
    }

    fn rx1_dr_offset_validate(&self, value: u8) -> Option<u8> {
        (value <= R::max_rx1_dr_offset()).then_some(value)
    }

    fn accept_rx_param_setup(&mut self, freq: u32, rx1_dr_offset: u8, rx2_dr: u8) -> u8 {
        let mut status = 0;
        if R::frequency_valid(freq) {
            status |= 0b001;
        }
        if self.check_data_rate(rx2_dr).is_some() {
            status |= 0b010;
        }
        if self.rx1_dr_offset_validate(rx1_dr_offset).is_some() {
            status |= 0b100;
        }
        if status == 0b111 {
            self.rx2_frequency = Some(freq);
            self.rx2_data_rate = Some(rx2_dr);
            self.rx1_dr_offset = rx1_dr_offset;
        }
        status
    }

    fn set_aggregate_duty_cycle(&mut self, inverse: u32) {
        self.aggregate.set_inverse(inverse);
    }

    fn frequency_valid(&self, freq: u32) -> bool {
        R::frequency_valid(freq)
    }

    fn has_custom_channel_plan(&self) -> bool {
        true
    }

    fn lbt_params(&self) -> Option<LbtConfig> {
        R::lbt()
    }

    fn duty_cycle_default(&self) -> bool {
        R::duty_cycle_default()
    }

    fn reset_join_backoff(&mut self) {
        self.join_backoff.reset();
    }
}

impl<R: DynamicChannelRegion> DynamicChannelPlan<R> {
    fn last_tx_channel(&self) -> u8 {
        self.last_tx
    }
}
