//! Grid channel plans (US915, AU915, CN470): every channel position is
//! fixed by the regional parameters, the network only masks them.
use core::marker::PhantomData;

use super::backoff::{AggregateDutyCycle, Band, JoinBackoff};
use super::*;
use lorawan_codec::parser::CfList;

#[cfg(feature = "region-au915")]
mod au915;
#[cfg(feature = "region-cn470")]
mod cn470;
#[cfg(any(feature = "region-us915", feature = "region-us915-hybrid"))]
mod us915;

#[cfg(feature = "region-au915")]
pub(crate) use au915::AU915Region;
#[cfg(feature = "region-cn470")]
pub(crate) use cn470::CN470Region;
#[cfg(feature = "region-us915-hybrid")]
pub(crate) use us915::US915HybridRegion;
#[cfg(any(feature = "region-us915", feature = "region-us915-hybrid"))]
pub(crate) use us915::US915Region;

#[cfg(feature = "region-au915")]
pub(crate) type AU915 = FixedChannelPlan<AU915Region>;
#[cfg(feature = "region-cn470")]
pub(crate) type CN470 = FixedChannelPlan<CN470Region>;
#[cfg(feature = "region-us915")]
pub(crate) type US915 = FixedChannelPlan<US915Region>;
#[cfg(feature = "region-us915-hybrid")]
pub(crate) type US915Hybrid = FixedChannelPlan<US915HybridRegion>;

/// Regional tables of a grid-plan region.
pub(crate) trait FixedChannelRegion: ChannelRegion {
    /// Total channels in the grid.
    const NUM_CHANNELS: usize;
    /// Wideband channels at the top of the grid (0 for CN470).
    const NUM_500K: usize;

    fn uplink_frequency(channel: u8) -> u32;
    fn downlink_frequency(channel: u8) -> u32;
    fn channel_dr_range(channel: u8) -> DataRateRange;
    fn rx2_defaults() -> (u32, DR);
    fn rx1_datarate(tx_dr: DR, offset: u8) -> DR;
    fn max_rx1_dr_offset() -> u8;
    fn frequency_valid(freq: u32) -> bool;
    fn default_max_eirp() -> i8;
    fn min_dr() -> DR;
    fn max_dr() -> DR;

    fn default_dr() -> DR {
        DR::_0
    }

    /// The join datarate of attempt number `nb_trials`, alternating
    /// between the narrowband floor and the wideband channel set.
    fn join_dr_for_trial(nb_trials: u8) -> DR;

    fn is_500k_dr(dr: DR) -> bool;

    fn default_channel_mask() -> PlanMask {
        let mut mask = PlanMask::empty();
        for i in 0..Self::NUM_CHANNELS {
            mask.set_channel(i, true);
        }
        mask
    }

    fn first_500k_channel() -> usize {
        Self::NUM_CHANNELS - Self::NUM_500K
    }
}

#[derive(Clone)]
pub(crate) struct FixedChannelPlan<R: FixedChannelRegion> {
    channel_mask: PlanMask,
    /// Channels not yet used in the current hopping rotation; refreshed
    /// from `channel_mask` once a pool is exhausted.
    current_mask: PlanMask,
    preferred_join_subband: Option<u8>,
    rx1_dr_offset: u8,
    rx2_frequency: Option<u32>,
    rx2_data_rate: Option<u8>,
    max_eirp: i8,
    band: Band,
    aggregate: AggregateDutyCycle,
    join_backoff: JoinBackoff,
    last_tx: u8,
    _region: PhantomData<R>,
}

impl<R: FixedChannelRegion> Default for FixedChannelPlan<R> {
    fn default() -> Self {
        let mask = R::default_channel_mask();
        Self {
            channel_mask: mask.clone(),
            current_mask: mask,
            preferred_join_subband: None,
            rx1_dr_offset: 0,
            rx2_frequency: None,
            rx2_data_rate: None,
            max_eirp: R::default_max_eirp(),
            band: Band::default(),
            aggregate: AggregateDutyCycle::default(),
            join_backoff: JoinBackoff::default(),
            last_tx: 0,
            _region: PhantomData,
        }
    }
}

impl<R: FixedChannelRegion> FixedChannelPlan<R> {
    /// Channel index range usable at `datarate`.
    fn pool(datarate: DR) -> core::ops::Range<usize> {
        if R::NUM_500K > 0 && R::is_500k_dr(datarate) {
            R::first_500k_channel()..R::NUM_CHANNELS
        } else {
            0..R::first_500k_channel()
        }
    }

    fn in_preferred_subband(&self, channel: usize) -> bool {
        match self.preferred_join_subband {
            None => true,
            Some(sb) => {
                let sb = sb as usize - 1;
                if channel < R::first_500k_channel() {
                    channel / 8 == sb
                } else {
                    channel - R::first_500k_channel() == sb
                }
            }
        }
    }

    fn refresh_current_mask(&mut self, range: core::ops::Range<usize>) {
        for i in range {
            self.current_mask
                .set_channel(i, self.channel_mask.is_enabled(i).unwrap_or(false));
        }
    }

    fn set_125k_channels(mask: &mut PlanMask, enabled: bool, extra: &ChannelMask<2>) {
        let value = if enabled { 0xFF } else { 0x00 };
        for bank in 0..R::first_500k_channel() / 8 {
            mask.set_bank(bank, value);
        }
        if R::NUM_500K > 0 {
            mask.set_bank(R::first_500k_channel() / 8, extra.get_index(0));
        }
    }
}

impl<R: FixedChannelRegion> RegionHandler for FixedChannelPlan<R> {
    fn process_join_accept<T: AsRef<[u8]>, F: CryptoFactory>(
        &mut self,
        join_accept: &DecryptedJoinAcceptPayload<T, F>,
    ) {
        if let Some(CfList::FixedChannel(mask)) = join_accept.c_f_list() {
            self.channel_mask_set(mask);
        }
        self.preferred_join_subband = None;
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
        if duty_cycle {
            let wait = self.band.restriction_ms(now_ms);
            if wait > 0 {
                return Err(Error::DutyCycleRestricted { delay_ms: wait });
            }
        }

        let range = Self::pool(datarate);
        let biased = matches!(frame, Frame::Join) && self.preferred_join_subband.is_some();

        let mut candidates: heapless::Vec<u8, MAX_CHANNELS> = heapless::Vec::new();
        let mut any_configured = false;
        for i in range.clone() {
            if !self.channel_mask.is_enabled(i).unwrap_or(false) {
                continue;
            }
            if biased && !self.in_preferred_subband(i) {
                continue;
            }
            any_configured = true;
            if exclude.contains(&(i as u8)) {
                continue;
            }
            if !self.current_mask.is_enabled(i).unwrap_or(false) {
                continue;
            }
            let _ = candidates.push(i as u8);
        }

        // hopping rotation exhausted; open the pool up again
        if candidates.is_empty() && any_configured {
            self.refresh_current_mask(range.clone());
            for i in range {
                if !self.channel_mask.is_enabled(i).unwrap_or(false) {
                    continue;
                }
                if biased && !self.in_preferred_subband(i) {
                    continue;
                }
                if exclude.contains(&(i as u8)) {
                    continue;
                }
                let _ = candidates.push(i as u8);
            }
        }

        if let Some(&index) = candidates
            .get((rng.next_u32() as usize).checked_rem(candidates.len()).unwrap_or(0))
        {
            self.last_tx = index;
            Ok(TxChannel {
                index,
                frequency: R::uplink_frequency(index),
                lbt: None,
            })
        } else if any_configured {
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
        self.current_mask.set_channel(channel as usize, false);
        self.band.register_tx(now_ms, time_on_air_ms, 1, duty_cycle);
        self.aggregate.register_tx(now_ms, time_on_air_ms);
        if !joined && matches!(frame, Frame::Join) {
            self.join_backoff.register_tx(now_ms, time_on_air_ms);
        }
    }

    fn channel_mask_get(&self) -> PlanMask {
        self.channel_mask.clone()
    }

    fn channel_mask_set(&mut self, mask: PlanMask) {
        self.channel_mask = mask.clone();
        self.current_mask = mask;
        self.preferred_join_subband = None;
    }

    fn channel_mask_update(&self, mask: &mut PlanMask, ctl: u8, bits: ChannelMask<2>) -> bool {
        let banks = R::NUM_CHANNELS.div_ceil(16);
        match ctl {
            ctl if (ctl as usize) < banks => {
                let base = ctl as usize * 2;
                mask.set_bank(base, bits.get_index(0));
                mask.set_bank(base + 1, bits.get_index(1));
                true
            }
            6 => {
                Self::set_125k_channels(mask, true, &bits);
                true
            }
            7 if R::NUM_500K > 0 => {
                Self::set_125k_channels(mask, false, &bits);
                true
            }
            _ => false,
        }
    }

    fn channel_mask_validate(&self, mask: &PlanMask, dr: Option<DR>) -> bool {
        let Some(dr) = dr else {
            return mask.count_enabled(0..R::NUM_CHANNELS) > 0;
        };
        if R::NUM_500K > 0 {
            if R::is_500k_dr(dr) {
                mask.count_enabled(R::first_500k_channel()..R::NUM_CHANNELS) > 0
            } else {
                // FCC frequency-hopping rule: narrowband operation needs at
                // least two 125 kHz channels
                mask.count_enabled(0..R::first_500k_channel()) >= 2
            }
        } else {
            mask.count_enabled(0..R::NUM_CHANNELS) > 0
        }
    }

    fn restore_default_channel_mask(&mut self) {
        self.channel_mask = R::default_channel_mask();
        self.current_mask = self.channel_mask.clone();
    }

    fn handle_new_channel(&mut self, _: u8, _: u32, _: Option<DataRateRange>) -> (bool, bool) {
        // grid plans take no channel definitions
        (false, false)
    }

    fn handle_dl_channel(&mut self, _: u8, _: u32) -> (bool, bool) {
        (false, false)
    }

    fn add_channel(&mut self, _: Channel) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    fn remove_channel(&mut self, _: u8) -> Result<(), Error> {
        Err(Error::NotSupported)
    }

    fn drop_channel_list(&mut self) {
        self.restore_default_channel_mask();
    }

    fn enabled_channels(&self, out: &mut heapless::Vec<Channel, MAX_CHANNELS>) {
        for i in 0..R::NUM_CHANNELS {
            if self.channel_mask.is_enabled(i).unwrap_or(false) {
                let _ = out.push(Channel {
                    id: i as u8,
                    frequency: R::uplink_frequency(i as u8),
                    rx1_frequency: R::downlink_frequency(i as u8),
                    dr_range: R::channel_dr_range(i as u8),
                    band: 0,
                });
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
        R::min_dr()
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
        R::join_dr_for_trial(nb_trials)
    }

    fn check_tx_power(&self, index: u8) -> Option<u8> {
        (index <= R::max_tx_power_index()).then_some(index)
    }

    fn tx_power_dbm(&self, index: u8, _frequency: u32) -> i8 {
        self.max_eirp - 2 * index as i8
    }

    fn set_tx_param_setup(&mut self, _: i8, _: bool, _: bool) {}

    fn accepts_tx_param_setup(&self) -> bool {
        false
    }

    fn uplink_dwell_time(&self) -> bool {
        false
    }

    fn get_rx_frequency(&self, _frame: &Frame, window: &Window) -> u32 {
        match window {
            Window::_1 => R::downlink_frequency(self.last_tx),
            Window::_2 => self.rx2_frequency.unwrap_or(R::rx2_defaults().0),
        }
    }

    fn get_rx_datarate(&self, tx_dr: DR, window: &Window) -> DR {
        match window {
            Window::_1 => R::rx1_datarate(tx_dr, self.rx1_dr_offset),
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
        // RX2 uses the downlink datarate set
        if R::datarates()
            .get(rx2_dr as usize)
            .map(|d| d.is_some())
            .unwrap_or(false)
        {
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

    fn set_preferred_join_subband(&mut self, subband: u8) -> Result<(), Error> {
        if (1..=(R::first_500k_channel() / 8) as u8).contains(&subband) {
            self.preferred_join_subband = Some(subband);
            Ok(())
        } else {
            Err(Error::InvalidChannelIndex)
        }
    }

    fn frequency_valid(&self, freq: u32) -> bool {
        R::frequency_valid(freq)
    }

    fn has_custom_channel_plan(&self) -> bool {
        false
    }

    fn duty_cycle_default(&self) -> bool {
        false
    }

    fn reset_join_backoff(&mut self) {
        self.join_backoff.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mac::Frame;

    #[test]
    #[cfg(feature = "region-us915")]
    fn us915_grid_frequencies() {
        assert_eq!(US915Region::uplink_frequency(0), 902_300_000);
        assert_eq!(US915Region::uplink_frequency(63), 914_900_000);
        assert_eq!(US915Region::uplink_frequency(64), 903_000_000);
        assert_eq!(US915Region::uplink_frequency(71), 914_200_000);
        // RX1 lands on the 500 kHz downlink grid derived from channel % 8
        assert_eq!(US915Region::downlink_frequency(0), 923_300_000);
        assert_eq!(US915Region::downlink_frequency(9), 923_900_000);
        assert_eq!(US915Region::downlink_frequency(71), 927_500_000);
    }

    #[test]
    #[cfg(feature = "region-us915")]
    fn us915_join_alternates_between_narrow_and_wide() {
        assert_eq!(US915Region::join_dr_for_trial(1), DR::_0);
        assert_eq!(US915Region::join_dr_for_trial(2), DR::_4);
        assert_eq!(US915Region::join_dr_for_trial(3), DR::_0);
    }

    #[test]
    #[cfg(feature = "region-us915")]
    fn us915_hops_through_every_channel_before_reuse() {
        let mut plan = US915::default();
        let mut rng = rand::rngs::OsRng;
        let mut seen = [false; 64];
        for _ in 0..64 {
            let channel = plan
                .next_channel(&mut rng, &Frame::Data, DR::_0, 0, false, true, &[])
                .unwrap();
            assert!(!seen[channel.index as usize], "channel {} reused early", channel.index);
            seen[channel.index as usize] = true;
            plan.register_tx_done(channel.index, &Frame::Data, true, false, 0, 100);
        }
        // the rotation refreshes once the pool is dry
        assert!(plan.next_channel(&mut rng, &Frame::Data, DR::_0, 0, false, true, &[]).is_ok());
    }

    #[test]
    #[cfg(feature = "region-us915")]
    fn us915_wideband_datarate_selects_the_500k_pool() {
        let mut plan = US915::default();
        let mut rng = rand::rngs::OsRng;
        for _ in 0..16 {
            let channel = plan
                .next_channel(&mut rng, &Frame::Data, DR::_4, 0, false, true, &[])
                .unwrap();
            assert!((64..72).contains(&(channel.index as usize)));
            plan.register_tx_done(channel.index, &Frame::Data, true, false, 0, 100);
        }
    }

    #[test]
    #[cfg(feature = "region-us915")]
    fn us915_join_bias_restricts_the_pool() {
        let mut plan = US915::default();
        plan.set_preferred_join_subband(2).unwrap();
        let mut rng = rand::rngs::OsRng;
        for _ in 0..8 {
            let channel = plan
                .next_channel(&mut rng, &Frame::Join, DR::_0, 0, false, false, &[])
                .unwrap();
            assert!((8..16).contains(&(channel.index as usize)));
            plan.register_tx_done(channel.index, &Frame::Join, false, false, 0, 1);
        }
    }

    #[test]
    #[cfg(feature = "region-us915-hybrid")]
    fn hybrid_default_mask_is_one_subband() {
        let plan = US915Hybrid::default();
        let mask = plan.channel_mask_get();
        assert_eq!(mask.count_enabled(0..64), 8);
        assert!(mask.is_enabled(64).unwrap());
        assert!(!mask.is_enabled(65).unwrap());
    }

    #[test]
    #[cfg(feature = "region-cn470")]
    fn cn470_grid_frequencies() {
        assert_eq!(CN470Region::uplink_frequency(0), 470_300_000);
        assert_eq!(CN470Region::uplink_frequency(95), 489_300_000);
        // downlink repeats every 48 channels
        assert_eq!(CN470Region::downlink_frequency(0), 500_300_000);
        assert_eq!(CN470Region::downlink_frequency(50), 500_700_000);
        assert_eq!(CN470Region::rx2_defaults(), (505_300_000, DR::_0));
    }

    #[test]
    #[cfg(feature = "region-au915")]
    fn au915_rx1_datarate_matrix() {
        assert_eq!(AU915Region::rx1_datarate(DR::_0, 0), DR::_8);
        assert_eq!(AU915Region::rx1_datarate(DR::_5, 0), DR::_13);
        assert_eq!(AU915Region::rx1_datarate(DR::_5, 5), DR::_8);
        assert_eq!(AU915Region::rx1_datarate(DR::_6, 1), DR::_13);
    }

    #[test]
    #[cfg(feature = "region-us915")]
    fn join_backoff_restricts_unjoined_devices() {
        let mut plan = US915::default();
        let mut rng = rand::rngs::OsRng;
        let channel =
            plan.next_channel(&mut rng, &Frame::Join, DR::_0, 0, false, false, &[]).unwrap();
        // a 400 ms join request consumes the first-hour budget for ~40 s
        plan.register_tx_done(channel.index, &Frame::Join, false, false, 0, 400);
        match plan.next_channel(&mut rng, &Frame::Join, DR::_0, 1000, false, false, &[]) {
            Err(Error::DutyCycleRestricted { delay_ms }) => {
                assert!((38_000..=39_600).contains(&delay_ms), "got {delay_ms}");
            }
            other => panic!("expected a join back-off, got {other:?}"),
        }
        // joined devices are not subject to it
        assert!(plan.next_channel(&mut rng, &Frame::Data, DR::_0, 1000, false, true, &[]).is_ok());
    }
}
