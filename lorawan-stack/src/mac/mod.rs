//! The MAC layer: sessions, the join procedure, downlink MAC command
//! processing and ADR, written as a non-async state machine driven by the
//! device layer.
use heapless::Vec;
use lorawan_codec::keys::CryptoFactory;
use lorawan_codec::maccommandcreator::*;
use lorawan_codec::maccommands::{DownlinkMacCommand, MacCommandIterator};
use lorawan_codec::parser::DevAddr;
use lorawan_codec::types::ChannelMask;
use rand_core::RngCore;

use crate::radio::{self, RadioBuffer, RfConfig, RxQuality};
use crate::region::{self, constants, TxChannel, DR};
use crate::{AppSKey, Downlink, NwkSKey};

pub(crate) mod adr;
mod otaa;
mod session;
pub(crate) mod uplink;

#[cfg(feature = "certification")]
pub(crate) mod certification;

use adr::AdrBackoff;
pub use otaa::NetworkCredentials;
pub use session::{Session, SessionKeys};

pub type FcntDown = u32;
pub type FcntUp = u32;

#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub(crate) enum Frame {
    Join,
    Data,
}

#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub(crate) enum Window {
    _1,
    _2,
}

/// Margin and gateway count reported by a `LinkCheckAns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct LinkCheckInfo {
    pub margin_db: u8,
    pub gateway_count: u8,
}

/// Session-independent MAC state: the active datarate and TX power, RX
/// timing, and the knobs the network turns through MAC commands.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub(crate) data_rate: DR,
    pub(crate) tx_power_index: u8,
    pub(crate) rx1_delay: u32,
    pub(crate) join_accept_delay1: u32,
    pub(crate) join_accept_delay2: u32,
    pub(crate) adr: bool,
    pub(crate) duty_cycle: bool,
    pub(crate) nb_trans: u8,
    pub(crate) adr_backoff: AdrBackoff,
    pub(crate) battery_level: u8,
    pub(crate) link_check: Option<LinkCheckInfo>,
}

struct AdrRequest {
    data_rate: u8,
    tx_power: u8,
    mask_bits: ChannelMask<2>,
    mask_ctl: u8,
    nb_trans: u8,
}

impl Configuration {
    fn new(region: &region::Configuration) -> Self {
        Self {
            data_rate: region.get_default_datarate(),
            tx_power_index: 0,
            rx1_delay: constants::RECEIVE_DELAY1,
            join_accept_delay1: constants::JOIN_ACCEPT_DELAY1,
            join_accept_delay2: constants::JOIN_ACCEPT_DELAY2,
            adr: true,
            duty_cycle: region.duty_cycle_default(),
            nb_trans: 1,
            adr_backoff: AdrBackoff::default(),
            battery_level: 255,
            link_check: None,
        }
    }

    pub(crate) fn handle_downlink_macs(
        &mut self,
        region: &mut region::Configuration,
        uplink: &mut uplink::Uplink,
        quality: RxQuality,
        cmds: MacCommandIterator<'_, DownlinkMacCommand<'_>>,
    ) {
        // contiguous LinkADRReq commands form one atomic block
        let mut adr_block: Vec<AdrRequest, 4> = Vec::new();
        for cmd in cmds {
            if let DownlinkMacCommand::LinkADRReq(req) = &cmd {
                let _ = adr_block.push(AdrRequest {
                    data_rate: req.data_rate(),
                    tx_power: req.tx_power(),
                    mask_bits: req.channel_mask(),
                    mask_ctl: req.redundancy().channel_mask_control(),
                    nb_trans: req.redundancy().number_of_transmissions(),
                });
                continue;
            }
            self.process_link_adr_block(region, uplink, &adr_block);
            adr_block.clear();

            match cmd {
                DownlinkMacCommand::LinkADRReq(_) => unreachable!(),
                DownlinkMacCommand::LinkCheckAns(ans) => {
                    self.link_check = Some(LinkCheckInfo {
                        margin_db: ans.margin(),
                        gateway_count: ans.gateway_count(),
                    });
                }
                DownlinkMacCommand::DutyCycleReq(req) => {
                    region.set_aggregate_duty_cycle(req.aggregated_duty_cycle() as u32);
                    uplink.queue(&DutyCycleAnsCreator::new());
                }
                DownlinkMacCommand::RXParamSetupReq(req) => {
                    let status = region.accept_rx_param_setup(
                        req.frequency().value(),
                        req.dl_settings().rx1_dr_offset(),
                        req.dl_settings().rx2_data_rate() as u8,
                    );
                    let mut ans = RXParamSetupAnsCreator::new();
                    ans.set_channel_ack(status & 0b001 != 0)
                        .set_rx2_data_rate_ack(status & 0b010 != 0)
                        .set_rx1_data_rate_offset_ack(status & 0b100 != 0);
                    uplink.queue_sticky(&ans);
                }
                DownlinkMacCommand::DevStatusReq(_) => {
                    let mut ans = DevStatusAnsCreator::new();
                    ans.set_battery(self.battery_level);
                    let _ = ans.set_margin(quality.snr().clamp(-32, 31));
                    uplink.queue(&ans);
                }
                DownlinkMacCommand::NewChannelReq(req) => {
                    if region.has_custom_channel_plan() {
                        let (freq_ok, drr_ok) = region.handle_new_channel(
                            req.channel_index(),
                            req.frequency().value(),
                            Some(req.data_rate_range()),
                        );
                        let mut ans = NewChannelAnsCreator::new();
                        ans.set_channel_frequency_ack(freq_ok).set_data_rate_range_ack(drr_ok);
                        uplink.queue(&ans);
                    }
                }
                DownlinkMacCommand::RXTimingSetupReq(req) => {
                    self.rx1_delay = del_to_delay_ms(req.delay());
                    uplink.queue_sticky(&RXTimingSetupAnsCreator::new());
                }
                DownlinkMacCommand::TXParamSetupReq(req) => {
                    if region.accepts_tx_param_setup() {
                        region.set_tx_param_setup(
                            req.max_eirp() as i8,
                            req.uplink_dwell_time(),
                            req.downlink_dwell_time(),
                        );
                        uplink.queue_sticky(&TXParamSetupAnsCreator::new());
                    }
                }
                DownlinkMacCommand::DlChannelReq(req) => {
                    if region.has_custom_channel_plan() {
                        let (freq_ok, uplink_exists) =
                            region.handle_dl_channel(req.channel_index(), req.frequency().value());
                        let mut ans = DlChannelAnsCreator::new();
                        ans.set_channel_frequency_ack(freq_ok)
                            .set_uplink_frequency_exists_ack(uplink_exists);
                        uplink.queue_sticky(&ans);
                    }
                }
            }
        }
        self.process_link_adr_block(region, uplink, &adr_block);
    }

    /// Applies one chained `LinkADRReq` block: mask deltas accumulate in a
    /// scratch mask, validation happens once over the combined result, and
    /// datarate/power come from the closing request.
    fn process_link_adr_block(
        &mut self,
        region: &mut region::Configuration,
        uplink: &mut uplink::Uplink,
        block: &[AdrRequest],
    ) {
        let Some(last) = block.last() else {
            return;
        };

        let mut scratch = region.channel_mask_get();
        let mut ctl_ok = true;
        for req in block {
            ctl_ok &=
                region.channel_mask_update(&mut scratch, req.mask_ctl, req.mask_bits.clone());
        }

        let dr_nop = last.data_rate == 0xF;
        let power_nop = last.tx_power == 0xF;
        let requested_dr = if dr_nop {
            Some(self.data_rate)
        } else {
            region.check_data_rate(last.data_rate)
        };
        let dr_ok = dr_nop || requested_dr.is_some();
        let power_ok = power_nop || region.check_tx_power(last.tx_power).is_some();
        let mask_ok = ctl_ok && region.channel_mask_validate(&scratch, requested_dr);

        if dr_ok && power_ok && mask_ok {
            region.channel_mask_set(scratch);
            if !dr_nop {
                self.data_rate = requested_dr.unwrap();
            }
            if !power_nop {
                self.tx_power_index = last.tx_power;
            }
            if last.nb_trans > 0 {
                self.nb_trans = last.nb_trans;
            }
        }

        let mut ans = LinkADRAnsCreator::new();
        ans.set_channel_mask_ack(mask_ok).set_data_rate_ack(dr_ok).set_tx_power_ack(power_ok);
        for _ in block {
            uplink.queue(&ans);
        }
    }
}

pub(crate) struct Mac {
    pub configuration: Configuration,
    pub region: region::Configuration,
    board_eirp: BoardEirp,
    state: State,
    join_attempts: u8,
}

struct BoardEirp {
    max_power: u8,
    antenna_gain: i8,
}

#[allow(clippy::large_enum_variant)]
enum State {
    Joined(Session),
    Otaa(otaa::Otaa),
    Unjoined,
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error {
    NotJoined,
}

/// One application payload queued for uplink.
pub struct SendData<'a> {
    pub data: &'a [u8],
    pub fport: u8,
    pub confirmed: bool,
}

pub(crate) type Result<T = ()> = core::result::Result<T, Error>;

impl Mac {
    pub(crate) fn new(region: region::Configuration, max_power: u8, antenna_gain: i8) -> Self {
        let configuration = Configuration::new(&region);
        Self {
            board_eirp: BoardEirp { max_power, antenna_gain },
            region,
            state: State::Unjoined,
            configuration,
            join_attempts: 0,
        }
    }

    /// Fills `buf` with a join request and arms the join state. Returns
    /// the DevNonce drawn for this attempt.
    pub(crate) fn join_otaa<F: CryptoFactory + Default, G: RngCore, const N: usize>(
        &mut self,
        rng: &mut G,
        credentials: NetworkCredentials,
        buf: &mut RadioBuffer<N>,
    ) -> u16 {
        let mut otaa = otaa::Otaa::new(credentials);
        let dev_nonce = otaa.prepare_buffer::<F, G, N>(rng, buf);
        self.state = State::Otaa(otaa);
        self.join_attempts = 1;
        dev_nonce
    }

    /// Rebuilds the join request for a retry, alternating the datarate the
    /// region prescribes for repeated attempts.
    pub(crate) fn join_retry<F: CryptoFactory + Default, G: RngCore, const N: usize>(
        &mut self,
        rng: &mut G,
        buf: &mut RadioBuffer<N>,
    ) -> Option<u16> {
        let State::Otaa(ref mut otaa) = self.state else {
            return None;
        };
        self.join_attempts = self.join_attempts.saturating_add(1);
        Some(otaa.prepare_buffer::<F, G, N>(rng, buf))
    }

    /// Establishes a session from provisioned ABP credentials.
    pub(crate) fn join_abp(
        &mut self,
        nwkskey: NwkSKey,
        appskey: AppSKey,
        devaddr: DevAddr<[u8; 4]>,
    ) {
        self.state = State::Joined(Session::new(nwkskey, appskey, devaddr));
    }

    pub(crate) fn set_session(&mut self, session: Session) {
        self.state = State::Joined(session);
    }

    /// Assembles a data frame. Fails when no session is active.
    pub(crate) fn prepare_send<F: CryptoFactory + Default, const N: usize>(
        &mut self,
        buf: &mut RadioBuffer<N>,
        send_data: &SendData,
    ) -> Result<FcntUp> {
        match &mut self.state {
            State::Joined(session) => Ok(session.prepare_buffer::<F, N>(
                &mut self.configuration,
                &mut self.region,
                send_data,
                buf,
            )),
            _ => Err(Error::NotJoined),
        }
    }

    /// The datarate the next transmission of `frame` uses.
    pub(crate) fn current_datarate(&self, frame: &Frame) -> DR {
        match frame {
            Frame::Join => self.region.get_alternate_dr(self.join_attempts.max(1)),
            Frame::Data => self.configuration.data_rate,
        }
    }

    /// Asks the region for a transmit channel, excluding `exclude`
    /// (channels already found busy this round).
    pub(crate) fn select_channel<G: RngCore>(
        &mut self,
        rng: &mut G,
        frame: &Frame,
        now_ms: u32,
        exclude: &[u8],
    ) -> core::result::Result<TxChannel, region::Error> {
        let datarate = self.current_datarate(frame);
        self.region.next_channel(
            rng,
            frame,
            datarate,
            now_ms,
            self.configuration.duty_cycle,
            self.is_joined(),
            exclude,
        )
    }

    /// Radio parameters for transmitting on the selected channel.
    pub(crate) fn create_tx_config(&self, channel: &TxChannel, frame: &Frame) -> radio::TxConfig {
        let datarate = self.current_datarate(frame);
        let mut tx_config =
            self.region
                .create_tx_config(channel, datarate, self.configuration.tx_power_index);
        tx_config.adjust_power(self.board_eirp.max_power, self.board_eirp.antenna_gain);
        tx_config
    }

    /// Books the airtime of the transmission that just finished.
    pub(crate) fn register_tx_done(
        &mut self,
        channel: u8,
        frame: &Frame,
        now_ms: u32,
        time_on_air_ms: u32,
    ) {
        let joined = self.is_joined();
        self.region.register_tx_done(
            channel,
            frame,
            joined,
            self.configuration.duty_cycle,
            now_ms,
            time_on_air_ms,
        );
    }

    pub(crate) fn get_rx_delay(&self, frame: &Frame, window: &Window) -> u32 {
        match frame {
            Frame::Join => match window {
                Window::_1 => self.configuration.join_accept_delay1,
                Window::_2 => self.configuration.join_accept_delay2,
            },
            Frame::Data => match window {
                Window::_1 => self.configuration.rx1_delay,
                // LoRaWAN 1.0.2 §3.3.2: the second window opens one second
                // after the first
                Window::_2 => self.configuration.rx1_delay + 1000,
            },
        }
    }

    pub(crate) fn get_rx_config(&self, frame: &Frame, window: &Window) -> RfConfig {
        self.region.get_rx_config(self.current_datarate(frame), frame, window)
    }

    /// (symbol timeout, arm-early offset in ms) for the given window.
    pub(crate) fn get_rx_window_params(
        &self,
        frame: &Frame,
        window: &Window,
        rx_error_ms: u32,
        wake_up_time_ms: u32,
    ) -> (u16, i32) {
        self.region.get_rx_window_params(
            self.current_datarate(frame),
            window,
            rx_error_ms,
            wake_up_time_ms,
        )
    }

    /// Processes a received frame: a join accept while joining, a data
    /// downlink while joined.
    pub(crate) fn handle_rx<F: CryptoFactory + Default, const N: usize, const D: usize>(
        &mut self,
        buf: &mut RadioBuffer<N>,
        dl: &mut Vec<Downlink, D>,
        quality: RxQuality,
        rx_slot: u8,
    ) -> Response {
        match &mut self.state {
            State::Joined(session) => session.handle_rx::<F, N, D>(
                &mut self.region,
                &mut self.configuration,
                buf,
                dl,
                quality,
                rx_slot,
            ),
            State::Otaa(otaa) => {
                if let Some(session) =
                    otaa.handle_rx::<F, N>(&mut self.region, &mut self.configuration, buf)
                {
                    info!("join accept received, session established");
                    self.state = State::Joined(session);
                    self.join_attempts = 0;
                    self.region.reset_join_backoff();
                    Response::JoinSuccess
                } else {
                    Response::NoUpdate
                }
            }
            State::Unjoined => Response::NoUpdate,
        }
    }

    /// Both receive windows closed without a frame.
    pub(crate) fn rx2_complete(&mut self, will_retry: bool) -> Response {
        match &mut self.state {
            State::Joined(session) => session.rx2_complete(will_retry),
            State::Otaa(otaa) => otaa.rx2_complete(),
            State::Unjoined => Response::NoUpdate,
        }
    }

    /// A confirmed uplink still waiting for its acknowledgement.
    pub(crate) fn ack_pending(&self) -> bool {
        match &self.state {
            State::Joined(session) => session.ack_pending,
            _ => false,
        }
    }

    pub(crate) fn is_joined(&self) -> bool {
        matches!(&self.state, State::Joined(_))
    }

    pub(crate) fn is_joining(&self) -> bool {
        matches!(&self.state, State::Otaa(_))
    }

    pub(crate) fn get_session(&self) -> Option<&Session> {
        match &self.state {
            State::Joined(session) => Some(session),
            _ => None,
        }
    }

    pub(crate) fn get_fcnt_up(&self) -> Option<FcntUp> {
        self.get_session().map(|s| s.fcnt_up)
    }

    pub(crate) fn take_link_check(&mut self) -> Option<LinkCheckInfo> {
        self.configuration.link_check.take()
    }

    /// Queues a `LinkCheckReq` for the next uplink.
    pub(crate) fn queue_link_check(&mut self) {
        if let State::Joined(session) = &mut self.state {
            session.uplink.queue(&LinkCheckReqCreator::new());
        }
    }

    /// Drops to the next lower datarate when one exists and the queued
    /// payload still fits its cap.
    pub(crate) fn lower_data_rate_if_fits(&mut self, payload_len: usize) -> bool {
        let lower = self.region.next_lower_data_rate(self.configuration.data_rate);
        if lower == self.configuration.data_rate {
            return false;
        }
        let dwell = self.region.uplink_dwell_time();
        let cap = self.region.get_max_payload_length(lower, false, dwell) as usize;
        if payload_len > cap {
            return false;
        }
        self.configuration.data_rate = lower;
        true
    }

    /// Drops the session and every pending buffer; the device must join
    /// again afterwards.
    pub(crate) fn shutdown(&mut self) {
        self.state = State::Unjoined;
        self.join_attempts = 0;
        self.configuration = Configuration::new(&self.region);
    }

    /// The application payload cap of the current datarate.
    pub(crate) fn max_payload_length(&self) -> u8 {
        let dwell = self.region.uplink_dwell_time();
        self.region.get_max_payload_length(self.configuration.data_rate, false, dwell)
    }
}

#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug)]
pub enum Response {
    /// Confirmed uplink saw no acknowledgement (yet).
    NoAck,
    /// The uplink frame counter is exhausted; a new session is required.
    SessionExpired,
    DownlinkReceived { fcnt: FcntDown, acknowledged: bool },
    NoJoinAccept,
    JoinSuccess,
    NoUpdate,
    RxComplete,
}

fn del_to_delay_ms(del: u8) -> u32 {
    match del {
        2..=15 => del as u32 * 1000,
        _ => constants::RECEIVE_DELAY1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Region;
    use lorawan_codec::maccommands::{parse_downlink_mac_commands, SerializableMacCommand};

    fn quality() -> RxQuality {
        RxQuality::new(-90, 5)
    }

    /// One serialized LinkADRReq: CID, DR/power, mask, redundancy.
    fn adr_req(dr: u8, power: u8, mask: u16, ctl: u8, nb_trans: u8) -> [u8; 5] {
        [
            0x03,
            (dr << 4) | power,
            (mask & 0xff) as u8,
            (mask >> 8) as u8,
            (ctl << 4) | nb_trans,
        ]
    }

    fn answer_statuses(uplink: &mut uplink::Uplink) -> std::vec::Vec<u8> {
        uplink
            .take_answers()
            .iter()
            .filter(|a| a.cid() == 0x03)
            .map(|a| a.payload_bytes()[0])
            .collect()
    }

    #[test]
    #[cfg(feature = "region-us915")]
    fn chained_link_adr_commits_the_combined_mask() {
        let mut region = region::Configuration::new(Region::US915);
        let mut configuration = Configuration::new(&region);
        let mut uplink = uplink::Uplink::default();

        // disable all 125 kHz channels keeping one 500 kHz channel, then
        // re-open channels 0 and 1: only the combined result is judged
        let mut bytes = std::vec::Vec::new();
        bytes.extend_from_slice(&adr_req(0, 0, 0x0001, 7, 1));
        bytes.extend_from_slice(&adr_req(0, 0, 0x0003, 0, 1));
        configuration.handle_downlink_macs(
            &mut region,
            &mut uplink,
            quality(),
            parse_downlink_mac_commands(&bytes),
        );

        // one answer per request, all three bits set
        assert_eq!(answer_statuses(&mut uplink), [0x07, 0x07]);

        let mask = region.channel_mask_get();
        assert_eq!(mask.count_enabled(0..64), 2);
        assert!(mask.is_enabled(0).unwrap());
        assert!(mask.is_enabled(1).unwrap());
        assert!(mask.is_enabled(64).unwrap());
        assert_eq!(configuration.data_rate, DR::_0);
    }

    #[test]
    #[cfg(feature = "region-us915")]
    fn link_adr_leaving_one_narrowband_channel_is_rejected() {
        let mut region = region::Configuration::new(Region::US915);
        let mut configuration = Configuration::new(&region);
        let mut uplink = uplink::Uplink::default();

        // a single 125 kHz channel violates the hopping rule below the
        // 500 kHz boundary
        let mut bytes = std::vec::Vec::new();
        bytes.extend_from_slice(&adr_req(0, 0, 0x0001, 7, 1));
        bytes.extend_from_slice(&adr_req(0, 0, 0x0001, 0, 1));
        configuration.handle_downlink_macs(
            &mut region,
            &mut uplink,
            quality(),
            parse_downlink_mac_commands(&bytes),
        );

        // channel-mask bit cleared, datarate and power bits still set
        assert_eq!(answer_statuses(&mut uplink), [0x06, 0x06]);
        // the stored mask is untouched
        assert_eq!(region.channel_mask_get().count_enabled(0..64), 64);
    }

    #[test]
    #[cfg(feature = "region-eu868")]
    fn link_adr_applies_datarate_and_power() {
        let mut region = region::Configuration::new(Region::EU868);
        let mut configuration = Configuration::new(&region);
        let mut uplink = uplink::Uplink::default();

        let bytes = adr_req(5, 2, 0x0007, 0, 3);
        configuration.handle_downlink_macs(
            &mut region,
            &mut uplink,
            quality(),
            parse_downlink_mac_commands(&bytes),
        );

        assert_eq!(answer_statuses(&mut uplink), [0x07]);
        assert_eq!(configuration.data_rate, DR::_5);
        assert_eq!(configuration.tx_power_index, 2);
        assert_eq!(configuration.nb_trans, 3);
    }

    #[test]
    #[cfg(feature = "region-eu868")]
    fn link_adr_nop_fields_keep_current_values() {
        let mut region = region::Configuration::new(Region::EU868);
        let mut configuration = Configuration::new(&region);
        configuration.data_rate = DR::_3;
        configuration.tx_power_index = 4;
        let mut uplink = uplink::Uplink::default();

        let bytes = adr_req(0xF, 0xF, 0x0007, 0, 0);
        configuration.handle_downlink_macs(
            &mut region,
            &mut uplink,
            quality(),
            parse_downlink_mac_commands(&bytes),
        );

        assert_eq!(answer_statuses(&mut uplink), [0x07]);
        assert_eq!(configuration.data_rate, DR::_3);
        assert_eq!(configuration.tx_power_index, 4);
    }

    #[test]
    #[cfg(feature = "region-eu868")]
    fn duty_cycle_req_is_acknowledged() {
        let mut region = region::Configuration::new(Region::EU868);
        let mut configuration = Configuration::new(&region);
        let mut uplink = uplink::Uplink::default();

        // MaxDCycle 4: 1/16 aggregated duty cycle
        configuration.handle_downlink_macs(
            &mut region,
            &mut uplink,
            quality(),
            parse_downlink_mac_commands(&[0x04, 0x04]),
        );
        let answers = uplink.take_answers();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].cid(), 0x04);
    }

    #[test]
    #[cfg(feature = "region-eu868")]
    fn dev_status_reports_battery_and_margin() {
        let mut region = region::Configuration::new(Region::EU868);
        let mut configuration = Configuration::new(&region);
        configuration.battery_level = 128;
        let mut uplink = uplink::Uplink::default();

        configuration.handle_downlink_macs(
            &mut region,
            &mut uplink,
            quality(),
            parse_downlink_mac_commands(&[0x06]),
        );
        let answers = uplink.take_answers();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].cid(), 0x06);
        assert_eq!(answers[0].payload_bytes(), [128, 5]);
    }

    #[test]
    #[cfg(feature = "region-eu868")]
    fn new_channel_req_defines_a_channel_on_dynamic_plans() {
        let mut region = region::Configuration::new(Region::EU868);
        let mut configuration = Configuration::new(&region);
        let mut uplink = uplink::Uplink::default();

        // channel 3 at 867.1 MHz, DR0..DR5
        let bytes = [0x07, 0x03, 0x18, 0x4f, 0x84, 0x50];
        configuration.handle_downlink_macs(
            &mut region,
            &mut uplink,
            quality(),
            parse_downlink_mac_commands(&bytes),
        );
        let answers = uplink.take_answers();
        assert_eq!(answers[0].cid(), 0x07);
        assert_eq!(answers[0].payload_bytes(), [0x03]);

        let mut channels: heapless::Vec<crate::region::Channel, { crate::region::MAX_CHANNELS }> =
            heapless::Vec::new();
        region.enabled_channels(&mut channels);
        assert!(channels.iter().any(|c| c.frequency == 867_100_000));
    }

    #[test]
    #[cfg(feature = "region-eu868")]
    fn rx_timing_setup_updates_delay_and_sticks() {
        let mut region = region::Configuration::new(Region::EU868);
        let mut configuration = Configuration::new(&region);
        let mut uplink = uplink::Uplink::default();

        configuration.handle_downlink_macs(
            &mut region,
            &mut uplink,
            quality(),
            parse_downlink_mac_commands(&[0x08, 0x03]),
        );
        assert_eq!(configuration.rx1_delay, 3000);
        assert!(uplink.has_sticky());
    }
}
