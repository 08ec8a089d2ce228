//! The device supervisor: owns the radio, the MAC and the single TX/RX
//! buffers, validates application requests, and translates MAC outcomes
//! into application events.
//!
//! The stack is single-threaded and cooperative: radio interrupts and
//! timer expiries are posted as [`Event`]s by the embedding work queue,
//! each processed to completion by [`Device::handle_event`]. A returned
//! [`Response::TimeoutRequest`] asks the queue to arm a one-shot timer.
use core::marker::PhantomData;

use heapless::Vec;
use lorawan_codec::keys::CryptoFactory;

use crate::mac::{self, LinkCheckInfo, Mac, NetworkCredentials, SendData, Session, SessionKeys};
use crate::radio::RadioBuffer;
use crate::region::{self, Channel, MAX_CHANNELS};
use crate::{Downlink, JoinMode, RngCore};

pub mod radio;
use radio::{PhyRxTx, Timings};

pub(crate) mod state;
use state::State;

#[cfg(test)]
mod test;

pub type TimestampMs = u32;

/// Lifecycle of the device as observable by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum DeviceState {
    NotInitialized,
    Init,
    Joining,
    Joined,
    AbpConnecting,
    Idle,
    Send,
    #[cfg(feature = "certification")]
    ComplianceTest,
    Shutdown,
}

/// Events fed to the stack by the embedding work queue. Application calls,
/// timer expiries and radio interrupts all arrive here, each carrying the
/// monotonic time at which it is processed.
pub enum Event<'a, R>
where
    R: PhyRxTx,
{
    Join(NetworkCredentials, TimestampMs),
    SendDataRequest(SendData<'a>, TimestampMs),
    RadioEvent(radio::Event<'a, R>, TimestampMs),
    TimeoutFired(TimestampMs),
}

impl<R> core::fmt::Debug for Event<'_, R>
where
    R: PhyRxTx,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let event = match self {
            Event::Join(..) => "Join",
            Event::SendDataRequest(..) => "SendDataRequest",
            Event::RadioEvent(..) => "RadioEvent",
            Event::TimeoutFired(_) => "TimeoutFired",
        };
        write!(f, "lorawan_stack::Event::{event}")
    }
}

/// Outcome of one processed work item, doubling as the application event
/// surface: `Connected`/`JoinFailure` close a join, `TxDone`/`NoAck`/
/// `DownlinkReceived` close an uplink exchange, `TimeoutRequest` asks the
/// queue for a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Response {
    NoUpdate,
    /// Arm a one-shot timer firing `TimeoutFired` at this time.
    TimeoutRequest(TimestampMs),
    JoinRequestSending,
    UplinkSending(mac::FcntUp),
    /// Session established (join accept received, or ABP activated).
    Connected,
    /// All join attempts exhausted.
    JoinFailure,
    /// A downlink was accepted; data (if any) is readable via
    /// [`Device::receive`]. `acknowledged` closes a confirmed uplink.
    DownlinkReceived {
        fcnt: mac::FcntDown,
        acknowledged: bool,
    },
    /// The uplink exchange finished without a downlink.
    TxDone,
    /// Confirmed uplink unacknowledged after all retries.
    NoAck,
    /// The radio gave up on the transmission.
    TxTimeout,
    /// No channel could be found (mask empty for the datarate, or carrier
    /// sense found them all busy).
    TxSchedulingError,
    /// The uplink frame counter is exhausted.
    SessionExpired,
    Disconnected,
}

#[derive(Debug)]
pub enum Error<R: PhyRxTx> {
    Radio(R::PhyError),
    State(state::StateError),
    Mac(mac::Error),
    /// The device has no active session.
    NoActiveSession,
    /// Joined network required for this operation.
    NoNetworkJoined,
    /// A transmission or join is already in progress.
    WouldBlock,
    /// FPort outside the application range.
    PortInvalid,
    /// The current datarate cannot carry any application payload (its
    /// dwell-limited cap is the attached maximum, zero); nothing was
    /// queued.
    LengthError { max: u8 },
    InvalidArgument,
}

impl<R: PhyRxTx> From<mac::Error> for Error<R> {
    fn from(mac_error: mac::Error) -> Error<R> {
        Error::Mac(mac_error)
    }
}

pub struct Device<R, C, RNG, const N: usize, const D: usize = 1>
where
    R: PhyRxTx + Timings,
    C: CryptoFactory + Default,
    RNG: RngCore,
{
    state: State,
    device_state: DeviceState,
    shared: Shared<R, RNG, N, D>,
    confirmed_retries: u8,
    rx_read_offset: usize,
    #[cfg(feature = "certification")]
    certification: mac::certification::Certification,
    #[cfg(feature = "certification")]
    certification_uplink: Option<Vec<u8, 242>>,
    crypto: PhantomData<C>,
}

pub(crate) struct Shared<R: PhyRxTx + Timings, RNG: RngCore, const N: usize, const D: usize> {
    pub(crate) radio: R,
    pub(crate) rng: RNG,
    pub(crate) tx_buffer: RadioBuffer<N>,
    /// Separate from `tx_buffer`: a stray frame must not clobber an uplink
    /// that may still be retransmitted.
    pub(crate) rx_buffer: RadioBuffer<N>,
    pub(crate) mac: Mac,
    pub(crate) downlink: Vec<Downlink, D>,
    pub(crate) join_retries_left: u8,
    pub(crate) data_retries_left: u8,
    pub(crate) tx_attempt: u8,
    pub(crate) pending_payload_len: usize,
    /// Tail of the last oversized send that did not fit the payload cap;
    /// the application drives follow-up sends for it.
    pub(crate) pending_bytes: usize,
}

impl<R, C, RNG, const N: usize, const D: usize> Device<R, C, RNG, N, D>
where
    R: PhyRxTx + Timings,
    C: CryptoFactory + Default,
    RNG: RngCore,
{
    /// Initializes the stack around a radio and an entropy source.
    pub fn new(region: region::Configuration, radio: R, rng: RNG) -> Device<R, C, RNG, N, D> {
        Device {
            crypto: PhantomData,
            state: State::default(),
            device_state: DeviceState::Init,
            shared: Shared {
                radio,
                rng,
                tx_buffer: RadioBuffer::new(),
                rx_buffer: RadioBuffer::new(),
                mac: Mac::new(region, R::MAX_RADIO_POWER, R::ANTENNA_GAIN),
                downlink: Vec::new(),
                join_retries_left: 0,
                data_retries_left: 0,
                tx_attempt: 1,
                pending_payload_len: 0,
                pending_bytes: 0,
            },
            confirmed_retries: 8,
            rx_read_offset: 0,
            #[cfg(feature = "certification")]
            certification: mac::certification::Certification::default(),
            #[cfg(feature = "certification")]
            certification_uplink: None,
        }
    }

    /// Starts the join procedure (or activates the ABP session
    /// immediately).
    pub fn join(&mut self, mode: JoinMode, now_ms: TimestampMs) -> Result<Response, Error<R>> {
        if !matches!(self.device_state, DeviceState::Init | DeviceState::Shutdown) {
            return Err(Error::WouldBlock);
        }
        match mode {
            JoinMode::OTAA { deveui, appeui, appkey, nb_trials } => {
                if nb_trials == 0 {
                    return Err(Error::InvalidArgument);
                }
                self.shared.join_retries_left = nb_trials - 1;
                self.device_state = DeviceState::Joining;
                self.handle_event(Event::Join(
                    NetworkCredentials::new(appeui, deveui, appkey),
                    now_ms,
                ))
            }
            JoinMode::ABP { nwkskey, appskey, devaddr } => {
                self.device_state = DeviceState::AbpConnecting;
                self.shared.mac.join_abp(nwkskey, appskey, devaddr);
                self.device_state = DeviceState::Idle;
                Ok(Response::Connected)
            }
        }
    }

    /// Shuts the session down: pending buffers are dropped, the radio is
    /// left to idle out, and the device must join again before sending.
    pub fn disconnect(&mut self) -> Response {
        let _ = self.shared.radio.handle_event(radio::Event::CancelRx);
        self.shared.mac.shutdown();
        self.shared.downlink.clear();
        self.shared.tx_buffer.clear();
        self.shared.pending_bytes = 0;
        self.rx_read_offset = 0;
        self.state = State::default();
        self.device_state = DeviceState::Shutdown;
        Response::Disconnected
    }

    /// Queues one uplink, truncating to the payload cap of the current
    /// datarate. Returns the number of bytes actually queued together with
    /// the scheduling outcome; an oversized payload's remainder is
    /// reported via [`Device::pending_bytes`] and stays with the caller to
    /// send next.
    pub fn send(
        &mut self,
        data: &[u8],
        fport: u8,
        confirmed: bool,
        now_ms: TimestampMs,
    ) -> Result<(usize, Response), Error<R>> {
        if !self.port_valid(fport) {
            return Err(Error::PortInvalid);
        }
        if !self.shared.mac.is_joined() {
            return Err(Error::NoNetworkJoined);
        }
        if !matches!(self.state, State::Idle(_)) {
            return Err(Error::WouldBlock);
        }
        let max = self.shared.mac.max_payload_length() as usize;
        if max == 0 {
            // dwell-limited datarates may carry no payload at all
            return Err(Error::LengthError { max: 0 });
        }
        let queued = data.len().min(max);
        self.shared.pending_bytes = data.len() - queued;
        self.shared.pending_payload_len = queued;
        self.shared.data_retries_left = if confirmed {
            self.confirmed_retries.saturating_sub(1)
        } else {
            0
        };
        self.shared.tx_attempt = 1;
        let response = self.handle_event(Event::SendDataRequest(
            SendData { data: &data[..queued], fport, confirmed },
            now_ms,
        ))?;
        Ok((queued, response))
    }

    /// Bytes of the last queued send that exceeded the payload cap and
    /// still await a follow-up send.
    pub fn pending_bytes(&self) -> usize {
        self.shared.pending_bytes
    }

    /// Reads a ready downlink for `fport` (or any port when `None`) into
    /// `buf`. Partial reads are supported: the remainder stays readable.
    pub fn receive(&mut self, fport: Option<u8>, buf: &mut [u8]) -> Result<usize, Error<R>> {
        if !self.shared.mac.is_joined() {
            return Err(Error::NoActiveSession);
        }
        let downlink = self.shared.downlink.first().ok_or(Error::WouldBlock)?;
        if let Some(port) = fport {
            if downlink.fport != port {
                return Err(Error::WouldBlock);
            }
        }
        let remaining = &downlink.data[self.rx_read_offset..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.rx_read_offset += n;
        if self.rx_read_offset >= downlink.data.len() {
            self.shared.downlink.remove(0);
            self.rx_read_offset = 0;
        }
        Ok(n)
    }

    /// Drives the state machine with a radio or timer event.
    pub fn handle_event(&mut self, event: Event<'_, R>) -> Result<Response, Error<R>> {
        let (new_state, result) =
            self.state.handle_event::<R, C, RNG, N, D>(&mut self.shared, event);
        self.state = new_state;
        #[cfg(feature = "certification")]
        if matches!(result, Ok(Response::DownlinkReceived { .. })) {
            self.process_certification_downlink();
        }
        self.device_state = match (&self.state, &result) {
            (_, Ok(Response::Connected)) => DeviceState::Idle,
            (_, Ok(Response::JoinFailure)) => DeviceState::Init,
            (State::Idle(_), _) => {
                if matches!(self.device_state, DeviceState::Shutdown) {
                    DeviceState::Shutdown
                } else if self.shared.mac.is_joined() {
                    self.idle_state()
                } else if matches!(self.device_state, DeviceState::Joining) {
                    // the join ended without an accept
                    DeviceState::Init
                } else {
                    self.device_state
                }
            }
            _ => {
                if matches!(self.device_state, DeviceState::Joining) {
                    DeviceState::Joining
                } else {
                    DeviceState::Send
                }
            }
        };
        result
    }

    /// The resting state between exchanges.
    fn idle_state(&self) -> DeviceState {
        #[cfg(feature = "certification")]
        if self.certification.is_active() {
            return DeviceState::ComplianceTest;
        }
        DeviceState::Idle
    }

    /// The application-visible lifecycle state.
    pub fn device_state(&self) -> DeviceState {
        self.device_state
    }

    pub fn ready_to_send_data(&self) -> bool {
        matches!(&self.state, State::Idle(_)) && self.shared.mac.is_joined()
    }

    /// Takes the oldest ready downlink wholesale.
    pub fn take_downlink(&mut self) -> Option<Downlink> {
        if self.shared.downlink.is_empty() {
            return None;
        }
        self.rx_read_offset = 0;
        Some(self.shared.downlink.remove(0))
    }

    /// Queues a `LinkCheckReq` for the next uplink; the answer appears via
    /// [`Device::take_link_check`] after the following downlink.
    pub fn set_link_check_request(&mut self) -> Result<(), Error<R>> {
        match self.shared.mac.get_session() {
            Some(_) => {
                // queue through the session's answer set
                self.shared.mac.queue_link_check();
                Ok(())
            }
            None => Err(Error::NoActiveSession),
        }
    }

    pub fn take_link_check(&mut self) -> Option<LinkCheckInfo> {
        self.shared.mac.take_link_check()
    }

    /// Battery level reported by `DevStatusAns`: 0 external power,
    /// 1..=254 charge level, 255 unknown.
    pub fn set_battery_level(&mut self, level: u8) {
        self.shared.mac.configuration.battery_level = level;
    }

    /// Number of transmissions attempted for a confirmed uplink before
    /// giving up; must be below 255.
    pub fn set_confirmed_msg_retry(&mut self, retries: u8) -> Result<(), Error<R>> {
        if retries == 255 {
            return Err(Error::InvalidArgument);
        }
        self.confirmed_retries = retries.max(1);
        Ok(())
    }

    pub fn enable_adaptive_datarate(&mut self, enabled: bool) {
        self.shared.mac.configuration.adr = enabled;
    }

    /// Overrides the duty-cycle enforcement default of the region. Turning
    /// it off is only permitted for test setups.
    pub fn set_duty_cycle_enabled(&mut self, enabled: bool) {
        self.shared.mac.configuration.duty_cycle = enabled;
    }

    pub fn get_datarate(&self) -> region::DR {
        self.shared.mac.configuration.data_rate
    }

    /// Pins the uplink datarate, e.g. before disabling ADR.
    pub fn set_datarate(&mut self, datarate: region::DR) -> Result<(), Error<R>> {
        if self.shared.mac.region.check_data_rate(datarate as u8).is_none() {
            return Err(Error::InvalidArgument);
        }
        self.shared.mac.configuration.data_rate = datarate;
        Ok(())
    }

    /// Adds application channels to a dynamic plan.
    pub fn add_channels(&mut self, channels: &[Channel]) -> Result<(), region::Error> {
        for channel in channels {
            self.shared.mac.region.add_channel(*channel)?;
        }
        Ok(())
    }

    pub fn remove_channel(&mut self, id: u8) -> Result<(), region::Error> {
        self.shared.mac.region.remove_channel(id)
    }

    /// Reverts the channel plan to the regional defaults.
    pub fn drop_channel_list(&mut self) {
        self.shared.mac.region.drop_channel_list()
    }

    pub fn get_enabled_channels(&self, out: &mut Vec<Channel, MAX_CHANNELS>) {
        self.shared.mac.region.enabled_channels(out)
    }

    /// Biases join attempts to one sub-band on the fixed grids.
    pub fn set_preferred_join_subband(&mut self, subband: u8) -> Result<(), region::Error> {
        self.shared.mac.region.set_preferred_join_subband(subband)
    }

    /// Selects the public or private LoRa sync word.
    pub fn set_public_network(&mut self, enabled: bool) {
        self.shared.radio.set_public_network(enabled)
    }

    pub fn get_radio(&mut self) -> &mut R {
        &mut self.shared.radio
    }

    pub fn get_session(&self) -> Option<&Session> {
        self.shared.mac.get_session()
    }

    pub fn set_session(&mut self, session: Session) {
        self.shared.mac.set_session(session);
        self.device_state = DeviceState::Idle;
    }

    pub fn get_session_keys(&self) -> Option<SessionKeys> {
        self.shared.mac.get_session().map(|s| s.keys())
    }

    pub fn get_fcnt_up(&self) -> Option<u32> {
        self.shared.mac.get_fcnt_up()
    }

    fn port_valid(&self, fport: u8) -> bool {
        match fport {
            1..=223 => true,
            // the test port opens up only while the compliance handler is
            // activated
            #[cfg(feature = "certification")]
            224 => self.certification.is_active(),
            _ => false,
        }
    }

    /// Runs a received test-port downlink through the compliance handler.
    #[cfg(feature = "certification")]
    fn process_certification_downlink(&mut self) {
        use mac::certification::ComplianceResponse;

        let Some(position) = self.shared.downlink.iter().position(|d| d.fport == 224) else {
            return;
        };
        let downlink = self.shared.downlink.remove(position);
        match self.certification.handle_downlink(&downlink.data) {
            // activation and deactivation show up through `device_state`
            ComplianceResponse::Activated | ComplianceResponse::Deactivated => {}
            ComplianceResponse::Reply(payload) => self.certification_uplink = Some(payload),
            ComplianceResponse::LinkCheck => self.shared.mac.queue_link_check(),
            ComplianceResponse::TxCw { timeout_ms } => {
                let frequency = self
                    .shared
                    .mac
                    .get_rx_config(&mac::Frame::Data, &mac::Window::_2)
                    .frequency;
                let _ = self.shared.radio.handle_event(radio::Event::TxContinuousWave {
                    frequency,
                    power_dbm: R::MAX_RADIO_POWER as i8,
                    timeout_ms,
                });
            }
            ComplianceResponse::NoUpdate => {}
        }
    }

    /// Payload the compliance handler wants sent on FPort 224, together
    /// with the confirmed-mode flag; the test harness drives the send.
    #[cfg(feature = "certification")]
    pub fn take_certification_uplink(&mut self) -> Option<(Vec<u8, 242>, bool)> {
        let confirmed = self.certification.confirmed_uplinks();
        self.certification_uplink.take().map(|payload| (payload, confirmed))
    }
}
