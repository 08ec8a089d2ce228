//! The Class A transmit/receive cycle as an explicit state machine.
//!
//! ```text
//! O
//! │ Join / SendData
//! v            DutyCycleRestricted
//! ┌──────┐    ┌───────────────┐
//! │ Idle │───>│ WaitingToSend │──┐ TimeoutFired
//! └──────┘    └───────────────┘  │
//!    ^  │ channel free           v
//!    │  └──────────────────> ┌─────────────┐
//!    │                       │ SendingData │
//!    │                       └─────────────┘
//!    │                              │ TxDone (arm RX1)
//!    │                              v
//!    │   ┌────────────────────────────┐      ┌──────────────┐
//!    │   │ WaitingForRxWindow (1 → 2) │<─────│ WaitingForRx │
//!    │   └────────────────────────────┘ RX1  └──────────────┘
//!    │                                  timeout   │    │ RxDone
//!    │       RX2 timeout, retries left            │    v
//!    │<───────────────┐                           │  (Join accept /
//!    │                │                           │   downlink)
//!    │          ┌────────────┐     RX2 timeout,   │
//!    └──────────│ RetryDelay │<───── confirmed ───┘
//!   no retries  └────────────┘
//! ```
//!
//! Every transition returns a [`Response`]; `TimeoutRequest(t)` asks the
//! embedding work queue to fire `TimeoutFired` at `t`.
use super::radio::{self, PhyRxTx, Timings};
use super::{Error, Event, Response, Shared};
use crate::mac::{self, Frame, Window};
use crate::region;
use crate::region::constants::{ACK_TIMEOUT, ACK_TIMEOUT_RND, MAX_RX_WINDOW};
use crate::RngCore;
use lorawan_codec::keys::CryptoFactory;

#[derive(Copy, Clone, Debug)]
pub enum State {
    Idle(Idle),
    WaitingToSend(WaitingToSend),
    SendingData(SendingData),
    WaitingForRxWindow(WaitingForRxWindow),
    WaitingForRx(WaitingForRx),
    RetryDelay(RetryDelay),
}

macro_rules! into_state {
    ($($from:tt),*) => {
    $(
        impl From<$from> for State {
            fn from(s: $from) -> State {
                State::$from(s)
            }
        }
    )*};
}

into_state!(Idle, WaitingToSend, SendingData, WaitingForRxWindow, WaitingForRx, RetryDelay);

impl Default for State {
    fn default() -> Self {
        State::Idle(Idle)
    }
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum StateError {
    RadioEventWhileIdle,
    RadioEventWhileWaitingForTx,
    TxRequestDuringTx,
    BufferTooSmall,
    UnexpectedRadioResponse,
}

impl<R: PhyRxTx> From<StateError> for Error<R> {
    fn from(error: StateError) -> Error<R> {
        Error::State(error)
    }
}

#[derive(Copy, Clone, Debug)]
enum Rx {
    _1(u32),
    _2(u32),
}

impl From<Rx> for Window {
    fn from(val: Rx) -> Window {
        match val {
            Rx::_1(_) => Window::_1,
            Rx::_2(_) => Window::_2,
        }
    }
}

impl State {
    pub(crate) fn handle_event<
        R: PhyRxTx + Timings,
        C: CryptoFactory + Default,
        RNG: RngCore,
        const N: usize,
        const D: usize,
    >(
        self,
        shared: &mut Shared<R, RNG, N, D>,
        event: Event<'_, R>,
    ) -> (Self, Result<Response, Error<R>>) {
        match self {
            State::Idle(s) => s.handle_event::<R, C, RNG, N, D>(shared, event),
            State::WaitingToSend(s) => s.handle_event::<R, C, RNG, N, D>(shared, event),
            State::SendingData(s) => s.handle_event::<R, RNG, N, D>(shared, event),
            State::WaitingForRxWindow(s) => s.handle_event::<R, RNG, N, D>(shared, event),
            State::WaitingForRx(s) => s.handle_event::<R, C, RNG, N, D>(shared, event),
            State::RetryDelay(s) => s.handle_event::<R, C, RNG, N, D>(shared, event),
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Idle;

impl Idle {
    fn handle_event<
        R: PhyRxTx + Timings,
        C: CryptoFactory + Default,
        RNG: RngCore,
        const N: usize,
        const D: usize,
    >(
        self,
        shared: &mut Shared<R, RNG, N, D>,
        event: Event<'_, R>,
    ) -> (State, Result<Response, Error<R>>) {
        match event {
            Event::Join(creds, now_ms) => {
                shared.mac.join_otaa::<C, RNG, N>(&mut shared.rng, creds, &mut shared.tx_buffer);
                schedule_tx::<R, RNG, N, D>(shared, Frame::Join, now_ms)
            }
            Event::SendDataRequest(send_data, now_ms) => {
                match shared.mac.prepare_send::<C, N>(&mut shared.tx_buffer, &send_data) {
                    Ok(_fcnt) => schedule_tx::<R, RNG, N, D>(shared, Frame::Data, now_ms),
                    Err(e) => (State::Idle(self), Err(Error::Mac(e))),
                }
            }
            // tolerate a stale window-close timer
            Event::TimeoutFired(_) => (State::Idle(self), Ok(Response::NoUpdate)),
            Event::RadioEvent(..) => {
                (State::Idle(self), Err(StateError::RadioEventWhileIdle.into()))
            }
        }
    }
}

/// A transmission is ready but every candidate band is cooling down.
#[derive(Copy, Clone, Debug)]
pub struct WaitingToSend {
    frame: Frame,
}

impl WaitingToSend {
    fn handle_event<
        R: PhyRxTx + Timings,
        C: CryptoFactory + Default,
        RNG: RngCore,
        const N: usize,
        const D: usize,
    >(
        self,
        shared: &mut Shared<R, RNG, N, D>,
        event: Event<'_, R>,
    ) -> (State, Result<Response, Error<R>>) {
        match event {
            Event::TimeoutFired(now_ms) => {
                schedule_tx::<R, RNG, N, D>(shared, self.frame, now_ms)
            }
            Event::Join(..) | Event::SendDataRequest(..) => {
                (self.into(), Err(StateError::TxRequestDuringTx.into()))
            }
            Event::RadioEvent(..) => {
                (self.into(), Err(StateError::RadioEventWhileWaitingForTx.into()))
            }
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct SendingData {
    frame: Frame,
    channel: u8,
    time_on_air_ms: u32,
}

impl SendingData {
    fn handle_event<R: PhyRxTx + Timings, RNG: RngCore, const N: usize, const D: usize>(
        self,
        shared: &mut Shared<R, RNG, N, D>,
        event: Event<'_, R>,
    ) -> (State, Result<Response, Error<R>>) {
        match event {
            Event::RadioEvent(radio_event, _now) => {
                match shared.radio.handle_event(radio_event) {
                    Ok(radio::Response::TxDone(ms)) => {
                        shared.mac.register_tx_done(
                            self.channel,
                            &self.frame,
                            ms,
                            self.time_on_air_ms,
                        );
                        open_rx1::<R, RNG, N, D>(shared, self.frame, ms)
                    }
                    Ok(radio::Response::TxTimeout) => {
                        (State::Idle(Idle), Ok(Response::TxTimeout))
                    }
                    Ok(_) => (self.into(), Ok(Response::NoUpdate)),
                    Err(e) => (self.into(), Err(Error::Radio(e))),
                }
            }
            // tolerate a stale timer
            Event::TimeoutFired(_) => (self.into(), Ok(Response::NoUpdate)),
            Event::Join(..) | Event::SendDataRequest(..) => {
                (self.into(), Err(StateError::TxRequestDuringTx.into()))
            }
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct WaitingForRxWindow {
    frame: Frame,
    window: Rx,
}

impl WaitingForRxWindow {
    fn handle_event<R: PhyRxTx + Timings, RNG: RngCore, const N: usize, const D: usize>(
        self,
        shared: &mut Shared<R, RNG, N, D>,
        event: Event<'_, R>,
    ) -> (State, Result<Response, Error<R>>) {
        match event {
            Event::TimeoutFired(_) => {
                let window = Window::from(self.window);
                let (symbols, _) = shared.mac.get_rx_window_params(
                    &self.frame,
                    &window,
                    shared.radio.get_rx_error_ms(),
                    shared.radio.get_wake_up_time_ms(),
                );
                let rf = shared.mac.get_rx_config(&self.frame, &window);
                let rx_config =
                    radio::RxConfig { rf, mode: radio::RxMode::Single { symbols } };
                match shared.radio.handle_event(radio::Event::RxRequest(rx_config)) {
                    Ok(_) => {
                        // a fallback close timer in case the radio never
                        // reports its own timeout
                        let window_close = match self.window {
                            Rx::_1(t1) => {
                                let between = shared.mac.get_rx_delay(&self.frame, &Window::_2)
                                    - shared.mac.get_rx_delay(&self.frame, &Window::_1);
                                t1 + between
                            }
                            Rx::_2(t2) => t2 + MAX_RX_WINDOW,
                        };
                        (
                            State::WaitingForRx(WaitingForRx {
                                frame: self.frame,
                                window: self.window,
                            }),
                            Ok(Response::TimeoutRequest(window_close)),
                        )
                    }
                    Err(e) => (self.into(), Err(Error::Radio(e))),
                }
            }
            Event::RadioEvent(..) => (self.into(), Ok(Response::NoUpdate)),
            Event::Join(..) | Event::SendDataRequest(..) => {
                (self.into(), Err(StateError::TxRequestDuringTx.into()))
            }
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct WaitingForRx {
    frame: Frame,
    window: Rx,
}

impl WaitingForRx {
    fn handle_event<
        R: PhyRxTx + Timings,
        C: CryptoFactory + Default,
        RNG: RngCore,
        const N: usize,
        const D: usize,
    >(
        self,
        shared: &mut Shared<R, RNG, N, D>,
        event: Event<'_, R>,
    ) -> (State, Result<Response, Error<R>>) {
        match event {
            Event::RadioEvent(radio_event, now_ms) => {
                match shared.radio.handle_event(radio_event) {
                    Ok(radio::Response::RxDone(quality)) => {
                        shared.rx_buffer.clear();
                        if shared
                            .rx_buffer
                            .extend_from_slice(shared.radio.get_received_packet())
                            .is_err()
                        {
                            return (self.into(), Err(StateError::BufferTooSmall.into()));
                        }
                        let rx_slot = match self.window {
                            Rx::_1(_) => 1,
                            Rx::_2(_) => 2,
                        };
                        match shared.mac.handle_rx::<C, N, D>(
                            &mut shared.rx_buffer,
                            &mut shared.downlink,
                            quality,
                            rx_slot,
                        ) {
                            // stray packet, keep listening
                            mac::Response::NoUpdate => {
                                (self.into(), Ok(Response::NoUpdate))
                            }
                            mac::Response::JoinSuccess => {
                                (State::Idle(Idle), Ok(Response::Connected))
                            }
                            mac::Response::DownlinkReceived { fcnt, acknowledged } => {
                                shared.tx_attempt = 1;
                                (
                                    State::Idle(Idle),
                                    Ok(Response::DownlinkReceived { fcnt, acknowledged }),
                                )
                            }
                            mac::Response::SessionExpired => {
                                (State::Idle(Idle), Ok(Response::SessionExpired))
                            }
                            _ => (State::Idle(Idle), Ok(Response::NoUpdate)),
                        }
                    }
                    Ok(radio::Response::RxTimeout) | Ok(radio::Response::RxError) => {
                        self.close_window::<R, C, RNG, N, D>(shared, now_ms)
                    }
                    Ok(_) => (self.into(), Ok(Response::NoUpdate)),
                    Err(e) => (self.into(), Err(Error::Radio(e))),
                }
            }
            Event::TimeoutFired(now_ms) => {
                if let Err(e) = shared.radio.handle_event(radio::Event::CancelRx) {
                    return (self.into(), Err(Error::Radio(e)));
                }
                self.close_window::<R, C, RNG, N, D>(shared, now_ms)
            }
            Event::Join(..) | Event::SendDataRequest(..) => {
                (self.into(), Err(StateError::TxRequestDuringTx.into()))
            }
        }
    }

    fn close_window<
        R: PhyRxTx + Timings,
        C: CryptoFactory + Default,
        RNG: RngCore,
        const N: usize,
        const D: usize,
    >(
        self,
        shared: &mut Shared<R, RNG, N, D>,
        now_ms: u32,
    ) -> (State, Result<Response, Error<R>>) {
        match self.window {
            Rx::_1(t1) => {
                let between = shared.mac.get_rx_delay(&self.frame, &Window::_2)
                    - shared.mac.get_rx_delay(&self.frame, &Window::_1);
                let (_, offset) = shared.mac.get_rx_window_params(
                    &self.frame,
                    &Window::_2,
                    shared.radio.get_rx_error_ms(),
                    shared.radio.get_wake_up_time_ms(),
                );
                let t2 = (t1 as i64 + between as i64 + offset as i64) as u32;
                (
                    State::WaitingForRxWindow(WaitingForRxWindow {
                        frame: self.frame,
                        window: Rx::_2(t2),
                    }),
                    Ok(Response::TimeoutRequest(t2)),
                )
            }
            Rx::_2(_) => complete_rx2::<R, C, RNG, N, D>(shared, self.frame, now_ms),
        }
    }
}

/// Confirmed retransmission pending its ACK-timeout delay.
#[derive(Copy, Clone, Debug)]
pub struct RetryDelay {
    frame: Frame,
}

impl RetryDelay {
    fn handle_event<
        R: PhyRxTx + Timings,
        C: CryptoFactory + Default,
        RNG: RngCore,
        const N: usize,
        const D: usize,
    >(
        self,
        shared: &mut Shared<R, RNG, N, D>,
        event: Event<'_, R>,
    ) -> (State, Result<Response, Error<R>>) {
        match event {
            Event::TimeoutFired(now_ms) => {
                schedule_tx::<R, RNG, N, D>(shared, self.frame, now_ms)
            }
            Event::RadioEvent(..) => (self.into(), Ok(Response::NoUpdate)),
            Event::Join(..) | Event::SendDataRequest(..) => {
                (self.into(), Err(StateError::TxRequestDuringTx.into()))
            }
        }
    }
}

/// Picks a channel (probing for a free one in listen-before-talk regions)
/// and hands the prepared frame to the radio.
fn schedule_tx<R: PhyRxTx + Timings, RNG: RngCore, const N: usize, const D: usize>(
    shared: &mut Shared<R, RNG, N, D>,
    frame: Frame,
    now_ms: u32,
) -> (State, Result<Response, Error<R>>) {
    let mut busy: heapless::Vec<u8, 16> = heapless::Vec::new();
    loop {
        match shared.mac.select_channel(&mut shared.rng, &frame, now_ms, &busy) {
            Ok(channel) => {
                if let Some(lbt) = channel.lbt {
                    match shared.radio.perform_carrier_sense(channel.frequency, lbt) {
                        Ok(true) => {}
                        Ok(false) => {
                            if busy.push(channel.index).is_err() {
                                return (State::Idle(Idle), Ok(Response::TxSchedulingError));
                            }
                            continue;
                        }
                        Err(e) => return (State::Idle(Idle), Err(Error::Radio(e))),
                    }
                }

                let tx_config = shared.mac.create_tx_config(&channel, &frame);
                let len = shared.tx_buffer.as_ref_for_read().len();
                let time_on_air_ms =
                    tx_config.rf.bb.time_on_air_us(Some(8), true, len as u8).div_ceil(1000);
                let sending = match frame {
                    Frame::Join => Response::JoinRequestSending,
                    Frame::Data => {
                        Response::UplinkSending(shared.mac.get_fcnt_up().unwrap_or(0))
                    }
                };
                let event =
                    radio::Event::TxRequest(tx_config, shared.tx_buffer.as_ref_for_read());
                return match shared.radio.handle_event(event) {
                    Ok(radio::Response::Txing) => (
                        State::SendingData(SendingData {
                            frame,
                            channel: channel.index,
                            time_on_air_ms,
                        }),
                        Ok(sending),
                    ),
                    Ok(radio::Response::TxDone(ms)) => {
                        shared.mac.register_tx_done(channel.index, &frame, ms, time_on_air_ms);
                        open_rx1::<R, RNG, N, D>(shared, frame, ms)
                    }
                    Ok(_) => {
                        (State::Idle(Idle), Err(StateError::UnexpectedRadioResponse.into()))
                    }
                    Err(e) => (State::Idle(Idle), Err(Error::Radio(e))),
                };
            }
            Err(region::Error::DutyCycleRestricted { delay_ms }) => {
                debug!("duty cycle restricted, backing off {} ms", delay_ms);
                return (
                    State::WaitingToSend(WaitingToSend { frame }),
                    Ok(Response::TimeoutRequest(now_ms.wrapping_add(delay_ms))),
                );
            }
            Err(region::Error::NoChannelFound) => {
                // the mask may simply exclude this datarate; try a slower one
                if matches!(frame, Frame::Data)
                    && shared.mac.lower_data_rate_if_fits(shared.pending_payload_len)
                {
                    continue;
                }
                return (State::Idle(Idle), Ok(Response::TxSchedulingError));
            }
            Err(_) => return (State::Idle(Idle), Ok(Response::TxSchedulingError)),
        }
    }
}

/// Arms the timer for RX1, `wake_up + drift` early.
fn open_rx1<R: PhyRxTx + Timings, RNG: RngCore, const N: usize, const D: usize>(
    shared: &mut Shared<R, RNG, N, D>,
    frame: Frame,
    tx_done_ms: u32,
) -> (State, Result<Response, Error<R>>) {
    let delay = shared.mac.get_rx_delay(&frame, &Window::_1);
    let (_, offset) = shared.mac.get_rx_window_params(
        &frame,
        &Window::_1,
        shared.radio.get_rx_error_ms(),
        shared.radio.get_wake_up_time_ms(),
    );
    let t1 = (tx_done_ms as i64 + delay as i64 + offset as i64) as u32;
    trace!("RX1 arms at {}", t1);
    (
        State::WaitingForRxWindow(WaitingForRxWindow { frame, window: Rx::_1(t1) }),
        Ok(Response::TimeoutRequest(t1)),
    )
}

/// Both windows of the uplink closed empty.
fn complete_rx2<
    R: PhyRxTx + Timings,
    C: CryptoFactory + Default,
    RNG: RngCore,
    const N: usize,
    const D: usize,
>(
    shared: &mut Shared<R, RNG, N, D>,
    frame: Frame,
    now_ms: u32,
) -> (State, Result<Response, Error<R>>) {
    match frame {
        Frame::Join => {
            let _ = shared.mac.rx2_complete(false);
            if shared.join_retries_left > 0 {
                shared.join_retries_left -= 1;
                shared
                    .mac
                    .join_retry::<C, RNG, N>(&mut shared.rng, &mut shared.tx_buffer);
                schedule_tx::<R, RNG, N, D>(shared, Frame::Join, now_ms)
            } else {
                (State::Idle(Idle), Ok(Response::JoinFailure))
            }
        }
        Frame::Data => {
            let will_retry = shared.mac.ack_pending() && shared.data_retries_left > 0;
            match shared.mac.rx2_complete(will_retry) {
                mac::Response::NoAck if will_retry => {
                    debug!("no ack, retransmitting ({} retries left)", shared.data_retries_left);
                    shared.data_retries_left -= 1;
                    shared.tx_attempt = shared.tx_attempt.saturating_add(1);
                    // shed a datarate step every second attempt, payload
                    // size permitting
                    if shared.tx_attempt % 2 == 1 {
                        shared.mac.lower_data_rate_if_fits(shared.pending_payload_len);
                    }
                    let jitter = shared.rng.next_u32() % (2 * ACK_TIMEOUT_RND + 1);
                    let delay = ACK_TIMEOUT - ACK_TIMEOUT_RND + jitter;
                    (
                        State::RetryDelay(RetryDelay { frame }),
                        Ok(Response::TimeoutRequest(now_ms.wrapping_add(delay))),
                    )
                }
                mac::Response::NoAck => (State::Idle(Idle), Ok(Response::NoAck)),
                mac::Response::SessionExpired => {
                    (State::Idle(Idle), Ok(Response::SessionExpired))
                }
                _ => {
                    shared.tx_attempt = 1;
                    (State::Idle(Idle), Ok(Response::TxDone))
                }
            }
        }
    }
}
