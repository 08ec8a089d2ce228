use super::TimestampMs;
pub use crate::radio::*;
pub use lora_modulation::{Bandwidth, CodingRate, SpreadingFactor};

use core::fmt;

#[derive(Debug)]
pub enum Event<'a, R>
where
    R: PhyRxTx,
{
    TxRequest(TxConfig, &'a [u8]),
    RxRequest(RxConfig),
    CancelRx,
    /// Unmodulated carrier for the compliance test modes.
    TxContinuousWave { frequency: u32, power_dbm: i8, timeout_ms: u32 },
    Phy(R::PhyEvent),
}

#[derive(Debug)]
pub enum Response<R>
where
    R: PhyRxTx,
{
    Idle,
    Txing,
    Rxing,
    TxDone(TimestampMs),
    RxDone(RxQuality),
    RxTimeout,
    RxError,
    TxTimeout,
    Phy(R::PhyResponse),
}

/// The radio driver as the MAC sees it: an event-driven transmitter and
/// receiver plus the synchronous carrier-sense probe used by
/// listen-before-talk regions.
pub trait PhyRxTx {
    type PhyEvent: fmt::Debug;
    type PhyError: fmt::Debug;
    type PhyResponse: fmt::Debug;

    /// Board-specific antenna gain and power loss in dBi.
    const ANTENNA_GAIN: i8 = 0;

    /// Maximum power (dBm) the radio is able to output; used as an upper
    /// bound on the regional ladder.
    const MAX_RADIO_POWER: u8;

    // mutable access so the MAC may decrypt in place
    fn get_received_packet(&mut self) -> &mut [u8];

    fn handle_event(&mut self, event: Event<'_, Self>) -> Result<Response<Self>, Self::PhyError>
    where
        Self: Sized;

    /// Probes `frequency` for `lbt.sense_time_ms`; true when no carrier
    /// above `lbt.rssi_threshold_dbm` was heard. Radios in regions without
    /// listen-before-talk never get called and may keep the default.
    fn perform_carrier_sense(
        &mut self,
        _frequency: u32,
        _lbt: LbtConfig,
    ) -> Result<bool, Self::PhyError> {
        Ok(true)
    }

    /// Whether the frontend can tune to `frequency` at all.
    fn check_rf_frequency(&mut self, _frequency: u32) -> bool {
        true
    }

    /// Selects the public or private sync word.
    fn set_public_network(&mut self, _enabled: bool) {}
}

/// Board-level timing budget for opening receive windows.
pub trait Timings {
    /// Worst-case local clock error accumulated over a receive delay, in
    /// milliseconds. The window timeout is widened to absorb it.
    fn get_rx_error_ms(&self) -> u32 {
        10
    }

    /// Lead time between a timer firing and the radio actually listening,
    /// in milliseconds. The window is armed this much earlier.
    fn get_wake_up_time_ms(&self) -> u32 {
        2
    }
}
