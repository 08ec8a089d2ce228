#![allow(dead_code)]
use lora_modulation::{Bandwidth, CodingRate, SpreadingFactor};

pub(crate) const RECEIVE_DELAY1: u32 = 1000;
pub(crate) const RECEIVE_DELAY2: u32 = RECEIVE_DELAY1 + 1000; // must be RECEIVE_DELAY1 + 1 s
pub(crate) const JOIN_ACCEPT_DELAY1: u32 = 5000;
pub(crate) const JOIN_ACCEPT_DELAY2: u32 = 6000;
pub(crate) const MAX_FCNT_GAP: u32 = 16384;
pub(crate) const ADR_ACK_LIMIT: u32 = 64;
pub(crate) const ADR_ACK_DELAY: u32 = 32;
pub(crate) const ACK_TIMEOUT: u32 = 2000;
pub(crate) const ACK_TIMEOUT_RND: u32 = 1000;
/// Upper bound on how long a receive window may stay open.
pub(crate) const MAX_RX_WINDOW: u32 = 3000;

/// Preamble symbols the radio listens for at minimum when a window opens.
pub(crate) const MIN_RX_SYMBOLS: u8 = 6;

pub(crate) const DEFAULT_BANDWIDTH: Bandwidth = Bandwidth::_125KHz;
pub(crate) const DEFAULT_SPREADING_FACTOR: SpreadingFactor = SpreadingFactor::_7;
pub(crate) const DEFAULT_CODING_RATE: CodingRate = CodingRate::_4_5;
pub(crate) const DEFAULT_DBM: i8 = 14;

/// Aggregated duty-cycle schedule for unjoined devices: allowed airtime per
/// sliding interval, expressed as inverse duty cycles.
pub(crate) const JOIN_BACKOFF_FIRST_HOUR_INVERSE: u32 = 100; // 36 s in the first hour
pub(crate) const JOIN_BACKOFF_NEXT_10_HOURS_INVERSE: u32 = 1000; // 36 s over the next 10 h
pub(crate) const JOIN_BACKOFF_STEADY_INVERSE: u32 = 10000; // 8.7 s per 24 h thereafter

pub(crate) const HOUR_MS: u32 = 3_600_000;
