//! Parsing of LoRaWAN 1.0.2 MAC commands, uplink and downlink.
use core::marker::PhantomData;

use crate::types::{ChannelMask, DataRateRange, DLSettings, Frequency, Redundancy};

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error {
    UnknownMacCommand,
    BufferTooShort,
    InvalidIndex,
    InvalidDataRateRange,
}

/// A MAC command that can be written into FOpts or an FPort-0 payload.
pub trait SerializableMacCommand {
    fn payload_bytes(&self) -> &[u8];
    fn cid(&self) -> u8;
    fn payload_len(&self) -> usize;
}

/// Length in bytes of a command sequence, CIDs included.
pub fn mac_commands_len(cmds: &[&dyn SerializableMacCommand]) -> usize {
    cmds.iter().map(|mc| mc.payload_len() + 1).sum()
}

/// Iterator over the commands packed in a FOpts field or FPort-0 payload.
///
/// Stops at the first unknown CID, since the length of what follows can no
/// longer be established.
pub struct MacCommandIterator<'a, T> {
    data: &'a [u8],
    index: usize,
    item: PhantomData<T>,
}

impl<'a, T> MacCommandIterator<'a, T> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, index: 0, item: PhantomData }
    }
}

macro_rules! mac_cmd_zero_len {
    (
        $(
            $(#[$outer:meta])*
            struct $type:ident[cmd=$name:ident, cid=$cid:expr, uplink=$uplink:expr]
        )*
    ) => {
        $(
            $(#[$outer])*
            pub struct $type();

            impl $type {
                pub fn new(_: &[u8]) -> $type {
                    $type()
                }

                /// Mirror of the sized-command constructor.
                pub fn new_from_raw(_: &[u8]) -> $type {
                    $type()
                }

                pub const fn cid() -> u8 {
                    $cid
                }

                /// True when the command travels device to network.
                pub const fn uplink() -> bool {
                    $uplink
                }

                pub const fn len() -> usize {
                    0
                }

                pub fn bytes(&self) -> &[u8] {
                    &[]
                }
            }
        )*
    }
}

macro_rules! mac_cmds {
    (
        $(
            $(#[$outer:meta])*
            struct $type:ident[cmd=$name:ident, cid=$cid:expr, uplink=$uplink:expr, size=$size:expr]
        )*
    ) => {
        $(
            $(#[$outer])*
            pub struct $type<'a>(pub(crate) &'a [u8]);

            impl<'a> $type<'a> {
                /// Builds the view when `data` has exactly the payload size.
                pub fn new(data: &'a [u8]) -> Result<$type<'a>, Error> {
                    if data.len() != $size {
                        Err(Error::BufferTooShort)
                    } else {
                        Ok($type(data))
                    }
                }

                /// Builds the view without checking the length; the caller
                /// guarantees at least `len()` bytes.
                pub fn new_from_raw(data: &'a [u8]) -> $type<'a> {
                    $type(data)
                }

                pub const fn cid() -> u8 {
                    $cid
                }

                /// True when the command travels device to network.
                pub const fn uplink() -> bool {
                    $uplink
                }

                pub const fn len() -> usize {
                    $size
                }

                pub fn bytes(&self) -> &[u8] {
                    self.0
                }
            }
        )*
    }
}

macro_rules! mac_cmds_enum {
    (
        $outer_vis:vis enum $outer_type:ident$(<$outer_lifetime:lifetime>),* {
        $(
            $name:ident($type:ident$(<$lifetime:lifetime>),*)
        )*
    }
    ) => {
        #[derive(Debug, PartialEq)]
        #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
        #[allow(clippy::len_without_is_empty, missing_docs)]
        $outer_vis enum $outer_type$(<$outer_lifetime>)* {
            $(
                $name($type$(<$lifetime>)*),
            )*
        }

        impl$(<$outer_lifetime>)* $outer_type$(<$outer_lifetime>)* {
            pub fn len(&self) -> usize {
                match *self {
                    $(
                        Self::$name(_) => $type::len(),
                    )*
                }
            }

            pub fn uplink(&self) -> bool {
                match *self {
                    $(
                        Self::$name(_) => $type::uplink(),
                    )*
                }
            }

            pub fn bytes(&self) -> &[u8] {
                match *self {
                    $(
                        Self::$name(ref v) => v.bytes(),
                    )*
                }
            }
        }

        impl$(<$outer_lifetime>)* SerializableMacCommand for $outer_type$(<$outer_lifetime>)* {
            fn payload_bytes(&self) -> &[u8] {
                self.bytes()
            }

            fn cid(&self) -> u8 {
                match *self {
                    $(
                        Self::$name(_) => $type::cid(),
                    )*
                }
            }

            fn payload_len(&self) -> usize {
                self.len()
            }
        }

        impl$(<$outer_lifetime>)* Iterator for MacCommandIterator<$($outer_lifetime)*, $outer_type$(<$outer_lifetime>)*> {
            type Item = $outer_type$(<$outer_lifetime>)*;

            fn next(&mut self) -> Option<Self::Item> {
                if self.index < self.data.len() {
                    let data = &self.data[self.index..];
                    $(
                        if data[0] == $type::cid() && data.len() > $type::len() {
                            self.index += $type::len() + 1;
                            Some($outer_type::$name($type::new_from_raw(&data[1..1 + $type::len()])))
                        } else
                    )* {
                        None
                    }
                } else {
                    None
                }
            }
        }
    }
}

mac_cmds_enum! {
    pub enum DownlinkMacCommand<'a> {
        LinkCheckAns(LinkCheckAnsPayload<'a>)
        LinkADRReq(LinkADRReqPayload<'a>)
        DutyCycleReq(DutyCycleReqPayload<'a>)
        RXParamSetupReq(RXParamSetupReqPayload<'a>)
        DevStatusReq(DevStatusReqPayload)
        NewChannelReq(NewChannelReqPayload<'a>)
        RXTimingSetupReq(RXTimingSetupReqPayload<'a>)
        TXParamSetupReq(TXParamSetupReqPayload<'a>)
        DlChannelReq(DlChannelReqPayload<'a>)
    }
}

mac_cmds_enum! {
    pub enum UplinkMacCommand<'a> {
        LinkCheckReq(LinkCheckReqPayload)
        LinkADRAns(LinkADRAnsPayload<'a>)
        DutyCycleAns(DutyCycleAnsPayload)
        RXParamSetupAns(RXParamSetupAnsPayload<'a>)
        DevStatusAns(DevStatusAnsPayload<'a>)
        NewChannelAns(NewChannelAnsPayload<'a>)
        RXTimingSetupAns(RXTimingSetupAnsPayload)
        TXParamSetupAns(TXParamSetupAnsPayload)
        DlChannelAns(DlChannelAnsPayload<'a>)
    }
}

/// Parses `data` as a sequence of uplink MAC commands.
pub fn parse_uplink_mac_commands(data: &[u8]) -> MacCommandIterator<'_, UplinkMacCommand<'_>> {
    MacCommandIterator::new(data)
}

/// Parses `data` as a sequence of downlink MAC commands.
pub fn parse_downlink_mac_commands(data: &[u8]) -> MacCommandIterator<'_, DownlinkMacCommand<'_>> {
    MacCommandIterator::new(data)
}

mac_cmd_zero_len! {
    /// Requests a connectivity margin report from the network.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct LinkCheckReqPayload[cmd=LinkCheckReq, cid=0x02, uplink=true]

    /// Acknowledges a duty-cycle change.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct DutyCycleAnsPayload[cmd=DutyCycleAns, cid=0x04, uplink=true]

    /// Requests battery level and demodulation margin from the device.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct DevStatusReqPayload[cmd=DevStatusReq, cid=0x06, uplink=false]

    /// Acknowledges an RX1 delay change.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct RXTimingSetupAnsPayload[cmd=RXTimingSetupAns, cid=0x08, uplink=true]

    /// Acknowledges a dwell-time / EIRP change.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct TXParamSetupAnsPayload[cmd=TXParamSetupAns, cid=0x09, uplink=true]
}

mac_cmds! {
    /// Margin and gateway count answering a `LinkCheckReq`.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct LinkCheckAnsPayload[cmd=LinkCheckAns, cid=0x02, uplink=false, size=2]

    /// Network-commanded data rate, TX power and channel mask change.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct LinkADRReqPayload[cmd=LinkADRReq, cid=0x03, uplink=false, size=4]

    /// Per-field status answering a `LinkADRReq`.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct LinkADRAnsPayload[cmd=LinkADRAns, cid=0x03, uplink=true, size=1]

    /// Aggregated duty-cycle limitation.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct DutyCycleReqPayload[cmd=DutyCycleReq, cid=0x04, uplink=false, size=1]

    /// RX2 parameters and RX1 DR offset change.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct RXParamSetupReqPayload[cmd=RXParamSetupReq, cid=0x05, uplink=false, size=4]

    /// Per-field status answering a `RXParamSetupReq`.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct RXParamSetupAnsPayload[cmd=RXParamSetupAns, cid=0x05, uplink=true, size=1]

    /// Battery level and demodulation margin report.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct DevStatusAnsPayload[cmd=DevStatusAns, cid=0x06, uplink=true, size=2]

    /// Creation or modification of an uplink channel.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct NewChannelReqPayload[cmd=NewChannelReq, cid=0x07, uplink=false, size=5]

    /// Per-field status answering a `NewChannelReq`.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct NewChannelAnsPayload[cmd=NewChannelAns, cid=0x07, uplink=true, size=1]

    /// RX1 delay change.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct RXTimingSetupReqPayload[cmd=RXTimingSetupReq, cid=0x08, uplink=false, size=1]

    /// Dwell-time and max-EIRP change (regions that use it).
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct TXParamSetupReqPayload[cmd=TXParamSetupReq, cid=0x09, uplink=false, size=1]

    /// Downlink-frequency override for an uplink channel.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct DlChannelReqPayload[cmd=DlChannelReq, cid=0x0A, uplink=false, size=4]

    /// Per-field status answering a `DlChannelReq`; sticky until a
    /// downlink is received.
    #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
    #[derive(Debug, PartialEq, Eq)]
    struct DlChannelAnsPayload[cmd=DlChannelAns, cid=0x0A, uplink=true, size=1]
}

impl<'a> LinkCheckAnsPayload<'a> {
    /// Link margin in dB of the best-received last uplink, 0..=254.
    pub fn margin(&self) -> u8 {
        self.0[0]
    }

    /// Number of gateways that received the last uplink.
    pub fn gateway_count(&self) -> u8 {
        self.0[1]
    }
}

impl<'a> From<&'a [u8; 2]> for LinkCheckAnsPayload<'a> {
    fn from(v: &'a [u8; 2]) -> Self {
        LinkCheckAnsPayload(v)
    }
}

impl<'a> LinkADRReqPayload<'a> {
    /// Requested data rate index; 15 keeps the current one.
    pub fn data_rate(&self) -> u8 {
        self.0[0] >> 4
    }

    /// Requested TX power index; 15 keeps the current one.
    pub fn tx_power(&self) -> u8 {
        self.0[0] & 0x0f
    }

    /// The 16-channel mask block addressed by the redundancy's ChMaskCntl.
    pub fn channel_mask(&self) -> ChannelMask<2> {
        ChannelMask::new_from_raw(&self.0[1..3])
    }

    pub fn redundancy(&self) -> Redundancy {
        Redundancy::new(self.0[3])
    }
}

impl<'a> DutyCycleReqPayload<'a> {
    /// MaxDCycle exponent, 0..=15.
    pub fn max_duty_cycle(&self) -> u8 {
        self.0[0] & 0x0f
    }

    /// Aggregated duty cycle as the inverse `2^MaxDCycle`.
    pub fn aggregated_duty_cycle(&self) -> u16 {
        1 << (self.0[0] & 0x0f)
    }
}

impl<'a> RXParamSetupReqPayload<'a> {
    pub fn dl_settings(&self) -> DLSettings {
        DLSettings::new(self.0[0])
    }

    /// RX2 frequency in Hz.
    pub fn frequency(&self) -> Frequency<'_> {
        Frequency::new_from_raw(&self.0[1..4])
    }
}

impl<'a> NewChannelReqPayload<'a> {
    pub fn channel_index(&self) -> u8 {
        self.0[0]
    }

    /// Channel frequency in Hz; zero disables the channel.
    pub fn frequency(&self) -> Frequency<'_> {
        Frequency::new_from_raw(&self.0[1..4])
    }

    pub fn data_rate_range(&self) -> DataRateRange {
        DataRateRange::new_from_raw(self.0[4])
    }
}

impl<'a> RXTimingSetupReqPayload<'a> {
    /// RX1 delay in seconds, 0 meaning the default of 1.
    pub fn delay(&self) -> u8 {
        self.0[0] & 0x0f
    }
}

/// Coded max-EIRP values of `TXParamSetupReq`, in dBm.
const MAX_EIRP_TABLE: [u8; 16] = [8, 10, 12, 13, 14, 16, 18, 20, 21, 24, 26, 27, 29, 30, 33, 36];

impl<'a> TXParamSetupReqPayload<'a> {
    pub fn downlink_dwell_time(&self) -> bool {
        self.0[0] & 0x20 != 0
    }

    pub fn uplink_dwell_time(&self) -> bool {
        self.0[0] & 0x10 != 0
    }

    /// Decoded max EIRP in dBm.
    pub fn max_eirp(&self) -> u8 {
        MAX_EIRP_TABLE[(self.0[0] & 0x0f) as usize]
    }
}

impl<'a> DlChannelReqPayload<'a> {
    pub fn channel_index(&self) -> u8 {
        self.0[0]
    }

    /// Downlink frequency in Hz.
    pub fn frequency(&self) -> Frequency<'_> {
        Frequency::new_from_raw(&self.0[1..4])
    }
}

macro_rules! ans_status_bit {
    (
        $(#[$outer:meta])*
        $fn_name:ident, $offset:expr
    ) => {
        $(#[$outer])*
        pub fn $fn_name(&self) -> bool {
            self.0[0] & (0x01 << $offset) != 0
        }
    };
}

impl<'a> LinkADRAnsPayload<'a> {
    ans_status_bit!(
        /// Whether the requested channel mask was accepted.
        channel_mask_ack,
        0
    );
    ans_status_bit!(
        /// Whether the requested data rate was accepted.
        data_rate_ack,
        1
    );
    ans_status_bit!(
        /// Whether the requested TX power was accepted.
        power_ack,
        2
    );

    pub fn ack(&self) -> bool {
        self.0[0] == 0x07
    }
}

impl<'a> RXParamSetupAnsPayload<'a> {
    ans_status_bit!(channel_ack, 0);
    ans_status_bit!(rx2_data_rate_ack, 1);
    ans_status_bit!(rx1_dr_offset_ack, 2);

    pub fn ack(&self) -> bool {
        self.0[0] == 0x07
    }
}

impl<'a> DevStatusAnsPayload<'a> {
    /// Battery level: 0 external power, 1..=254 charge level, 255 unknown.
    pub fn battery(&self) -> u8 {
        self.0[0]
    }

    /// Demodulation margin of the last received `DevStatusReq`, -32..=31.
    pub fn margin(&self) -> i8 {
        ((self.0[1] << 2) as i8) >> 2
    }
}

impl<'a> NewChannelAnsPayload<'a> {
    ans_status_bit!(channel_freq_ack, 0);
    ans_status_bit!(data_rate_range_ack, 1);

    pub fn ack(&self) -> bool {
        self.0[0] == 0x03
    }
}

impl<'a> DlChannelAnsPayload<'a> {
    ans_status_bit!(channel_freq_ack, 0);
    ans_status_bit!(uplink_freq_exists_ack, 1);

    pub fn ack(&self) -> bool {
        self.0[0] == 0x03
    }
}
