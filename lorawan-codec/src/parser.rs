//! Zero-copy views over LoRaWAN PHY payloads.
//!
//! [`parse`](fn@parse) classifies a byte slice as a join request, join
//! accept or data frame; the resulting types expose field accessors, MIC
//! validation and in-place decryption without copying the frame.
use crate::keys::{AppKey, AppSKey, CryptoFactory, Encrypter, NwkSKey, AES128, MIC};
use crate::maccommands::{DownlinkMacCommand, MacCommandIterator};
use crate::securityhelpers;
use crate::types::{ChannelMask, DLSettings, Frequency};

#[cfg(feature = "default-crypto")]
use crate::default_crypto::DefaultFactory;

pub(crate) const MHDR_LEN: usize = 1;
pub(crate) const MIC_LEN: usize = 4;
/// MHDR + bare FHDR + MIC.
pub(crate) const DATA_MIN_LEN: usize = 12;
pub(crate) const JOIN_REQUEST_LEN: usize = 23;
pub(crate) const JOIN_ACCEPT_LEN: usize = 17;
pub(crate) const JOIN_ACCEPT_WITH_CFLIST_LEN: usize = 33;

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error {
    InvalidData,
    InvalidMic,
    InvalidMessageType,
    /// FOptsLen points past the end of the frame.
    InvalidFOptsLen,
    UnsupportedMajorVersion,
    /// Decryption was requested without the key the FPort calls for.
    MissingKey,
}

macro_rules! fixed_len_struct {
    (
        $(#[$outer:meta])*
        struct $type:ident[$size:expr];
    ) => {
        $(#[$outer])*
        #[derive(Debug, Eq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
        pub struct $type<T: AsRef<[u8]>>(T);

        impl<T: AsRef<[u8]>> $type<T> {
            fn new_from_raw(bytes: T) -> $type<T> {
                $type(bytes)
            }

            pub fn new(data: T) -> Option<$type<T>> {
                if data.as_ref().len() != $size {
                    None
                } else {
                    Some($type(data))
                }
            }
        }

        impl<T: AsRef<[u8]> + Clone> Clone for $type<T> {
            fn clone(&self) -> Self {
                Self(self.0.clone())
            }
        }

        impl<T: AsRef<[u8]> + Copy> Copy for $type<T> {}

        impl<T: AsRef<[u8]>, V: AsRef<[u8]>> PartialEq<$type<T>> for $type<V> {
            fn eq(&self, other: &$type<T>) -> bool {
                self.as_ref() == other.as_ref()
            }
        }

        impl<'a> From<&'a [u8; $size]> for $type<&'a [u8; $size]> {
            fn from(v: &'a [u8; $size]) -> Self {
                $type(v)
            }
        }

        impl From<[u8; $size]> for $type<[u8; $size]> {
            fn from(v: [u8; $size]) -> Self {
                $type(v)
            }
        }

        impl<T: AsRef<[u8]>> AsRef<[u8]> for $type<T> {
            fn as_ref(&self) -> &[u8] {
                self.0.as_ref()
            }
        }

        impl<T: AsRef<[u8]>> $type<T> {
            #[inline]
            pub fn to_owned(&self) -> $type<[u8; $size]> {
                let mut data = [0u8; $size];
                data.copy_from_slice(self.0.as_ref());
                $type(data)
            }
        }
    };
}

fixed_len_struct! {
    /// An IEEE-like 64-bit extended identifier, LSB-first as on the wire.
    struct EUI64[8];
}

fixed_len_struct! {
    /// The 2-byte join nonce drawn by the device, LSB-first.
    struct DevNonce[2];
}

impl From<u16> for DevNonce<[u8; 2]> {
    fn from(v: u16) -> Self {
        DevNonce(v.to_le_bytes())
    }
}

impl<T: AsRef<[u8]>> From<DevNonce<T>> for u16 {
    fn from(v: DevNonce<T>) -> Self {
        let d = v.as_ref();
        u16::from_le_bytes([d[0], d[1]])
    }
}

fixed_len_struct! {
    /// The 3-byte server nonce of the join accept.
    struct AppNonce[3];
}

fixed_len_struct! {
    /// The 3-byte network identifier of the join accept.
    struct NwkAddr[3];
}

fixed_len_struct! {
    /// The 4-byte device address, LSB-first as on the wire.
    struct DevAddr[4];
}

impl<T: AsRef<[u8]>> DevAddr<T> {
    pub fn nwk_id(&self) -> u8 {
        self.0.as_ref()[3] >> 1
    }
}

impl From<u32> for DevAddr<[u8; 4]> {
    fn from(v: u32) -> Self {
        DevAddr(v.to_le_bytes())
    }
}

impl<T: AsRef<[u8]>> From<DevAddr<T>> for u32 {
    fn from(v: DevAddr<T>) -> Self {
        u32::from_le_bytes(v.as_ref().try_into().unwrap())
    }
}

/// The message type carried by the MHDR.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum MType {
    JoinRequest,
    JoinAccept,
    UnconfirmedDataUp,
    UnconfirmedDataDown,
    ConfirmedDataUp,
    ConfirmedDataDown,
    RFU,
    Proprietary,
}

/// The MAC header octet.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MHDR(pub u8);

impl MHDR {
    pub fn new(byte: u8) -> MHDR {
        MHDR(byte)
    }

    pub fn mtype(&self) -> MType {
        match self.0 >> 5 {
            0 => MType::JoinRequest,
            1 => MType::JoinAccept,
            2 => MType::UnconfirmedDataUp,
            3 => MType::UnconfirmedDataDown,
            4 => MType::ConfirmedDataUp,
            5 => MType::ConfirmedDataDown,
            6 => MType::RFU,
            _ => MType::Proprietary,
        }
    }

    pub fn major(&self) -> u8 {
        self.0 & 0x03
    }
}

impl From<u8> for MHDR {
    fn from(v: u8) -> Self {
        MHDR(v)
    }
}

/// The frame control octet of the FHDR.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct FCtrl(pub u8, pub bool);

impl FCtrl {
    pub fn new(byte: u8, uplink: bool) -> FCtrl {
        FCtrl(byte, uplink)
    }

    pub fn set_adr(&mut self) {
        self.0 |= 0x80;
    }

    pub fn adr(&self) -> bool {
        self.0 & 0x80 != 0
    }

    pub fn set_adr_ack_req(&mut self) {
        self.0 |= 0x40;
    }

    /// Uplink only.
    pub fn adr_ack_req(&self) -> bool {
        self.1 && self.0 & 0x40 != 0
    }

    pub fn set_ack(&mut self) {
        self.0 |= 0x20;
    }

    pub fn ack(&self) -> bool {
        self.0 & 0x20 != 0
    }

    /// Downlink only: more frames are queued for the device.
    pub fn f_pending(&self) -> bool {
        !self.1 && self.0 & 0x10 != 0
    }

    pub fn f_opts_len(&self) -> u8 {
        self.0 & 0x0f
    }

    pub fn raw_value(&self) -> u8 {
        self.0
    }
}

/// View over the frame header of a data payload.
#[derive(Debug, PartialEq, Eq)]
pub struct FHDR<'a>(&'a [u8], bool);

impl<'a> FHDR<'a> {
    pub fn new_from_raw(bytes: &'a [u8], uplink: bool) -> FHDR<'a> {
        FHDR(bytes, uplink)
    }

    pub fn new(bytes: &'a [u8], uplink: bool) -> Option<FHDR<'a>> {
        let len = bytes.len();
        if len < 7 {
            return None;
        }
        if len < 7 + (bytes[4] & 0x0f) as usize {
            return None;
        }
        Some(FHDR(bytes, uplink))
    }

    pub fn dev_addr(&self) -> DevAddr<&'a [u8]> {
        DevAddr::new_from_raw(&self.0[0..4])
    }

    pub fn fctrl(&self) -> FCtrl {
        FCtrl(self.0[4], self.1)
    }

    /// The 16-bit counter as sent on the wire.
    pub fn fcnt(&self) -> u16 {
        u16::from_le_bytes([self.0[5], self.0[6]])
    }

    pub fn fopts(&self) -> MacCommandIterator<'a, DownlinkMacCommand<'a>> {
        MacCommandIterator::new(self.data())
    }

    /// The raw FOpts bytes.
    pub fn data(&self) -> &'a [u8] {
        let f_opts_len = (self.0[4] & 0x0f) as usize;
        &self.0[7..7 + f_opts_len]
    }
}

/// Any LoRaWAN PHY payload.
#[derive(Debug, PartialEq, Eq)]
pub enum PhyPayload<T, F> {
    JoinRequest(JoinRequestPayload<T, F>),
    JoinAccept(JoinAcceptPayload<T, F>),
    Data(DataPayload<T, F>),
}

impl<T: AsRef<[u8]> + AsMut<[u8]>, F: CryptoFactory> PhyPayload<T, F> {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PhyPayload::JoinRequest(jr) => jr.as_bytes(),
            PhyPayload::JoinAccept(JoinAcceptPayload::Encrypted(ja)) => ja.as_bytes(),
            PhyPayload::JoinAccept(JoinAcceptPayload::Decrypted(ja)) => ja.as_bytes(),
            PhyPayload::Data(DataPayload::Encrypted(d)) => d.as_bytes(),
            PhyPayload::Data(DataPayload::Decrypted(d)) => d.as_bytes(),
        }
    }
}

/// A join accept in either crypto state.
#[derive(Debug, PartialEq, Eq)]
pub enum JoinAcceptPayload<T, F> {
    Encrypted(EncryptedJoinAcceptPayload<T, F>),
    Decrypted(DecryptedJoinAcceptPayload<T, F>),
}

/// A data frame in either crypto state.
#[derive(Debug, PartialEq, Eq)]
pub enum DataPayload<T, F> {
    Encrypted(EncryptedDataPayload<T, F>),
    Decrypted(DecryptedDataPayload<T>),
}

/// Classifies `data` and wraps it in the matching payload view.
///
/// The slice must be mutable because join accepts and data frames are
/// later decrypted in place.
pub fn parse_with_factory<T, F>(data: T, factory: F) -> Result<PhyPayload<T, F>, Error>
where
    T: AsRef<[u8]> + AsMut<[u8]>,
    F: CryptoFactory,
{
    let bytes = data.as_ref();
    if bytes.is_empty() {
        return Err(Error::InvalidData);
    }
    let mhdr = MHDR(bytes[0]);
    if mhdr.major() != 0 {
        return Err(Error::UnsupportedMajorVersion);
    }
    match mhdr.mtype() {
        MType::JoinRequest => Ok(PhyPayload::JoinRequest(JoinRequestPayload::new_with_factory(
            data, factory,
        )?)),
        MType::JoinAccept => Ok(PhyPayload::JoinAccept(JoinAcceptPayload::Encrypted(
            EncryptedJoinAcceptPayload::new_with_factory(data, factory)?,
        ))),
        MType::UnconfirmedDataUp
        | MType::UnconfirmedDataDown
        | MType::ConfirmedDataUp
        | MType::ConfirmedDataDown => Ok(PhyPayload::Data(DataPayload::Encrypted(
            EncryptedDataPayload::new_with_factory(data, factory)?,
        ))),
        _ => Err(Error::InvalidMessageType),
    }
}

/// [`parse_with_factory`] with the software crypto implementation.
#[cfg(feature = "default-crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "default-crypto")))]
pub fn parse<T: AsRef<[u8]> + AsMut<[u8]>>(data: T) -> Result<PhyPayload<T, DefaultFactory>, Error> {
    parse_with_factory(data, DefaultFactory)
}

/// A received join request (parsed on the device side only in tests and
/// tooling; devices emit these through the creator).
#[derive(Debug, PartialEq, Eq)]
pub struct JoinRequestPayload<T, F>(T, F);

impl<T: AsRef<[u8]>, F: CryptoFactory> JoinRequestPayload<T, F> {
    pub fn new_with_factory(data: T, factory: F) -> Result<Self, Error> {
        {
            let bytes = data.as_ref();
            if bytes.len() != JOIN_REQUEST_LEN || MHDR(bytes[0]).mtype() != MType::JoinRequest {
                return Err(Error::InvalidData);
            }
        }
        Ok(Self(data, factory))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    pub fn app_eui(&self) -> EUI64<&[u8]> {
        EUI64::new_from_raw(&self.0.as_ref()[1..9])
    }

    pub fn dev_eui(&self) -> EUI64<&[u8]> {
        EUI64::new_from_raw(&self.0.as_ref()[9..17])
    }

    pub fn dev_nonce(&self) -> DevNonce<&[u8]> {
        DevNonce::new_from_raw(&self.0.as_ref()[17..19])
    }

    pub fn mic(&self) -> MIC {
        parsed_mic(self.0.as_ref())
    }

    pub fn validate_mic(&self, key: &AES128) -> bool {
        let d = self.0.as_ref();
        self.mic()
            == securityhelpers::calculate_mic(&d[..d.len() - MIC_LEN], self.1.new_mac(key))
    }
}

fn parsed_mic(data: &[u8]) -> MIC {
    let len = data.len();
    MIC([data[len - 4], data[len - 3], data[len - 2], data[len - 1]])
}

/// A join accept as received, still encrypted under the AppKey.
#[derive(Debug, PartialEq, Eq)]
pub struct EncryptedJoinAcceptPayload<T, F>(T, F);

impl<T: AsRef<[u8]> + AsMut<[u8]>, F: CryptoFactory> EncryptedJoinAcceptPayload<T, F> {
    pub fn new_with_factory(data: T, factory: F) -> Result<Self, Error> {
        {
            let bytes = data.as_ref();
            if (bytes.len() != JOIN_ACCEPT_LEN && bytes.len() != JOIN_ACCEPT_WITH_CFLIST_LEN)
                || MHDR(bytes[0]).mtype() != MType::JoinAccept
            {
                return Err(Error::InvalidData);
            }
        }
        Ok(Self(data, factory))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Decrypts the payload in place.
    ///
    /// The network server encrypts the join accept with an AES *decrypt*
    /// operation so that devices only ever need the encrypt primitive.
    pub fn decrypt(mut self, key: &AppKey) -> DecryptedJoinAcceptPayload<T, F> {
        {
            let aes = self.1.new_enc(&key.0);
            let bytes = self.0.as_mut();
            let len = bytes.len();
            for block in bytes[MHDR_LEN..len].chunks_exact_mut(16) {
                aes.encrypt_block(generic_array::GenericArray::from_mut_slice(block));
            }
        }
        DecryptedJoinAcceptPayload(self.0, self.1)
    }
}

/// A join accept after decryption; field accessors and key derivation.
#[derive(Debug, PartialEq, Eq)]
pub struct DecryptedJoinAcceptPayload<T, F>(T, F);

impl<T: AsRef<[u8]>, F: CryptoFactory> DecryptedJoinAcceptPayload<T, F> {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    pub fn mic(&self) -> MIC {
        parsed_mic(self.0.as_ref())
    }

    pub fn validate_mic(&self, key: &AppKey) -> bool {
        let d = self.0.as_ref();
        self.mic()
            == securityhelpers::calculate_mic(&d[..d.len() - MIC_LEN], self.1.new_mac(&key.0))
    }

    pub fn app_nonce(&self) -> AppNonce<&[u8]> {
        AppNonce::new_from_raw(&self.0.as_ref()[1..4])
    }

    pub fn net_id(&self) -> NwkAddr<&[u8]> {
        NwkAddr::new_from_raw(&self.0.as_ref()[4..7])
    }

    pub fn dev_addr(&self) -> DevAddr<&[u8]> {
        DevAddr::new_from_raw(&self.0.as_ref()[7..11])
    }

    pub fn dl_settings(&self) -> DLSettings {
        DLSettings::new(self.0.as_ref()[11])
    }

    /// RX1 delay in seconds (0 meaning the 1 s default).
    pub fn rx_delay(&self) -> u8 {
        self.0.as_ref()[12] & 0x0f
    }

    /// The optional channel list appended to the accept.
    pub fn c_f_list(&self) -> Option<CfList<'_>> {
        let d = self.0.as_ref();
        if d.len() != JOIN_ACCEPT_WITH_CFLIST_LEN {
            return None;
        }
        let cf_list_type = d[28];
        match cf_list_type {
            0 => {
                let res = [
                    Frequency::new_from_raw(&d[13..16]),
                    Frequency::new_from_raw(&d[16..19]),
                    Frequency::new_from_raw(&d[19..22]),
                    Frequency::new_from_raw(&d[22..25]),
                    Frequency::new_from_raw(&d[25..28]),
                ];
                Some(CfList::DynamicChannel(res))
            }
            1 => Some(CfList::FixedChannel(ChannelMask::new_from_raw(&d[13..25]))),
            _ => None,
        }
    }

    pub fn derive_nwkskey<TT: AsRef<[u8]>>(
        &self,
        dev_nonce: &DevNonce<TT>,
        key: &AppKey,
    ) -> NwkSKey {
        NwkSKey(self.derive_session_key(0x01, dev_nonce, &key.0))
    }

    pub fn derive_appskey<TT: AsRef<[u8]>>(
        &self,
        dev_nonce: &DevNonce<TT>,
        key: &AppKey,
    ) -> AppSKey {
        AppSKey(self.derive_session_key(0x02, dev_nonce, &key.0))
    }

    fn derive_session_key<TT: AsRef<[u8]>>(
        &self,
        first: u8,
        dev_nonce: &DevNonce<TT>,
        key: &AES128,
    ) -> AES128 {
        let mut block = [0u8; 16];
        block[0] = first;
        block[1..4].copy_from_slice(self.app_nonce().as_ref());
        block[4..7].copy_from_slice(self.net_id().as_ref());
        block[7..9].copy_from_slice(dev_nonce.as_ref());

        let aes = self.1.new_enc(key);
        let mut ga = generic_array::GenericArray::from(block);
        aes.encrypt_block(&mut ga);
        AES128(ga.into())
    }
}

/// The CFList appended to a join accept: frequencies for dynamic channel
/// plans, a channel mask for fixed ones.
#[derive(Debug, PartialEq, Eq)]
pub enum CfList<'a> {
    DynamicChannel([Frequency<'a>; 5]),
    FixedChannel(ChannelMask<12>),
}

/// A data frame as received, FRMPayload still encrypted.
#[derive(Debug, PartialEq, Eq)]
pub struct EncryptedDataPayload<T, F>(T, F);

impl<T: AsRef<[u8]>, F: CryptoFactory> EncryptedDataPayload<T, F> {
    pub fn new_with_factory(data: T, factory: F) -> Result<Self, Error> {
        {
            let bytes = data.as_ref();
            if bytes.len() < DATA_MIN_LEN {
                return Err(Error::InvalidData);
            }
            if !matches!(
                MHDR(bytes[0]).mtype(),
                MType::UnconfirmedDataUp
                    | MType::UnconfirmedDataDown
                    | MType::ConfirmedDataUp
                    | MType::ConfirmedDataDown
            ) {
                return Err(Error::InvalidMessageType);
            }
            let fopts_len = (bytes[5] & 0x0f) as usize;
            if bytes.len() < DATA_MIN_LEN + fopts_len {
                return Err(Error::InvalidFOptsLen);
            }
        }
        Ok(Self(data, factory))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    pub fn mhdr(&self) -> MHDR {
        MHDR(self.0.as_ref()[0])
    }

    pub fn is_uplink(&self) -> bool {
        matches!(
            self.mhdr().mtype(),
            MType::UnconfirmedDataUp | MType::ConfirmedDataUp
        )
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(
            self.mhdr().mtype(),
            MType::ConfirmedDataUp | MType::ConfirmedDataDown
        )
    }

    pub fn fhdr(&self) -> FHDR<'_> {
        let d = self.0.as_ref();
        FHDR::new_from_raw(&d[MHDR_LEN..d.len() - MIC_LEN], self.is_uplink())
    }

    /// The FPort, when the frame carries one.
    pub fn f_port(&self) -> Option<u8> {
        let d = self.0.as_ref();
        let fhdr_len = 7 + (d[5] & 0x0f) as usize;
        if MHDR_LEN + fhdr_len + MIC_LEN >= d.len() {
            return None;
        }
        Some(d[MHDR_LEN + fhdr_len])
    }

    pub fn mic(&self) -> MIC {
        parsed_mic(self.0.as_ref())
    }

    /// Checks the MIC under `key` for the reconstructed 32-bit `fcnt`.
    pub fn validate_mic(&self, key: &AES128, fcnt: u32) -> bool {
        let d = self.0.as_ref();
        self.mic()
            == securityhelpers::calculate_data_mic(
                &d[..d.len() - MIC_LEN],
                self.1.new_mac(key),
                fcnt,
            )
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>, F: CryptoFactory> EncryptedDataPayload<T, F> {
    /// Decrypts the FRMPayload in place.
    ///
    /// `nwk_skey` is required when FPort is 0 (MAC commands), `app_skey`
    /// otherwise; `fcnt` must be the reconstructed 32-bit counter the MIC
    /// validated against.
    pub fn decrypt<'a>(
        mut self,
        nwk_skey: Option<&'a AES128>,
        app_skey: Option<&'a AES128>,
        fcnt: u32,
    ) -> Result<DecryptedDataPayload<T>, Error> {
        let fhdr_len = 7 + (self.0.as_ref()[5] & 0x0f) as usize;
        let full_len = self.0.as_ref().len();

        let key = match self.f_port() {
            Some(0) => nwk_skey,
            Some(_) => app_skey,
            None => return Ok(DecryptedDataPayload(self.0)),
        }
        .ok_or(Error::MissingKey)?;

        let start = MHDR_LEN + fhdr_len + 1;
        let end = full_len - MIC_LEN;
        let aes = self.1.new_enc(key);
        securityhelpers::encrypt_frm_data_payload(self.0.as_mut(), start, end, fcnt, &aes);

        Ok(DecryptedDataPayload(self.0))
    }
}

/// A data frame whose FRMPayload has been decrypted.
#[derive(Debug, PartialEq, Eq)]
pub struct DecryptedDataPayload<T>(T);

impl<T: AsRef<[u8]>> DecryptedDataPayload<T> {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    pub fn mhdr(&self) -> MHDR {
        MHDR(self.0.as_ref()[0])
    }

    pub fn is_uplink(&self) -> bool {
        matches!(
            self.mhdr().mtype(),
            MType::UnconfirmedDataUp | MType::ConfirmedDataUp
        )
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(
            self.mhdr().mtype(),
            MType::ConfirmedDataUp | MType::ConfirmedDataDown
        )
    }

    pub fn fhdr(&self) -> FHDR<'_> {
        let d = self.0.as_ref();
        FHDR::new_from_raw(&d[MHDR_LEN..d.len() - MIC_LEN], self.is_uplink())
    }

    pub fn f_port(&self) -> Option<u8> {
        let d = self.0.as_ref();
        let fhdr_len = 7 + (d[5] & 0x0f) as usize;
        if MHDR_LEN + fhdr_len + MIC_LEN >= d.len() {
            return None;
        }
        Some(d[MHDR_LEN + fhdr_len])
    }

    /// The decrypted FRMPayload, classified by FPort.
    pub fn frm_payload(&self) -> FRMPayload<'_> {
        let d = self.0.as_ref();
        let fhdr_len = 7 + (d[5] & 0x0f) as usize;
        let start = MHDR_LEN + fhdr_len + 1;
        if start > d.len() - MIC_LEN {
            return FRMPayload::None;
        }
        let payload = &d[start..d.len() - MIC_LEN];
        if self.f_port() == Some(0) {
            FRMPayload::MACCommands(FRMMacCommands::new(payload, self.is_uplink()))
        } else {
            FRMPayload::Data(payload)
        }
    }
}

/// The application view of a decrypted FRMPayload.
#[derive(Debug, PartialEq, Eq)]
pub enum FRMPayload<'a> {
    Data(&'a [u8]),
    MACCommands(FRMMacCommands<'a>),
    None,
}

/// MAC commands carried in the FRMPayload (FPort 0).
#[derive(Debug, PartialEq, Eq)]
pub struct FRMMacCommands<'a>(bool, &'a [u8]);

impl<'a> FRMMacCommands<'a> {
    pub fn new(bytes: &'a [u8], uplink: bool) -> Self {
        Self(uplink, bytes)
    }

    pub fn mac_commands(&self) -> MacCommandIterator<'a, DownlinkMacCommand<'a>> {
        MacCommandIterator::new(self.1)
    }

    pub(crate) fn data(&self) -> &'a [u8] {
        self.1
    }
}
