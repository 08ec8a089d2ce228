//! Builders for the PHY payloads a device (or a test network) emits.
use crate::keys::{self, CryptoFactory, Decrypter, AES128};
use crate::maccommandcreator;
use crate::maccommands::{mac_commands_len, SerializableMacCommand};
use crate::parser::{DevAddr, DevNonce, FCtrl, EUI64};
use crate::securityhelpers;
use crate::types::{DLSettings, Frequency};

/// Answers riding in FOpts may take at most 15 bytes; longer sequences go
/// to an FPort-0 payload.
pub const PIGGYBACK_MAC_COMMANDS_MAX_LEN: usize = 15;

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error {
    BufferTooShort,
    MacCommandTooBigForFOpts,
    DataAndMacCommandsInPayload,
    MissingFPort,
    TooManyFrequencies,
}

impl From<crate::maccommands::Error> for Error {
    fn from(_: crate::maccommands::Error) -> Error {
        Error::BufferTooShort
    }
}

fn set_plain_mic<F: CryptoFactory>(data: &mut [u8], key: &AES128, factory: &F) {
    let len = data.len();
    let mic = securityhelpers::calculate_mic(&data[..len - 4], factory.new_mac(key));
    data[len - 4..].copy_from_slice(&mic.0[..]);
}

/// Builds the join request frame of an OTAA attempt.
#[derive(Default)]
pub struct JoinRequestCreator<D, F> {
    data: D,
    factory: F,
}

impl<D: AsMut<[u8]>, F: CryptoFactory> JoinRequestCreator<D, F> {
    /// Wraps `data` (at least 23 bytes) for building.
    pub fn with_options(mut data: D, factory: F) -> Result<Self, Error> {
        let d = data.as_mut();
        if d.len() < 23 {
            return Err(Error::BufferTooShort);
        }
        d[0] = 0x00;
        Ok(Self { data, factory })
    }

    pub fn set_app_eui<H: AsRef<[u8]>, T: Into<EUI64<H>>>(&mut self, app_eui: T) -> &mut Self {
        let converted = app_eui.into();
        self.data.as_mut()[1..9].copy_from_slice(converted.as_ref());
        self
    }

    pub fn set_dev_eui<H: AsRef<[u8]>, T: Into<EUI64<H>>>(&mut self, dev_eui: T) -> &mut Self {
        let converted = dev_eui.into();
        self.data.as_mut()[9..17].copy_from_slice(converted.as_ref());
        self
    }

    pub fn set_dev_nonce<H: AsRef<[u8]>, T: Into<DevNonce<H>>>(
        &mut self,
        dev_nonce: T,
    ) -> &mut Self {
        let converted = dev_nonce.into();
        self.data.as_mut()[17..19].copy_from_slice(converted.as_ref());
        self
    }

    /// Finishes the frame: sets the MIC under `key` and returns the wire
    /// bytes.
    pub fn build(&mut self, key: &keys::AppKey) -> &[u8] {
        let d = self.data.as_mut();
        set_plain_mic(&mut d[..23], &key.0, &self.factory);
        &d[..23]
    }
}

/// Builds join accept frames; the device never sends these, but network
/// simulations in tests do.
pub struct JoinAcceptCreator<D, F> {
    data: D,
    with_c_f_list: bool,
    encrypted: bool,
    factory: F,
}

impl<D: AsMut<[u8]>, F: CryptoFactory> JoinAcceptCreator<D, F> {
    /// Wraps `data` (17 bytes, or 33 with a CFList) for building.
    pub fn with_options(mut data: D, factory: F) -> Result<Self, Error> {
        let d = data.as_mut();
        if d.len() < 17 {
            return Err(Error::BufferTooShort);
        }
        d[0] = 0x20;
        Ok(Self { data, with_c_f_list: false, encrypted: false, factory })
    }

    pub fn set_app_nonce(&mut self, app_nonce: &[u8; 3]) -> &mut Self {
        self.data.as_mut()[1..4].copy_from_slice(app_nonce);
        self
    }

    pub fn set_net_id(&mut self, net_id: &[u8; 3]) -> &mut Self {
        self.data.as_mut()[4..7].copy_from_slice(net_id);
        self
    }

    pub fn set_dev_addr<H: AsRef<[u8]>, T: Into<DevAddr<H>>>(&mut self, dev_addr: T) -> &mut Self {
        let converted = dev_addr.into();
        self.data.as_mut()[7..11].copy_from_slice(converted.as_ref());
        self
    }

    pub fn set_dl_settings<T: Into<DLSettings>>(&mut self, dl_settings: T) -> &mut Self {
        self.data.as_mut()[11] = dl_settings.into().raw_value();
        self
    }

    pub fn set_rx_delay(&mut self, rx_delay: u8) -> &mut Self {
        self.data.as_mut()[12] = rx_delay;
        self
    }

    /// Appends a dynamic-plan CFList of up to five frequencies.
    pub fn set_c_f_list<'a, C: AsRef<[Frequency<'a>]>>(
        &mut self,
        list: C,
    ) -> Result<&mut Self, Error> {
        let frequencies = list.as_ref();
        if frequencies.len() > 5 {
            return Err(Error::TooManyFrequencies);
        }
        let d = self.data.as_mut();
        if d.len() < 33 {
            return Err(Error::BufferTooShort);
        }
        frequencies.iter().enumerate().for_each(|(i, freq)| {
            let v = freq.value() / 100;
            d[13 + i * 3] = (v & 0xff) as u8;
            d[14 + i * 3] = ((v >> 8) & 0xff) as u8;
            d[15 + i * 3] = ((v >> 16) & 0xff) as u8;
        });
        // CFListType 0
        d[28] = 0;
        self.with_c_f_list = true;
        Ok(self)
    }

    /// Finishes the frame: sets the MIC and encrypts with the AES decrypt
    /// primitive, as the server side does.
    pub fn build(&mut self, key: &keys::AppKey) -> Result<&[u8], Error> {
        let len = if self.with_c_f_list {
            33
        } else {
            17
        };
        if self.data.as_mut().len() < len {
            return Err(Error::BufferTooShort);
        }
        if !self.encrypted {
            let d = &mut self.data.as_mut()[..len];
            set_plain_mic(d, &key.0, &self.factory);
            let aes = self.factory.new_dec(&key.0);
            for block in d[1..].chunks_exact_mut(16) {
                aes.decrypt_block(generic_array::GenericArray::from_mut_slice(block));
            }
            self.encrypted = true;
        }
        Ok(&self.data.as_mut()[..len])
    }
}

/// Builds data frames, encrypting the FRMPayload and setting the MIC.
#[derive(Default)]
pub struct DataPayloadCreator<D, F> {
    data: D,
    data_f_port: Option<u8>,
    fcnt: u32,
    factory: F,
}

impl<D: AsMut<[u8]>, F: CryptoFactory> DataPayloadCreator<D, F> {
    /// Wraps `data` for building. The buffer must hold the largest frame
    /// that may be produced (MHDR + FHDR + FPort + payload + MIC).
    ///
    /// Defaults to an unconfirmed uplink.
    pub fn with_options(mut data: D, factory: F) -> Result<Self, Error> {
        let d = data.as_mut();
        if d.len() < 12 {
            return Err(Error::BufferTooShort);
        }
        d[0] = 0x40;
        Ok(DataPayloadCreator { data, data_f_port: None, fcnt: 0, factory })
    }

    pub fn set_uplink(&mut self, uplink: bool) -> &mut Self {
        if uplink {
            self.data.as_mut()[0] &= 0xdf;
        } else {
            self.data.as_mut()[0] |= 0x20;
        }
        self
    }

    pub fn set_confirmed(&mut self, confirmed: bool) -> &mut Self {
        let d = self.data.as_mut();
        if confirmed {
            d[0] &= 0xbf;
            d[0] |= 0x80;
        } else {
            d[0] &= 0x7f;
            d[0] |= 0x40;
        }
        self
    }

    pub fn set_dev_addr<H: AsRef<[u8]>, T: Into<DevAddr<H>>>(&mut self, dev_addr: T) -> &mut Self {
        let converted = dev_addr.into();
        self.data.as_mut()[1..5].copy_from_slice(converted.as_ref());
        self
    }

    pub fn set_fctrl(&mut self, fctrl: &FCtrl) -> &mut Self {
        self.data.as_mut()[5] = fctrl.raw_value();
        self
    }

    /// Truncated to 16 bits in the header; the full value feeds the crypto.
    pub fn set_fcnt(&mut self, fcnt: u32) -> &mut Self {
        let d = self.data.as_mut();
        self.fcnt = fcnt;
        d[6] = (fcnt & 0xff) as u8;
        d[7] = ((fcnt >> 8) & 0xff) as u8;
        self
    }

    pub fn set_f_port(&mut self, f_port: u8) -> &mut Self {
        self.data_f_port = Some(f_port);
        self
    }

    /// Whether `cmds` fit in FOpts.
    pub fn can_piggyback(cmds: &[&dyn SerializableMacCommand]) -> bool {
        mac_commands_len(cmds) <= PIGGYBACK_MAC_COMMANDS_MAX_LEN
    }

    /// Finishes the frame and returns the wire bytes.
    ///
    /// MAC commands go to FOpts unless FPort is 0, in which case they form
    /// the FRMPayload and `payload` must be empty.
    pub fn build(
        &mut self,
        payload: &[u8],
        cmds: &[&dyn SerializableMacCommand],
        nwk_skey: &keys::NwkSKey,
        app_skey: &keys::AppSKey,
    ) -> Result<&[u8], Error> {
        let d = self.data.as_mut();
        let mut last_filled = 8; // MHDR + FHDR without FOpts
        let has_fport = self.data_f_port.is_some();
        let has_fport_zero = self.data_f_port == Some(0);
        let mac_cmds_len = mac_commands_len(cmds);

        if mac_cmds_len > PIGGYBACK_MAC_COMMANDS_MAX_LEN && !has_fport_zero {
            return Err(Error::MacCommandTooBigForFOpts);
        }
        if has_fport_zero && !payload.is_empty() {
            return Err(Error::DataAndMacCommandsInPayload);
        }
        if !has_fport && !payload.is_empty() {
            return Err(Error::MissingFPort);
        }

        let mut payload_len = payload.len();
        if d.len() < 12 + mac_cmds_len + payload_len + has_fport as usize {
            return Err(Error::BufferTooShort);
        }

        // FOpts, unless the commands ride on FPort 0
        d[5] &= 0xf0;
        if !has_fport_zero && mac_cmds_len > 0 {
            d[5] |= mac_cmds_len as u8 & 0x0f;
            maccommandcreator::build_mac_commands(
                cmds,
                &mut d[last_filled..last_filled + mac_cmds_len],
            )?;
            last_filled += mac_cmds_len;
        }

        if has_fport {
            d[last_filled] = self.data_f_port.unwrap();
            last_filled += 1;
        }

        let mut enc_key = &app_skey.0;
        if has_fport_zero && mac_cmds_len > 0 {
            enc_key = &nwk_skey.0;
            payload_len = mac_cmds_len;
            maccommandcreator::build_mac_commands(
                cmds,
                &mut d[last_filled..last_filled + payload_len],
            )?;
        } else {
            d[last_filled..last_filled + payload_len].copy_from_slice(payload);
        }

        securityhelpers::encrypt_frm_data_payload(
            d,
            last_filled,
            last_filled + payload_len,
            self.fcnt,
            &self.factory.new_enc(enc_key),
        );

        let frame_len = last_filled + payload_len;
        let mic = securityhelpers::calculate_data_mic(
            &d[..frame_len],
            self.factory.new_mac(&nwk_skey.0),
            self.fcnt,
        );
        d[frame_len..frame_len + 4].copy_from_slice(&mic.0);

        Ok(&d[..frame_len + 4])
    }
}
