use heapless::Vec;
use lorawan_codec::creator::DataPayloadCreator;
use lorawan_codec::keys::CryptoFactory;
use lorawan_codec::maccommands::SerializableMacCommand;
use lorawan_codec::parser::{
    parse_with_factory as lorawan_parse, DataPayload, DecryptedJoinAcceptPayload, DevAddr, FCtrl,
    FRMPayload, PhyPayload,
};

use crate::radio::{RadioBuffer, RxQuality};
use crate::region;
use crate::region::constants::MAX_FCNT_GAP;
use crate::{AppSKey, Downlink, NwkSKey};

use super::adr::AdrAction;
use super::otaa::{DevNonce, NetworkCredentials};
use super::{uplink, FcntUp, Response, SendData};

/// An established LoRaWAN session: keys, address and frame counters.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Session {
    pub(crate) nwkskey: NwkSKey,
    pub(crate) appskey: AppSKey,
    pub(crate) devaddr: DevAddr<[u8; 4]>,
    /// Network identifier from the join accept; `None` for ABP sessions.
    pub(crate) net_id: Option<[u8; 3]>,
    pub(crate) fcnt_up: u32,
    /// Highest 32-bit downlink counter seen; `None` before the first
    /// accepted downlink.
    pub(crate) fcnt_down: Option<u32>,
    /// Confirmed uplink awaiting its acknowledgement.
    pub(crate) ack_pending: bool,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) uplink: uplink::Uplink,
}

/// The key material of a [`Session`], for host-side persistence.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionKeys {
    pub nwkskey: NwkSKey,
    pub appskey: AppSKey,
    pub devaddr: DevAddr<[u8; 4]>,
}

impl From<&Session> for SessionKeys {
    fn from(session: &Session) -> Self {
        Self {
            nwkskey: session.nwkskey,
            appskey: session.appskey,
            devaddr: session.devaddr,
        }
    }
}

impl Session {
    pub fn new(nwkskey: NwkSKey, appskey: AppSKey, devaddr: DevAddr<[u8; 4]>) -> Self {
        Self {
            nwkskey,
            appskey,
            devaddr,
            net_id: None,
            fcnt_up: 0,
            fcnt_down: None,
            ack_pending: false,
            uplink: uplink::Uplink::default(),
        }
    }

    pub(crate) fn derive_new<T: AsRef<[u8]>, F: CryptoFactory>(
        decrypted: &DecryptedJoinAcceptPayload<T, F>,
        devnonce: DevNonce,
        credentials: &NetworkCredentials,
    ) -> Self {
        let mut session = Self::new(
            decrypted.derive_nwkskey(&devnonce, credentials.appkey()),
            decrypted.derive_appskey(&devnonce, credentials.appkey()),
            DevAddr::new(decrypted.dev_addr().as_ref().try_into().unwrap()).unwrap(),
        );
        session.net_id = Some(decrypted.net_id().as_ref().try_into().unwrap());
        session
    }

    pub fn devaddr(&self) -> &DevAddr<[u8; 4]> {
        &self.devaddr
    }

    pub fn net_id(&self) -> Option<[u8; 3]> {
        self.net_id
    }

    pub fn keys(&self) -> SessionKeys {
        SessionKeys::from(self)
    }

    pub fn fcnt_up(&self) -> FcntUp {
        self.fcnt_up
    }

    /// Reconstructs the 32-bit downlink counter from the 16 bits on the
    /// wire: keep the stored high half, bump it when the low half did not
    /// advance, reject counters further ahead than the permitted gap.
    fn guess_fcnt_down(&self, wire_fcnt: u16) -> Option<u32> {
        let guess = match self.fcnt_down {
            None => wire_fcnt as u32,
            Some(last) => {
                let mut guess = (last & 0xFFFF_0000) | wire_fcnt as u32;
                if guess <= last {
                    guess = guess.wrapping_add(0x1_0000);
                }
                guess
            }
        };
        let gap = guess.wrapping_sub(self.fcnt_down.unwrap_or(0));
        (gap <= MAX_FCNT_GAP).then_some(guess)
    }

    /// Validates and decrypts a received frame, consuming its MAC commands
    /// and queueing application data into `dl`.
    pub(crate) fn handle_rx<F: CryptoFactory + Default, const N: usize, const D: usize>(
        &mut self,
        region: &mut region::Configuration,
        configuration: &mut super::Configuration,
        rx: &mut RadioBuffer<N>,
        dl: &mut Vec<Downlink, D>,
        quality: RxQuality,
        rx_slot: u8,
    ) -> Response {
        let Ok(PhyPayload::Data(DataPayload::Encrypted(encrypted))) =
            lorawan_parse(rx.as_mut_for_read(), F::default())
        else {
            return Response::NoUpdate;
        };
        if encrypted.is_uplink() || self.devaddr() != &encrypted.fhdr().dev_addr() {
            return Response::NoUpdate;
        }
        let Some(fcnt) = self.guess_fcnt_down(encrypted.fhdr().fcnt()) else {
            return Response::NoUpdate;
        };
        if !encrypted.validate_mic(self.nwkskey.inner(), fcnt) {
            return Response::NoUpdate;
        }

        let confirmed_downlink = encrypted.is_confirmed();
        let ack = encrypted.fhdr().fctrl().ack();
        let f_pending = encrypted.fhdr().fctrl().f_pending();
        self.fcnt_down = Some(fcnt);
        debug!("downlink accepted, fcnt {}", fcnt);

        // MIC passed, decryption keys are present by construction
        let decrypted = encrypted
            .decrypt(Some(self.nwkskey.inner()), Some(self.appskey.inner()), fcnt)
            .unwrap();

        // a downlink retires the sticky answers and the ADR silence count
        self.uplink.downlink_received();
        configuration.adr_backoff.downlink_received();

        configuration.handle_downlink_macs(
            region,
            &mut self.uplink,
            quality,
            decrypted.fhdr().fopts(),
        );
        if let FRMPayload::MACCommands(cmds) = decrypted.frm_payload() {
            configuration.handle_downlink_macs(
                region,
                &mut self.uplink,
                quality,
                cmds.mac_commands(),
            );
        }

        if confirmed_downlink {
            self.uplink.set_downlink_confirmation();
        }

        // any downlink ends a confirmed exchange, acknowledged or not
        let acknowledged = self.ack_pending && ack;
        self.ack_pending = false;

        if self.fcnt_up == 0xFFFF_FFFF {
            return Response::SessionExpired;
        }
        // the exchange is over, account the uplink
        self.fcnt_up += 1;

        if let (Some(fport), FRMPayload::Data(data)) =
            (decrypted.f_port(), decrypted.frm_payload())
        {
            if fport > 0 {
                // an FRMPayload never exceeds the buffer the Vec is sized for
                let data = Vec::from_slice(data).unwrap();
                if dl.push(Downlink { data, fport, quality, rx_slot, f_pending }).is_err() {
                    warn!("receive queue full, downlink dropped");
                }
            }
        }
        Response::DownlinkReceived { fcnt, acknowledged }
    }

    /// Closes the receive phase of an uplink that saw no downlink.
    /// `will_retry` keeps the frame counter unchanged so a confirmed
    /// retransmission reuses it.
    pub(crate) fn rx2_complete(&mut self, will_retry: bool) -> Response {
        if self.ack_pending {
            if will_retry {
                return Response::NoAck;
            }
            // retries exhausted
            self.ack_pending = false;
            if self.fcnt_up == 0xFFFF_FFFF {
                return Response::SessionExpired;
            }
            self.fcnt_up += 1;
            return Response::NoAck;
        }
        if self.fcnt_up == 0xFFFF_FFFF {
            return Response::SessionExpired;
        }
        self.fcnt_up += 1;
        Response::RxComplete
    }

    /// Assembles, encrypts and signs a data frame into `tx_buffer`.
    pub(crate) fn prepare_buffer<F: CryptoFactory + Default, const N: usize>(
        &mut self,
        configuration: &mut super::Configuration,
        region: &mut region::Configuration,
        data: &SendData,
        tx_buffer: &mut RadioBuffer<N>,
    ) -> FcntUp {
        let fcnt = self.fcnt_up;
        tx_buffer.clear();
        let mut phy = DataPayloadCreator::with_options(tx_buffer.as_mut(), F::default())
            .expect("radio buffer holds a full frame");

        let mut fctrl = FCtrl(0, true);
        if configuration.adr {
            fctrl.set_adr();
            match configuration.adr_backoff.uplink_prepared() {
                AdrAction::None => {}
                AdrAction::RequestAck => fctrl.set_adr_ack_req(),
                AdrAction::StepDown => {
                    debug!("ADR backoff, shedding a data rate step");
                    fctrl.set_adr_ack_req();
                    let floor = region.min_data_rate();
                    if configuration.data_rate > floor {
                        configuration.data_rate =
                            region.next_lower_data_rate(configuration.data_rate);
                    } else {
                        // nothing slower to try; reopen the default plan at
                        // full power
                        configuration.tx_power_index = 0;
                        region.restore_default_channel_mask();
                    }
                }
            }
        }

        if self.uplink.confirms_downlink() {
            fctrl.set_ack();
            self.uplink.clear_downlink_confirmation();
        }

        self.ack_pending = data.confirmed;

        phy.set_confirmed(data.confirmed)
            .set_uplink(true)
            .set_fctrl(&fctrl)
            .set_dev_addr(self.devaddr)
            .set_fcnt(fcnt);

        let answers = self.uplink.take_answers();
        let mut cmds: Vec<&dyn SerializableMacCommand, 12> = Vec::new();
        for answer in answers.iter() {
            let _ = cmds.push(answer);
        }

        let oversized = lorawan_codec::maccommands::mac_commands_len(&cmds) > uplink::FOPTS_MAX_LEN;
        let packet_len = if oversized && data.data.is_empty() {
            // command overflow rides alone on FPort 0
            phy.set_f_port(0);
            phy.build(&[], &cmds, &self.nwkskey, &self.appskey)
                .expect("frame parameters were validated before queueing")
                .len()
        } else {
            if oversized {
                // one-shot answers wait for a later uplink; sticky ones are
                // regenerated from their queue anyway
                cmds.clear();
            }
            if !data.data.is_empty() || data.fport != 0 {
                phy.set_f_port(data.fport);
            }
            phy.build(data.data, &cmds, &self.nwkskey, &self.appskey)
                .expect("frame parameters were validated before queueing")
                .len()
        };
        tx_buffer.set_pos(packet_len);
        fcnt
    }
}
