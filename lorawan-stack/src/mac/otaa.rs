use lorawan_codec::creator::JoinRequestCreator;
use lorawan_codec::keys::CryptoFactory;
use lorawan_codec::parser::{parse_with_factory as lorawan_parse, JoinAcceptPayload, PhyPayload};
use rand_core::RngCore;

use crate::radio::RadioBuffer;
use crate::region::Configuration as RegionConfiguration;
use crate::{AppEui, AppKey, DevEui};

use super::{del_to_delay_ms, session::Session, Response};

pub(crate) type DevNonce = lorawan_codec::parser::DevNonce<[u8; 2]>;

/// The OTAA credentials provisioned on the device.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone)]
pub struct NetworkCredentials {
    deveui: DevEui,
    appeui: AppEui,
    appkey: AppKey,
}

impl NetworkCredentials {
    pub fn new(appeui: AppEui, deveui: DevEui, appkey: AppKey) -> Self {
        Self { deveui, appeui, appkey }
    }

    pub fn appeui(&self) -> &AppEui {
        &self.appeui
    }

    pub fn deveui(&self) -> &DevEui {
        &self.deveui
    }

    pub fn appkey(&self) -> &AppKey {
        &self.appkey
    }
}

/// A join exchange in flight.
pub(crate) struct Otaa {
    dev_nonce: Option<DevNonce>,
    credentials: NetworkCredentials,
}

impl Otaa {
    pub(crate) fn new(credentials: NetworkCredentials) -> Self {
        Self { dev_nonce: None, credentials }
    }

    /// Builds a join request into `buf` and returns the nonce used.
    ///
    /// Each attempt draws a fresh nonce and redraws until it differs from
    /// the previous one, as the server rejects replayed nonces.
    pub(crate) fn prepare_buffer<F: CryptoFactory + Default, G: RngCore, const N: usize>(
        &mut self,
        rng: &mut G,
        buf: &mut RadioBuffer<N>,
    ) -> u16 {
        let mut nonce = DevNonce::from(rng.next_u32() as u16);
        while Some(nonce) == self.dev_nonce {
            nonce = DevNonce::from(rng.next_u32() as u16);
        }
        self.dev_nonce = Some(nonce);

        buf.clear();
        let mut phy = JoinRequestCreator::with_options(buf.as_mut(), F::default())
            .expect("radio buffer holds a join request");
        phy.set_app_eui(self.credentials.appeui)
            .set_dev_eui(self.credentials.deveui)
            .set_dev_nonce(nonce);
        let len = phy.build(self.credentials.appkey()).len();
        buf.set_pos(len);
        u16::from(nonce)
    }

    /// Attempts to read `rx` as the join accept answering our request.
    pub(crate) fn handle_rx<F: CryptoFactory + Default, const N: usize>(
        &mut self,
        region: &mut RegionConfiguration,
        configuration: &mut super::Configuration,
        rx: &mut RadioBuffer<N>,
    ) -> Option<Session> {
        let Some(dev_nonce) = self.dev_nonce else {
            return None;
        };
        let Ok(PhyPayload::JoinAccept(JoinAcceptPayload::Encrypted(encrypted))) =
            lorawan_parse(rx.as_mut_for_read(), F::default())
        else {
            return None;
        };
        let decrypted = encrypted.decrypt(self.credentials.appkey());
        if !decrypted.validate_mic(self.credentials.appkey()) {
            return None;
        }

        region.process_join_accept(&decrypted);
        let dl_settings = decrypted.dl_settings();
        if region.rx1_dr_offset_validate(dl_settings.rx1_dr_offset()).is_some() {
            region.set_rx1_dr_offset(dl_settings.rx1_dr_offset());
        }
        if region.check_data_rate(dl_settings.rx2_data_rate() as u8).is_some() {
            region.set_rx2_data_rate(dl_settings.rx2_data_rate() as u8);
        }
        configuration.rx1_delay = del_to_delay_ms(decrypted.rx_delay());

        Some(Session::derive_new(&decrypted, dev_nonce, &self.credentials))
    }

    pub(crate) fn rx2_complete(&mut self) -> Response {
        Response::NoJoinAccept
    }
}
