//! Shared helpers for the device tests: a fake network server built from
//! the codec crate's creators.
use super::*;
use lorawan_codec::creator::{DataPayloadCreator, JoinAcceptCreator};
use lorawan_codec::default_crypto::DefaultFactory;
use lorawan_codec::maccommands::SerializableMacCommand;
use lorawan_codec::parser::{parse, FCtrl, PhyPayload};

use crate::radio::{RfConfig, TxConfig};
use std::vec::Vec;

#[derive(Debug, Clone)]
pub struct Uplink {
    data: Vec<u8>,
    #[allow(unused)]
    tx_config: TxConfig,
}

impl Uplink {
    /// Copies the transmitted bytes and checks they parse at all.
    pub fn new(data_in: &[u8], tx_config: TxConfig) -> Result<Self, lorawan_codec::parser::Error> {
        let mut data: Vec<u8> = Vec::new();
        data.extend_from_slice(data_in);
        let _parse = parse(data.as_mut_slice())?;
        Ok(Self { data, tx_config })
    }

    pub fn get_payload(&mut self) -> PhyPayload<&mut [u8], DefaultFactory> {
        match parse(self.data.as_mut_slice()) {
            Ok(p) => p,
            Err(e) => panic!("Failed to parse payload: {:?}", e),
        }
    }
}

pub fn get_key() -> [u8; 16] {
    [0; 16]
}

pub fn get_dev_addr() -> DevAddr<[u8; 4]> {
    DevAddr::from(0)
}

pub fn get_otaa_credentials() -> JoinMode {
    JoinMode::OTAA {
        deveui: DevEui::from([0; 8]),
        appeui: AppEui::from([0; 8]),
        appkey: AppKey::from(get_key()),
        nb_trials: 1,
    }
}

pub fn get_abp_credentials() -> JoinMode {
    JoinMode::ABP {
        devaddr: get_dev_addr(),
        appskey: AppSKey::from(get_key()),
        nwkskey: NwkSKey::from(get_key()),
    }
}

pub type RxTxHandler = fn(Option<Uplink>, RfConfig, &mut [u8]) -> usize;

/// Answers a captured join request with a join accept under the all-zero
/// AppKey.
pub fn handle_join_request(
    uplink: Option<Uplink>,
    _config: RfConfig,
    rx_buffer: &mut [u8],
) -> usize {
    let mut uplink = uplink.expect("no uplink passed to handle_join_request");
    let PhyPayload::JoinRequest(join_request) = uplink.get_payload() else {
        panic!("did not parse join request from uplink");
    };
    assert!(join_request.validate_mic(&get_key().into()));

    let mut buffer = [0u8; 17];
    let mut phy = JoinAcceptCreator::with_options(&mut buffer, DefaultFactory).unwrap();
    phy.set_app_nonce(&[1; 3]).set_net_id(&[1; 3]).set_dev_addr(get_dev_addr());
    let finished = phy.build(&AppKey::from(get_key())).unwrap();
    rx_buffer[..finished.len()].copy_from_slice(finished);
    finished.len()
}

/// Builds a downlink under the all-zero session keys.
pub fn build_downlink(
    rx_buffer: &mut [u8],
    fcnt: u32,
    fport: Option<u8>,
    payload: &[u8],
    cmds: &[&dyn SerializableMacCommand],
    ack: bool,
    confirmed: bool,
) -> usize {
    let mut phy = DataPayloadCreator::with_options(rx_buffer, DefaultFactory).unwrap();
    let mut fctrl = FCtrl::new(0, false);
    if ack {
        fctrl.set_ack();
    }
    phy.set_confirmed(confirmed)
        .set_uplink(false)
        .set_fctrl(&fctrl)
        .set_dev_addr(get_dev_addr())
        .set_fcnt(fcnt);
    if let Some(fport) = fport {
        phy.set_f_port(fport);
    }
    let finished = phy
        .build(payload, cmds, &NwkSKey::from(get_key()), &AppSKey::from(get_key()))
        .unwrap();
    finished.len()
}

/// Checks the captured uplink's MIC and returns its decrypted form.
pub fn decrypt_uplink(
    uplink: &mut Uplink,
    fcnt: u32,
) -> lorawan_codec::parser::DecryptedDataPayload<&mut [u8]> {
    use lorawan_codec::parser::DataPayload;
    let PhyPayload::Data(DataPayload::Encrypted(data)) = uplink.get_payload() else {
        panic!("expected a data uplink");
    };
    assert!(data.validate_mic(&lorawan_codec::keys::AES128(get_key()), fcnt));
    data.decrypt(
        Some(&lorawan_codec::keys::AES128(get_key())),
        Some(&lorawan_codec::keys::AES128(get_key())),
        fcnt,
    )
    .unwrap()
}
