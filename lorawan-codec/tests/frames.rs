use lorawan_codec::creator::{
    DataPayloadCreator, Error as CreatorError, JoinAcceptCreator, JoinRequestCreator,
};
use lorawan_codec::default_crypto::DefaultFactory;
use lorawan_codec::keys::*;
use lorawan_codec::parser::*;
use lorawan_codec::types::*;

fn phy_join_request_payload() -> Vec<u8> {
    vec![
        0x00, 0x04, 0x03, 0x02, 0x01, 0x04, 0x03, 0x02, 0x01, 0x05, 0x04, 0x03, 0x02, 0x05, 0x04,
        0x03, 0x02, 0x2d, 0x10, 0x6a, 0x99, 0x0e, 0x12,
    ]
}

fn phy_join_accept_payload() -> Vec<u8> {
    vec![
        0x20, 0x49, 0x3e, 0xeb, 0x51, 0xfb, 0xa2, 0x11, 0x6f, 0x81, 0x0e, 0xdb, 0x37, 0x42, 0x97,
        0x51, 0x42,
    ]
}

// CFList: 867.1, 867.3, 867.5, 867.7, 867.9 MHz
fn phy_join_accept_payload_with_c_f_list() -> Vec<u8> {
    vec![
        0x20, 0xe4, 0x56, 0x73, 0xb6, 0x3c, 0xb4, 0xb9, 0xce, 0xcb, 0x2a, 0xa8, 0x3f, 0x03, 0x33,
        0xe6, 0x15, 0xd2, 0xac, 0x89, 0xee, 0xa1, 0x65, 0x98, 0x37, 0xc3, 0xaa, 0x6d, 0xf9, 0x68,
        0x98, 0x89, 0xcf,
    ]
}

fn phy_dataup_payload() -> Vec<u8> {
    vec![
        0x40, 0x04, 0x03, 0x02, 0x01, 0x80, 0x01, 0x00, 0x01, 0xa6, 0x94, 0x64, 0x26, 0x15, 0xd6,
        0xc3, 0xb5, 0x82,
    ]
}

fn phy_datadown_payload() -> Vec<u8> {
    vec![
        0xa0, 0x04, 0x03, 0x02, 0x01, 0x80, 0xff, 0x2a, 0x2a, 0x0a, 0xf1, 0xa3, 0x6a, 0x05, 0xd0,
        0x12, 0x5f, 0x88, 0x5d, 0x88, 0x1d, 0x49, 0xe1,
    ]
}

fn app_key() -> AppKey {
    AppKey::from([
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee,
        0xff,
    ])
}

#[test]
fn mhdr_mtype() {
    let examples = [
        (0x00, MType::JoinRequest),
        (0x20, MType::JoinAccept),
        (0x40, MType::UnconfirmedDataUp),
        (0x60, MType::UnconfirmedDataDown),
        (0x80, MType::ConfirmedDataUp),
        (0xa0, MType::ConfirmedDataDown),
        (0xc0, MType::RFU),
        (0xe0, MType::Proprietary),
    ];
    for (v, expected) in examples {
        assert_eq!(MHDR::new(v).mtype(), expected);
    }
}

#[test]
fn parse_classifies_each_frame_type() {
    assert!(matches!(
        parse(phy_join_request_payload()),
        Ok(PhyPayload::JoinRequest(_))
    ));
    assert!(matches!(
        parse(phy_join_accept_payload()),
        Ok(PhyPayload::JoinAccept(JoinAcceptPayload::Encrypted(_)))
    ));
    assert!(matches!(
        parse(phy_dataup_payload()),
        Ok(PhyPayload::Data(DataPayload::Encrypted(_)))
    ));
}

#[test]
fn parse_rejects_truncated_data_frame() {
    let bytes = vec![0x80, 0x04, 0x03, 0x02, 0x01, 0x00, 0xff, 0x01, 0x02, 0x03, 0x04];
    assert!(parse(bytes).is_err());
}

#[test]
fn parse_rejects_fopts_len_past_frame_end() {
    let bytes = vec![0x80, 0x04, 0x03, 0x02, 0x01, 0x0f, 0xff, 0x04, 0x01, 0x02, 0x03, 0x04];
    assert!(EncryptedDataPayload::new(bytes).is_err());
}

#[test]
fn join_accept_decrypt_and_mic() {
    let phy = DecryptedJoinAcceptPayload::new(phy_join_accept_payload(), &app_key()).unwrap();
    assert_eq!(phy.app_nonce().as_ref(), &[0x49, 0x3e, 0xeb]);
    assert_eq!(phy.net_id().as_ref(), &[0x51, 0xfb, 0xa2]);
    assert_eq!(phy.c_f_list(), None);
}

#[test]
fn join_accept_bad_mic_is_rejected() {
    let wrong_key = AppKey::from([0x42; 16]);
    assert_eq!(
        DecryptedJoinAcceptPayload::new(phy_join_accept_payload(), &wrong_key),
        Err(Error::InvalidMic)
    );
}

#[test]
fn join_accept_c_f_list_extraction() {
    let key = AppKey::from([1; 16]);
    let phy =
        DecryptedJoinAcceptPayload::new(phy_join_accept_payload_with_c_f_list(), &key).unwrap();
    assert_eq!(phy.rx_delay(), 3);
    assert_eq!(phy.dl_settings(), DLSettings::new(0x12));

    match phy.c_f_list().unwrap() {
        CfList::DynamicChannel(frequencies) => {
            let expected = [867_100_000, 867_300_000, 867_500_000, 867_700_000, 867_900_000];
            for (freq, hz) in frequencies.iter().zip(expected) {
                assert_eq!(freq.value(), hz);
            }
        }
        CfList::FixedChannel(_) => panic!("expected a dynamic channel CFList"),
    }
}

#[test]
fn session_key_derivation() {
    let key = app_key();
    let join_request = JoinRequestPayload::new(phy_join_request_payload()).unwrap();
    let join_accept = DecryptedJoinAcceptPayload::new(phy_join_accept_payload(), &key).unwrap();

    let nwk_skey = join_accept.derive_nwkskey(&join_request.dev_nonce(), &key);
    assert_eq!(
        nwk_skey.inner().0,
        [0x7b, 0xb2, 0x5f, 0x89, 0xe0, 0xd1, 0x37, 0x1e, 0x1f, 0xbf, 0x4d, 0x99, 0x7e, 0x14,
         0x68, 0xa3]
    );

    let app_skey = join_accept.derive_appskey(&join_request.dev_nonce(), &key);
    assert_eq!(
        app_skey.inner().0,
        [0x14, 0x88, 0x20, 0xdf, 0xb1, 0xe0, 0xc9, 0xd6, 0x28, 0x9c, 0xde, 0x16, 0xc1, 0xaf,
         0x24, 0x9f]
    );
}

#[test]
fn data_mic_validation() {
    let phy = EncryptedDataPayload::new(phy_dataup_payload()).unwrap();
    assert_eq!(phy.mic(), MIC([0xd6, 0xc3, 0xb5, 0x82]));
    assert!(phy.validate_mic(&AES128([2; 16]), 1));
    assert!(!phy.validate_mic(&AES128([3; 16]), 1));
    assert!(!phy.validate_mic(&AES128([2; 16]), 2));
}

#[test]
fn data_mic_uses_full_32_bit_counter() {
    // frame counter 76543 wraps to 0x2aff on the wire
    let phy = EncryptedDataPayload::new(phy_datadown_payload()).unwrap();
    assert_eq!(phy.fhdr().fcnt(), 0x2aff);
    assert!(phy.validate_mic(&AES128([2; 16]), 76_543));
    assert!(!phy.validate_mic(&AES128([2; 16]), 0x2aff));
}

#[test]
fn fhdr_fields() {
    let phy = EncryptedDataPayload::new(phy_dataup_payload()).unwrap();
    assert_eq!(phy.f_port(), Some(1));

    let fhdr = phy.fhdr();
    assert_eq!(fhdr.dev_addr(), DevAddr::new([4, 3, 2, 1]).unwrap());
    assert_eq!(fhdr.fcnt(), 1u16);

    let fctrl = fhdr.fctrl();
    assert_eq!(fctrl.f_opts_len(), 0);
    assert!(!fctrl.f_pending());
    assert!(!fctrl.ack());
    assert!(fctrl.adr());
}

#[test]
fn f_port_can_be_absent() {
    let bytes = &[0x80, 0x04, 0x03, 0x02, 0x01, 0x00, 0xff, 0x04, 0x01, 0x02, 0x03, 0x04];
    let phy = EncryptedDataPayload::new(bytes).unwrap();
    assert!(phy.f_port().is_none());
}

#[test]
fn uplink_decrypt() {
    let phy = EncryptedDataPayload::new(phy_dataup_payload()).unwrap();
    let key = AES128([1; 16]);
    let decrypted = phy.decrypt(None, Some(&key), 1).unwrap();
    assert_eq!(decrypted.frm_payload(), FRMPayload::Data(b"hello"));
}

#[test]
fn downlink_decrypt_with_large_fcnt() {
    let phy = EncryptedDataPayload::new(phy_datadown_payload()).unwrap();
    let key = AES128([1; 16]);
    let decrypted = phy.decrypt(None, Some(&key), 76_543).unwrap();
    assert_eq!(decrypted.frm_payload(), FRMPayload::Data(b"hello lora"));
}

#[test]
fn decrypt_without_required_key_fails() {
    let phy = EncryptedDataPayload::new(phy_dataup_payload()).unwrap();
    assert_eq!(phy.decrypt(None, None, 1), Err(Error::MissingKey));
}

#[test]
fn downlink_fopts_mac_commands() {
    let data = [
        0x60, 0x5f, 0x3b, 0xd7, 0x4e, 0x0a, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x70, 0x03, 0x00,
        0xff, 0x00, 0x30, 0xcd, 0xdb, 0x22, 0xee,
    ];
    let phy = EncryptedDataPayload::new(data).unwrap();
    assert_eq!(phy.mhdr().mtype(), MType::UnconfirmedDataDown);

    let fhdr = phy.fhdr();
    assert_eq!(fhdr.fopts().count(), 2);
    for cmd in fhdr.fopts() {
        assert!(matches!(
            cmd,
            lorawan_codec::maccommands::DownlinkMacCommand::LinkADRReq(_)
        ));
    }
}

#[test]
fn data_payload_uplink_round_trip_against_vector() {
    let mut buf = [0u8; 255];
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    let nwk_skey = NwkSKey::from([2; 16]);
    let app_skey = AppSKey::from([1; 16]);
    let fctrl = FCtrl::new(0x80, true);
    phy.set_confirmed(false)
        .set_uplink(true)
        .set_f_port(1)
        .set_dev_addr(&[4, 3, 2, 1])
        .set_fctrl(&fctrl)
        .set_fcnt(1);

    assert_eq!(
        phy.build(b"hello", &[], &nwk_skey, &app_skey).unwrap(),
        &phy_dataup_payload()[..]
    );
}

#[test]
fn data_payload_downlink_round_trip_against_vector() {
    let mut buf = [0u8; 255];
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    let nwk_skey = NwkSKey::from([2; 16]);
    let app_skey = AppSKey::from([1; 16]);
    let fctrl = FCtrl::new(0x80, false);
    phy.set_confirmed(true)
        .set_uplink(false)
        .set_f_port(42)
        .set_dev_addr(&[4, 3, 2, 1])
        .set_fctrl(&fctrl)
        .set_fcnt(76543);

    assert_eq!(
        phy.build(b"hello lora", &[], &nwk_skey, &app_skey).unwrap(),
        &phy_datadown_payload()[..]
    );
}

#[test]
fn encrypt_then_decrypt_is_identity() {
    let nwk_skey = NwkSKey::from([0x5a; 16]);
    let app_skey = AppSKey::from([0xa5; 16]);
    let payload = [0x17u8; 51];

    let mut buf = [0u8; 255];
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    phy.set_uplink(true).set_f_port(12).set_dev_addr(&[1, 2, 3, 4]).set_fcnt(7);
    let frame = phy.build(&payload, &[], &nwk_skey, &app_skey).unwrap().to_vec();

    let parsed = EncryptedDataPayload::new(frame).unwrap();
    assert!(parsed.validate_mic(nwk_skey.inner(), 7));
    let decrypted =
        parsed.decrypt(Some(nwk_skey.inner()), Some(app_skey.inner()), 7).unwrap();
    assert_eq!(decrypted.frm_payload(), FRMPayload::Data(&payload[..]));
}

#[test]
fn join_request_round_trip_against_vector() {
    let mut data = [0u8; 23];
    let mut phy = JoinRequestCreator::with_options(&mut data[..], DefaultFactory).unwrap();
    let key = AppKey::from([1; 16]);
    phy.set_app_eui(&[0x04, 0x03, 0x02, 0x01, 0x04, 0x03, 0x02, 0x01])
        .set_dev_eui(&[0x05, 0x04, 0x03, 0x02, 0x05, 0x04, 0x03, 0x02])
        .set_dev_nonce(&[0x2du8, 0x10]);

    assert_eq!(phy.build(&key), &phy_join_request_payload()[..]);

    let parsed = JoinRequestPayload::new(phy_join_request_payload()).unwrap();
    assert!(parsed.validate_mic(key.inner()));
    assert!(!parsed.validate_mic(&AES128([2; 16])));
}

#[test]
fn join_accept_creator_against_vector() {
    let mut buf = [0u8; 17];
    let mut phy = JoinAcceptCreator::new(&mut buf[..]).unwrap();
    let key = app_key();
    phy.set_app_nonce(&[0xc7, 0x0b, 0x57])
        .set_net_id(&[0x01, 0x11, 0x22])
        .set_dev_addr(&[0x80, 0x19, 0x03, 0x02])
        .set_dl_settings(0)
        .set_rx_delay(0);

    assert_eq!(phy.build(&key).unwrap(), &phy_join_accept_payload()[..]);
}

#[test]
fn creator_rejects_payload_on_port_zero() {
    let mut buf = [0u8; 255];
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    phy.set_f_port(0);
    assert_eq!(
        phy.build(b"hello", &[], &NwkSKey::from([2; 16]), &AppSKey::from([1; 16])),
        Err(CreatorError::DataAndMacCommandsInPayload)
    );
}

#[test]
fn creator_rejects_payload_without_port() {
    let mut buf = [0u8; 255];
    let mut phy = DataPayloadCreator::new(&mut buf[..]).unwrap();
    assert_eq!(
        phy.build(b"hello", &[], &NwkSKey::from([2; 16]), &AppSKey::from([1; 16])),
        Err(CreatorError::MissingFPort)
    );
}
