use lorawan_codec::maccommandcreator::*;
use lorawan_codec::maccommands::*;
use lorawan_codec::types::ChannelMask;

#[test]
fn parse_downlink_chain() {
    // LinkADRReq ‖ DutyCycleReq ‖ RXTimingSetupReq
    let data = [
        0x03, 0x51, 0xff, 0x00, 0x01, 0x04, 0x02, 0x08, 0x05,
    ];
    let mut cmds = parse_downlink_mac_commands(&data);

    match cmds.next().unwrap() {
        DownlinkMacCommand::LinkADRReq(req) => {
            assert_eq!(req.data_rate(), 5);
            assert_eq!(req.tx_power(), 1);
            assert_eq!(req.channel_mask(), ChannelMask::new(&[0xff, 0x00]).unwrap());
            assert_eq!(req.redundancy().channel_mask_control(), 0);
            assert_eq!(req.redundancy().number_of_transmissions(), 1);
        }
        other => panic!("expected LinkADRReq, got {other:?}"),
    }
    match cmds.next().unwrap() {
        DownlinkMacCommand::DutyCycleReq(req) => {
            assert_eq!(req.max_duty_cycle(), 2);
            assert_eq!(req.aggregated_duty_cycle(), 4);
        }
        other => panic!("expected DutyCycleReq, got {other:?}"),
    }
    match cmds.next().unwrap() {
        DownlinkMacCommand::RXTimingSetupReq(req) => {
            assert_eq!(req.delay(), 5);
        }
        other => panic!("expected RXTimingSetupReq, got {other:?}"),
    }
    assert!(cmds.next().is_none());
}

#[test]
fn parse_stops_at_unknown_cid() {
    let data = [0x04, 0x01, 0x7f, 0x03, 0x51, 0xff, 0x00, 0x01];
    let mut cmds = parse_downlink_mac_commands(&data);
    assert!(matches!(cmds.next(), Some(DownlinkMacCommand::DutyCycleReq(_))));
    assert!(cmds.next().is_none());
}

#[test]
fn parse_truncated_payload_yields_nothing() {
    let data = [0x03, 0x51, 0xff];
    assert_eq!(parse_downlink_mac_commands(&data).count(), 0);
}

#[test]
fn link_check_ans_fields() {
    let data = [0x02, 0x14, 0x03];
    let mut cmds = parse_downlink_mac_commands(&data);
    match cmds.next().unwrap() {
        DownlinkMacCommand::LinkCheckAns(ans) => {
            assert_eq!(ans.margin(), 20);
            assert_eq!(ans.gateway_count(), 3);
        }
        other => panic!("expected LinkCheckAns, got {other:?}"),
    }
}

#[test]
fn rx_param_setup_req_fields() {
    let data = [0x05, 0x12, 0x28, 0x76, 0x84];
    let mut cmds = parse_downlink_mac_commands(&data);
    match cmds.next().unwrap() {
        DownlinkMacCommand::RXParamSetupReq(req) => {
            assert_eq!(req.dl_settings().rx1_dr_offset(), 1);
            assert_eq!(req.dl_settings().rx2_data_rate() as u8, 2);
            assert_eq!(req.frequency().value(), 868_100_000);
        }
        other => panic!("expected RXParamSetupReq, got {other:?}"),
    }
}

#[test]
fn new_channel_req_fields() {
    let data = [0x07, 0x03, 0x18, 0x4f, 0x84, 0x50];
    let mut cmds = parse_downlink_mac_commands(&data);
    match cmds.next().unwrap() {
        DownlinkMacCommand::NewChannelReq(req) => {
            assert_eq!(req.channel_index(), 3);
            assert_eq!(req.frequency().value(), 867_100_000);
            assert_eq!(req.data_rate_range().min_data_rate(), 0);
            assert_eq!(req.data_rate_range().max_data_rate(), 5);
        }
        other => panic!("expected NewChannelReq, got {other:?}"),
    }
}

#[test]
fn dl_channel_req_fields() {
    let data = [0x0a, 0x01, 0x28, 0x76, 0x84];
    let mut cmds = parse_downlink_mac_commands(&data);
    match cmds.next().unwrap() {
        DownlinkMacCommand::DlChannelReq(req) => {
            assert_eq!(req.channel_index(), 1);
            assert_eq!(req.frequency().value(), 868_100_000);
        }
        other => panic!("expected DlChannelReq, got {other:?}"),
    }
}

#[test]
fn tx_param_setup_req_fields() {
    let data = [0x09, 0x35];
    let mut cmds = parse_downlink_mac_commands(&data);
    match cmds.next().unwrap() {
        DownlinkMacCommand::TXParamSetupReq(req) => {
            assert!(req.downlink_dwell_time());
            assert!(req.uplink_dwell_time());
            assert_eq!(req.max_eirp(), 16);
        }
        other => panic!("expected TXParamSetupReq, got {other:?}"),
    }
}

#[test]
fn link_adr_ans_creator_bits() {
    let mut creator = LinkADRAnsCreator::new();
    creator.set_channel_mask_ack(true).set_data_rate_ack(false).set_tx_power_ack(true);
    assert_eq!(creator.build(), [0x03, 0x05]);
}

#[test]
fn rx_param_setup_ans_creator_bits() {
    let mut creator = RXParamSetupAnsCreator::new();
    creator
        .set_channel_ack(true)
        .set_rx2_data_rate_ack(true)
        .set_rx1_data_rate_offset_ack(true);
    assert_eq!(creator.build(), [0x05, 0x07]);
}

#[test]
fn dev_status_ans_creator_fields() {
    let mut creator = DevStatusAnsCreator::new();
    creator.set_battery(254).set_margin(-32).unwrap();
    assert_eq!(creator.build(), [0x06, 0xfe, 0x20]);

    let mut creator = DevStatusAnsCreator::new();
    assert!(creator.set_margin(32).is_err());
}

#[test]
fn zero_len_creators() {
    assert_eq!(LinkCheckReqCreator::new().build(), [0x02]);
    assert_eq!(DutyCycleAnsCreator::new().build(), [0x04]);
    assert_eq!(RXTimingSetupAnsCreator::new().build(), [0x08]);
    assert_eq!(TXParamSetupAnsCreator::new().build(), [0x09]);
}

#[test]
fn pack_then_unpack_answers() {
    let mut adr = LinkADRAnsCreator::new();
    adr.set_channel_mask_ack(true).set_data_rate_ack(true).set_tx_power_ack(true);
    let mut new_channel = NewChannelAnsCreator::new();
    new_channel.set_channel_frequency_ack(true).set_data_rate_range_ack(true);
    let mut dl_channel = DlChannelAnsCreator::new();
    dl_channel.set_channel_frequency_ack(true).set_uplink_frequency_exists_ack(false);

    let cmds: [&dyn SerializableMacCommand; 3] = [&adr, &new_channel, &dl_channel];
    assert_eq!(mac_commands_len(&cmds), 6);

    let mut buf = [0u8; 16];
    let written = build_mac_commands(&cmds, &mut buf).unwrap();
    assert_eq!(written, 6);

    let mut parsed = parse_uplink_mac_commands(&buf[..written]);
    match parsed.next().unwrap() {
        UplinkMacCommand::LinkADRAns(ans) => assert!(ans.ack()),
        other => panic!("expected LinkADRAns, got {other:?}"),
    }
    match parsed.next().unwrap() {
        UplinkMacCommand::NewChannelAns(ans) => assert!(ans.ack()),
        other => panic!("expected NewChannelAns, got {other:?}"),
    }
    match parsed.next().unwrap() {
        UplinkMacCommand::DlChannelAns(ans) => {
            assert!(ans.channel_freq_ack());
            assert!(!ans.uplink_freq_exists_ack());
        }
        other => panic!("expected DlChannelAns, got {other:?}"),
    }
    assert!(parsed.next().is_none());
}
