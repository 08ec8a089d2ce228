use super::radio as device_radio;
use super::{DeviceState, Error, Event, Response};
use crate::region::{Channel, Region, MAX_CHANNELS};
use crate::test_util::*;
use lorawan_codec::maccommands::{
    parse_uplink_mac_commands, DownlinkMacCommand, RXParamSetupReqPayload,
    SerializableMacCommand, UplinkMacCommand,
};
use lorawan_codec::types::DataRateRange;
use lorawan_codec::types::DR;

mod util;
use util::{test_device, TestRadio};

type Device =
    super::Device<TestRadio, lorawan_codec::default_crypto::DefaultFactory, rand::rngs::OsRng, 255, 3>;

/// Fires requested timeouts until the state machine settles, consuming
/// captured uplinks along the way. Returns the terminal response and the
/// uplinks seen.
fn run_timeouts(device: &mut Device, first: Response) -> (Response, std::vec::Vec<Uplink>) {
    let mut uplinks = std::vec::Vec::new();
    let mut response = first;
    for _ in 0..64 {
        if let Some(uplink) = device.get_radio().take_last_uplink() {
            uplinks.push(uplink);
        }
        match response {
            Response::TimeoutRequest(at) => {
                response = device.handle_event(Event::TimeoutFired(at)).unwrap();
            }
            terminal => return (terminal, uplinks),
        }
    }
    panic!("state machine did not settle");
}

fn connect_abp(device: &mut Device) {
    let response = device.join(get_abp_credentials(), 0).unwrap();
    assert_eq!(response, Response::Connected);
}

#[test]
#[cfg(feature = "region-eu868")]
fn otaa_join_eu868() {
    let mut device = test_device(Region::EU868);
    device.get_radio().set_rxtx_handler(handle_join_request);

    let response = device.join(get_otaa_credentials(), 0).unwrap();
    assert_eq!(device.device_state(), DeviceState::Joining);

    // RX1 of a join opens five seconds after TX end, armed slightly early
    let Response::TimeoutRequest(t1) = response else {
        panic!("expected an RX1 timer, got {response:?}");
    };
    assert!((4950..=5010).contains(&t1), "RX1 timer at {t1}");

    let response = device.handle_event(Event::TimeoutFired(t1)).unwrap();
    assert!(matches!(response, Response::TimeoutRequest(_)));

    // the fake network answers in RX1
    let response = device
        .handle_event(Event::RadioEvent(device_radio::Event::Phy(()), t1 + 20))
        .unwrap();
    assert_eq!(response, Response::Connected);
    assert_eq!(device.device_state(), DeviceState::Idle);
    assert!(device.ready_to_send_data());

    let session = device.get_session().unwrap();
    assert_eq!(session.fcnt_up(), 0);

    // the three EU868 default channels survive the join untouched
    let mut channels: heapless::Vec<Channel, MAX_CHANNELS> = heapless::Vec::new();
    device.get_enabled_channels(&mut channels);
    let frequencies: std::vec::Vec<u32> = channels.iter().map(|c| c.frequency).collect();
    assert_eq!(frequencies, [868_100_000, 868_300_000, 868_500_000]);
}

#[test]
#[cfg(feature = "region-eu868")]
fn abp_activation_is_immediate() {
    let mut device = test_device(Region::EU868);
    connect_abp(&mut device);
    assert_eq!(device.device_state(), DeviceState::Idle);
    assert!(device.ready_to_send_data());
    assert_eq!(device.get_fcnt_up(), Some(0));
}

#[test]
#[cfg(feature = "region-eu868")]
fn unconfirmed_send_at_payload_cap() {
    let mut device = test_device(Region::EU868);
    connect_abp(&mut device);

    // 51 bytes is exactly the EU868 DR0 cap
    let data = [0xAB; 51];
    let (queued, response) = device.send(&data, 1, false, 0).unwrap();
    assert_eq!(queued, 51);
    let (terminal, uplinks) = run_timeouts(&mut device, response);
    assert_eq!(terminal, Response::TxDone);
    assert_eq!(device.get_fcnt_up(), Some(1));

    // the emitted frame used the pre-increment counter
    let mut uplink = uplinks.into_iter().next().unwrap();
    let decrypted = decrypt_uplink(&mut uplink, 0);
    assert_eq!(decrypted.fhdr().fcnt(), 0);
    assert_eq!(decrypted.f_port(), Some(1));
}

#[test]
#[cfg(feature = "region-eu868")]
fn oversized_payload_queues_what_fits() {
    let mut device = test_device(Region::EU868);
    connect_abp(&mut device);

    // 52 bytes against the 51-byte DR0 cap: the prefix goes out, the
    // remainder stays with the caller
    let mut data = [0u8; 52];
    for (i, byte) in data.iter_mut().enumerate() {
        *byte = i as u8;
    }
    let (queued, response) = device.send(&data, 1, false, 0).unwrap();
    assert_eq!(queued, 51);
    assert_eq!(device.pending_bytes(), 1);

    let (terminal, uplinks) = run_timeouts(&mut device, response);
    assert_eq!(terminal, Response::TxDone);

    let mut uplink = uplinks.into_iter().next().unwrap();
    let decrypted = decrypt_uplink(&mut uplink, 0);
    match decrypted.frm_payload() {
        lorawan_codec::parser::FRMPayload::Data(payload) => assert_eq!(payload, &data[..51]),
        other => panic!("expected a data payload, got {other:?}"),
    }

    // a send that fits leaves nothing pending
    let (queued, _) = device.send(&data[51..], 1, false, 600_000).unwrap();
    assert_eq!(queued, 1);
    assert_eq!(device.pending_bytes(), 0);
}

#[test]
#[cfg(feature = "region-eu868")]
fn duty_cycle_restricts_the_next_uplink() {
    let mut device = test_device(Region::EU868);
    connect_abp(&mut device);

    let (_, response) = device.send(&[0x42; 51], 1, false, 0).unwrap();
    let (terminal, _) = run_timeouts(&mut device, response);
    assert_eq!(terminal, Response::TxDone);

    // 1% duty cycle: ~3 s of SF12 airtime locks the band for minutes
    let (_, response) = device.send(&[0x42; 11], 2, false, 10_000).unwrap();
    match response {
        Response::TimeoutRequest(at) => assert!(at > 100_000, "back-off only until {at}"),
        other => panic!("expected a duty-cycle back-off, got {other:?}"),
    }

    // while waiting, further sends would overlap
    assert!(matches!(device.send(&[1], 1, false, 11_000), Err(Error::WouldBlock)));
}

#[test]
#[cfg(feature = "region-eu868")]
fn confirmed_send_acknowledged_in_rx1() {
    fn ack_handler(
        uplink: Option<Uplink>,
        _config: crate::radio::RfConfig,
        rx_buffer: &mut [u8],
    ) -> usize {
        let mut uplink = uplink.expect("uplink must be present");
        let decrypted = decrypt_uplink(&mut uplink, 0);
        assert!(decrypted.is_confirmed());
        build_downlink(rx_buffer, 0, None, &[], &[], true, false)
    }

    let mut device = test_device(Region::EU868);
    connect_abp(&mut device);
    device.get_radio().set_rxtx_handler(ack_handler);

    let (_, response) = device.send(&[1; 11], 1, true, 0).unwrap();
    let Response::TimeoutRequest(t1) = response else {
        panic!("expected RX1 timer");
    };
    let response = device.handle_event(Event::TimeoutFired(t1)).unwrap();
    assert!(matches!(response, Response::TimeoutRequest(_)));

    let response = device
        .handle_event(Event::RadioEvent(device_radio::Event::Phy(()), t1 + 10))
        .unwrap();
    assert_eq!(response, Response::DownlinkReceived { fcnt: 0, acknowledged: true });
    assert_eq!(device.get_fcnt_up(), Some(1));
}

#[test]
#[cfg(feature = "region-eu868")]
fn confirmed_send_retries_then_gives_up() {
    let mut device = test_device(Region::EU868);
    connect_abp(&mut device);
    device.set_confirmed_msg_retry(3).unwrap();

    let (_, response) = device.send(&[7; 11], 1, true, 0).unwrap();
    let (terminal, uplinks) = run_timeouts(&mut device, response);
    assert_eq!(terminal, Response::NoAck);

    // three transmissions of the identical frame (same FCnt on the wire)
    assert_eq!(uplinks.len(), 3);
    let mut frames = uplinks.into_iter();
    let mut first = frames.next().unwrap();
    let reference = decrypt_uplink(&mut first, 0).as_bytes().to_vec();
    for mut retry in frames {
        assert_eq!(decrypt_uplink(&mut retry, 0).as_bytes(), &reference[..]);
    }

    // the counter advances once, when the exchange is abandoned
    assert_eq!(device.get_fcnt_up(), Some(1));
}

#[test]
#[cfg(feature = "region-eu868")]
fn invalid_ports_are_rejected() {
    let mut device = test_device(Region::EU868);
    connect_abp(&mut device);

    for port in [0u8, 224, 225, 255] {
        assert!(
            matches!(device.send(&[1], port, false, 0), Err(Error::PortInvalid)),
            "port {port} must be rejected"
        );
    }
}

#[test]
#[cfg(feature = "region-eu868")]
fn send_requires_a_session() {
    let mut device = test_device(Region::EU868);
    assert!(matches!(device.send(&[1], 1, false, 0), Err(Error::NoNetworkJoined)));
    assert!(matches!(device.receive(None, &mut [0; 8]), Err(Error::NoActiveSession)));
}

#[test]
#[cfg(feature = "region-eu868")]
fn channel_plan_edit() {
    let mut device = test_device(Region::EU868);
    connect_abp(&mut device);

    device.drop_channel_list();
    let added = [
        Channel {
            id: 3,
            frequency: 867_100_000,
            rx1_frequency: 0,
            dr_range: DataRateRange::new_range(DR::_0, DR::_5),
            band: 1,
        },
        Channel {
            id: 4,
            frequency: 867_300_000,
            rx1_frequency: 0,
            dr_range: DataRateRange::new_range(DR::_0, DR::_5),
            band: 1,
        },
        Channel {
            id: 5,
            frequency: 867_500_000,
            rx1_frequency: 0,
            dr_range: DataRateRange::new_range(DR::_0, DR::_5),
            band: 1,
        },
    ];
    device.add_channels(&added).unwrap();

    let mut channels: heapless::Vec<Channel, MAX_CHANNELS> = heapless::Vec::new();
    device.get_enabled_channels(&mut channels);
    let frequencies: std::vec::Vec<u32> = channels.iter().map(|c| c.frequency).collect();
    assert_eq!(
        frequencies,
        [868_100_000, 868_300_000, 868_500_000, 867_100_000, 867_300_000, 867_500_000]
    );

    // defaults cannot be removed, additions can
    assert!(device.remove_channel(0).is_err());
    assert!(device.remove_channel(5).is_ok());
}

#[test]
#[cfg(feature = "region-eu868")]
fn receive_supports_partial_reads() {
    fn data_handler(
        uplink: Option<Uplink>,
        _config: crate::radio::RfConfig,
        rx_buffer: &mut [u8],
    ) -> usize {
        let _ = uplink;
        build_downlink(rx_buffer, 0, Some(42), &[10, 20, 30, 40, 50], &[], false, false)
    }

    let mut device = test_device(Region::EU868);
    connect_abp(&mut device);
    device.get_radio().set_rxtx_handler(data_handler);

    let (_, response) = device.send(&[1; 4], 1, false, 0).unwrap();
    let Response::TimeoutRequest(t1) = response else {
        panic!("expected RX1 timer");
    };
    device.handle_event(Event::TimeoutFired(t1)).unwrap();
    let response = device
        .handle_event(Event::RadioEvent(device_radio::Event::Phy(()), t1 + 10))
        .unwrap();
    assert!(matches!(response, Response::DownlinkReceived { .. }));

    // read on the wrong port: nothing
    assert!(matches!(device.receive(Some(7), &mut [0; 8]), Err(Error::WouldBlock)));

    let mut buf = [0u8; 3];
    assert_eq!(device.receive(Some(42), &mut buf).unwrap(), 3);
    assert_eq!(buf, [10, 20, 30]);
    // the remainder survives the first read
    assert_eq!(device.receive(Some(42), &mut buf).unwrap(), 2);
    assert_eq!(&buf[..2], &[40, 50]);
    assert!(matches!(device.receive(Some(42), &mut buf), Err(Error::WouldBlock)));
}

#[test]
#[cfg(feature = "region-eu868")]
fn sticky_answers_repeat_until_a_downlink() {
    fn rx_param_setup_handler(
        uplink: Option<Uplink>,
        _config: crate::radio::RfConfig,
        rx_buffer: &mut [u8],
    ) -> usize {
        let _ = uplink;
        // RX2 869.525 MHz / DR0, offset 0: acceptable on EU868
        let payload = [0x00, 0xd2, 0xa9, 0x84];
        let req = DownlinkMacCommand::RXParamSetupReq(
            RXParamSetupReqPayload::new(&payload).unwrap(),
        );
        let cmds: std::vec::Vec<&dyn SerializableMacCommand> = vec![&req];
        build_downlink(rx_buffer, 0, Some(1), &[0xff], &cmds, false, false)
    }

    fn empty_downlink_handler(
        uplink: Option<Uplink>,
        _config: crate::radio::RfConfig,
        rx_buffer: &mut [u8],
    ) -> usize {
        let _ = uplink;
        build_downlink(rx_buffer, 1, None, &[], &[], false, false)
    }

    let mut device = test_device(Region::EU868);
    connect_abp(&mut device);
    device.set_duty_cycle_enabled(false);
    device.get_radio().set_rxtx_handler(rx_param_setup_handler);

    // first exchange: the network commands new RX parameters
    let (_, response) = device.send(&[1], 1, false, 0).unwrap();
    let Response::TimeoutRequest(t1) = response else { panic!("expected RX1 timer") };
    device.handle_event(Event::TimeoutFired(t1)).unwrap();
    let response = device
        .handle_event(Event::RadioEvent(device_radio::Event::Phy(()), t1 + 10))
        .unwrap();
    assert!(matches!(response, Response::DownlinkReceived { .. }));

    let has_rx_param_ans = |uplink: &mut Uplink, fcnt: u32| {
        let decrypted = decrypt_uplink(uplink, fcnt);
        parse_uplink_mac_commands(decrypted.fhdr().data())
            .any(|cmd| matches!(cmd, UplinkMacCommand::RXParamSetupAns(_)))
    };

    // the answer rides the next uplink, and sticks while no downlink is
    // heard
    for (now, fcnt) in [(10_000u32, 1u32), (60_000, 2)] {
        let (_, response) = device.send(&[2], 1, false, now).unwrap();
        let (terminal, mut uplinks) = run_timeouts(&mut device, response);
        assert_eq!(terminal, Response::TxDone);
        assert_eq!(uplinks.len(), 1);
        assert!(has_rx_param_ans(&mut uplinks[0], fcnt), "sticky answer missing at {now}");
    }

    // a downlink retires it
    device.get_radio().set_rxtx_handler(empty_downlink_handler);
    let (_, response) = device.send(&[3], 1, false, 120_000).unwrap();
    let Response::TimeoutRequest(t1) = response else { panic!("expected RX1 timer") };
    device.handle_event(Event::TimeoutFired(t1)).unwrap();
    let response = device
        .handle_event(Event::RadioEvent(device_radio::Event::Phy(()), t1 + 10))
        .unwrap();
    assert!(matches!(response, Response::DownlinkReceived { .. }));

    device.get_radio().set_rxtx_handler(rx_param_setup_handler);
    let (_, response) = device.send(&[4], 1, false, 180_000).unwrap();
    let (_, mut uplinks) = run_timeouts(&mut device, response);
    // the sticky answer is gone; note this uplink counter is now 4
    let decrypted = decrypt_uplink(&mut uplinks[0], 4);
    assert_eq!(
        parse_uplink_mac_commands(decrypted.fhdr().data()).count(),
        0,
        "sticky answer must vanish after a downlink"
    );
}

#[test]
#[cfg(feature = "region-eu868")]
fn stale_downlink_counters_are_dropped() {
    fn fcnt_five_handler(
        uplink: Option<Uplink>,
        _config: crate::radio::RfConfig,
        rx_buffer: &mut [u8],
    ) -> usize {
        let _ = uplink;
        build_downlink(rx_buffer, 5, Some(9), &[1], &[], false, false)
    }

    fn fcnt_three_handler(
        uplink: Option<Uplink>,
        _config: crate::radio::RfConfig,
        rx_buffer: &mut [u8],
    ) -> usize {
        let _ = uplink;
        build_downlink(rx_buffer, 3, Some(9), &[2], &[], false, false)
    }

    let mut device = test_device(Region::EU868);
    connect_abp(&mut device);
    device.set_duty_cycle_enabled(false);

    device.get_radio().set_rxtx_handler(fcnt_five_handler);
    let (_, response) = device.send(&[1], 1, false, 0).unwrap();
    let Response::TimeoutRequest(t1) = response else { panic!("expected RX1 timer") };
    device.handle_event(Event::TimeoutFired(t1)).unwrap();
    let response = device
        .handle_event(Event::RadioEvent(device_radio::Event::Phy(()), t1 + 10))
        .unwrap();
    assert!(matches!(response, Response::DownlinkReceived { fcnt: 5, .. }));
    device.take_downlink().unwrap();

    // an older counter replays: the frame is silently ignored and the
    // windows run out
    device.get_radio().set_rxtx_handler(fcnt_three_handler);
    let (_, response) = device.send(&[2], 1, false, 10_000).unwrap();
    let Response::TimeoutRequest(t1) = response else { panic!("expected RX1 timer") };
    let mut response = device.handle_event(Event::TimeoutFired(t1)).unwrap();
    let stray = device
        .handle_event(Event::RadioEvent(device_radio::Event::Phy(()), t1 + 10))
        .unwrap();
    assert_eq!(stray, Response::NoUpdate);
    device.get_radio().take_last_uplink();
    let terminal = loop {
        match response {
            Response::TimeoutRequest(at) => {
                response = device.handle_event(Event::TimeoutFired(at)).unwrap();
            }
            other => break other,
        }
    };
    assert_eq!(terminal, Response::TxDone);
    assert!(device.take_downlink().is_none());
}

#[test]
#[cfg(feature = "region-kr920")]
fn lbt_exhaustion_is_a_scheduling_error() {
    let mut device = test_device(Region::KR920);
    connect_abp(&mut device);

    device.get_radio().busy_frequencies =
        vec![922_100_000, 922_300_000, 922_500_000];
    let (_, response) = device.send(&[1; 11], 1, false, 0).unwrap();
    assert_eq!(response, Response::TxSchedulingError);
    assert_eq!(device.get_radio().carrier_sense_calls, 3);

    // channels freed: the send goes out
    device.get_radio().busy_frequencies.clear();
    let (_, response) = device.send(&[1; 11], 1, false, 1000).unwrap();
    assert!(matches!(response, Response::TimeoutRequest(_)));
}

#[test]
#[cfg(feature = "region-eu868")]
fn disconnect_drops_the_session() {
    let mut device = test_device(Region::EU868);
    connect_abp(&mut device);
    assert_eq!(device.disconnect(), Response::Disconnected);
    assert_eq!(device.device_state(), DeviceState::Shutdown);
    assert!(device.get_session().is_none());
    assert!(matches!(device.send(&[1], 1, false, 0), Err(Error::NoNetworkJoined)));

    // a device can join again after shutdown
    connect_abp(&mut device);
    assert!(device.ready_to_send_data());
}
