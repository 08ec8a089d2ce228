use crate::nb_device::radio::{Event, LbtConfig, PhyRxTx, Response, RfConfig, RxQuality, Timings};
use crate::nb_device::Device;
use crate::region::{Configuration, Region};
use crate::test_util::{RxTxHandler, Uplink};
use lorawan_codec::default_crypto;

pub fn test_device(region: Region) -> Device<TestRadio, default_crypto::DefaultFactory, rand::rngs::OsRng, 255, 3> {
    Device::new(Configuration::new(region), TestRadio::default(), rand::rngs::OsRng)
}

#[derive(Debug)]
pub struct TestRadio {
    current_config: Option<RfConfig>,
    last_uplink: Option<Uplink>,
    rxtx_handler: Option<RxTxHandler>,
    /// Timestamp reported with TxDone.
    pub tx_done_time: u32,
    /// When set, carrier sense reports these frequencies busy.
    pub busy_frequencies: std::vec::Vec<u32>,
    pub carrier_sense_calls: usize,
    buffer: [u8; 256],
    buffer_index: usize,
}

impl TestRadio {
    pub fn set_rxtx_handler(&mut self, handler: RxTxHandler) {
        self.rxtx_handler = Some(handler);
    }

    pub fn take_last_uplink(&mut self) -> Option<Uplink> {
        self.last_uplink.take()
    }

    pub fn current_config(&self) -> Option<RfConfig> {
        self.current_config
    }
}

impl Default for TestRadio {
    fn default() -> Self {
        Self {
            current_config: None,
            last_uplink: None,
            rxtx_handler: None,
            tx_done_time: 0,
            busy_frequencies: std::vec::Vec::new(),
            carrier_sense_calls: 0,
            buffer: [0; 256],
            buffer_index: 0,
        }
    }
}

impl PhyRxTx for TestRadio {
    type PhyEvent = ();
    type PhyError = &'static str;
    type PhyResponse = ();

    const MAX_RADIO_POWER: u8 = 26;
    const ANTENNA_GAIN: i8 = 0;

    fn get_received_packet(&mut self) -> &mut [u8] {
        &mut self.buffer[..self.buffer_index]
    }

    fn handle_event(&mut self, event: Event<'_, Self>) -> Result<Response<Self>, Self::PhyError>
    where
        Self: Sized,
    {
        match event {
            Event::TxRequest(config, buf) => {
                // ensure the previous uplink was always consumed
                if self.last_uplink.is_some() {
                    panic!("last uplink not consumed");
                }
                self.last_uplink =
                    Some(Uplink::new(buf, config).map_err(|_| "error creating uplink")?);
                return Ok(Response::TxDone(self.tx_done_time));
            }
            Event::RxRequest(rx_config) => {
                self.current_config = Some(rx_config.rf);
            }
            Event::CancelRx => (),
            Event::TxContinuousWave { .. } => (),
            Event::Phy(()) => {
                if let (Some(rf_config), Some(rxtx_handler)) =
                    (self.current_config, self.rxtx_handler)
                {
                    self.buffer_index =
                        rxtx_handler(self.last_uplink.take(), rf_config, &mut self.buffer);
                    return Ok(Response::RxDone(RxQuality::new(-80, 7)));
                }
            }
        }
        Ok(Response::Idle)
    }

    fn perform_carrier_sense(
        &mut self,
        frequency: u32,
        _lbt: LbtConfig,
    ) -> Result<bool, Self::PhyError> {
        self.carrier_sense_calls += 1;
        Ok(!self.busy_frequencies.contains(&frequency))
    }
}

impl Timings for TestRadio {
    fn get_rx_error_ms(&self) -> u32 {
        10
    }
    fn get_wake_up_time_ms(&self) -> u32 {
        2
    }
}
