#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Feature flags
#![doc = document_features::document_features!(feature_label = r#"<span class="stab portability"><code>{feature}</code></span>"#)]
//!
//! A LoRaWAN 1.0.2 Class A device stack: ten regional PHY policies, a MAC
//! engine driven as a synchronous state machine from a deferred-work
//! queue, and a thin device supervisor between the two and the
//! application.

use heapless::Vec;

mod fmt;

mod radio;
pub use radio::{LbtConfig, RxQuality};

pub mod mac;

pub mod region;
pub use region::Region;

pub mod nb_device;

#[cfg(test)]
mod test_util;

pub use lorawan_codec as codec;
#[cfg(feature = "default-crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "default-crypto")))]
pub use lorawan_codec::default_crypto;
pub use lorawan_codec::{
    keys::{AppEui, AppKey, AppSKey, CryptoFactory, DevEui, NwkSKey},
    parser::DevAddr,
};

pub use rand_core::RngCore;

/// One received application downlink, with its radio metadata.
pub struct Downlink {
    pub data: Vec<u8, 256>,
    pub fport: u8,
    pub quality: RxQuality,
    /// The receive window (1 or 2) the frame arrived in.
    pub rx_slot: u8,
    /// The network has more frames queued for this device.
    pub f_pending: bool,
}

#[cfg(feature = "defmt-03")]
impl defmt::Format for Downlink {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Downlink {{ fport: {}, data: ", self.fport,);
        for byte in self.data.iter() {
            defmt::write!(f, "{:02x}", byte);
        }
        defmt::write!(f, " }}")
    }
}

/// How to establish a session: a join exchange or provisioned keys.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JoinMode {
    OTAA {
        deveui: DevEui,
        appeui: AppEui,
        appkey: AppKey,
        /// Join attempts before giving up with a join failure.
        nb_trials: u8,
    },
    ABP {
        nwkskey: NwkSKey,
        appskey: AppSKey,
        devaddr: DevAddr<[u8; 4]>,
    },
}
