//! Key material and the crypto seam used by the parser and the creators.
use crate::parser::EUI64;
use generic_array::{typenum::U16, GenericArray};

/// A raw 128-bit AES key.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct AES128(pub [u8; 16]);

impl From<[u8; 16]> for AES128 {
    fn from(v: [u8; 16]) -> Self {
        AES128(v)
    }
}

/// A 4-byte LoRaWAN message integrity code.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct MIC(pub [u8; 4]);

impl From<[u8; 4]> for MIC {
    fn from(v: [u8; 4]) -> Self {
        MIC(v)
    }
}

macro_rules! aes_key_newtype {
    (
        $(#[$outer:meta])*
        pub struct $type:ident;
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
        pub struct $type(pub(crate) AES128);

        impl From<[u8; 16]> for $type {
            fn from(key: [u8; 16]) -> Self {
                $type(AES128(key))
            }
        }

        impl $type {
            pub fn inner(&self) -> &AES128 {
                &self.0
            }
        }

        impl AsRef<[u8]> for $type {
            fn as_ref(&self) -> &[u8] {
                &self.0 .0
            }
        }

        impl core::str::FromStr for $type {
            type Err = hex::FromHexError;

            /// Parses a key from its 32-character MSB-first hex form.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let mut key = [0u8; 16];
                hex::decode_to_slice(s, &mut key)?;
                Ok(key.into())
            }
        }
    };
}

aes_key_newtype!(
    /// The OTAA root key, entered MSB-first as provisioned on the network
    /// server.
    pub struct AppKey;
);
aes_key_newtype!(
    /// Network session key; derived during OTAA join or provisioned for ABP.
    pub struct NwkSKey;
);
aes_key_newtype!(
    /// Application session key; derived during OTAA join or provisioned for
    /// ABP.
    pub struct AppSKey;
);

macro_rules! eui_newtype {
    (
        $(#[$outer:meta])*
        pub struct $type:ident;
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
        pub struct $type(EUI64<[u8; 8]>);

        impl From<[u8; 8]> for $type {
            fn from(bytes: [u8; 8]) -> Self {
                $type(EUI64::from(bytes))
            }
        }

        impl From<$type> for EUI64<[u8; 8]> {
            fn from(eui: $type) -> Self {
                eui.0
            }
        }

        impl AsRef<[u8]> for $type {
            fn as_ref(&self) -> &[u8] {
                self.0.as_ref()
            }
        }
    };
}

eui_newtype!(
    /// Device EUI, stored LSB-first (wire order of the join request).
    pub struct DevEui;
);
eui_newtype!(
    /// Application (join) EUI, stored LSB-first (wire order of the join
    /// request).
    pub struct AppEui;
);

/// AES-128 block encryption.
pub trait Encrypter {
    fn encrypt_block(&self, block: &mut GenericArray<u8, U16>);
}

/// AES-128 block decryption.
pub trait Decrypter {
    fn decrypt_block(&self, block: &mut GenericArray<u8, U16>);
}

/// AES-CMAC computation.
pub trait Mac {
    fn input(&mut self, data: &[u8]);
    fn reset(&mut self);
    fn result(self) -> GenericArray<u8, U16>;
}

/// Factory over the crypto primitives, letting implementations back the
/// codec with hardware AES where available.
pub trait CryptoFactory {
    type E: Encrypter;
    type D: Decrypter;
    type M: Mac;

    fn new_enc(&self, key: &AES128) -> Self::E;
    fn new_dec(&self, key: &AES128) -> Self::D;
    fn new_mac(&self, key: &AES128) -> Self::M;
}
