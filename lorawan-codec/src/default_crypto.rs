//! Software crypto backend built on the RustCrypto `aes` and `cmac` crates.
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use generic_array::{typenum::U16, GenericArray};

use crate::creator::{DataPayloadCreator, Error as CreatorError, JoinAcceptCreator, JoinRequestCreator};
use crate::keys::{AppKey, CryptoFactory, Decrypter, Encrypter, Mac, AES128};
use crate::parser::{
    DecryptedJoinAcceptPayload, EncryptedDataPayload, EncryptedJoinAcceptPayload, Error,
    JoinRequestPayload,
};

pub type Cmac = cmac::Cmac<Aes128>;

/// The default [`CryptoFactory`].
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultFactory;

impl CryptoFactory for DefaultFactory {
    type E = Aes128;
    type D = Aes128;
    type M = Cmac;

    fn new_enc(&self, key: &AES128) -> Self::E {
        Aes128::new(GenericArray::from_slice(&key.0[..]))
    }

    fn new_dec(&self, key: &AES128) -> Self::D {
        Aes128::new(GenericArray::from_slice(&key.0[..]))
    }

    fn new_mac(&self, key: &AES128) -> Self::M {
        cmac::Mac::new(GenericArray::from_slice(&key.0[..]))
    }
}

impl Encrypter for Aes128 {
    fn encrypt_block(&self, block: &mut GenericArray<u8, U16>) {
        BlockEncrypt::encrypt_block(self, block);
    }
}

impl Decrypter for Aes128 {
    fn decrypt_block(&self, block: &mut GenericArray<u8, U16>) {
        BlockDecrypt::decrypt_block(self, block);
    }
}

impl Mac for Cmac {
    fn input(&mut self, data: &[u8]) {
        cmac::Mac::update(self, data);
    }

    fn reset(&mut self) {
        cmac::Mac::reset(self);
    }

    fn result(self) -> GenericArray<u8, U16> {
        cmac::Mac::finalize(self).into_bytes()
    }
}

impl<D: AsMut<[u8]>> JoinRequestCreator<D, DefaultFactory> {
    /// [`JoinRequestCreator::with_options`] with the software crypto.
    pub fn new(buf: D) -> Result<Self, CreatorError> {
        Self::with_options(buf, DefaultFactory)
    }
}

impl<D: AsMut<[u8]>> JoinAcceptCreator<D, DefaultFactory> {
    /// [`JoinAcceptCreator::with_options`] with the software crypto.
    pub fn new(buf: D) -> Result<Self, CreatorError> {
        Self::with_options(buf, DefaultFactory)
    }
}

impl<D: AsMut<[u8]>> DataPayloadCreator<D, DefaultFactory> {
    /// [`DataPayloadCreator::with_options`] with the software crypto.
    pub fn new(buf: D) -> Result<Self, CreatorError> {
        Self::with_options(buf, DefaultFactory)
    }
}

impl<T: AsRef<[u8]>> JoinRequestPayload<T, DefaultFactory> {
    pub fn new(data: T) -> Result<Self, Error> {
        Self::new_with_factory(data, DefaultFactory)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> EncryptedJoinAcceptPayload<T, DefaultFactory> {
    pub fn new(data: T) -> Result<Self, Error> {
        Self::new_with_factory(data, DefaultFactory)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> DecryptedJoinAcceptPayload<T, DefaultFactory> {
    /// Decrypts `data` with `key` and verifies the MIC.
    pub fn new(data: T, key: &AppKey) -> Result<Self, Error> {
        let decrypted = EncryptedJoinAcceptPayload::new(data)?.decrypt(key);
        if decrypted.validate_mic(key) {
            Ok(decrypted)
        } else {
            Err(Error::InvalidMic)
        }
    }
}

impl<T: AsRef<[u8]>> EncryptedDataPayload<T, DefaultFactory> {
    pub fn new(data: T) -> Result<Self, Error> {
        Self::new_with_factory(data, DefaultFactory)
    }
}
