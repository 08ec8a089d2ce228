//! MIC and FRMPayload crypto building blocks.
//!
//! The block layouts follow LoRaWAN 1.0.2 §4.3.3 (B0 for the MIC) and
//! §4.3.1 (A_i for payload encryption). Both share the same first fifteen
//! bytes apart from the leading tag, so one helper fills them.
use crate::keys;
use generic_array::GenericArray;

/// Fills `block` with `tag ‖ 0x00·4 ‖ dir ‖ DevAddr ‖ FCnt32 ‖ 0x00 ‖ ?`.
///
/// `phy` must point at a data frame; the direction bit is taken from the
/// MHDR (bit 5 distinguishes uplink from downlink MTypes) and the DevAddr
/// from the FHDR.
fn fill_block_a(phy: &[u8], tag: u8, fcnt: u32, block: &mut [u8; 16]) {
    block[0] = tag;
    // block[1..5] stay zero
    block[5] = (phy[0] & 0x20) >> 5;
    block[6..10].copy_from_slice(&phy[1..5]);
    block[10] = (fcnt & 0xff) as u8;
    block[11] = ((fcnt >> 8) & 0xff) as u8;
    block[12] = ((fcnt >> 16) & 0xff) as u8;
    block[13] = ((fcnt >> 24) & 0xff) as u8;
    // block[14] stays zero, block[15] is set by the caller
}

fn mic_with_prefix<M: keys::Mac>(prefix: &[u8], msg: &[u8], mut cmac: M) -> keys::MIC {
    cmac.input(prefix);
    cmac.input(msg);
    let full = cmac.result();

    let mut mic = [0u8; 4];
    mic.copy_from_slice(&full[0..4]);
    keys::MIC(mic)
}

/// MIC of a data frame: CMAC over `B0 ‖ msg` truncated to four bytes.
pub fn calculate_data_mic<M: keys::Mac>(msg: &[u8], cmac: M, fcnt: u32) -> keys::MIC {
    let mut b0 = [0u8; 16];
    fill_block_a(msg, 0x49, fcnt, &mut b0);
    b0[15] = msg.len() as u8;
    mic_with_prefix(&b0, msg, cmac)
}

/// MIC of a join request or (decrypted) join accept: plain CMAC over the
/// message.
pub fn calculate_mic<M: keys::Mac>(msg: &[u8], cmac: M) -> keys::MIC {
    mic_with_prefix(&[], msg, cmac)
}

/// Encrypts (or, being an XOR stream, decrypts) `phy[start..end]` in place
/// with the LoRaWAN CTR construction.
pub fn encrypt_frm_data_payload<E: keys::Encrypter>(
    phy: &mut [u8],
    start: usize,
    end: usize,
    fcnt: u32,
    aes: &E,
) {
    let mut a = [0u8; 16];
    fill_block_a(phy, 0x01, fcnt, &mut a);

    let mut s = GenericArray::from([0u8; 16]);
    for i in 0..end - start {
        let j = i & 0x0f;
        if j == 0 {
            a[15] = (i >> 4) as u8 + 1;
            s.copy_from_slice(&a);
            aes.encrypt_block(&mut s);
        }
        phy[start + i] ^= s[j];
    }
}
