// ── TP-Link local protocol primitives ──
//
// XOR autokey cipher: the key starts at 171 and becomes the previous
// ciphertext byte. Frames are a 4-byte big-endian length followed by the
// ciphertext.

use crate::error::Error;

/// Initial key of the autokey cipher.
const INITIAL_KEY: u8 = 171;

/// Largest frame accepted in either direction.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Encrypt a plaintext payload.
pub fn encrypt(plain: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    plain
        .iter()
        .map(|&byte| {
            key ^= byte;
            key
        })
        .collect()
}

/// Decrypt a ciphertext payload.
pub fn decrypt(cipher: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    cipher
        .iter()
        .map(|&byte| {
            let plain = key ^ byte;
            key = byte;
            plain
        })
        .collect()
}

/// Encrypt `payload` and prefix it with its big-endian length.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, Error> {
    let length = check_frame_len(payload.len())?;
    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(&encrypt(payload));
    Ok(frame)
}

/// Validate a frame length against [`MAX_FRAME_LEN`].
pub fn check_frame_len(length: usize) -> Result<u32, Error> {
    if length > MAX_FRAME_LEN {
        return Err(Error::FrameTooLarge {
            length,
            limit: MAX_FRAME_LEN,
        });
    }
    u32::try_from(length).map_err(|_| Error::FrameTooLarge {
        length,
        limit: MAX_FRAME_LEN,
    })
}
