//! Message checksum helper.
//!
//! Tests use this to compute the integrity value a client should see on a
//! message without going through the server.

use crate::protocol::Message;
use crc32fast::Hasher;

/// Magic byte of the v0 message format.
pub const MESSAGE_MAGIC: i8 = 0;

/// Attributes byte; compression is not supported.
pub const MESSAGE_ATTRIBUTES: i8 = 0;

/// Compute the IEEE CRC-32 of a message over `magic | attributes | key | value`,
/// with key and value in their length-prefixed wire encoding.
pub fn compute_crc(message: &Message) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[MESSAGE_MAGIC as u8, MESSAGE_ATTRIBUTES as u8]);
    hash_bytes(&mut hasher, message.key.as_deref());
    hash_bytes(&mut hasher, message.value.as_deref());
    hasher.finalize()
}

fn hash_bytes(hasher: &mut Hasher, value: Option<&[u8]>) {
    match value {
        Some(b) => {
            hasher.update(&(b.len() as i32).to_be_bytes());
            hasher.update(b);
        }
        None => hasher.update(&(-1i32).to_be_bytes()),
    }
}
