//! Little-endian packing primitives for the fixed-width integers the arena
//! stores inline (links, `keylen`, `datalen`). The time-instant packing
//! lives on [`crate::clock::Instant`] instead, since it packs to a
//! different width.

/// Byte width of a packed `u32`.
pub const U32_LEN: usize = 4;

/// Packs `value` into `out[..4]`, little-endian.
#[inline]
pub fn pack_u32(out: &mut [u8], value: u32) {
    out[..U32_LEN].copy_from_slice(&value.to_le_bytes());
}

/// Unpacks a little-endian `u32` from `bytes[..4]`.
#[inline]
pub fn unpack_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; U32_LEN];
    raw.copy_from_slice(&bytes[..U32_LEN]);
    u32::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let mut buf = [0u8; U32_LEN];
        pack_u32(&mut buf, 0xdead_beef);
        assert_eq!(unpack_u32(&buf), 0xdead_beef);
    }
}
