//! Entry layout: `link(4) | keylen(4) | datalen(4) | expire(8) | key | data`.

use ringcache_common::clock::{Instant, PACKED_LEN as INSTANT_LEN};

use crate::arena;

/// Fixed header size in bytes, before the variable-length key and data.
pub const HEADER_LEN: u32 = 4 + 4 + 4 + INSTANT_LEN as u32;

const LINK_OFFSET: u32 = 0;
const KEYLEN_OFFSET: u32 = 4;
const DATALEN_OFFSET: u32 = 8;
const EXPIRE_OFFSET: u32 = 12;
const BODY_OFFSET: u32 = HEADER_LEN;

/// Total on-arena size of an entry with the given key/data lengths.
pub fn entry_len(keylen: u32, datalen: u32) -> u32 {
    HEADER_LEN + keylen + datalen
}

/// Reads the XOR link word stored at `pos`.
pub fn read_link(buf: &[u8], size: u32, pos: u32) -> u32 {
    arena::read_u32(buf, size, pos + LINK_OFFSET)
}

/// Overwrites the XOR link word stored at `pos`.
pub fn write_link(buf: &mut [u8], size: u32, pos: u32, value: u32) {
    arena::write_u32(buf, size, pos + LINK_OFFSET, value);
}

/// Reads the `keylen` field at `pos`.
pub fn read_keylen(buf: &[u8], size: u32, pos: u32) -> u32 {
    arena::read_u32(buf, size, pos + KEYLEN_OFFSET)
}

/// Reads the `datalen` field at `pos`.
pub fn read_datalen(buf: &[u8], size: u32, pos: u32) -> u32 {
    arena::read_u32(buf, size, pos + DATALEN_OFFSET)
}

/// Reads the packed expiry instant at `pos`.
pub fn read_expire(buf: &[u8], size: u32, pos: u32) -> Instant {
    let bytes = arena::read_bytes(buf, size, pos + EXPIRE_OFFSET, INSTANT_LEN as u32);
    Instant::unpack(bytes)
}

/// Returns the key slice for the entry at `pos`, given its `keylen`.
pub fn key_slice<'a>(buf: &'a [u8], size: u32, pos: u32, keylen: u32) -> &'a [u8] {
    arena::read_bytes(buf, size, pos + BODY_OFFSET, keylen)
}

/// Returns the data slice for the entry at `pos`, given its `keylen`/`datalen`.
pub fn data_slice<'a>(buf: &'a [u8], size: u32, pos: u32, keylen: u32, datalen: u32) -> &'a [u8] {
    arena::read_bytes(buf, size, pos + BODY_OFFSET + keylen, datalen)
}

/// Writes a complete entry at `pos`: header fields, then key, then data.
#[allow(clippy::too_many_arguments)]
pub fn write_entry(
    buf: &mut [u8],
    size: u32,
    pos: u32,
    link: u32,
    keylen: u32,
    datalen: u32,
    expire: Instant,
    key: &[u8],
    data: &[u8],
) {
    write_link(buf, size, pos, link);
    arena::write_u32(buf, size, pos + KEYLEN_OFFSET, keylen);
    arena::write_u32(buf, size, pos + DATALEN_OFFSET, datalen);
    let mut packed = [0u8; INSTANT_LEN];
    expire.pack(&mut packed);
    arena::write_bytes(buf, size, pos + EXPIRE_OFFSET, &packed);
    arena::write_bytes(buf, size, pos + BODY_OFFSET, key);
    arena::write_bytes(buf, size, pos + BODY_OFFSET + keylen, data);
}
