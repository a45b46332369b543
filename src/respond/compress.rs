//! Gzip helpers for wire payloads.

use std::io::{Read, Write};

use bytes::Bytes;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::wire::WireError;

/// Cap on decompressed inbound payloads, so a hostile upload cannot
/// exhaust memory.
const MAX_DECOMPRESSED_BYTES: usize = 16 * 1024 * 1024;

pub fn gzip(data: &[u8]) -> Result<Bytes, WireError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data).map_err(WireError::Compression)?;
    encoder
        .finish()
        .map(Bytes::from)
        .map_err(WireError::Compression)
}

pub fn gunzip(data: &[u8]) -> Result<Bytes, WireError> {
    let mut decoder = GzDecoder::new(data).take((MAX_DECOMPRESSED_BYTES + 1) as u64);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(WireError::Decompression)?;
    if out.len() > MAX_DECOMPRESSED_BYTES {
        return Err(WireError::Decompression(std::io::Error::other(
            "decompressed payload exceeds size cap",
        )));
    }
    Ok(Bytes::from(out))
}
