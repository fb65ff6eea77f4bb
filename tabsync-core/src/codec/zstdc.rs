use crate::error::Result;
use std::io::{Read, Write};

pub(super) fn compress(src: &mut dyn Read, dst: &mut dyn Write, level: i32) -> Result<u64> {
    let mut enc = zstd::stream::Encoder::new(dst, level.max(1))?;
    // Pages are small; keep the frame self-contained with a checksum of its own.
    enc.include_checksum(true)?;
    let written_uncompressed = std::io::copy(src, &mut enc)?;
    enc.finish()?;
    Ok(written_uncompressed)
}

pub(super) fn decompress(src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64> {
    let mut dec = zstd::stream::Decoder::new(src)?;
    Ok(std::io::copy(&mut dec, dst)?)
}
