use crate::error::{Result, SyncError};
use crate::page::{Chunk, WirePage, WirePageRef};
use std::io::{Read, Write};

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CodecId {
    Store = 0,
    Zstd = 1,
}

impl TryFrom<u8> for CodecId {
    type Error = SyncError;

    fn try_from(b: u8) -> Result<Self> {
        match b {
            0 => Ok(CodecId::Store),
            1 => Ok(CodecId::Zstd),
            other => Err(SyncError::Decode(format!("unknown codec id {other}"))),
        }
    }
}

impl CodecId {
    /// `Store` is a plain copy; `level` only matters for zstd.
    fn compress(self, src: &mut dyn Read, dst: &mut dyn Write, level: i32) -> Result<u64> {
        match self {
            CodecId::Store => Ok(std::io::copy(src, dst)?),
            CodecId::Zstd => zstdc::compress(src, dst, level),
        }
    }

    fn decompress(self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64> {
        match self {
            CodecId::Store => Ok(std::io::copy(src, dst)?),
            CodecId::Zstd => zstdc::decompress(src, dst),
        }
    }
}

mod zstdc;

/// Page encoder. Encoded form is `[codec id][compressed CBOR]`, so the
/// receiving side never needs to be told which codec the sender picked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Codec {
    pub id: CodecId,
    pub level: i32,
}

impl Default for Codec {
    fn default() -> Self {
        Self {
            id: CodecId::Zstd,
            level: 3,
        }
    }
}

impl Codec {
    pub fn store() -> Self {
        Self {
            id: CodecId::Store,
            level: 0,
        }
    }

    pub fn encode(&self, chunk: &Chunk) -> Result<Vec<u8>> {
        let mut cbor = Vec::new();
        ciborium::into_writer(&WirePageRef::from(chunk), &mut cbor)
            .map_err(|e| SyncError::Protocol(format!("page encode: {e}")))?;

        let mut out = Vec::with_capacity(cbor.len() / 2 + 1);
        out.push(self.id as u8);
        self.id.compress(&mut &cbor[..], &mut out, self.level)?;
        Ok(out)
    }
}

pub fn decode(bytes: &[u8]) -> Result<Chunk> {
    let (&tag, body) = bytes
        .split_first()
        .ok_or_else(|| SyncError::Decode("empty payload".into()))?;
    let id = CodecId::try_from(tag)?;

    let mut cbor = Vec::new();
    id.decompress(&mut &body[..], &mut cbor)
        .map_err(|e| SyncError::Decode(format!("decompress: {e}")))?;

    let wire: WirePage = ciborium::from_reader(&cbor[..])
        .map_err(|e| SyncError::Decode(format!("page decode: {e}")))?;
    Chunk::try_from(wire).map_err(SyncError::Decode)
}

/// Hex BLAKE3 over the encoded bytes exactly as they travel.
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

pub fn verify(bytes: &[u8], expected: &str) -> bool {
    match parse_digest(expected) {
        Some(want) => blake3::hash(bytes) == blake3::Hash::from_bytes(want),
        None => false,
    }
}

fn parse_digest(hex_str: &str) -> Option<[u8; 32]> {
    let bytes = hex::decode(hex_str.trim()).ok()?;
    bytes.try_into().ok()
}

/// Encoded page plus the digest taken over exactly those bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkEnvelope {
    pub bytes: Vec<u8>,
    pub checksum: String,
}

impl ChunkEnvelope {
    pub fn seal(codec: &Codec, chunk: &Chunk) -> Result<Self> {
        let bytes = codec.encode(chunk)?;
        let checksum = digest(&bytes);
        Ok(Self { bytes, checksum })
    }

    pub fn verify(&self) -> bool {
        verify(&self.bytes, &self.checksum)
    }

    /// Checks the digest before touching the payload; a mismatch is reported
    /// as `CorruptedChunk` so the caller can ask again.
    pub fn open(&self, table: &str, offset: u64) -> Result<Chunk> {
        if !self.verify() {
            return Err(SyncError::CorruptedChunk {
                table: table.to_string(),
                offset,
            });
        }
        decode(&self.bytes)
    }
}
