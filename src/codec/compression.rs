//! Stream compression wrapped around encoded records
//!
//! Compression is applied to the whole encoded blob. The compressor is
//! finished before the blob is returned, so the output is always a complete
//! stream.

use std::borrow::Cow;
use std::io::{Read, Write};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

use super::errors::{CodecError, CodecResult};

/// Zstd level 0 selects the library default
const ZSTD_LEVEL: i32 = 0;

/// Compression applied to stored record files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zstd,
}

impl Compression {
    /// File name suffix appended after the format extension
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => ".gz",
            Compression::Zstd => ".zst",
        }
    }

    pub fn compress(&self, data: Vec<u8>) -> CodecResult<Vec<u8>> {
        match self {
            Compression::None => Ok(data),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), flate2::Compression::default());
                encoder.write_all(&data).map_err(CodecError::Compression)?;
                encoder.finish().map_err(CodecError::Compression)
            }
            Compression::Zstd => zstd::stream::encode_all(data.as_slice(), ZSTD_LEVEL).map_err(CodecError::Compression),
        }
    }

    pub fn decompress<'a>(&self, data: &'a [u8]) -> CodecResult<Cow<'a, [u8]>> {
        match self {
            Compression::None => Ok(Cow::Borrowed(data)),
            Compression::Gzip => {
                let mut out = Vec::with_capacity(data.len() * 2);
                MultiGzDecoder::new(data)
                    .read_to_end(&mut out)
                    .map_err(CodecError::Decompression)?;
                Ok(Cow::Owned(out))
            }
            Compression::Zstd => zstd::stream::decode_all(data)
                .map(Cow::Owned)
                .map_err(CodecError::Decompression),
        }
    }
}
