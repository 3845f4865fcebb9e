use std::io::{Read as _, Write as _};

use flate2::{Compression, read::DeflateDecoder, write::DeflateEncoder};

use crate::{
    JWECompression, JoseError,
    error::{ErrorContext as _, OpaqueError},
};

/// Default upper bound for the size of a decompressed JWE plaintext (16 MiB)
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 16 * 1024 * 1024;

/// Compress `data` with the given `zip` algorithm (raw DEFLATE, RFC 1951).
pub(super) fn compress(zip: JWECompression, data: &[u8]) -> Result<Vec<u8>, JoseError> {
    match zip {
        JWECompression::Deflate => {
            let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
            encoder
                .write_all(data)
                .and_then(|()| encoder.finish())
                .context("deflate jwe plaintext")
                .map_err(JoseError::Compression)
        }
    }
}

/// Decompress `data` with the given `zip` algorithm,
/// failing when the output would exceed `max_size` bytes.
pub(super) fn decompress(
    zip: JWECompression,
    data: &[u8],
    max_size: usize,
) -> Result<Vec<u8>, JoseError> {
    match zip {
        JWECompression::Deflate => {
            let limit = u64::try_from(max_size).unwrap_or(u64::MAX).saturating_add(1);
            let mut output = Vec::new();
            DeflateDecoder::new(data)
                .take(limit)
                .read_to_end(&mut output)
                .context("inflate jwe plaintext")
                .map_err(JoseError::Compression)?;
            if output.len() > max_size {
                return Err(JoseError::Compression(OpaqueError::from_display(
                    "decompressed jwe plaintext exceeds size limit",
                )));
            }
            Ok(output)
        }
    }
}
