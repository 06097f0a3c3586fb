use std::io::{self, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::{PipelineError, Result};

/// Read a single-member gzip archive and inflate it completely.
pub fn decode(path: &Path) -> Result<Vec<u8>> {
    let raw = std::fs::read(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let bytes = inflate(&raw).map_err(|source| PipelineError::CorruptArchive {
        path: path.to_path_buf(),
        source,
    })?;

    log::debug!(
        "Inflated {} ({} → {} bytes)",
        path.display(),
        raw.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Inflate an in-memory gzip member.
pub fn inflate(raw: &[u8]) -> io::Result<Vec<u8>> {
    if raw.is_empty() {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "empty archive"));
    }
    let mut out = Vec::new();
    GzDecoder::new(raw).read_to_end(&mut out)?;
    Ok(out)
}
