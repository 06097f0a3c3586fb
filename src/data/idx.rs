use crate::error::{PipelineError, Result, StreamRole};

use super::model::FeatureMatrix;

const LABEL_HEADER_LEN: usize = 8;
const IMAGE_HEADER_LEN: usize = 16;

// ---------------------------------------------------------------------------
// IDX header
// ---------------------------------------------------------------------------

/// Structural metadata at the start of an IDX stream.
///
/// Label streams carry `magic, count`; image streams additionally carry
/// `rows, cols`. For labels `rows` and `cols` are both 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdxHeader {
    pub magic: u32,
    pub count: usize,
    pub rows: usize,
    pub cols: usize,
}

impl IdxHeader {
    /// Bytes per record.
    pub fn record_size(&self) -> usize {
        self.rows * self.cols
    }
}

fn read_be_u32(stream: &[u8], offset: usize, role: StreamRole) -> Result<u32> {
    let bytes = stream
        .get(offset..offset + 4)
        .ok_or(PipelineError::TruncatedData {
            role,
            needed: offset + 4,
            available: stream.len(),
        })?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read a count/dimension field; the format stores them as signed 32-bit.
fn read_count(stream: &[u8], offset: usize, role: StreamRole, field: &'static str) -> Result<usize> {
    let value = read_be_u32(stream, offset, role)? as i32;
    usize::try_from(value).map_err(|_| PipelineError::InvalidHeader { role, field, value })
}

fn check_magic(role: StreamRole, found: u32, expected: Option<u32>) -> Result<()> {
    match expected {
        Some(expected) if expected != found => Err(PipelineError::FormatMismatch {
            role,
            expected,
            found,
        }),
        _ => Ok(()),
    }
}

/// Verify that `count` records of `record_size` bytes fit after the header.
fn check_payload(stream: &[u8], role: StreamRole, header_len: usize, header: &IdxHeader) -> Result<()> {
    let available = stream.len();
    let needed = header
        .count
        .checked_mul(header.record_size())
        .and_then(|payload| payload.checked_add(header_len))
        .ok_or(PipelineError::TruncatedData {
            role,
            needed: usize::MAX,
            available,
        })?;

    if needed > available {
        return Err(PipelineError::TruncatedData {
            role,
            needed,
            available,
        });
    }
    if needed < available {
        log::warn!(
            "{role}: ignoring {} trailing bytes after {} records",
            available - needed,
            header.count
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Label stream
// ---------------------------------------------------------------------------

pub fn read_label_header(stream: &[u8], expected_magic: Option<u32>) -> Result<IdxHeader> {
    let role = StreamRole::Labels;
    let magic = read_be_u32(stream, 0, role)?;
    check_magic(role, magic, expected_magic)?;
    let count = read_count(stream, 4, role, "item count")?;
    Ok(IdxHeader {
        magic,
        count,
        rows: 1,
        cols: 1,
    })
}

/// Parse an IDX label stream into one `f32` per record, in file order.
///
/// Label values are passed through unchanged (no range check).
pub fn parse_labels(stream: &[u8], expected_magic: Option<u32>) -> Result<Vec<f32>> {
    let header = read_label_header(stream, expected_magic)?;
    check_payload(stream, StreamRole::Labels, LABEL_HEADER_LEN, &header)?;

    let payload = &stream[LABEL_HEADER_LEN..LABEL_HEADER_LEN + header.count];
    Ok(payload.iter().map(|&b| f32::from(b)).collect())
}

// ---------------------------------------------------------------------------
// Image stream
// ---------------------------------------------------------------------------

pub fn read_image_header(stream: &[u8], expected_magic: Option<u32>) -> Result<IdxHeader> {
    let role = StreamRole::Images;
    let magic = read_be_u32(stream, 0, role)?;
    check_magic(role, magic, expected_magic)?;
    let count = read_count(stream, 4, role, "item count")?;
    let rows = read_count(stream, 8, role, "row count")?;
    let cols = read_count(stream, 12, role, "column count")?;

    for (field, value) in [("row count", rows), ("column count", cols)] {
        if value == 0 {
            return Err(PipelineError::InvalidHeader {
                role,
                field,
                value: 0,
            });
        }
    }

    Ok(IdxHeader {
        magic,
        count,
        rows,
        cols,
    })
}

/// Parse an IDX image stream into one feature vector of `rows × cols` raw
/// pixel values per record, in file order.
pub fn parse_images(stream: &[u8], expected_magic: Option<u32>) -> Result<(IdxHeader, FeatureMatrix)> {
    let header = read_image_header(stream, expected_magic)?;
    check_payload(stream, StreamRole::Images, IMAGE_HEADER_LEN, &header)?;

    let record_size = header.record_size();
    let mut values = Vec::with_capacity(header.count * record_size);
    for i in 0..header.count {
        let offset = IMAGE_HEADER_LEN + i * record_size;
        let record = &stream[offset..offset + record_size];
        values.extend(record.iter().map(|&b| f32::from(b)));
    }

    Ok((header, FeatureMatrix::from_flat(values, record_size)))
}
