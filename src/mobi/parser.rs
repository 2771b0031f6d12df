//! Pure MOBI parsing functions (no IO).

use std::ops::Range;

pub use super::headers::{Codepage, Compression, ExthHeader, MobiHeader, NULL_INDEX};
use crate::error::{Error, Result};

/// PDB (Palm Database) header info extracted from bytes.
#[derive(Debug)]
pub struct PdbInfo {
    pub name: String,
    /// Record offsets within the file.
    pub record_offsets: Vec<u32>,
}

impl PdbInfo {
    /// Parse the PDB header at the start of the file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 78 {
            return Err(Error::InvalidMobi("PDB header too short".into()));
        }

        // Bytes 0-31: Database name (null-terminated)
        let name_end = data[..32].iter().position(|&b| b == 0).unwrap_or(32);
        let name = String::from_utf8_lossy(&data[..name_end]).to_string();

        // Bytes 60-67: Type/Creator should be "BOOKMOBI" or "TEXtREAd"
        let ident = &data[60..68];
        if ident != b"BOOKMOBI" && !ident.eq_ignore_ascii_case(b"TEXTREAD") {
            return Err(Error::InvalidMobi(format!(
                "Unknown book type: {:?}",
                String::from_utf8_lossy(ident)
            )));
        }

        // Bytes 76-77: Number of records
        let num_records = u16::from_be_bytes([data[76], data[77]]) as usize;

        // Record info list (8 bytes per record, starting at byte 78)
        let records_start = 78;
        if data.len() < records_start + num_records * 8 {
            return Err(Error::InvalidMobi("PDB header truncated".into()));
        }

        let record_offsets = data[records_start..records_start + num_records * 8]
            .chunks_exact(8)
            .map(|info| u32::from_be_bytes([info[0], info[1], info[2], info[3]]))
            .collect();

        Ok(Self {
            name,
            record_offsets,
        })
    }

    pub fn num_records(&self) -> usize {
        self.record_offsets.len()
    }

    /// Get the byte range for a record, checked against the file length.
    pub fn record_range(&self, index: usize, file_len: usize) -> Result<Range<usize>> {
        let start = *self
            .record_offsets
            .get(index)
            .ok_or_else(|| Error::InvalidMobi(format!("Record index {index} out of bounds")))?
            as usize;
        let end = self
            .record_offsets
            .get(index + 1)
            .map_or(file_len, |&next| next as usize);

        if start > end || end > file_len {
            return Err(Error::InvalidMobi(format!(
                "Record {index} has invalid bounds {start}..{end}"
            )));
        }

        Ok(start..end)
    }
}

/// Parse EXTH header if present.
pub fn parse_exth(
    record0: &[u8],
    header: &MobiHeader,
    decode: impl Fn(&[u8]) -> String,
) -> Option<ExthHeader> {
    if header.has_exth() && header.header_length > 0 {
        let exth_start = 16 + header.header_length as usize;
        if exth_start < record0.len() {
            return ExthHeader::parse(&record0[exth_start..], decode).ok();
        }
    }
    None
}

/// Strip trailing multibyte extra data from text records.
///
/// MOBI text records can have trailing data appended. The extra_flags field
/// indicates which types are present. We need to strip this data before
/// decompression.
pub fn strip_trailing_data(record: &[u8], flags: u16) -> &[u8] {
    if flags == 0 || record.is_empty() {
        return record;
    }

    let mut end = record.len();

    // Bits 1-15: one backward-encoded size per set bit
    let mut shifted_flags = flags >> 1;
    while shifted_flags != 0 {
        if shifted_flags & 1 != 0 {
            if end == 0 {
                break;
            }
            // VWI read backward: low 7 bits are value, high bit SET means stop
            let mut size = 0usize;
            let mut shift = 0;
            let mut pos = end;
            while pos > 0 {
                pos -= 1;
                let byte = record[pos];
                size |= ((byte & 0x7F) as usize) << shift;
                shift += 7;
                if byte & 0x80 != 0 || shift >= 28 {
                    break;
                }
            }
            if size > 0 && size <= end {
                end -= size;
            }
        }
        shifted_flags >>= 1;
    }

    // Multibyte overlap flag (bit 0) is processed last
    if flags & 1 != 0 && end > 0 {
        let overlap = (record[end - 1] & 3) as usize + 1;
        if overlap <= end {
            end -= overlap;
        }
    }

    &record[..end]
}
