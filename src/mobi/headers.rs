use crate::error::{Error, Result};

pub const NULL_INDEX: u32 = 0xFFFFFFFF;

/// MOBI Header (Record 0)
#[derive(Debug, Clone)]
pub struct MobiHeader {
    pub compression: Compression,
    pub text_record_count: u16,
    pub text_record_size: u16,
    pub encryption: u16,
    pub codepage: Codepage,
    pub first_image_index: u32,
    /// Raw "full name" bytes stored inside record 0, in `codepage`.
    pub full_name: Vec<u8>,
    pub exth_flags: u32,
    pub extra_data_flags: u16,
    pub huff_record_index: u32,
    /// HUFF record plus the CDIC records that follow it.
    pub huff_record_count: u32,
    pub header_length: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Compression {
    None,
    PalmDoc,
    Huffman,
    Unknown(u16),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Codepage {
    Cp1252,
    Utf8,
    Unknown(u32),
}

fn be_u16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

fn be_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

impl MobiHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 16 {
            return Err(Error::InvalidMobi("MOBI header too short".into()));
        }

        let compression = match be_u16(data, 0) {
            1 => Compression::None,
            2 => Compression::PalmDoc,
            0x4448 => Compression::Huffman, // "DH"
            n => Compression::Unknown(n),
        };

        let mut header = Self {
            compression,
            text_record_count: be_u16(data, 8),
            text_record_size: be_u16(data, 10),
            encryption: be_u16(data, 12),
            codepage: Codepage::Cp1252,
            first_image_index: NULL_INDEX,
            full_name: Vec::new(),
            exth_flags: 0,
            extra_data_flags: 0,
            huff_record_index: NULL_INDEX,
            huff_record_count: 0,
            header_length: 0,
        };

        // PalmDOC-only record 0 (TEXtREAd files)
        if data.len() < 32 || &data[16..20] != b"MOBI" {
            return Ok(header);
        }

        header.header_length = be_u32(data, 20);
        header.codepage = match be_u32(data, 28) {
            1252 => Codepage::Cp1252,
            65001 => Codepage::Utf8,
            n => Codepage::Unknown(n),
        };

        // Title offset and length at 0x54-0x5C
        if data.len() >= 0x5C {
            let offset = be_u32(data, 0x54) as usize;
            let length = be_u32(data, 0x58) as usize;
            if let Some(raw) = offset
                .checked_add(length)
                .filter(|&end| end <= data.len())
                .map(|end| &data[offset..end])
            {
                header.full_name = raw.to_vec();
            }
        }

        if data.len() >= 0x70 {
            header.first_image_index = be_u32(data, 0x6C);
        }

        // HUFF/CDIC index and count at 0x70
        if data.len() >= 0x78 {
            header.huff_record_index = be_u32(data, 0x70);
            header.huff_record_count = be_u32(data, 0x74);
        }

        if data.len() >= 0x84 {
            header.exth_flags = be_u32(data, 0x80);
        }

        if data.len() >= 0xF4 && header.header_length >= 0xE4 {
            header.extra_data_flags = be_u16(data, 0xF2);
        }

        Ok(header)
    }

    pub fn has_exth(&self) -> bool {
        self.exth_flags & 0x40 != 0
    }
}

/// EXTH Header (extended metadata)
#[derive(Debug, Default)]
pub struct ExthHeader {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub cover_offset: Option<u32>,
}

impl ExthHeader {
    /// Parse EXTH records. String values are decoded with `decode`.
    pub fn parse(data: &[u8], decode: impl Fn(&[u8]) -> String) -> Result<Self> {
        if data.len() < 12 {
            return Err(Error::InvalidMobi("EXTH header too short".into()));
        }

        if &data[0..4] != b"EXTH" {
            return Err(Error::InvalidMobi("Invalid EXTH signature".into()));
        }

        let record_count = be_u32(data, 8);

        let mut exth = ExthHeader::default();
        let mut pos = 12;

        for _ in 0..record_count {
            if pos + 8 > data.len() {
                break;
            }

            let record_type = be_u32(data, pos);
            let record_len = be_u32(data, pos + 4) as usize;

            if record_len < 8 || pos + record_len > data.len() {
                break;
            }

            let content = &data[pos + 8..pos + record_len];

            match record_type {
                100 => {
                    let author = decode(content).trim().to_string();
                    if !author.is_empty() {
                        exth.authors.push(author);
                    }
                }
                201 => {
                    if content.len() >= 4 {
                        let val = be_u32(content, 0);
                        if val != NULL_INDEX {
                            exth.cover_offset = Some(val);
                        }
                    }
                }
                503 => {
                    let title = decode(content).trim().to_string();
                    if !title.is_empty() {
                        exth.title = Some(title);
                    }
                }
                _ => {}
            }

            pos += record_len;
        }

        Ok(exth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    #[test]
    fn test_mobi_header_parse_minimal() {
        // Minimal 16-byte PalmDOC header
        let mut data = vec![0u8; 16];
        data[0..2].copy_from_slice(&2u16.to_be_bytes()); // PalmDoc compression
        data[8..10].copy_from_slice(&10u16.to_be_bytes()); // text_record_count
        data[10..12].copy_from_slice(&4096u16.to_be_bytes()); // text_record_size

        let header = MobiHeader::parse(&data).unwrap();
        assert_eq!(header.compression, Compression::PalmDoc);
        assert_eq!(header.text_record_count, 10);
        assert_eq!(header.text_record_size, 4096);
        assert_eq!(header.codepage, Codepage::Cp1252); // default
        assert!(!header.has_exth());
    }

    #[test]
    fn test_mobi_header_parse_with_codepage() {
        let mut data = vec![0u8; 32];
        data[0..2].copy_from_slice(&1u16.to_be_bytes()); // No compression
        data[16..20].copy_from_slice(b"MOBI");
        data[28..32].copy_from_slice(&65001u32.to_be_bytes()); // UTF-8 codepage

        let header = MobiHeader::parse(&data).unwrap();
        assert_eq!(header.compression, Compression::None);
        assert_eq!(header.codepage, Codepage::Utf8);
    }

    #[test]
    fn test_mobi_header_huffman_compression() {
        let mut data = vec![0u8; 0x80];
        data[0..2].copy_from_slice(&0x4448u16.to_be_bytes()); // "DH" = Huffman
        data[16..20].copy_from_slice(b"MOBI");
        data[0x70..0x74].copy_from_slice(&7u32.to_be_bytes());
        data[0x74..0x78].copy_from_slice(&3u32.to_be_bytes());

        let header = MobiHeader::parse(&data).unwrap();
        assert_eq!(header.compression, Compression::Huffman);
        assert_eq!(header.huff_record_index, 7);
        assert_eq!(header.huff_record_count, 3);
    }

    #[test]
    fn test_mobi_header_full_name_and_flags() {
        let mut data = vec![0u8; 0x100];
        data[16..20].copy_from_slice(b"MOBI");
        data[20..24].copy_from_slice(&0xE8u32.to_be_bytes());
        data[0x54..0x58].copy_from_slice(&0xF8u32.to_be_bytes());
        data[0x58..0x5C].copy_from_slice(&5u32.to_be_bytes());
        data[0x80..0x84].copy_from_slice(&0x50u32.to_be_bytes());
        data[0xF2..0xF4].copy_from_slice(&3u16.to_be_bytes());
        data[0xF8..0xFD].copy_from_slice(b"Caf\xE9!");

        let header = MobiHeader::parse(&data).unwrap();
        assert_eq!(header.full_name, b"Caf\xE9!");
        assert!(header.has_exth());
        assert_eq!(header.extra_data_flags, 3);
    }

    #[test]
    fn test_mobi_header_title_out_of_bounds() {
        let mut data = vec![0u8; 0x84];
        data[16..20].copy_from_slice(b"MOBI");
        data[0x54..0x58].copy_from_slice(&0xFFFF_FFF0u32.to_be_bytes());
        data[0x58..0x5C].copy_from_slice(&0x20u32.to_be_bytes());

        let header = MobiHeader::parse(&data).unwrap();
        assert!(header.full_name.is_empty());
    }

    #[test]
    fn test_mobi_header_too_short() {
        let data = vec![0u8; 10];
        assert!(matches!(MobiHeader::parse(&data), Err(Error::InvalidMobi(_))));
    }

    #[test]
    fn test_exth_header_parse() {
        let mut data = Vec::new();
        data.extend_from_slice(b"EXTH"); // signature
        data.extend_from_slice(&100u32.to_be_bytes()); // header length
        data.extend_from_slice(&3u32.to_be_bytes()); // 3 records

        // Record 1: Author (type 100)
        let author = b"Test Author";
        data.extend_from_slice(&100u32.to_be_bytes()); // type
        data.extend_from_slice(&(8 + author.len() as u32).to_be_bytes()); // length
        data.extend_from_slice(author);

        // Record 2: Title (type 503)
        let title = b"Test Title";
        data.extend_from_slice(&503u32.to_be_bytes()); // type
        data.extend_from_slice(&(8 + title.len() as u32).to_be_bytes()); // length
        data.extend_from_slice(title);

        // Record 3: Cover offset (type 201)
        data.extend_from_slice(&201u32.to_be_bytes());
        data.extend_from_slice(&12u32.to_be_bytes());
        data.extend_from_slice(&42u32.to_be_bytes());

        let exth = ExthHeader::parse(&data, utf8).unwrap();
        assert_eq!(exth.authors, vec!["Test Author"]);
        assert_eq!(exth.title, Some("Test Title".to_string()));
        assert_eq!(exth.cover_offset, Some(42));
    }

    #[test]
    fn test_exth_header_stops_on_bad_length() {
        let mut data = Vec::new();
        data.extend_from_slice(b"EXTH");
        data.extend_from_slice(&24u32.to_be_bytes());
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&100u32.to_be_bytes());
        data.extend_from_slice(&4u32.to_be_bytes()); // shorter than its own header

        let exth = ExthHeader::parse(&data, utf8).unwrap();
        assert!(exth.authors.is_empty());
    }

    #[test]
    fn test_exth_header_invalid_signature() {
        let data = b"NOTEXTH_____";
        assert!(ExthHeader::parse(data, utf8).is_err());
    }

    #[test]
    fn test_exth_header_too_short() {
        let data = b"EXTH";
        assert!(ExthHeader::parse(data, utf8).is_err());
    }
}
