//! MOBI (PalmDB) container parsing.
//!
//! Only the legacy single-stream layout is read: the text records are
//! decompressed, concatenated and decoded into one markup string.

mod headers;
pub mod huffcdic;
pub mod markup;
pub mod palmdoc;
pub mod parser;

pub use huffcdic::HuffCdicReader;
pub use markup::strip_markup;
pub use parser::{
    Codepage, Compression, ExthHeader, MobiHeader, NULL_INDEX, PdbInfo, parse_exth,
    strip_trailing_data,
};

use crate::book::Cover;
use crate::error::{Error, Result};
use crate::util::{decode_text, detect_image_type};

/// A parsed MOBI file held in memory.
#[derive(Debug)]
pub struct MobiFile {
    data: Vec<u8>,
    pdb: PdbInfo,
    header: MobiHeader,
    exth: Option<ExthHeader>,
    full_name: String,
}

impl MobiFile {
    /// Parse the PDB header, record 0 and the optional EXTH block.
    ///
    /// Fails for encrypted books and for unknown compression schemes.
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        let pdb = PdbInfo::parse(&data)?;
        if pdb.num_records() < 2 {
            return Err(Error::InvalidMobi("Not enough records".into()));
        }

        let record0 = &data[pdb.record_range(0, data.len())?];
        let header = MobiHeader::parse(record0)?;

        if header.encryption != 0 {
            return Err(Error::InvalidMobi(
                "Encrypted files are not supported".into(),
            ));
        }
        match header.compression {
            Compression::None | Compression::PalmDoc => {}
            Compression::Huffman if header.huff_record_index == NULL_INDEX => {
                return Err(Error::InvalidMobi("HUFF/CDIC book without a HUFF record".into()));
            }
            Compression::Huffman => {}
            Compression::Unknown(n) => {
                return Err(Error::InvalidMobi(format!("Unknown compression type {n}")));
            }
        }

        let codepage = header.codepage;
        let exth = parse_exth(record0, &header, |bytes| decode_with(codepage, bytes));
        let full_name = decode_with(codepage, &header.full_name).trim().to_string();

        log::debug!(
            "MOBI {:?}: {} text records, {:?}, {:?}",
            pdb.name,
            header.text_record_count,
            header.compression,
            header.codepage
        );

        Ok(Self {
            data,
            pdb,
            header,
            exth,
            full_name,
        })
    }

    /// EXTH title, else the full name from record 0.
    pub fn title(&self) -> Option<&str> {
        self.exth
            .as_ref()
            .and_then(|e| e.title.as_deref())
            .or_else(|| Some(self.full_name.as_str()).filter(|t| !t.is_empty()))
    }

    /// First EXTH author.
    pub fn author(&self) -> Option<&str> {
        self.exth
            .as_ref()
            .and_then(|e| e.authors.first())
            .map(String::as_str)
    }

    /// The image record named by the EXTH cover offset, if it holds an image.
    pub fn cover(&self) -> Option<Cover> {
        let offset = self.exth.as_ref()?.cover_offset?;
        if self.header.first_image_index == NULL_INDEX {
            return None;
        }

        let index = self.header.first_image_index as usize + offset as usize;
        let record = self.record(index).ok()?;
        match detect_image_type(record) {
            Some(media_type) => Some(Cover {
                media_type: media_type.to_string(),
                data: record.to_vec(),
            }),
            None => {
                log::warn!("cover record {index} is not a recognised image");
                None
            }
        }
    }

    /// Decompress and decode the whole text stream.
    pub fn markup(&self) -> Result<String> {
        let count = self.header.text_record_count as usize;
        let mut text = Vec::with_capacity(count * self.header.text_record_size as usize);
        let mut huff = match self.header.compression {
            Compression::Huffman => Some(self.huff_reader()?),
            _ => None,
        };

        for i in 1..=count {
            let record = self.record(i)?;
            let stripped = strip_trailing_data(record, self.header.extra_data_flags);

            match (self.header.compression, huff.as_mut()) {
                (Compression::PalmDoc, _) => {
                    text.extend_from_slice(&palmdoc::decompress(stripped))
                }
                (Compression::Huffman, Some(reader)) => {
                    text.extend_from_slice(&reader.decompress(stripped)?)
                }
                _ => text.extend_from_slice(stripped),
            }
        }

        Ok(decode_with(self.header.codepage, &text))
    }

    /// The HUFF record followed by its CDIC records.
    fn huff_reader(&self) -> Result<HuffCdicReader> {
        let first = self.header.huff_record_index as usize;
        let huff = self.record(first)?;
        let cdics = (1..self.header.huff_record_count as usize)
            .map(|i| self.record(first + i))
            .collect::<Result<Vec<_>>>()?;
        HuffCdicReader::new(huff, &cdics)
    }

    fn record(&self, index: usize) -> Result<&[u8]> {
        let range = self.pdb.record_range(index, self.data.len())?;
        Ok(&self.data[range])
    }
}

/// Decode bytes according to the record 0 codepage.
fn decode_with(codepage: Codepage, bytes: &[u8]) -> String {
    match codepage {
        Codepage::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        Codepage::Cp1252 => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        Codepage::Unknown(_) => decode_text(bytes),
    }
}
