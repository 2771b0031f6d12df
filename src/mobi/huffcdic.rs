//! HUFF/CDIC decompression.
//!
//! Kindlegen output often stores text records as Huffman codes over a phrase
//! dictionary. The HUFF record holds the code tables; the CDIC records that
//! follow it hold the phrases. A phrase may itself be compressed, in which
//! case it is expanded on first use and cached.

use crate::error::{Error, Result};

const HUFF_MAGIC: &[u8; 8] = b"HUFF\x00\x00\x00\x18";
const CDIC_MAGIC: &[u8; 8] = b"CDIC\x00\x00\x00\x10";

#[derive(Debug)]
enum Phrase {
    /// Literal bytes.
    Literal(Vec<u8>),
    /// Still Huffman-coded.
    Packed(Vec<u8>),
}

/// Code lookup entry for one leading byte.
#[derive(Debug, Clone, Copy)]
struct CodeEntry {
    len: u8,
    terminal: bool,
    max_code: u32,
}

#[derive(Debug)]
pub struct HuffCdicReader {
    /// Indexed by the top byte of the 32-bit code window.
    lookup: Vec<CodeEntry>,
    /// Per code length (index 0 unused).
    min_codes: [u32; 33],
    max_codes: [u32; 33],
    phrases: Vec<Phrase>,
}

fn be_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Left-align a code of `len` bits in a 32-bit window, filling with ones.
fn widen_max(code: u32, len: u32) -> u32 {
    ((code as u64 + 1) << (32 - len)).wrapping_sub(1) as u32
}

impl HuffCdicReader {
    /// Build a reader from the HUFF record and its CDIC records, in order.
    pub fn new(huff: &[u8], cdics: &[&[u8]]) -> Result<Self> {
        let mut reader = Self {
            lookup: Vec::with_capacity(256),
            min_codes: [0; 33],
            max_codes: [0; 33],
            phrases: Vec::new(),
        };
        reader.load_huff(huff)?;
        for cdic in cdics {
            reader.load_cdic(cdic)?;
        }
        Ok(reader)
    }

    fn load_huff(&mut self, huff: &[u8]) -> Result<()> {
        if huff.len() < 16 || &huff[..8] != HUFF_MAGIC {
            return Err(Error::InvalidMobi("Invalid HUFF header".into()));
        }
        let lookup_at = be_u32(huff, 8) as usize;
        let ranges_at = be_u32(huff, 12) as usize;

        if huff.len() < lookup_at.saturating_add(256 * 4) {
            return Err(Error::InvalidMobi("HUFF code table truncated".into()));
        }
        for i in 0..256 {
            let v = be_u32(huff, lookup_at + i * 4);
            let len = (v & 0x1F) as u8;
            let max_code = if len == 0 {
                0
            } else {
                widen_max(v >> 8, len as u32)
            };
            self.lookup.push(CodeEntry {
                len,
                terminal: v & 0x80 != 0,
                max_code,
            });
        }

        if huff.len() < ranges_at.saturating_add(32 * 8) {
            return Err(Error::InvalidMobi("HUFF code ranges truncated".into()));
        }
        for len in 1..=32u32 {
            let at = ranges_at + (len as usize - 1) * 8;
            self.min_codes[len as usize] = be_u32(huff, at) << (32 - len);
            self.max_codes[len as usize] = widen_max(be_u32(huff, at + 4), len);
        }
        Ok(())
    }

    fn load_cdic(&mut self, cdic: &[u8]) -> Result<()> {
        if cdic.len() < 16 || &cdic[..8] != CDIC_MAGIC {
            return Err(Error::InvalidMobi("Invalid CDIC header".into()));
        }
        let total = be_u32(cdic, 8) as usize;
        let bits = be_u32(cdic, 12).min(16);
        let count = (1usize << bits).min(total.saturating_sub(self.phrases.len()));

        if cdic.len() < 16 + count * 2 {
            return Err(Error::InvalidMobi("CDIC offset table truncated".into()));
        }
        let body = &cdic[16..];
        for i in 0..count {
            let at = u16::from_be_bytes([body[i * 2], body[i * 2 + 1]]) as usize;
            if at + 2 > body.len() {
                return Err(Error::InvalidMobi("CDIC phrase truncated".into()));
            }
            let flags = u16::from_be_bytes([body[at], body[at + 1]]);
            let start = at + 2;
            let end = (start + (flags & 0x7FFF) as usize).min(body.len());
            let bytes = body[start..end].to_vec();

            self.phrases.push(if flags & 0x8000 != 0 {
                Phrase::Literal(bytes)
            } else {
                Phrase::Packed(bytes)
            });
        }
        Ok(())
    }

    /// Decompress one text record.
    pub fn decompress(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len() * 2);
        self.unpack(data, &mut out, 0)?;
        Ok(out)
    }

    fn unpack(&mut self, data: &[u8], out: &mut Vec<u8>, depth: usize) -> Result<()> {
        if depth > 32 {
            return Err(Error::InvalidMobi("CDIC phrases nest too deeply".into()));
        }

        let mut padded = data.to_vec();
        padded.extend_from_slice(&[0; 8]);

        let mut bits_left = data.len() as i64 * 8;
        let mut pos = 0;
        let mut window = read_u64(&padded, pos);
        let mut shift: i32 = 32;

        while bits_left > 0 {
            if shift <= 0 {
                pos += 4;
                window = read_u64(&padded, pos);
                shift += 32;
            }
            let code = (window >> shift) as u32;

            let entry = self.lookup[(code >> 24) as usize];
            let mut len = entry.len as usize;
            let mut max_code = entry.max_code;
            if !entry.terminal {
                while len < 32 && code < self.min_codes[len] {
                    len += 1;
                }
                max_code = self.max_codes[len];
            }

            shift -= len as i32;
            bits_left -= len as i64;
            if bits_left < 0 {
                break;
            }
            if len == 0 {
                return Err(Error::InvalidMobi("Zero-length Huffman code".into()));
            }

            let index = (max_code.wrapping_sub(code) >> (32 - len)) as usize;
            match self.phrases.get(index) {
                Some(Phrase::Literal(bytes)) => out.extend_from_slice(bytes),
                Some(Phrase::Packed(bytes)) => {
                    let packed = bytes.clone();
                    let mut expanded = Vec::new();
                    self.unpack(&packed, &mut expanded, depth + 1)?;
                    out.extend_from_slice(&expanded);
                    self.phrases[index] = Phrase::Literal(expanded);
                }
                None => {
                    return Err(Error::InvalidMobi(format!(
                        "CDIC index {index} out of range ({} phrases)",
                        self.phrases.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

fn read_u64(data: &[u8], at: usize) -> u64 {
    data.get(at..at + 8)
        .and_then(|b| b.try_into().ok())
        .map_or(0, u64::from_be_bytes)
}
