//! Text decoding and small string helpers shared by the importers.

use std::borrow::Cow;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// Decode a raw byte buffer of unknown encoding.
///
/// This function:
/// 1. Honors a UTF-8 or UTF-16 byte order mark if one is present
/// 2. Otherwise asks `chardetng` for the most probable encoding (GBK, Big5,
///    Shift_JIS, windows-1252, ...)
/// 3. Falls back to lossy UTF-8 when detection has nothing to go on
///
/// Never fails: undecodable sequences become U+FFFD.
///
/// # Examples
///
/// ```
/// use bookmill::util::decode_text;
///
/// assert_eq!(decode_text("第一章".as_bytes()), "第一章");
/// assert_eq!(decode_text(&[0xEF, 0xBB, 0xBF, b'h', b'i']), "hi");
/// ```
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        log::debug!("byte order mark found: {}", encoding.name());
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }

    if bytes.is_empty() {
        return String::new();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, _, malformed) = encoding.decode(bytes);

    if malformed && encoding != encoding_rs::UTF_8 {
        log::debug!(
            "detected {} but input is malformed, falling back to UTF-8",
            encoding.name()
        );
        return String::from_utf8_lossy(bytes).into_owned();
    }

    log::debug!("detected encoding {}", encoding.name());
    text.into_owned()
}

/// Decode markup (XHTML, OPF, NCX) whose encoding is usually declared.
///
/// Tries UTF-8 first, then the encoding named in the XML declaration, and
/// finally byte-level detection. Uses `Cow<str>` to avoid allocation when the
/// input is valid UTF-8.
pub fn decode_markup(bytes: &[u8]) -> Cow<'_, str> {
    // Try UTF-8 first (handles BOM automatically)
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = extract_xml_encoding(bytes)
        && let Some(encoding) = Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    Cow::Owned(decode_text(bytes))
}

/// Extract the encoding name from an XML declaration, if any.
///
/// Only the first 100 bytes are inspected.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    let (&quote, rest) = after_enc.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = rest.iter().position(|&b| b == quote)?;
    std::str::from_utf8(&rest[..value_end]).ok()
}

/// Unify line endings: `\r\n` and lone `\r` both become `\n`.
pub fn normalize_newlines(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Escape text for inclusion in an HTML element body.
pub fn html_escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>']) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    )
}

/// Decode the handful of character references found in ebook markup.
///
/// Named entities beyond the XML five (plus `nbsp`) are left untouched.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        // Entities are short; anything longer is a literal ampersand.
        let resolved = tail[1..]
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| resolve_entity(&tail[1..1 + semi]).map(|c| (c, semi + 2)));

        match resolved {
            Some((c, consumed)) => {
                out.push(c);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}

fn resolve_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => return Some('&'),
        "lt" => return Some('<'),
        "gt" => return Some('>'),
        "quot" => return Some('"'),
        "apos" => return Some('\''),
        "nbsp" => return Some('\u{a0}'),
        _ => {}
    }

    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }

    entity
        .strip_prefix('#')
        .and_then(|dec| dec.parse::<u32>().ok())
        .and_then(char::from_u32)
}

/// Detect image type from magic bytes.
pub fn detect_image_type(data: &[u8]) -> Option<&'static str> {
    if data.len() < 4 {
        return None;
    }

    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if data.starts_with(b"\x89PNG") {
        Some("image/png")
    } else if data.starts_with(b"GIF8") {
        Some("image/gif")
    } else if data.starts_with(b"BM") {
        Some("image/bmp")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_utf8() {
        let text = "第一章 开始\n正文内容";
        assert_eq!(decode_text(text.as_bytes()), text);
    }

    #[test]
    fn test_decode_text_strips_bom() {
        assert_eq!(decode_text(&[0xEF, 0xBB, 0xBF, b'o', b'k']), "ok");
        // UTF-16LE BOM + "hi"
        assert_eq!(decode_text(&[0xFF, 0xFE, b'h', 0, b'i', 0]), "hi");
    }

    #[test]
    fn test_decode_text_gbk() {
        let source = "第一章 风起云涌\n天色渐晚，城门将闭。少年背着行囊，站在长街尽头。\n".repeat(20);
        let (bytes, _, _) = encoding_rs::GBK.encode(&source);
        assert_eq!(decode_text(&bytes), source);
    }

    #[test]
    fn test_decode_text_empty() {
        assert_eq!(decode_text(&[]), "");
    }

    #[test]
    fn test_decode_markup_with_declaration() {
        let mut bytes = br#"<?xml version="1.0" encoding="windows-1252"?><p>caf"#.to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"</p>");
        assert!(decode_markup(&bytes).contains("café"));
    }

    #[test]
    fn test_extract_xml_encoding() {
        assert_eq!(
            extract_xml_encoding(br#"<?xml version="1.0" encoding="UTF-8"?>"#),
            Some("UTF-8")
        );
        assert_eq!(
            extract_xml_encoding(b"<?xml version='1.0' encoding='gbk'?>"),
            Some("gbk")
        );
        assert_eq!(extract_xml_encoding(b"<html>"), None);
    }

    #[test]
    fn test_normalize_newlines() {
        assert_eq!(normalize_newlines("a\r\nb\rc\nd"), "a\nb\nc\nd");
        assert_eq!(normalize_newlines("\r\r\n"), "\n\n");
        assert_eq!(normalize_newlines("plain"), "plain");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert!(matches!(html_escape("nothing"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(decode_entities("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(decode_entities("a&nbsp;b"), "a\u{a0}b");
        assert_eq!(decode_entities("AT&T rocks"), "AT&T rocks");
        assert_eq!(decode_entities("&unknown; stays"), "&unknown; stays");
        assert_eq!(decode_entities("trailing &"), "trailing &");
    }

    #[test]
    fn test_detect_image_type() {
        assert_eq!(detect_image_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(detect_image_type(b"\x89PNG\r\n"), Some("image/png"));
        assert_eq!(detect_image_type(b"GIF89a"), Some("image/gif"));
        assert_eq!(detect_image_type(b"FLIS"), None);
    }
}
