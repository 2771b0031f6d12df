//! Embedding of chapter images as `data:` URIs.

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use zip::ZipArchive;

use super::{Manifest, resolve_href};
use crate::error::{Error, Result};
use crate::util::decode_entities;

/// Media type assumed for manifest images that declare none.
const FALLBACK_IMAGE_TYPE: &str = "image/jpeg";

static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\s[^>]*?\bsrc\s*=\s*(?:"([^"]+)"|'([^']+)')"#).unwrap()
});

/// Anything that can hand out archive members by path.
pub trait AssetSource {
    fn read_asset(&mut self, path: &str) -> Result<Vec<u8>>;
}

impl<R: Read + Seek> AssetSource for ZipArchive<R> {
    fn read_asset(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut file = self.by_name(path)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl AssetSource for HashMap<String, Vec<u8>> {
    fn read_asset(&mut self, path: &str) -> Result<Vec<u8>> {
        self.get(path)
            .cloned()
            .ok_or_else(|| Error::InvalidEpub(format!("missing asset: {path}")))
    }
}

/// Replace the `src` of every `<img>` in `markup` with an inline base64
/// `data:` URI.
///
/// `chapter_path` is the archive path of the chapter the markup came from;
/// relative sources are resolved against it. Images that are remote, already
/// inline, absent from the manifest or unreadable keep their original `src`
/// and are logged.
pub fn inline_images<S: AssetSource + ?Sized>(
    markup: &str,
    chapter_path: &str,
    manifest: &Manifest,
    assets: &mut S,
) -> String {
    let mut replacements: Vec<(std::ops::Range<usize>, String)> = Vec::new();

    for caps in IMG_SRC.captures_iter(markup) {
        let Some(src) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        if let Some(uri) = embed(src.as_str(), chapter_path, manifest, assets) {
            replacements.push((src.range(), uri));
        }
    }

    if replacements.is_empty() {
        return markup.to_string();
    }

    let mut out = markup.to_string();
    // Back to front so earlier offsets stay valid.
    replacements.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    for (range, uri) in replacements {
        out.replace_range(range, &uri);
    }
    out
}

fn embed<S: AssetSource + ?Sized>(
    src: &str,
    chapter_path: &str,
    manifest: &Manifest,
    assets: &mut S,
) -> Option<String> {
    let src = src.trim();
    if is_external(src) {
        return None;
    }

    // Attribute text is still entity-encoded; manifest hrefs are not.
    let decoded = decode_entities(src);
    let target = decoded.split(['?', '#']).next().unwrap_or(&*decoded);
    let path = resolve_href(chapter_path, target);

    let Some(entry) = manifest.by_path(&path) else {
        log::warn!("image {src:?} in {chapter_path} is not in the manifest");
        return None;
    };

    let data = match assets.read_asset(&entry.href) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("failed to read image {}: {e}", entry.href);
            return None;
        }
    };

    let media_type = if entry.media_type.is_empty() {
        FALLBACK_IMAGE_TYPE
    } else {
        entry.media_type.as_str()
    };
    Some(format!("data:{media_type};base64,{}", STANDARD.encode(data)))
}

fn is_external(src: &str) -> bool {
    let lower = src.to_ascii_lowercase();
    lower.starts_with("data:")
        || lower.starts_with("http:")
        || lower.starts_with("https:")
        || lower.starts_with("//")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::ManifestEntry;

    fn fixture() -> (Manifest, HashMap<String, Vec<u8>>) {
        let mut manifest = Manifest::new();
        manifest.insert(ManifestEntry {
            id: "pic".into(),
            href: "OEBPS/images/pic.png".into(),
            media_type: "image/png".into(),
        });
        manifest.insert(ManifestEntry {
            id: "bare".into(),
            href: "OEBPS/images/bare.jpg".into(),
            media_type: String::new(),
        });
        manifest.insert(ManifestEntry {
            id: "gone".into(),
            href: "OEBPS/images/gone.gif".into(),
            media_type: "image/gif".into(),
        });

        manifest.insert(ManifestEntry {
            id: "amp".into(),
            href: "OEBPS/images/salt&pepper.png".into(),
            media_type: "image/png".into(),
        });

        let mut assets = HashMap::new();
        assets.insert("OEBPS/images/salt&pepper.png".to_string(), b"S&P".to_vec());
        assets.insert("OEBPS/images/pic.png".to_string(), b"PNG!".to_vec());
        assets.insert("OEBPS/images/bare.jpg".to_string(), b"JPG".to_vec());
        (manifest, assets)
    }

    #[test]
    fn test_inline_relative_image() {
        let (manifest, mut assets) = fixture();
        let markup = r#"<p><img alt="x" src="../images/pic.png"/></p>"#;
        let out = inline_images(markup, "OEBPS/text/ch1.xhtml", &manifest, &mut assets);

        assert_eq!(
            out,
            format!(
                r#"<p><img alt="x" src="data:image/png;base64,{}"/></p>"#,
                STANDARD.encode(b"PNG!")
            )
        );
    }

    #[test]
    fn test_inline_single_quotes_and_fragment() {
        let (manifest, mut assets) = fixture();
        let markup = "<IMG SRC='images/pic.png#frag'>";
        let out = inline_images(markup, "OEBPS/ch1.xhtml", &manifest, &mut assets);

        assert!(out.starts_with("<IMG SRC='data:image/png;base64,"));
    }

    #[test]
    fn test_inline_entity_encoded_src() {
        let (manifest, mut assets) = fixture();
        let markup = r#"<img src="images/salt&amp;pepper.png"/><img src="images/salt&#38;pepper.png"/>"#;
        let out = inline_images(markup, "OEBPS/c.xhtml", &manifest, &mut assets);

        let uri = format!("data:image/png;base64,{}", STANDARD.encode(b"S&P"));
        assert_eq!(out, format!(r#"<img src="{uri}"/><img src="{uri}"/>"#));
    }

    #[test]
    fn test_zip_asset_source() {
        use std::io::{Cursor, Write};
        use zip::ZipWriter;
        use zip::write::SimpleFileOptions;

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("OEBPS/images/pic.png", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"PNG!").unwrap();
        let mut archive = ZipArchive::new(writer.finish().unwrap()).unwrap();

        assert_eq!(archive.read_asset("OEBPS/images/pic.png").unwrap(), b"PNG!");
        assert!(matches!(archive.read_asset("OEBPS/missing.png"), Err(Error::Zip(_))));
    }

    #[test]
    fn test_inline_defaults_media_type() {
        let (manifest, mut assets) = fixture();
        let out = inline_images(r#"<img src="images/bare.jpg">"#, "OEBPS/c.xhtml", &manifest, &mut assets);

        assert!(out.contains("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_inline_multiple_images() {
        let (manifest, mut assets) = fixture();
        let markup = r#"<img src="images/pic.png"><p>mid</p><img src="images/bare.jpg">"#;
        let out = inline_images(markup, "OEBPS/c.xhtml", &manifest, &mut assets);

        assert_eq!(out.matches("data:").count(), 2);
        assert!(out.contains("<p>mid</p>"));
    }

    #[test]
    fn test_unlisted_image_left_alone() {
        let (manifest, mut assets) = fixture();
        let markup = r#"<img src="images/other.png">"#;
        let out = inline_images(markup, "OEBPS/c.xhtml", &manifest, &mut assets);

        assert_eq!(out, markup);
    }

    #[test]
    fn test_unreadable_image_left_alone() {
        let (manifest, mut assets) = fixture();
        let markup = r#"<img src="images/gone.gif">"#;
        let out = inline_images(markup, "OEBPS/c.xhtml", &manifest, &mut assets);

        assert_eq!(out, markup);
    }

    #[test]
    fn test_external_sources_skipped() {
        let (manifest, mut assets) = fixture();
        let markup = r#"<img src="https://example.com/a.png"><img src="data:image/png;base64,AAAA">"#;
        let out = inline_images(markup, "OEBPS/c.xhtml", &manifest, &mut assets);

        assert_eq!(out, markup);
    }
}
