//! EPUB parsing utilities (OPF, NCX, container.xml)

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{Manifest, ManifestEntry, resolve_href};
use crate::error::{Error, Result};

/// What the ingestion needs from the OPF package document.
#[derive(Debug, Default)]
pub struct Package {
    pub title: Option<String>,
    /// First `dc:creator`.
    pub author: Option<String>,
    pub manifest: Manifest,
    /// Manifest ids in reading order.
    pub spine: Vec<String>,
    /// Archive path of the NCX table of contents.
    pub ncx_path: Option<String>,
}

/// One entry of the NCX table of contents, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavPoint {
    pub label: String,
    pub src: String,
}

/// Parse META-INF/container.xml to find the OPF path.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = String::from_utf8_lossy(strip_bom(bytes));

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                if let Some(path) = attribute(&e, b"full-path") {
                    return Ok(path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::InvalidEpub(
        "No rootfile found in container.xml".into(),
    ))
}

/// Parse the OPF package document found at archive path `opf_path`.
///
/// Manifest hrefs are resolved to full archive paths.
pub fn parse_opf(content: &str, opf_path: &str) -> Result<Package> {
    // Text is trimmed per value: entity references split text events.
    let mut reader = Reader::from_str(content);

    let mut package = Package::default();
    let mut toc_id: Option<String> = None;

    let mut in_metadata = false;
    let mut current_element: Option<&'static str> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"metadata" => in_metadata = true,
                    b"title" if in_metadata => {
                        current_element = Some("title");
                        buf_text.clear();
                    }
                    b"creator" if in_metadata => {
                        current_element = Some("creator");
                        buf_text.clear();
                    }
                    b"spine" => toc_id = attribute(&e, b"toc"),
                    b"item" => add_manifest_item(&mut package.manifest, &e, opf_path),
                    b"itemref" => package.spine.extend(attribute(&e, b"idref")),
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"item" => add_manifest_item(&mut package.manifest, &e, opf_path),
                    b"itemref" => package.spine.extend(attribute(&e, b"idref")),
                    b"spine" => toc_id = attribute(&e, b"toc"),
                    _ => {}
                }
            }
            Event::Text(e) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if current_element.is_some() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        buf_text.push_str(&resolved);
                    }
                }
            }
            Event::End(e) => {
                let name = e.name();
                if local_name(name.as_ref()) == b"metadata" {
                    in_metadata = false;
                }

                if let Some(elem) = current_element.take() {
                    let value = buf_text.trim();
                    let slot = match elem {
                        "title" => &mut package.title,
                        _ => &mut package.author,
                    };
                    if slot.is_none() && !value.is_empty() {
                        *slot = Some(value.to_string());
                    }
                    buf_text.clear();
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    package.ncx_path = toc_id
        .and_then(|id| package.manifest.get(&id).map(|entry| entry.href.clone()))
        .or_else(|| {
            // Some EPUB 2 files omit spine@toc but still ship an NCX.
            package
                .manifest
                .entries
                .values()
                .find(|entry| entry.media_type == "application/x-dtbncx+xml")
                .map(|entry| entry.href.clone())
        });

    Ok(package)
}

/// Parse the NCX table of contents into a flat list, in document order.
///
/// Nested nav points follow their parent. Entries without a label or a
/// `content@src` are dropped.
pub fn parse_ncx(content: &str) -> Result<Vec<NavPoint>> {
    let mut reader = Reader::from_str(content);

    let mut points: Vec<(String, Option<String>)> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"navPoint" => {
                    open.push(points.len());
                    points.push((String::new(), None));
                }
                b"text" => in_text = true,
                b"content" => set_src(&mut points, &open, &e),
                _ => {}
            },
            Event::Empty(e) => {
                if local_name(e.name().as_ref()) == b"content" {
                    set_src(&mut points, &open, &e);
                }
            }
            Event::Text(e) => {
                if in_text && let Some(&idx) = open.last() {
                    points[idx].0.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if in_text && let Some(&idx) = open.last() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        points[idx].0.push_str(&resolved);
                    }
                }
            }
            Event::End(e) => match local_name(e.name().as_ref()) {
                b"text" => in_text = false,
                b"navPoint" => {
                    open.pop();
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(points
        .into_iter()
        .filter_map(|(label, src)| {
            let label = label.trim().to_string();
            match src {
                Some(src) if !label.is_empty() => Some(NavPoint { label, src }),
                _ => None,
            }
        })
        .collect())
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

fn add_manifest_item(manifest: &mut Manifest, e: &BytesStart<'_>, opf_path: &str) {
    let (Some(id), Some(href)) = (attribute(e, b"id"), attribute(e, b"href")) else {
        return;
    };
    manifest.insert(ManifestEntry {
        id,
        href: resolve_href(opf_path, &href),
        media_type: attribute(e, b"media-type").unwrap_or_default(),
    });
}

fn set_src(points: &mut [(String, Option<String>)], open: &[usize], e: &BytesStart<'_>) {
    if let Some(&idx) = open.last()
        && points[idx].1.is_none()
    {
        points[idx].1 = attribute(e, b"src");
    }
}

/// Unescaped value of attribute `key`, if present.
fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| {
            let raw = String::from_utf8_lossy(attr.value.as_ref());
            crate::util::decode_entities(&raw).into_owned()
        })
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    let decoded = crate::util::decode_entities(&format!("&{entity};")).into_owned();
    (decoded != format!("&{entity};")).then_some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_bom() {
        let with_bom = &[0xEF, 0xBB, 0xBF, b'h', b'i'];
        assert_eq!(strip_bom(with_bom), b"hi");

        assert_eq!(strip_bom(b"hello"), b"hello");
        assert_eq!(strip_bom(&[]), &[]);

        // Partial BOM (not stripped)
        let partial = &[0xEF, 0xBB, b'x'];
        assert_eq!(strip_bom(partial), partial);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"title"), b"title");
        assert_eq!(local_name(b"dc:title"), b"title");
        assert_eq!(local_name(b"opf:meta"), b"meta");
        assert_eq!(local_name(b""), b"");
    }

    #[test]
    fn test_resolve_entity() {
        assert_eq!(resolve_entity("amp"), Some("&".to_string()));
        assert_eq!(resolve_entity("#x2019"), Some("\u{2019}".to_string()));
        assert_eq!(resolve_entity("invalid"), None);
    }

    #[test]
    fn test_parse_container_xml() {
        let container = br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

        assert_eq!(parse_container_xml(container).unwrap(), "OEBPS/content.opf");
    }

    #[test]
    fn test_parse_container_xml_with_bom() {
        let mut container = vec![0xEF, 0xBB, 0xBF];
        container.extend_from_slice(
            br#"<?xml version="1.0"?>
<container><rootfiles><rootfile full-path="content.opf"/></rootfiles></container>"#,
        );

        assert_eq!(parse_container_xml(&container).unwrap(), "content.opf");
    }

    #[test]
    fn test_parse_container_xml_missing_rootfile() {
        let container = br#"<container><rootfiles/></container>"#;
        assert!(matches!(
            parse_container_xml(container),
            Err(Error::InvalidEpub(_))
        ));
    }

    #[test]
    fn test_parse_opf() {
        let opf = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Tom &amp; Jerry</dc:title>
    <dc:creator>Author One</dc:creator>
    <dc:creator>Author Two</dc:creator>
  </metadata>
  <manifest>
    <item id="ch1" href="text/chapter1.xhtml" media-type="application/xhtml+xml"/>
    <item id="img" href="images/a%20b.png" media-type="image/png"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="ch1"/>
    <itemref idref="missing"/>
  </spine>
</package>"#;

        let package = parse_opf(opf, "OEBPS/content.opf").unwrap();

        assert_eq!(package.title.as_deref(), Some("Tom & Jerry"));
        assert_eq!(package.author.as_deref(), Some("Author One"));
        assert_eq!(package.spine, vec!["ch1", "missing"]);
        assert_eq!(package.ncx_path.as_deref(), Some("OEBPS/toc.ncx"));
        assert_eq!(package.manifest.get("ch1").unwrap().href, "OEBPS/text/chapter1.xhtml");
        assert_eq!(package.manifest.by_path("OEBPS/images/a b.png").unwrap().id, "img");
    }

    #[test]
    fn test_parse_opf_without_metadata() {
        let opf = r#"<package><metadata/><manifest/><spine/></package>"#;
        let package = parse_opf(opf, "content.opf").unwrap();

        assert!(package.title.is_none());
        assert!(package.author.is_none());
        assert!(package.manifest.is_empty());
        assert!(package.ncx_path.is_none());
    }

    #[test]
    fn test_parse_opf_finds_ncx_by_media_type() {
        let opf = r#"<package><manifest>
<item id="toc" href="nav/toc.ncx" media-type="application/x-dtbncx+xml"/>
</manifest><spine/></package>"#;
        let package = parse_opf(opf, "content.opf").unwrap();

        assert_eq!(package.ncx_path.as_deref(), Some("nav/toc.ncx"));
    }

    #[test]
    fn test_parse_ncx_flattens_in_order() {
        let ncx = r#"<?xml version="1.0"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <navMap>
    <navPoint id="part1" playOrder="1">
      <navLabel><text>Part I</text></navLabel>
      <content src="part1.xhtml"/>
      <navPoint id="ch1" playOrder="2">
        <navLabel><text>Chapter 1</text></navLabel>
        <content src="ch1.xhtml#start"/>
      </navPoint>
    </navPoint>
    <navPoint id="ch2" playOrder="3">
      <navLabel><text>Q&amp;A</text></navLabel>
      <content src="ch2.xhtml"/>
    </navPoint>
    <navPoint id="broken"><navLabel><text>No src</text></navLabel></navPoint>
  </navMap>
</ncx>"#;

        let points = parse_ncx(ncx).unwrap();
        let labels: Vec<_> = points.iter().map(|p| p.label.as_str()).collect();

        assert_eq!(labels, vec!["Part I", "Chapter 1", "Q&A"]);
        assert_eq!(points[1].src, "ch1.xhtml#start");
    }
}
