//! EPUB format importer - handles all IO.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::book::{Chapter, Format, UNKNOWN_AUTHOR, title_from_path};
use crate::epub::{
    AssetSource, Package, body_fragment, inline_images, parse_container_xml, parse_ncx, parse_opf,
    resolve_href,
};
use crate::error::Result;
use crate::import::{Content, Importer};
use crate::util::decode_markup;

/// EPUB importer. Every spine item becomes one chapter.
pub struct EpubImporter<R: Read + Seek = File> {
    archive: ZipArchive<R>,
    package: Package,
    /// Archive path -> NCX label.
    nav_titles: HashMap<String, String>,
    title: String,
    author: String,
}

impl Importer for EpubImporter<File> {
    const FORMAT: Format = Format::Epub;

    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file, &title_from_path(path))
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn author(&self) -> &str {
        &self.author
    }

    fn load_content(&mut self) -> Result<Content> {
        Ok(Content::Chapters(self.load_chapters()))
    }
}

impl<R: Read + Seek> EpubImporter<R> {
    /// Read the package metadata from an EPUB archive.
    ///
    /// `fallback_title` is used when the package declares no title.
    pub fn from_reader(reader: R, fallback_title: &str) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let container = archive.read_asset("META-INF/container.xml")?;
        let opf_path = parse_container_xml(&container)?;

        let opf_bytes = archive.read_asset(&opf_path)?;
        let package = parse_opf(&decode_markup(&opf_bytes), &opf_path)?;

        let nav_titles = match package.ncx_path.as_deref() {
            Some(ncx_path) => read_nav_titles(&mut archive, ncx_path),
            None => HashMap::new(),
        };

        let title = package
            .title
            .clone()
            .unwrap_or_else(|| fallback_title.to_string());
        let author = package
            .author
            .clone()
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

        log::debug!(
            "EPUB {opf_path}: {} manifest items, {} spine items, {} nav points",
            package.manifest.len(),
            package.spine.len(),
            nav_titles.len()
        );

        Ok(Self {
            archive,
            package,
            nav_titles,
            title,
            author,
        })
    }

    /// One chapter per readable spine item, in reading order.
    pub fn load_chapters(&mut self) -> Vec<Chapter> {
        let mut chapters = Vec::with_capacity(self.package.spine.len());

        for idref in &self.package.spine {
            let Some(entry) = self.package.manifest.get(idref) else {
                log::warn!("spine item {idref:?} is not in the manifest");
                continue;
            };

            let bytes = match self.archive.read_asset(&entry.href) {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("skipping unreadable spine item {}: {e}", entry.href);
                    continue;
                }
            };

            let markup = decode_markup(&bytes);
            let content = inline_images(
                body_fragment(&markup),
                &entry.href,
                &self.package.manifest,
                &mut self.archive,
            );

            let title = self
                .nav_titles
                .get(&entry.href)
                .cloned()
                .unwrap_or_else(|| entry.id.clone());
            chapters.push(Chapter::new(title, content));
        }

        chapters
    }
}

/// NCX labels keyed by the archive path they point to. The first nav point
/// for a path wins; a missing or broken NCX yields no titles.
fn read_nav_titles<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    ncx_path: &str,
) -> HashMap<String, String> {
    let points = match archive
        .read_asset(ncx_path)
        .and_then(|bytes| parse_ncx(&decode_markup(&bytes)))
    {
        Ok(points) => points,
        Err(e) => {
            log::warn!("ignoring table of contents {ncx_path}: {e}");
            return HashMap::new();
        }
    };

    let mut titles = HashMap::new();
    for point in points {
        let target = point.src.split('#').next().unwrap_or(&point.src);
        titles
            .entry(resolve_href(ncx_path, target))
            .or_insert(point.label);
    }
    titles
}
