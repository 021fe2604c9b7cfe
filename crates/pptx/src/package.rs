//! PPTX package handling: template reading, slide stripping, and the
//! event-level rewrites of the package registration parts.
//!
//! A `.pptx` file is a ZIP archive of XML parts. Slides are registered in
//! three places besides their own part: the `[Content_Types].xml` override
//! list, the presentation relationships, and the `<p:sldIdLst>` of
//! `ppt/presentation.xml`. Stripping and appending slides must keep all
//! three in agreement.

use crate::layout::LayoutInfo;
use crate::scaffold;
use crate::xmlutil::{attr_value, local_name, resolve_target};
use deck_core::{Error, Result};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

/// Relationship type suffix identifying slide parts.
const REL_SUFFIX_SLIDE: &str = "/slide";
/// Relationship type suffix identifying slide masters.
const REL_SUFFIX_MASTER: &str = "/slideMaster";
/// Relationship type suffix identifying slide layouts.
const REL_SUFFIX_LAYOUT: &str = "/slideLayout";

/// Content type of a slide part.
pub(crate) const SLIDE_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
/// Relationship type of a slide part.
pub(crate) const SLIDE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
/// Relationship type of a slide layout part.
pub(crate) const LAYOUT_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";

/// Path of the presentation part, fixed by convention.
pub(crate) const PRESENTATION_PATH: &str = "ppt/presentation.xml";
/// Path of the presentation relationships part.
pub(crate) const PRESENTATION_RELS_PATH: &str = "ppt/_rels/presentation.xml.rels";
/// Path of the content types part.
pub(crate) const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// One entry of a relationships part.
#[derive(Debug, Clone)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

/// A styled-but-mutable base document the assembler fills with slides.
///
/// Either the embedded blank scaffold or a user template whose layouts and
/// masters are reused. The part map is consumed once per assembly; no
/// instance is shared across assemblies.
#[derive(Debug)]
pub struct BasePackage {
    /// Part path -> raw bytes, in deterministic order.
    pub(crate) parts: BTreeMap<String, Vec<u8>>,
    /// Layouts across all masters, in master order.
    pub(crate) layouts: Vec<LayoutInfo>,
    /// Pre-existing slide part paths, in presentation order.
    pub(crate) slides: Vec<String>,
    /// Whether this base came from a user template.
    pub(crate) from_template: bool,
}

impl BasePackage {
    /// Create the embedded blank scaffold: one master, a "Title Slide"
    /// layout and a "Title and Content" layout, no slides.
    pub fn blank() -> Self {
        let mut parts = BTreeMap::new();
        let entries = [
            (CONTENT_TYPES_PATH, scaffold::CONTENT_TYPES),
            ("_rels/.rels", scaffold::ROOT_RELS),
            (PRESENTATION_PATH, scaffold::PRESENTATION),
            (PRESENTATION_RELS_PATH, scaffold::PRESENTATION_RELS),
            ("ppt/slideMasters/slideMaster1.xml", scaffold::SLIDE_MASTER),
            (
                "ppt/slideMasters/_rels/slideMaster1.xml.rels",
                scaffold::SLIDE_MASTER_RELS,
            ),
            ("ppt/slideLayouts/slideLayout1.xml", scaffold::LAYOUT_TITLE),
            (
                "ppt/slideLayouts/slideLayout2.xml",
                scaffold::LAYOUT_TITLE_AND_CONTENT,
            ),
            (
                "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
                scaffold::LAYOUT_RELS,
            ),
            (
                "ppt/slideLayouts/_rels/slideLayout2.xml.rels",
                scaffold::LAYOUT_RELS,
            ),
            ("ppt/theme/theme1.xml", scaffold::THEME),
            ("docProps/core.xml", scaffold::CORE_PROPS),
            ("docProps/app.xml", scaffold::APP_PROPS),
        ];
        for (path, xml) in entries {
            parts.insert(path.to_string(), xml.as_bytes().to_vec());
        }

        let layouts = vec![
            LayoutInfo {
                name: "Title Slide".to_string(),
                path: "ppt/slideLayouts/slideLayout1.xml".to_string(),
                has_body_placeholder: true,
            },
            LayoutInfo {
                name: "Title and Content".to_string(),
                path: "ppt/slideLayouts/slideLayout2.xml".to_string(),
                has_body_placeholder: true,
            },
        ];

        Self {
            parts,
            layouts,
            slides: Vec::new(),
            from_template: false,
        }
    }

    /// Open a template package from a reader over `.pptx` bytes.
    ///
    /// Reads every part into memory, indexes the masters' layouts (with
    /// their display names) and the existing slide list. The template's
    /// slides are discarded later, during assembly.
    pub fn from_template<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open template: {}", e)))?;

        let mut parts = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;
            if file.is_dir() {
                continue;
            }
            let mut bytes = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut bytes)
                .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", file.name(), e)))?;
            parts.insert(file.name().to_string(), bytes);
        }

        Self::from_parts(parts)
    }

    /// Build a base from an already-read part map.
    pub(crate) fn from_parts(parts: BTreeMap<String, Vec<u8>>) -> Result<Self> {
        let pres_rels = part_as_str(&parts, PRESENTATION_RELS_PATH)?;
        let rels = parse_relationships(pres_rels)?;

        let slides: Vec<String> = rels
            .iter()
            .filter(|r| r.rel_type.ends_with(REL_SUFFIX_SLIDE))
            .map(|r| resolve_target("ppt", &r.target))
            .collect();

        let mut layouts = Vec::new();
        for master in rels.iter().filter(|r| r.rel_type.ends_with(REL_SUFFIX_MASTER)) {
            let master_path = resolve_target("ppt", &master.target);
            let master_rels_path = rels_path_for(&master_path);
            let master_dir = parent_dir(&master_path);

            let master_rels = match parts.get(&master_rels_path) {
                Some(bytes) => std::str::from_utf8(bytes).map_err(|e| {
                    Error::XmlError(format!("Master rels is not UTF-8: {}", e))
                })?,
                None => {
                    log::warn!("Master {} has no relationships part", master_path);
                    continue;
                }
            };

            for rel in parse_relationships(master_rels)?
                .iter()
                .filter(|r| r.rel_type.ends_with(REL_SUFFIX_LAYOUT))
            {
                let layout_path = resolve_target(&master_dir, &rel.target);
                let layout_xml = part_as_str(&parts, &layout_path)?;
                layouts.push(LayoutInfo {
                    name: layout_display_name(layout_xml)?.unwrap_or_default(),
                    path: layout_path,
                    has_body_placeholder: has_body_placeholder(layout_xml)?,
                });
            }
        }

        if layouts.is_empty() {
            return Err(Error::InvalidTemplate(
                "template contains no slide layouts".to_string(),
            ));
        }

        log::debug!(
            "template opened: {} parts, {} layouts, {} existing slides",
            parts.len(),
            layouts.len(),
            slides.len()
        );

        Ok(Self {
            parts,
            layouts,
            slides,
            from_template: true,
        })
    }

    /// Remove every pre-existing slide, leaving a styled-but-empty
    /// document. Masters, layouts, and theme are untouched.
    pub(crate) fn strip_slides(&mut self) -> Result<()> {
        if self.slides.is_empty() {
            return Ok(());
        }

        let stripped = self.slides.len();
        self.parts.retain(|path, _| {
            !path.starts_with("ppt/slides/") && !path.starts_with("ppt/notesSlides/")
        });
        for path in std::mem::take(&mut self.slides) {
            self.parts.remove(&path);
        }

        let content_types = part_as_str(&self.parts, CONTENT_TYPES_PATH)?;
        let rewritten = rewrite_content_types(content_types, true, &[])?;
        self.parts
            .insert(CONTENT_TYPES_PATH.to_string(), rewritten.into_bytes());

        let pres_rels = part_as_str(&self.parts, PRESENTATION_RELS_PATH)?;
        let rewritten = rewrite_relationships(pres_rels, true, &[])?;
        self.parts
            .insert(PRESENTATION_RELS_PATH.to_string(), rewritten.into_bytes());

        let presentation = part_as_str(&self.parts, PRESENTATION_PATH)?;
        let rewritten = rewrite_presentation(presentation, &[])?;
        self.parts
            .insert(PRESENTATION_PATH.to_string(), rewritten.into_bytes());

        log::debug!("stripped {} template slides", stripped);

        Ok(())
    }
}

/// Read a required part as UTF-8 text.
pub(crate) fn part_as_str<'a>(
    parts: &'a BTreeMap<String, Vec<u8>>,
    path: &str,
) -> Result<&'a str> {
    let bytes = parts.get(path).ok_or_else(|| {
        Error::InvalidTemplate(format!("missing required part: {}", path))
    })?;
    std::str::from_utf8(bytes)
        .map_err(|e| Error::XmlError(format!("Part {} is not UTF-8: {}", path, e)))
}

/// Parse a relationships part into entries ordered by numeric rId.
pub(crate) fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut entries: Vec<Relationship> = Vec::new();
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.name().as_ref() == b"Relationship" =>
            {
                let id = attr_value(e, b"Id").unwrap_or_default();
                let rel_type = attr_value(e, b"Type").unwrap_or_default();
                let target = attr_value(e, b"Target").unwrap_or_default();
                entries.push(Relationship {
                    id,
                    rel_type,
                    target,
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    entries.sort_by(|a, b| match (rel_number(&a.id), rel_number(&b.id)) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });

    Ok(entries)
}

/// Highest numeric rId in a relationships part, 0 if none.
pub(crate) fn max_rel_id(xml: &str) -> Result<u32> {
    Ok(parse_relationships(xml)?
        .iter()
        .filter_map(|r| rel_number(&r.id))
        .max()
        .unwrap_or(0) as u32)
}

/// Extract the trailing number from an id like "rId12".
fn rel_number(id: &str) -> Option<usize> {
    let digits: String = id.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

/// The `_rels` sibling path of a part, e.g. `ppt/slideMasters/x.xml` ->
/// `ppt/slideMasters/_rels/x.xml.rels`.
pub(crate) fn rels_path_for(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, name)) => format!("{}/_rels/{}.rels", dir, name),
        None => format!("_rels/{}.rels", part_path),
    }
}

/// The directory of a part path.
pub(crate) fn parent_dir(part_path: &str) -> String {
    part_path
        .rsplit_once('/')
        .map(|(dir, _)| dir.to_string())
        .unwrap_or_default()
}

/// Read the display name of a layout from its `<p:cSld name="...">`.
pub(crate) fn layout_display_name(xml: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if local_name(e.name().as_ref()) == b"cSld" =>
            {
                return Ok(attr_value(e, b"name"));
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(Error::XmlError(format!("Error reading layout: {}", e))),
            _ => {}
        }
    }
}

/// Whether a layout carries a body placeholder (a `<p:ph>` with `idx="1"`).
pub(crate) fn has_body_placeholder(xml: &str) -> Result<bool> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if local_name(e.name().as_ref()) == b"ph" =>
            {
                if attr_value(e, b"idx").as_deref() == Some("1") {
                    return Ok(true);
                }
            }
            Ok(Event::Eof) => return Ok(false),
            Err(e) => return Err(Error::XmlError(format!("Error reading layout: {}", e))),
            _ => {}
        }
    }
}

/// Rewrite `[Content_Types].xml`: optionally drop slide and notes-slide
/// overrides, and append new overrides before the closing tag.
pub(crate) fn rewrite_content_types(
    xml: &str,
    drop_slides: bool,
    additions: &[(String, String)],
) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::XmlError(format!("Error rewriting content types: {}", e)))?;
        match event {
            Event::Eof => break,
            Event::Empty(ref e)
                if drop_slides
                    && e.name().as_ref() == b"Override"
                    && is_slide_part_name(e) => {}
            Event::End(ref e) if e.name().as_ref() == b"Types" => {
                for (path, content_type) in additions {
                    let mut over = BytesStart::new("Override");
                    over.push_attribute(("PartName", format!("/{}", path).as_str()));
                    over.push_attribute(("ContentType", content_type.as_str()));
                    write_event(&mut writer, Event::Empty(over))?;
                }
                write_event(&mut writer, event.clone())?;
            }
            other => write_event(&mut writer, other)?,
        }
    }

    into_xml_string(writer)
}

/// Rewrite a relationships part: optionally drop slide relationships, and
/// append new entries before the closing tag.
pub(crate) fn rewrite_relationships(
    xml: &str,
    drop_slides: bool,
    additions: &[Relationship],
) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::XmlError(format!("Error rewriting relationships: {}", e)))?;
        match event {
            Event::Eof => break,
            Event::Empty(ref e)
                if drop_slides
                    && e.name().as_ref() == b"Relationship"
                    && attr_value(e, b"Type")
                        .map(|t| t.ends_with(REL_SUFFIX_SLIDE))
                        .unwrap_or(false) => {}
            Event::End(ref e) if e.name().as_ref() == b"Relationships" => {
                for rel in additions {
                    let mut entry = BytesStart::new("Relationship");
                    entry.push_attribute(("Id", rel.id.as_str()));
                    entry.push_attribute(("Type", rel.rel_type.as_str()));
                    entry.push_attribute(("Target", rel.target.as_str()));
                    write_event(&mut writer, Event::Empty(entry))?;
                }
                write_event(&mut writer, event.clone())?;
            }
            other => write_event(&mut writer, other)?,
        }
    }

    into_xml_string(writer)
}

/// Rewrite `ppt/presentation.xml`, replacing the slide id list with the
/// given `(slide id, rId)` entries. An empty list removes the element.
pub(crate) fn rewrite_presentation(xml: &str, entries: &[(u32, String)]) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut inserted = false;
    // Depth inside a skipped sldIdLst subtree; 0 means not skipping.
    let mut skip_depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::XmlError(format!("Error rewriting presentation: {}", e)))?;

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => {
                    return Err(Error::XmlError(
                        "unterminated sldIdLst in presentation.xml".to_string(),
                    ));
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Eof => break,
            Event::Start(ref e) if local_name(e.name().as_ref()) == b"sldIdLst" => {
                if !inserted {
                    write_slide_id_list(&mut writer, entries)?;
                    inserted = true;
                }
                skip_depth = 1;
            }
            Event::Empty(ref e) if local_name(e.name().as_ref()) == b"sldIdLst" => {
                if !inserted {
                    write_slide_id_list(&mut writer, entries)?;
                    inserted = true;
                }
            }
            Event::Start(ref e) | Event::Empty(ref e)
                if !inserted && local_name(e.name().as_ref()) == b"sldSz" =>
            {
                write_slide_id_list(&mut writer, entries)?;
                inserted = true;
                write_event(&mut writer, event.clone())?;
            }
            Event::End(ref e) if !inserted && local_name(e.name().as_ref()) == b"presentation" => {
                write_slide_id_list(&mut writer, entries)?;
                inserted = true;
                write_event(&mut writer, event.clone())?;
            }
            other => write_event(&mut writer, other)?,
        }
    }

    into_xml_string(writer)
}

/// Emit a `<p:sldIdLst>` with the given entries; nothing if empty.
fn write_slide_id_list(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    entries: &[(u32, String)],
) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    write_event(writer, Event::Start(BytesStart::new("p:sldIdLst")))?;
    for (slide_id, rel_id) in entries {
        let mut sld = BytesStart::new("p:sldId");
        sld.push_attribute(("id", slide_id.to_string().as_str()));
        sld.push_attribute(("r:id", rel_id.as_str()));
        write_event(writer, Event::Empty(sld))?;
    }
    write_event(writer, Event::End(BytesEnd::new("p:sldIdLst")))?;
    Ok(())
}

fn is_slide_part_name(e: &BytesStart) -> bool {
    attr_value(e, b"PartName")
        .map(|p| p.starts_with("/ppt/slides/") || p.starts_with("/ppt/notesSlides/"))
        .unwrap_or(false)
}

fn write_event(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::XmlError(format!("Error writing XML: {}", e)))
}

fn into_xml_string(writer: Writer<Cursor<Vec<u8>>>) -> Result<String> {
    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| Error::XmlError(format!("Rewritten XML is not UTF-8: {}", e)))
}
