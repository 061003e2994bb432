//! lopdf-backed document source

use super::content::{ContentInterpreter, Matrix};
use super::fonts::{as_number, dict_get, resolve};
use super::tables::TableFinder;
use super::{Annotation, Destination, DocumentSource, LinkTarget, ResolvedTarget};
use crate::error::{AnalyzerError, Result};
use crate::geometry::PageGeometry;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// US Letter, used when a page has no MediaBox anywhere in its tree
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Guards against cyclic `/Parent` chains and name trees
const MAX_TREE_DEPTH: usize = 32;

/// A PDF opened once and queried page by page
pub struct LopdfSource {
    doc: Document,
    /// Page object ids in document order
    page_ids: Vec<ObjectId>,
}

impl std::fmt::Debug for LopdfSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LopdfSource")
            .field("page_count", &self.page_ids.len())
            .finish_non_exhaustive()
    }
}

impl LopdfSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_document(Document::load_mem(bytes)?))
    }

    pub fn from_document(doc: Document) -> Self {
        let page_ids = doc.get_pages().into_values().collect();
        Self { doc, page_ids }
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        page.checked_sub(1)
            .and_then(|i| self.page_ids.get(i as usize))
            .copied()
            .ok_or_else(|| {
                AnalyzerError::Parse(format!(
                    "page {} out of range (document has {} pages)",
                    page,
                    self.page_ids.len()
                ))
            })
    }

    fn page_dict(&self, page_id: ObjectId) -> Result<&Dictionary> {
        self.doc
            .get_object(page_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| AnalyzerError::Parse(format!("failed to get page dictionary: {}", e)))
    }

    /// Look a key up on the page, then up the `/Parent` chain
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Result<Option<&Object>> {
        let mut dict = self.page_dict(page_id)?;
        for _ in 0..MAX_TREE_DEPTH {
            if let Some(value) = dict_get(&self.doc, dict, key) {
                return Ok(Some(value));
            }
            match dict_get(&self.doc, dict, b"Parent").and_then(|o| o.as_dict().ok()) {
                Some(parent) => dict = parent,
                None => return Ok(None),
            }
        }
        Ok(None)
    }

    fn media_box(&self, page_id: ObjectId) -> Result<[f64; 4]> {
        let Some(obj) = self.inherited(page_id, b"MediaBox")? else {
            return Ok(DEFAULT_MEDIA_BOX);
        };
        let values: Vec<f64> = obj
            .as_array()
            .map_err(|e| AnalyzerError::Parse(format!("/MediaBox is not an array: {}", e)))?
            .iter()
            .filter_map(|o| resolve(&self.doc, o).and_then(as_number))
            .collect();

        match values.as_slice() {
            [x0, y0, x1, y1] => Ok([x0.min(*x1), y0.min(*y1), x0.max(*x1), y0.max(*y1)]),
            _ => Err(AnalyzerError::Parse(format!(
                "expected 4 numbers in /MediaBox, got {}",
                values.len()
            ))),
        }
    }

    /// Clockwise display rotation: 0, 90, 180 or 270
    fn rotation(&self, page_id: ObjectId) -> Result<u32> {
        let Some(obj) = self.inherited(page_id, b"Rotate")? else {
            return Ok(0);
        };
        let degrees = obj
            .as_i64()
            .map_err(|e| AnalyzerError::Parse(format!("/Rotate is not an integer: {}", e)))?
            .rem_euclid(360);
        if degrees % 90 != 0 {
            tracing::warn!("Ignoring /Rotate {} (not a multiple of 90)", degrees);
            return Ok(0);
        }
        Ok(degrees as u32)
    }

    /// 1-based page number of a page object
    fn page_number_of(&self, id: ObjectId) -> Option<u32> {
        self.page_ids
            .iter()
            .position(|&p| p == id)
            .map(|i| i as u32 + 1)
    }

    fn resolved_target(&self, value: &Object) -> ResolvedTarget {
        let value = resolve(&self.doc, value);
        let array = match value {
            Some(Object::Array(arr)) => Some(arr),
            Some(Object::Dictionary(d)) => {
                dict_get(&self.doc, d, b"D").and_then(|o| o.as_array().ok())
            }
            _ => None,
        };
        let page = array
            .and_then(|arr| arr.first())
            .and_then(|first| first.as_reference().ok())
            .and_then(|id| self.page_number_of(id));
        ResolvedTarget { page }
    }

    fn catalog(&self) -> Result<&Dictionary> {
        self.doc
            .trailer
            .get(b"Root")
            .ok()
            .and_then(|o| resolve(&self.doc, o))
            .and_then(|o| o.as_dict().ok())
            .ok_or_else(|| AnalyzerError::Parse("document has no catalog".to_string()))
    }

    fn collect_name_tree(
        &self,
        node: &Dictionary,
        depth: usize,
        out: &mut HashMap<String, ResolvedTarget>,
    ) {
        if depth >= MAX_TREE_DEPTH {
            tracing::warn!("Name tree deeper than {} levels, ignoring the rest", MAX_TREE_DEPTH);
            return;
        }

        if let Some(names) = dict_get(&self.doc, node, b"Names").and_then(|o| o.as_array().ok()) {
            // [key1 value1 key2 value2 ...]
            for pair in names.chunks(2) {
                if let [key, value] = pair {
                    if let Some(name) = resolve(&self.doc, key).and_then(text_of) {
                        out.insert(name, self.resolved_target(value));
                    }
                }
            }
        }

        if let Some(kids) = dict_get(&self.doc, node, b"Kids").and_then(|o| o.as_array().ok()) {
            for kid in kids {
                if let Some(kid) = resolve(&self.doc, kid).and_then(|o| o.as_dict().ok()) {
                    self.collect_name_tree(kid, depth + 1, out);
                }
            }
        }
    }

    fn link_target(&self, annot: &Dictionary) -> Option<LinkTarget> {
        if let Some(action) = dict_get(&self.doc, annot, b"A").and_then(|o| o.as_dict().ok()) {
            if let Some(uri) = dict_get(&self.doc, action, b"URI").and_then(text_of) {
                return Some(LinkTarget::External(uri));
            }
            let is_goto = dict_get(&self.doc, action, b"S")
                .and_then(|o| o.as_name().ok())
                .is_some_and(|s| s == b"GoTo");
            if is_goto {
                if let Some(dest) = dict_get(&self.doc, action, b"D").and_then(destination_of) {
                    return Some(LinkTarget::Internal(dest));
                }
            }
        }

        dict_get(&self.doc, annot, b"Dest")
            .and_then(destination_of)
            .map(LinkTarget::Internal)
    }
}

impl DocumentSource for LopdfSource {
    fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    fn page_geometry(&self, page: u32) -> Result<PageGeometry> {
        let page_id = self.page_id(page)?;
        let media_box = self.media_box(page_id)?;
        let rotation = self.rotation(page_id)?;
        let [x0, y0, x1, y1] = media_box;
        let (width, height) = match rotation {
            90 | 270 => (y1 - y0, x1 - x0),
            _ => (x1 - x0, y1 - y0),
        };

        let content = self.doc.get_page_content(page_id)?;
        let empty = Dictionary::new();
        let resources = match self.inherited(page_id, b"Resources")? {
            Some(obj) => obj.as_dict().map_err(|_| {
                AnalyzerError::Parse("/Resources is not a dictionary".to_string())
            })?,
            None => &empty,
        };

        let display = Matrix::page_display(media_box, rotation);
        let extracted = ContentInterpreter::new(&self.doc, display).run(&content, resources)?;
        let tables = TableFinder::default().find(&extracted.edges, &extracted.chars);

        Ok(PageGeometry::new(width, height)
            .with_chars(extracted.chars)
            .with_tables(tables))
    }

    fn page_annotations(&self, page: u32) -> Result<Vec<Annotation>> {
        let page_id = self.page_id(page)?;
        let page_dict = self.page_dict(page_id)?;

        let Some(annots) = dict_get(&self.doc, page_dict, b"Annots") else {
            return Ok(Vec::new());
        };
        let annots = annots
            .as_array()
            .map_err(|e| AnalyzerError::Parse(format!("/Annots is not an array: {}", e)))?;

        let mut annotations = Vec::new();
        for entry in annots {
            // unresolvable or malformed entries are skipped, not fatal
            let Some(annot) = resolve(&self.doc, entry).and_then(|o| o.as_dict().ok()) else {
                continue;
            };
            let Some(subtype) = dict_get(&self.doc, annot, b"Subtype")
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).into_owned())
            else {
                continue;
            };

            let target = if subtype == "Link" {
                self.link_target(annot)
            } else {
                None
            };
            annotations.push(Annotation { subtype, target });
        }

        Ok(annotations)
    }

    fn named_destinations(&self) -> Result<Vec<(String, ResolvedTarget)>> {
        let catalog = self.catalog()?;
        let mut found = HashMap::new();

        // PDF 1.1 style: /Dests dictionary in the catalog
        if let Some(dests) = dict_get(&self.doc, catalog, b"Dests").and_then(|o| o.as_dict().ok()) {
            for (key, value) in dests.iter() {
                found.insert(
                    String::from_utf8_lossy(key).into_owned(),
                    self.resolved_target(value),
                );
            }
        }

        // PDF 1.2+: /Names -> /Dests name tree
        if let Some(tree) = dict_get(&self.doc, catalog, b"Names")
            .and_then(|o| o.as_dict().ok())
            .and_then(|names| dict_get(&self.doc, names, b"Dests"))
            .and_then(|o| o.as_dict().ok())
        {
            self.collect_name_tree(tree, 0, &mut found);
        }

        let mut entries: Vec<_> = found.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

fn destination_of(obj: &Object) -> Option<Destination> {
    match obj {
        Object::Array(_) => Some(Destination::Explicit),
        other => text_of(other).map(Destination::Named),
    }
}

/// Decode a PDF text string or name: UTF-16BE with BOM, UTF-8, then Latin-1
fn text_of(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => {
            if let [0xFE, 0xFF, rest @ ..] = bytes.as_slice() {
                let units: Vec<u16> = rest
                    .chunks(2)
                    .filter_map(|c| match c {
                        [hi, lo] => Some(u16::from_be_bytes([*hi, *lo])),
                        _ => None,
                    })
                    .collect();
                return String::from_utf16(&units).ok();
            }
            match std::str::from_utf8(bytes) {
                Ok(s) => Some(s.to_string()),
                Err(_) => Some(bytes.iter().map(|&b| b as char).collect()),
            }
        }
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}
