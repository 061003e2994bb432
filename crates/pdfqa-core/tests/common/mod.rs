//! In-memory PDF fixtures for integration tests
//!
//! Pages are US Letter (612 x 792) and share a single Courier resource
//! named `F1`, so every glyph is exactly `0.6 * font_size` wide.

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

pub const PAGE_WIDTH: f64 = 612.0;

/// Operations showing `text` in 10pt Courier with its baseline at (x, y)
pub fn text_at(x: f64, y: f64, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
        Operation::new("Td", vec![Object::Real(x as f32), Object::Real(y as f32)]),
        Operation::new(
            "Tj",
            vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

/// A stroked straight line
pub fn rule(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Operation> {
    vec![
        Operation::new("m", vec![Object::Real(x0 as f32), Object::Real(y0 as f32)]),
        Operation::new("l", vec![Object::Real(x1 as f32), Object::Real(y1 as f32)]),
        Operation::new("S", vec![]),
    ]
}

/// Ruling lines for a one-row grid with the given column boundaries
pub fn grid_row(columns: &[f64], bottom: f64, top: f64) -> Vec<Operation> {
    let left = columns[0];
    let right = columns[columns.len() - 1];
    let mut ops = rule(left, bottom, right, bottom);
    ops.extend(rule(left, top, right, top));
    for &x in columns {
        ops.extend(rule(x, bottom, x, top));
    }
    ops
}

fn rect(corners: [i64; 4]) -> Vec<Object> {
    corners.into_iter().map(Object::Integer).collect()
}

/// `/Link` annotation pointing at a named destination via `/Dest`
pub fn named_link(name: &str) -> Dictionary {
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => rect([72, 700, 144, 712]),
        "Dest" => Object::string_literal(name),
    }
}

/// `/Link` annotation with a GoTo action to a named destination
pub fn goto_link(name: &str) -> Dictionary {
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => rect([72, 680, 144, 692]),
        "A" => dictionary! {
            "S" => "GoTo",
            "D" => Object::Name(name.as_bytes().to_vec()),
        },
    }
}

/// `/Link` annotation with an explicit `[page /Fit]` destination
pub fn explicit_link() -> Dictionary {
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => rect([72, 660, 144, 672]),
        "Dest" => vec![Object::Null, Object::Name(b"Fit".to_vec())],
    }
}

/// `/Link` annotation with a URI action
pub fn uri_link(uri: &str) -> Dictionary {
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => rect([72, 640, 144, 652]),
        "A" => dictionary! {
            "S" => "URI",
            "URI" => Object::string_literal(uri),
        },
    }
}

/// A non-link annotation
pub fn sticky_note() -> Dictionary {
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Text",
        "Rect" => rect([10, 10, 30, 30]),
        "Contents" => Object::string_literal("review this"),
        "Dest" => Object::string_literal("nowhere"),
    }
}

#[derive(Default)]
struct PageFixture {
    operations: Vec<Operation>,
    annotations: Vec<Dictionary>,
    rotate: Option<i64>,
}

/// Builds a small PDF in memory
#[derive(Default)]
pub struct PdfBuilder {
    pages: Vec<PageFixture>,
    /// Catalog `/Dests` entries: name -> 0-based page index
    dests: Vec<(String, usize)>,
    /// `/Names /Dests` tree entries, split into two kids
    name_tree: Vec<(String, usize)>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, operations: Vec<Operation>, annotations: Vec<Dictionary>) -> Self {
        self.pages.push(PageFixture {
            operations,
            annotations,
            rotate: None,
        });
        self
    }

    /// A page carrying `/Rotate degrees`
    pub fn rotated_page(mut self, degrees: i64, operations: Vec<Operation>) -> Self {
        self.pages.push(PageFixture {
            operations,
            annotations: Vec::new(),
            rotate: Some(degrees),
        });
        self
    }

    pub fn dest(mut self, name: &str, page_index: usize) -> Self {
        self.dests.push((name.to_string(), page_index));
        self
    }

    pub fn named_dest(mut self, name: &str, page_index: usize) -> Self {
        self.name_tree.push((name.to_string(), page_index));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let page_ids: Vec<ObjectId> = self.pages.iter().map(|_| doc.new_object_id()).collect();
        for (fixture, &page_id) in self.pages.into_iter().zip(&page_ids) {
            let content = Content {
                operations: fixture.operations,
            };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => rect([0, 0, 612, 792]),
                "Contents" => content_id,
                "Resources" => resources_id,
            };
            if let Some(degrees) = fixture.rotate {
                page.set("Rotate", Object::Integer(degrees));
            }
            if !fixture.annotations.is_empty() {
                let annots: Vec<Object> = fixture
                    .annotations
                    .into_iter()
                    .map(|a| Object::Reference(doc.add_object(a)))
                    .collect();
                page.set("Annots", annots);
            }
            doc.objects.insert(page_id, Object::Dictionary(page));
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Count" => Object::Integer(page_ids.len() as i64),
            "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let fit = |index: usize| -> Object {
            vec![Object::Reference(page_ids[index]), Object::Name(b"Fit".to_vec())].into()
        };

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if !self.dests.is_empty() {
            let mut dests = Dictionary::new();
            for (name, index) in &self.dests {
                dests.set(name.as_bytes().to_vec(), fit(*index));
            }
            catalog.set("Dests", dests);
        }
        if !self.name_tree.is_empty() {
            let mid = self.name_tree.len().div_ceil(2);
            let kids: Vec<Object> = self
                .name_tree
                .chunks(mid)
                .map(|chunk| {
                    let names: Vec<Object> = chunk
                        .iter()
                        .flat_map(|(name, index)| {
                            [Object::string_literal(name.as_str()), fit(*index)]
                        })
                        .collect();
                    Object::Reference(doc.add_object(dictionary! { "Names" => names }))
                })
                .collect();
            catalog.set("Names", dictionary! { "Dests" => dictionary! { "Kids" => kids } });
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }
}
