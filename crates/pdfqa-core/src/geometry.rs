//! Page geometry snapshot
//!
//! Plain numeric rectangles for one page: character boxes, detected tables
//! and their cells. Coordinates are PDF user space with the origin moved to
//! the lower-left corner of the page's MediaBox, so `x1 > width` means the
//! box crosses the right page edge.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle, `y` grows upwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    /// Smallest box covering both
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// One rendered glyph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharBox {
    pub text: String,
    pub bbox: BBox,
}

impl CharBox {
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }

    /// Right edge x-coordinate
    pub fn x1(&self) -> f64 {
        self.bbox.x1
    }
}

/// A table found on the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBox {
    pub bbox: BBox,
    pub cells: Vec<BBox>,
    /// Cell text grouped by row, top row first. `None` marks an empty cell.
    pub rows: Vec<Vec<Option<String>>>,
}

impl TableBox {
    /// Short identifying excerpt: the first row's first three cells,
    /// empty ones skipped, each cut to 30 characters.
    pub fn sample(&self) -> String {
        let Some(first_row) = self.rows.first() else {
            return "[Empty table]".to_string();
        };

        first_row
            .iter()
            .take(3)
            .flatten()
            .filter(|cell| !cell.is_empty())
            .map(|cell| cell.chars().take(30).collect::<String>())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Everything the overflow detector needs to know about a page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub chars: Vec<CharBox>,
    pub tables: Vec<TableBox>,
}

impl PageGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_chars(mut self, chars: Vec<CharBox>) -> Self {
        self.chars = chars;
        self
    }

    pub fn with_tables(mut self, tables: Vec<TableBox>) -> Self {
        self.tables = tables;
        self
    }
}
