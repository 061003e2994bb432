//! Content stream interpreter
//!
//! Walks a page's operators to recover glyph boxes and ruling edges. Only
//! the state that moves glyphs or draws straight lines is tracked; colour,
//! clipping and images are ignored.

use super::fonts::{as_number, dict_get, FontInfo};
use super::tables::Edge;
use crate::error::Result;
use crate::geometry::{BBox, CharBox};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object};
use std::collections::HashMap;
use std::rc::Rc;

/// Form XObjects nested deeper than this are skipped
const MAX_FORM_DEPTH: usize = 8;

/// Glyph extent below and above the baseline, as a fraction of font size
const DESCENT: f64 = -0.2;
const ASCENT: f64 = 0.8;

/// Segments closer than this to horizontal/vertical count as ruling lines
const AXIS_EPSILON: f64 = 0.5;

/// Affine transform `[a b c d e f]`, row-vector convention
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// User space to displayed page space: the MediaBox origin moves to
    /// (0, 0) and the page is turned clockwise by `rotation` degrees, which
    /// must be 0, 90, 180 or 270.
    pub fn page_display(media_box: [f64; 4], rotation: u32) -> Self {
        let [x0, y0, x1, y1] = media_box;
        let (w, h) = (x1 - x0, y1 - y0);
        let turn = match rotation {
            90 => Self::new(0.0, -1.0, 1.0, 0.0, 0.0, w),
            180 => Self::new(-1.0, 0.0, 0.0, -1.0, w, h),
            270 => Self::new(0.0, 1.0, -1.0, 0.0, h, 0.0),
            _ => Self::IDENTITY,
        };
        Self::translate(-x0, -y0).then(&turn)
    }

    fn from_operands(operands: &[Object]) -> Self {
        Self::new(
            num(operands, 0),
            num(operands, 1),
            num(operands, 2),
            num(operands, 3),
            num(operands, 4),
            num(operands, 5),
        )
    }

    /// `self` applied first, then `other`
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Rc<FontInfo>>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    h_scale: f64,
    leading: f64,
    rise: f64,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Path segments waiting for a painting operator
#[derive(Debug, Default)]
struct PathBuilder {
    segments: Vec<((f64, f64), (f64, f64))>,
    start: Option<(f64, f64)>,
    current: Option<(f64, f64)>,
}

impl PathBuilder {
    fn move_to(&mut self, p: (f64, f64)) {
        self.start = Some(p);
        self.current = Some(p);
    }

    fn line_to(&mut self, p: (f64, f64)) {
        if let Some(from) = self.current {
            self.segments.push((from, p));
        }
        self.current = Some(p);
        if self.start.is_none() {
            self.start = Some(p);
        }
    }

    fn close(&mut self) {
        if let (Some(from), Some(to)) = (self.current, self.start) {
            if from != to {
                self.segments.push((from, to));
            }
            self.current = Some(to);
        }
    }

    fn take(&mut self) -> Vec<((f64, f64), (f64, f64))> {
        self.start = None;
        self.current = None;
        std::mem::take(&mut self.segments)
    }
}

/// Glyphs and ruling edges recovered from one page
#[derive(Debug, Default)]
pub(crate) struct PageContent {
    pub chars: Vec<CharBox>,
    pub edges: Vec<Edge>,
}

pub(crate) struct ContentInterpreter<'a> {
    doc: &'a Document,
    /// Applied to every output coordinate, see [`Matrix::page_display`]
    display: Matrix,
    output: PageContent,
}

impl<'a> ContentInterpreter<'a> {
    pub fn new(doc: &'a Document, display: Matrix) -> Self {
        Self {
            doc,
            display,
            output: PageContent::default(),
        }
    }

    pub fn run(mut self, content: &[u8], resources: &Dictionary) -> Result<PageContent> {
        self.interpret(content, resources, Matrix::IDENTITY, 0)?;
        Ok(self.output)
    }

    fn interpret(
        &mut self,
        content: &[u8],
        resources: &Dictionary,
        ctm: Matrix,
        depth: usize,
    ) -> Result<()> {
        let content = Content::decode(content)?;
        let mut fonts: HashMap<Vec<u8>, Rc<FontInfo>> = HashMap::new();
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut gs = GraphicsState::new(ctm);
        let mut tm = Matrix::IDENTITY;
        let mut tlm = Matrix::IDENTITY;
        let mut path = PathBuilder::default();

        for op in &content.operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => stack.push(gs.clone()),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        gs = saved;
                    }
                }
                "cm" => gs.ctm = Matrix::from_operands(operands).then(&gs.ctm),

                "BT" => {
                    tm = Matrix::IDENTITY;
                    tlm = Matrix::IDENTITY;
                }
                "ET" => {}
                "Tf" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        gs.font = Some(self.load_font(&mut fonts, resources, name));
                    }
                    gs.font_size = num(operands, 1);
                }
                "Tc" => gs.char_spacing = num(operands, 0),
                "Tw" => gs.word_spacing = num(operands, 0),
                "Tz" => gs.h_scale = num(operands, 0) / 100.0,
                "TL" => gs.leading = num(operands, 0),
                "Ts" => gs.rise = num(operands, 0),
                "Td" => {
                    tlm = Matrix::translate(num(operands, 0), num(operands, 1)).then(&tlm);
                    tm = tlm;
                }
                "TD" => {
                    gs.leading = -num(operands, 1);
                    tlm = Matrix::translate(num(operands, 0), num(operands, 1)).then(&tlm);
                    tm = tlm;
                }
                "Tm" => {
                    tlm = Matrix::from_operands(operands);
                    tm = tlm;
                }
                "T*" => {
                    tlm = Matrix::translate(0.0, -gs.leading).then(&tlm);
                    tm = tlm;
                }
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show(&gs, &mut tm, bytes);
                    }
                }
                "'" => {
                    tlm = Matrix::translate(0.0, -gs.leading).then(&tlm);
                    tm = tlm;
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show(&gs, &mut tm, bytes);
                    }
                }
                "\"" => {
                    gs.word_spacing = num(operands, 0);
                    gs.char_spacing = num(operands, 1);
                    tlm = Matrix::translate(0.0, -gs.leading).then(&tlm);
                    tm = tlm;
                    if let Some(Object::String(bytes, _)) = operands.get(2) {
                        self.show(&gs, &mut tm, bytes);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        for item in items {
                            match item {
                                Object::String(bytes, _) => self.show(&gs, &mut tm, bytes),
                                other => {
                                    if let Some(adjust) = as_number(other) {
                                        let tx = -adjust / 1000.0 * gs.font_size * gs.h_scale;
                                        tm = Matrix::translate(tx, 0.0).then(&tm);
                                    }
                                }
                            }
                        }
                    }
                }

                "m" => path.move_to(gs.ctm.apply(num(operands, 0), num(operands, 1))),
                "l" => path.line_to(gs.ctm.apply(num(operands, 0), num(operands, 1))),
                "c" => path.current = Some(gs.ctm.apply(num(operands, 4), num(operands, 5))),
                "v" | "y" => path.current = Some(gs.ctm.apply(num(operands, 2), num(operands, 3))),
                "h" => path.close(),
                "re" => {
                    let (x, y, w, h) = (
                        num(operands, 0),
                        num(operands, 1),
                        num(operands, 2),
                        num(operands, 3),
                    );
                    path.move_to(gs.ctm.apply(x, y));
                    path.line_to(gs.ctm.apply(x + w, y));
                    path.line_to(gs.ctm.apply(x + w, y + h));
                    path.line_to(gs.ctm.apply(x, y + h));
                    path.close();
                }
                "s" | "b" | "b*" => {
                    path.close();
                    self.paint(path.take());
                }
                "S" | "f" | "F" | "f*" | "B" | "B*" => self.paint(path.take()),
                "n" => {
                    path.take();
                }

                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.form_xobject(resources, name, &gs, depth)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn load_font(
        &self,
        cache: &mut HashMap<Vec<u8>, Rc<FontInfo>>,
        resources: &Dictionary,
        name: &[u8],
    ) -> Rc<FontInfo> {
        if let Some(font) = cache.get(name) {
            return Rc::clone(font);
        }

        let font = dict_get(self.doc, resources, b"Font")
            .and_then(|o| o.as_dict().ok())
            .and_then(|fonts| dict_get(self.doc, fonts, name))
            .and_then(|o| o.as_dict().ok())
            .map(|dict| FontInfo::from_dict(self.doc, dict))
            .unwrap_or_default();

        let font = Rc::new(font);
        cache.insert(name.to_vec(), Rc::clone(&font));
        font
    }

    fn show(&mut self, gs: &GraphicsState, tm: &mut Matrix, bytes: &[u8]) {
        let default_font;
        let font = match &gs.font {
            Some(font) => font.as_ref(),
            None => {
                default_font = FontInfo::default();
                &default_font
            }
        };

        for glyph in font.decode(bytes) {
            let w0 = glyph.width / 1000.0;
            let trm = Matrix::new(
                gs.font_size * gs.h_scale,
                0.0,
                0.0,
                gs.font_size,
                0.0,
                gs.rise,
            )
            .then(tm)
            .then(&gs.ctm);

            let corners = [
                trm.apply(0.0, DESCENT),
                trm.apply(w0, DESCENT),
                trm.apply(0.0, ASCENT),
                trm.apply(w0, ASCENT),
            ];
            self.output
                .chars
                .push(CharBox::new(glyph.text, self.bounding(&corners)));

            let spacing = if glyph.is_space { gs.word_spacing } else { 0.0 };
            let tx = (w0 * gs.font_size + gs.char_spacing + spacing) * gs.h_scale;
            *tm = Matrix::translate(tx, 0.0).then(tm);
        }
    }

    fn paint(&mut self, segments: Vec<((f64, f64), (f64, f64))>) {
        for (from, to) in segments {
            let (x0, y0) = self.relative(from);
            let (x1, y1) = self.relative(to);
            if (y0 - y1).abs() <= AXIS_EPSILON && (x0 - x1).abs() > AXIS_EPSILON {
                self.output.edges.push(Edge::horizontal((y0 + y1) / 2.0, x0, x1));
            } else if (x0 - x1).abs() <= AXIS_EPSILON && (y0 - y1).abs() > AXIS_EPSILON {
                self.output.edges.push(Edge::vertical((x0 + x1) / 2.0, y0, y1));
            }
        }
    }

    fn form_xobject(
        &mut self,
        resources: &Dictionary,
        name: &[u8],
        gs: &GraphicsState,
        depth: usize,
    ) -> Result<()> {
        let Some(stream) = dict_get(self.doc, resources, b"XObject")
            .and_then(|o| o.as_dict().ok())
            .and_then(|xobjects| dict_get(self.doc, xobjects, name))
            .and_then(|o| o.as_stream().ok())
        else {
            return Ok(());
        };

        let is_form = dict_get(self.doc, &stream.dict, b"Subtype")
            .and_then(|o| o.as_name().ok())
            .is_some_and(|s| s == b"Form");
        if !is_form {
            return Ok(());
        }
        if depth >= MAX_FORM_DEPTH {
            tracing::debug!(
                "Skipping form XObject {} nested deeper than {}",
                String::from_utf8_lossy(name),
                MAX_FORM_DEPTH
            );
            return Ok(());
        }

        let matrix = dict_get(self.doc, &stream.dict, b"Matrix")
            .and_then(|o| o.as_array().ok())
            .map(|arr| Matrix::from_operands(arr))
            .unwrap_or(Matrix::IDENTITY);
        let form_resources = dict_get(self.doc, &stream.dict, b"Resources")
            .and_then(|o| o.as_dict().ok())
            .unwrap_or(resources);
        let data = if stream.dict.has(b"Filter") {
            stream.decompressed_content()?
        } else {
            stream.content.clone()
        };

        self.interpret(&data, form_resources, matrix.then(&gs.ctm), depth + 1)
    }

    fn relative(&self, (x, y): (f64, f64)) -> (f64, f64) {
        self.display.apply(x, y)
    }

    fn bounding(&self, points: &[(f64, f64)]) -> BBox {
        let (x, y) = self.relative(points[0]);
        let mut bbox = BBox::new(x, y, x, y);
        for &p in &points[1..] {
            let (x, y) = self.relative(p);
            bbox = bbox.union(&BBox::new(x, y, x, y));
        }
        bbox
    }
}

fn num(operands: &[Object], index: usize) -> f64 {
    operands.get(index).and_then(as_number).unwrap_or(0.0)
}

/// Encode operations into a content stream
#[cfg(test)]
pub(crate) fn encode(operations: Vec<lopdf::content::Operation>) -> Vec<u8> {
    Content { operations }.encode().unwrap()
}
