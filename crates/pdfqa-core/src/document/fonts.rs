//! Font metrics and text decoding
//!
//! Just enough font handling to place glyphs: advance widths for simple
//! and Type0 fonts, and a `/ToUnicode` reader for the text excerpt.

use lopdf::{Dictionary, Document, Object};
use std::collections::HashMap;

/// Width used for CID fonts without `/DW`
const DEFAULT_CID_WIDTH: f64 = 1000.0;

/// Longest code range a `/W` or `bfrange` entry may cover
const MAX_RANGE_SPAN: u32 = 0xFFFF;

/// One decoded character code
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Glyph {
    pub text: String,
    /// Advance width in glyph space (thousandths of the font size)
    pub width: f64,
    /// Single-byte code 32, the only code word spacing applies to
    pub is_space: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct FontInfo {
    two_byte: bool,
    first_char: u32,
    widths: Vec<f64>,
    cid_widths: HashMap<u32, f64>,
    default_width: f64,
    to_unicode: HashMap<u32, String>,
}

impl Default for FontInfo {
    fn default() -> Self {
        Self {
            two_byte: false,
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            default_width: 500.0,
            to_unicode: HashMap::new(),
        }
    }
}

impl FontInfo {
    pub fn from_dict(doc: &Document, dict: &Dictionary) -> Self {
        let subtype = dict_get(doc, dict, b"Subtype")
            .and_then(|o| o.as_name().ok())
            .unwrap_or_default();

        let mut font = if subtype == b"Type0" {
            Self::composite(doc, dict)
        } else {
            Self::simple(doc, dict)
        };

        if let Some(Object::Stream(stream)) = dict_get(doc, dict, b"ToUnicode") {
            let data = if stream.dict.has(b"Filter") {
                stream.decompressed_content().ok()
            } else {
                Some(stream.content.clone())
            };
            if let Some(data) = data {
                font.to_unicode = parse_to_unicode(&data);
            }
        }

        font
    }

    fn simple(doc: &Document, dict: &Dictionary) -> Self {
        let base_font = dict_get(doc, dict, b"BaseFont")
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default();

        let missing_width = dict_get(doc, dict, b"FontDescriptor")
            .and_then(|o| o.as_dict().ok())
            .and_then(|fd| dict_get(doc, fd, b"MissingWidth"))
            .and_then(as_number);

        let default_width = missing_width.unwrap_or(if base_font.contains("Courier") {
            600.0
        } else {
            500.0
        });

        let first_char = dict_get(doc, dict, b"FirstChar")
            .and_then(as_number)
            .map(|n| n.max(0.0) as u32)
            .unwrap_or(0);

        let widths = dict_get(doc, dict, b"Widths")
            .and_then(|o| o.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| resolve(doc, w).and_then(as_number).unwrap_or(default_width))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            first_char,
            widths,
            default_width,
            ..Default::default()
        }
    }

    fn composite(doc: &Document, dict: &Dictionary) -> Self {
        let descendant = dict_get(doc, dict, b"DescendantFonts")
            .and_then(|o| o.as_array().ok())
            .and_then(|arr| arr.first())
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok());

        let mut font = Self {
            two_byte: true,
            default_width: DEFAULT_CID_WIDTH,
            ..Default::default()
        };

        if let Some(descendant) = descendant {
            if let Some(dw) = dict_get(doc, descendant, b"DW").and_then(as_number) {
                font.default_width = dw;
            }
            if let Some(w) = dict_get(doc, descendant, b"W").and_then(|o| o.as_array().ok()) {
                font.cid_widths = parse_cid_widths(doc, w);
            }
        }

        font
    }

    fn width_of(&self, code: u32) -> f64 {
        if self.two_byte {
            return self
                .cid_widths
                .get(&code)
                .copied()
                .unwrap_or(self.default_width);
        }
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .unwrap_or(self.default_width)
    }

    fn text_of(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.get(&code) {
            return text.clone();
        }
        if self.two_byte {
            char::from_u32(code).unwrap_or('\u{FFFD}').to_string()
        } else {
            // Latin-1 fallback
            char::from(code as u8).to_string()
        }
    }

    /// Split a shown string into glyphs
    pub fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        let codes: Vec<u32> = if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| match c {
                    [hi, lo] => u32::from(*hi) << 8 | u32::from(*lo),
                    [single] => u32::from(*single),
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|&b| u32::from(b)).collect()
        };

        codes
            .into_iter()
            .map(|code| Glyph {
                text: self.text_of(code),
                width: self.width_of(code),
                is_space: !self.two_byte && code == 32,
            })
            .collect()
    }
}

/// `/W` entries come in two shapes: `c [w1 w2 ...]` and `cfirst clast w`.
fn parse_cid_widths(doc: &Document, w: &[Object]) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < w.len() {
        let Some(start) = resolve(doc, &w[i]).and_then(as_number) else {
            break;
        };
        let start = start.max(0.0) as u32;
        match w.get(i + 1).and_then(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                for (offset, width) in list.iter().enumerate() {
                    let Some(code) = u32::try_from(offset)
                        .ok()
                        .and_then(|offset| start.checked_add(offset))
                    else {
                        break;
                    };
                    if let Some(width) = resolve(doc, width).and_then(as_number) {
                        widths.insert(code, width);
                    }
                }
                i += 2;
            }
            Some(end) => {
                let end = as_number(end)
                    .map(|n| n.max(0.0) as u32)
                    .unwrap_or(start)
                    .min(start.saturating_add(MAX_RANGE_SPAN));
                let width = w
                    .get(i + 2)
                    .and_then(|o| resolve(doc, o))
                    .and_then(as_number)
                    .unwrap_or(DEFAULT_CID_WIDTH);
                for code in start..=end.max(start) {
                    widths.insert(code, width);
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

#[derive(Debug, PartialEq)]
enum CMapToken {
    Hex(Vec<u8>),
    Word(String),
    ArrayStart,
    ArrayEnd,
}

fn tokenize_cmap(data: &[u8]) -> Vec<CMapToken> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'<' if data.get(i + 1) != Some(&b'<') => {
                let end = data[i + 1..]
                    .iter()
                    .position(|&b| b == b'>')
                    .map(|p| i + 1 + p)
                    .unwrap_or(data.len());
                let digits: Vec<u8> = data[i + 1..end]
                    .iter()
                    .copied()
                    .filter(u8::is_ascii_hexdigit)
                    .collect();
                tokens.push(CMapToken::Hex(decode_hex(&digits)));
                i = end + 1;
            }
            b'[' => {
                tokens.push(CMapToken::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(CMapToken::ArrayEnd);
                i += 1;
            }
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len()
                    && !data[i].is_ascii_whitespace()
                    && !matches!(data[i], b'<' | b'>' | b'[' | b']' | b'%')
                {
                    i += 1;
                }
                if i == start {
                    i += 1;
                    continue;
                }
                tokens.push(CMapToken::Word(
                    String::from_utf8_lossy(&data[start..i]).into_owned(),
                ));
            }
        }
    }
    tokens
}

fn decode_hex(digits: &[u8]) -> Vec<u8> {
    digits
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16).unwrap_or(0) as u8;
            let lo = pair
                .get(1)
                .and_then(|&c| (c as char).to_digit(16))
                .unwrap_or(0) as u8;
            hi << 4 | lo
        })
        .collect()
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| acc << 8 | u32::from(b))
}

fn utf16_text(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|c| match c {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => u16::from(*single),
            _ => 0,
        })
        .collect();
    String::from_utf16_lossy(&units)
}

/// Read `bfchar` and `bfrange` mappings from a ToUnicode CMap
pub(crate) fn parse_to_unicode(data: &[u8]) -> HashMap<u32, String> {
    let tokens = tokenize_cmap(data);
    let mut map = HashMap::new();
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            CMapToken::Word(w) if w == "beginbfchar" => {
                i += 1;
                while i + 1 < tokens.len() {
                    match (&tokens[i], &tokens[i + 1]) {
                        (CMapToken::Hex(src), CMapToken::Hex(dst)) => {
                            map.insert(code_of(src), utf16_text(dst));
                            i += 2;
                        }
                        _ => break,
                    }
                }
            }
            CMapToken::Word(w) if w == "beginbfrange" => {
                i += 1;
                while i + 2 < tokens.len() {
                    let (CMapToken::Hex(lo), CMapToken::Hex(hi)) = (&tokens[i], &tokens[i + 1])
                    else {
                        break;
                    };
                    let lo = code_of(lo);
                    let hi = code_of(hi).min(lo.saturating_add(MAX_RANGE_SPAN));
                    match &tokens[i + 2] {
                        CMapToken::Hex(dst) => {
                            let base = utf16_text(dst);
                            let mut chars: Vec<char> = base.chars().collect();
                            for code in lo..=hi.max(lo) {
                                map.insert(code, chars.iter().collect());
                                if let Some(last) = chars.last_mut() {
                                    *last = char::from_u32(*last as u32 + 1).unwrap_or(*last);
                                }
                            }
                            i += 3;
                        }
                        CMapToken::ArrayStart => {
                            let mut j = i + 3;
                            let mut code = lo;
                            while let Some(CMapToken::Hex(dst)) = tokens.get(j) {
                                map.insert(code, utf16_text(dst));
                                j += 1;
                                match code.checked_add(1) {
                                    Some(next) => code = next,
                                    None => break,
                                }
                            }
                            // skip the closing bracket
                            i = j + 1;
                        }
                        _ => break,
                    }
                }
            }
            _ => i += 1,
        }
    }

    map
}

pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

pub(crate) fn dict_get<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    dict.get(key).ok().and_then(|o| resolve(doc, o))
}

pub(crate) fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}
