//! Confidentiality watermark stamped on every page of a PDF before it leaves the system.
//!
//! The caption is drawn once per page, centred and rotated 45 degrees, in light grey
//! at a fixed opacity. The original page content is wrapped in a saved graphics state
//! so the overlay is never affected by transforms left active by the page itself.
//! Output is deterministic for identical input bytes, caption and options.

use std::fmt::Display;

use chrono::NaiveDate;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};

use super::documents::DocumentError;

pub const DEFAULT_OPACITY: f32 = 0.3;
pub const DEFAULT_FONT_SIZE: f32 = 40.0;

const FONT_KEY: &str = "TpWmFont";
const STATE_KEY: &str = "TpWmState";
const GREY: f32 = 0.7;
const A4: [f32; 4] = [0.0, 0.0, 595.0, 842.0];
const MAX_INHERITANCE_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WatermarkOptions {
    pub opacity: f32,
    pub font_size: f32,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            opacity: DEFAULT_OPACITY,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl WatermarkOptions {
    /// Opacity clamped into (0, 1]; font size must be a positive number.
    pub(crate) fn normalized(self) -> Result<Self, DocumentError> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(DocumentError::InvalidWatermark(format!(
                "font size must be positive (found {})",
                self.font_size
            )));
        }
        let opacity = if self.opacity.is_finite() {
            self.opacity.clamp(0.01, 1.0)
        } else {
            DEFAULT_OPACITY
        };
        Ok(Self {
            opacity,
            font_size: self.font_size,
        })
    }
}

/// Caption used for client deliveries.
pub fn default_caption(sender: &str, date: NaiveDate) -> String {
    format!(
        "Transmitted by {sender} - {} - Confidential",
        date.format("%d/%m/%Y")
    )
}

pub fn watermark_pdf(
    source: &[u8],
    caption: &str,
    options: &WatermarkOptions,
) -> Result<Vec<u8>, DocumentError> {
    let options = options.normalized()?;
    let mut document = Document::load_mem(source).map_err(unreadable)?;

    let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
    if pages.is_empty() {
        return Err(DocumentError::UnreadableDocument(
            "document has no pages".to_string(),
        ));
    }

    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let state_id = document.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => real(options.opacity),
        "CA" => real(options.opacity),
    });
    let save_id = document.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
    let text = encode_caption(caption);

    for page_id in pages {
        let overlay = overlay_stream(&text, media_box(&document, page_id), options.font_size)?;
        let overlay_id = document.add_object(Stream::new(dictionary! {}, overlay));

        let resources = page_resources(&document, page_id, font_id, state_id);
        let contents = wrapped_contents(&document, page_id, save_id, overlay_id)?;

        let page = document
            .get_object_mut(page_id)
            .and_then(|object| object.as_dict_mut())
            .map_err(unreadable)?;
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Array(contents));
    }

    let mut output = Vec::new();
    document.save_to(&mut output).map_err(unreadable)?;
    Ok(output)
}

fn unreadable(err: impl Display) -> DocumentError {
    DocumentError::UnreadableDocument(err.to_string())
}

fn real(value: f32) -> Object {
    Object::Real(((value * 100.0).round() / 100.0).into())
}

/// Standard 14 fonts only cover Latin-1; anything else is replaced.
pub(crate) fn encode_caption(caption: &str) -> Vec<u8> {
    caption
        .chars()
        .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
        .collect()
}

/// Page contents are concatenated before parsing, so the overlay starts on a fresh
/// line in case the original stream ends mid-token.
fn overlay_stream(
    text: &[u8],
    media_box: [f32; 4],
    font_size: f32,
) -> Result<Vec<u8>, DocumentError> {
    let mut stream = b"\n".to_vec();
    stream.extend(
        overlay_content(text, media_box, font_size)
            .encode()
            .map_err(unreadable)?,
    );
    Ok(stream)
}

fn overlay_content(text: &[u8], media_box: [f32; 4], font_size: f32) -> Content {
    let [llx, lly, urx, ury] = media_box;
    let center_x = (llx + urx) / 2.0;
    let center_y = (lly + ury) / 2.0;
    let (sin, cos) = std::f32::consts::FRAC_PI_4.sin_cos();

    // Helvetica averages roughly half an em per glyph.
    let half_width = text.len() as f32 * font_size * 0.25;
    let half_height = font_size * 0.35;
    let x = center_x - half_width * cos + half_height * sin;
    let y = center_y - half_width * sin - half_height * cos;

    Content {
        operations: vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(STATE_KEY.as_bytes().to_vec())]),
            Operation::new("rg", vec![real(GREY), real(GREY), real(GREY)]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(FONT_KEY.as_bytes().to_vec()), real(font_size)],
            ),
            Operation::new(
                "Tm",
                vec![real(cos), real(sin), real(-sin), real(cos), real(x), real(y)],
            ),
            Operation::new("Tj", vec![Object::string_literal(text.to_vec())]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    }
}

fn resolve(document: &Document, object: Object) -> Option<Object> {
    match object {
        Object::Reference(id) => document.get_object(id).ok().cloned(),
        other => Some(other),
    }
}

/// Look up a page attribute, walking up the page tree for inheritable keys.
fn inherited(document: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = document.get_dictionary(parent).ok()?;
    }
    None
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn media_box(document: &Document, page_id: ObjectId) -> [f32; 4] {
    let values = match inherited(document, page_id, b"MediaBox")
        .and_then(|object| resolve(document, object))
    {
        Some(Object::Array(values)) => values,
        _ => return A4,
    };

    let numbers: Vec<f32> = values
        .into_iter()
        .filter_map(|value| resolve(document, value))
        .filter_map(|value| number(&value))
        .collect();

    match numbers.as_slice() {
        [llx, lly, urx, ury] if urx > llx && ury > lly => [*llx, *lly, *urx, *ury],
        _ => A4,
    }
}

fn resolved_dictionary(document: &Document, object: Option<Object>) -> Dictionary {
    object
        .and_then(|object| resolve(document, object))
        .and_then(|object| object.as_dict().ok().cloned())
        .unwrap_or_else(Dictionary::new)
}

fn page_resources(
    document: &Document,
    page_id: ObjectId,
    font_id: ObjectId,
    state_id: ObjectId,
) -> Dictionary {
    let mut resources =
        resolved_dictionary(document, inherited(document, page_id, b"Resources"));

    for (category, key, id) in [("Font", FONT_KEY, font_id), ("ExtGState", STATE_KEY, state_id)] {
        let mut entries =
            resolved_dictionary(document, resources.get(category.as_bytes()).ok().cloned());
        entries.set(key, Object::Reference(id));
        resources.set(category, Object::Dictionary(entries));
    }

    resources
}

fn wrapped_contents(
    document: &Document,
    page_id: ObjectId,
    save_id: ObjectId,
    overlay_id: ObjectId,
) -> Result<Vec<Object>, DocumentError> {
    let page = document.get_dictionary(page_id).map_err(unreadable)?;
    let mut contents = vec![Object::Reference(save_id)];

    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match document.get_object(*id) {
            Ok(Object::Array(items)) => contents.extend(items.iter().cloned()),
            _ => contents.push(Object::Reference(*id)),
        },
        Ok(Object::Array(items)) => contents.extend(items.iter().cloned()),
        Ok(_) => {
            return Err(DocumentError::UnreadableDocument(
                "page contents are malformed".to_string(),
            ))
        }
        Err(_) => {}
    }

    contents.push(Object::Reference(overlay_id));
    Ok(contents)
}
