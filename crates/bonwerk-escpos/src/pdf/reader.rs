// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: decode a base64 payload, locate a page and expose the pieces
// the rasteriser needs (MediaBox, resources, content operations) using the
// `lopdf` crate.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bonwerk_core::EncodeError;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, instrument};

/// Page tree depth beyond which inherited attributes are not searched.
const MAX_TREE_DEPTH: usize = 32;

/// US Letter, used when a page tree carries no MediaBox at all.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// A parsed PDF document held in memory.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Decode a base64 payload and parse it.
    ///
    /// Whitespace and a leading `data:...;base64,` prefix are tolerated.
    #[instrument(skip_all, fields(payload_len = payload.len()))]
    pub fn from_base64(payload: &str) -> Result<Self, EncodeError> {
        let bytes = decode_base64(payload)?;
        Self::from_bytes(&bytes)
    }

    /// Parse raw PDF bytes.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, EncodeError> {
        let document = Document::load_mem(data).map_err(|err| {
            EncodeError::MalformedPdfPayload(format!("failed to parse PDF: {err}"))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Look up a page by its 1-based number.
    pub fn page(&self, page_number: u32) -> Result<PdfPage<'_>, EncodeError> {
        let pages = self.document.get_pages();
        let page_count = pages.len() as u32;
        let out_of_range = EncodeError::PageOutOfRange {
            page: page_number,
            page_count,
        };
        if page_number == 0 || page_number > page_count {
            return Err(out_of_range);
        }
        let id = *pages.get(&page_number).ok_or(out_of_range)?;
        Ok(PdfPage {
            document: &self.document,
            id,
            number: page_number,
        })
    }
}

/// One page of a [`PdfReader`] document.
pub struct PdfPage<'a> {
    document: &'a Document,
    id: ObjectId,
    number: u32,
}

impl<'a> PdfPage<'a> {
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    /// `[llx, lly, urx, ury]` in PDF user space, normalised so that
    /// `llx <= urx` and `lly <= ury`.
    pub fn media_box(&self) -> [f32; 4] {
        let Some(values) = inherited(self.document, self.id, b"MediaBox")
            .and_then(|obj| obj.as_array().ok())
            .and_then(|arr| numbers(self.document, arr))
        else {
            return DEFAULT_MEDIA_BOX;
        };
        if values.len() != 4 {
            return DEFAULT_MEDIA_BOX;
        }
        [
            values[0].min(values[2]),
            values[1].min(values[3]),
            values[0].max(values[2]),
            values[1].max(values[3]),
        ]
    }

    /// Resource dictionary, inherited from the page tree if necessary.
    pub fn resources(&self) -> Option<&'a Dictionary> {
        inherited(self.document, self.id, b"Resources").and_then(|obj| obj.as_dict().ok())
    }

    /// Decoded content stream operations of this page.
    pub fn content(&self) -> Result<Content, EncodeError> {
        let raw = self.document.get_page_content(self.id).map_err(|err| {
            EncodeError::MalformedPdfPayload(format!(
                "page {} content unreadable: {err}",
                self.number
            ))
        })?;
        decode_content(&raw)
    }
}

/// Parse a content stream into operations.
pub fn decode_content(raw: &[u8]) -> Result<Content, EncodeError> {
    Content::decode(raw).map_err(|err| {
        EncodeError::MalformedPdfPayload(format!("content stream unreadable: {err}"))
    })
}

/// Strip an optional data URL prefix and whitespace, then decode.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, EncodeError> {
    let body = match payload.find(";base64,") {
        Some(idx) if payload.starts_with("data:") => &payload[idx + ";base64,".len()..],
        _ => payload,
    };
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(EncodeError::MalformedPdfPayload("payload is empty".into()));
    }
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| EncodeError::MalformedPdfPayload(format!("invalid base64: {err}")))
}

/// Follow a single indirect reference.
pub fn resolve<'a>(document: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Numeric value of an integer or real object.
pub fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn numbers(document: &Document, arr: &[Object]) -> Option<Vec<f32>> {
    arr.iter()
        .map(|obj| resolve(document, obj).and_then(number))
        .collect()
}

/// Page attribute lookup that walks up the `Parent` chain.
fn inherited<'a>(document: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return resolve(document, value);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = document.get_dictionary(parent).ok()?;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures;

    #[test]
    fn non_base64_is_malformed() {
        assert!(matches!(
            PdfReader::from_base64("this is not base64!!"),
            Err(EncodeError::MalformedPdfPayload(_))
        ));
    }

    #[test]
    fn empty_payload_is_malformed() {
        assert!(matches!(
            decode_base64("  \n"),
            Err(EncodeError::MalformedPdfPayload(_))
        ));
    }

    #[test]
    fn valid_base64_but_not_pdf_is_malformed() {
        let payload = STANDARD.encode(b"hello world");
        assert!(matches!(
            PdfReader::from_base64(&payload),
            Err(EncodeError::MalformedPdfPayload(_))
        ));
    }

    #[test]
    fn data_url_and_whitespace_tolerated() {
        let encoded = STANDARD.encode(b"%PDF-1.5");
        let wrapped = format!("data:application/pdf;base64,{}\n{}", &encoded[..4], &encoded[4..]);
        assert_eq!(decode_base64(&wrapped).unwrap(), b"%PDF-1.5");
    }

    #[test]
    fn page_out_of_range() {
        let pdf = fixtures::build([0, 0, 72, 144], &["", ""], None);
        let reader = PdfReader::from_bytes(&pdf).unwrap();
        assert_eq!(reader.page_count(), 2);
        assert!(matches!(
            reader.page(5),
            Err(EncodeError::PageOutOfRange {
                page: 5,
                page_count: 2
            })
        ));
        assert!(matches!(
            reader.page(0),
            Err(EncodeError::PageOutOfRange { page: 0, .. })
        ));
    }

    #[test]
    fn media_box_inherited_from_page_tree() {
        let pdf = fixtures::build([0, 0, 72, 144], &["0 g 0 0 10 10 re f"], None);
        let reader = PdfReader::from_bytes(&pdf).unwrap();
        let page = reader.page(1).unwrap();
        assert_eq!(page.media_box(), [0.0, 0.0, 72.0, 144.0]);
        let ops: Vec<String> = page
            .content()
            .unwrap()
            .operations
            .into_iter()
            .map(|op| op.operator)
            .collect();
        assert_eq!(ops, vec!["g", "re", "f"]);
    }
}
