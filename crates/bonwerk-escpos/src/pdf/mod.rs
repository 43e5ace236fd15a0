// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: page lookup and rasterisation for thermal printing.

pub mod font;
pub mod reader;
pub mod render;

/// Small in-memory PDFs for tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::{Dictionary, Document, Object, Stream, dictionary};

    /// One page per entry of `contents`, sharing the page tree's MediaBox.
    /// When `image` is given it is available to every page as `/Im1`.
    pub fn build(media_box: [i64; 4], contents: &[&str], image: Option<Stream>) -> Vec<u8> {
        build_with(media_box, contents, |doc| {
            image.map(|stream| {
                let image_id = doc.add_object(stream);
                dictionary! {
                    "XObject" => dictionary! { "Im1" => image_id },
                }
            })
        })
    }

    /// Like [`build`], with WinAnsi Helvetica available as `/F1`.
    pub fn build_with_font(media_box: [i64; 4], contents: &[&str]) -> Vec<u8> {
        build_with(media_box, contents, |doc| {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            });
            Some(dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            })
        })
    }

    /// A page invoking Form `/F`, which paints a dot and then invokes itself
    /// `fan_out` times.
    pub fn self_invoking_form(fan_out: usize) -> Vec<u8> {
        build_with([0, 0, 72, 72], &["/F Do"], |doc| {
            let form_id = doc.new_object_id();
            let content = format!("0 g 0 0 1 1 re f {}", "/F Do ".repeat(fan_out));
            let form = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(72),
                        Object::Integer(72),
                    ],
                    "Resources" => dictionary! {
                        "XObject" => dictionary! { "F" => form_id },
                    },
                },
                content.into_bytes(),
            );
            doc.objects.insert(form_id, Object::Stream(form));
            Some(dictionary! {
                "XObject" => dictionary! { "F" => form_id },
            })
        })
    }

    fn build_with(
        media_box: [i64; 4],
        contents: &[&str],
        resources: impl FnOnce(&mut Document) -> Option<Dictionary>,
    ) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let resources = resources(&mut doc);

        let mut kids: Vec<Object> = Vec::new();
        for content in contents {
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            };
            if let Some(resources) = &resources {
                page.set("Resources", resources.clone());
            }
            kids.push(doc.add_object(page).into());
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => contents.len() as i64,
            "MediaBox" => media_box.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).expect("fixture PDF serialises");
        out
    }

    /// Uncompressed 8-bit DeviceGray image XObject.
    pub fn gray_image(width: i64, height: i64, pixels: Vec<u8>) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            pixels,
        )
    }
}
