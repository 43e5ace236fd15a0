// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasteriser: paints the parts of a PDF page that matter on a receipt
// (filled rectangles, text and image XObjects, including those inside Form
// XObjects) onto a white grayscale canvas.

use std::collections::HashMap;
use std::rc::Rc;

use bonwerk_core::EncodeError;
use image::{GrayImage, ImageFormat, Luma};
use lopdf::content::Operation;
use lopdf::{Dictionary, Document, Object, Stream};
use tracing::{debug, instrument, warn};

use super::font::PdfFont;
use super::reader::{PdfPage, decode_content, number, resolve};

/// Form XObject nesting limit.
const MAX_FORM_DEPTH: usize = 8;

/// Content operations executed per page, counting every Form invocation.
const MAX_OPERATIONS: usize = 1_000_000;

/// Canvas pixels written per page, summed over every fill, image and glyph.
const MAX_PAINTED_PIXELS: u64 = 1 << 30;

/// Longest page we are willing to rasterise, in dots (about 2 m of paper).
pub const MAX_RASTER_HEIGHT: u32 = 16_000;

/// Largest embedded image we decode, in pixels.
const MAX_IMAGE_PIXELS: u64 = 64 * 1024 * 1024;

/// Affine transform in PDF row-vector convention:
/// `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn translate(tx: f32, ty: f32) -> Self {
        Matrix {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        let v: Vec<f32> = operands.iter().map(number).collect::<Option<_>>()?;
        match v.as_slice() {
            &[a, b, c, d, e, f] => Some(Self { a, b, c, d, e, f }),
            _ => None,
        }
    }

    /// `self` applied first, then `outer`.
    fn then(&self, outer: &Matrix) -> Matrix {
        Matrix {
            a: self.a * outer.a + self.b * outer.c,
            b: self.a * outer.b + self.b * outer.d,
            c: self.c * outer.a + self.d * outer.c,
            d: self.c * outer.b + self.d * outer.d,
            e: self.e * outer.a + self.f * outer.c + outer.e,
            f: self.e * outer.b + self.f * outer.d + outer.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    fn invert(&self) -> Option<Matrix> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < 1e-9 {
            return None;
        }
        Some(Matrix {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    fill: u8,
}

/// Text state of one content stream. Positions are in text space.
struct TextState<'a> {
    font: Option<Rc<PdfFont<'a>>>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
    render_mode: i64,
    matrix: Matrix,
    line_matrix: Matrix,
}

impl TextState<'_> {
    fn new() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            render_mode: 0,
            matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
        }
    }

    fn begin(&mut self) {
        self.matrix = Matrix::IDENTITY;
        self.line_matrix = Matrix::IDENTITY;
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.matrix = self.line_matrix;
    }

    fn advance(&mut self, tx: f32) {
        self.matrix = Matrix::translate(tx, 0.0).then(&self.matrix);
    }

    /// Modes 3 and 7 position glyphs without painting them.
    fn visible(&self) -> bool {
        !matches!(self.render_mode, 3 | 7)
    }
}

/// Decoded image samples. `stencil` images paint the current fill colour
/// where a sample is 0 and leave the canvas alone elsewhere.
struct PageImage {
    pixels: GrayImage,
    stencil: bool,
}

/// Rasterise `page` to `width` dots, keeping the MediaBox aspect ratio.
#[instrument(skip(page), fields(page_number = page.number()))]
pub fn render_page(page: &PdfPage<'_>, width: u32) -> Result<GrayImage, EncodeError> {
    render_with_limits(page, width, MAX_OPERATIONS, MAX_PAINTED_PIXELS)
}

fn render_with_limits(
    page: &PdfPage<'_>,
    width: u32,
    max_operations: usize,
    max_pixels: u64,
) -> Result<GrayImage, EncodeError> {
    let [llx, lly, urx, ury] = page.media_box();
    let (page_w, page_h) = (urx - llx, ury - lly);
    if page_w <= 0.0 || page_h <= 0.0 {
        return Err(EncodeError::MalformedPdfPayload(format!(
            "page {} has an empty MediaBox",
            page.number()
        )));
    }

    let scale = width as f32 / page_w;
    let mut height = (page_h * scale).round().max(1.0) as u32;
    if height > MAX_RASTER_HEIGHT {
        warn!(height, max = MAX_RASTER_HEIGHT, "Page too long, truncating raster");
        height = MAX_RASTER_HEIGHT;
    }

    // User space to device space: flip y, origin at the top-left corner.
    let device = Matrix {
        a: scale,
        b: 0.0,
        c: 0.0,
        d: -scale,
        e: -llx * scale,
        f: ury * scale,
    };

    let mut painter = Painter {
        document: page.document(),
        canvas: GrayImage::from_pixel(width, height, Luma([255])),
        painted: 0,
        operations: 0,
        pixels: 0,
        max_operations,
        max_pixels,
        exhausted: false,
    };
    let content = page.content()?;
    painter.run(
        &content.operations,
        page.resources(),
        GraphicsState {
            ctm: device,
            fill: 0,
        },
        0,
    );

    if painter.exhausted {
        return Err(EncodeError::InvalidJob(format!(
            "page {} is too complex to rasterise",
            page.number()
        )));
    }

    debug!(
        width,
        height,
        painted = painter.painted,
        operations = painter.operations,
        "Page rasterised"
    );
    Ok(painter.canvas)
}

struct Painter<'a> {
    document: &'a Document,
    canvas: GrayImage,
    painted: usize,
    operations: usize,
    pixels: u64,
    max_operations: usize,
    max_pixels: u64,
    exhausted: bool,
}

impl<'a> Painter<'a> {
    /// Account for work about to be done. False once the page budget is
    /// spent; nothing more is painted after that.
    fn charge(&mut self, operations: usize, pixels: u64) -> bool {
        if self.exhausted {
            return false;
        }
        self.operations = self.operations.saturating_add(operations);
        self.pixels = self.pixels.saturating_add(pixels);
        if self.operations > self.max_operations || self.pixels > self.max_pixels {
            warn!(
                operations = self.operations,
                pixels = self.pixels,
                "Page paint budget exhausted"
            );
            self.exhausted = true;
            return false;
        }
        true
    }

    fn run(
        &mut self,
        operations: &[Operation],
        resources: Option<&'a Dictionary>,
        initial: GraphicsState,
        depth: usize,
    ) {
        let mut state = initial;
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut path: Vec<[f32; 4]> = Vec::new();
        let mut text = TextState::new();
        let mut fonts: HashMap<Vec<u8>, Rc<PdfFont<'a>>> = HashMap::new();

        for op in operations {
            if !self.charge(1, 0) {
                return;
            }
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => stack.push(state),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        state.ctm = m.then(&state.ctm);
                    }
                }
                "g" | "rg" | "k" | "sc" | "scn" => {
                    if let Some(gray) = fill_gray(operands) {
                        state.fill = gray;
                    }
                }
                "re" => {
                    let v: Option<Vec<f32>> = operands.iter().map(number).collect();
                    if let Some(&[x, y, w, h]) = v.as_deref() {
                        path.push([x, y, w, h]);
                    }
                }
                "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                    for rect in path.drain(..) {
                        self.fill_rect(&state.ctm, rect, state.fill);
                    }
                }
                "n" | "S" | "s" => path.clear(),
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.draw_xobject(name, resources, state, depth);
                    }
                }
                "BT" => text.begin(),
                "Tf" => {
                    if let [Object::Name(name), size] = operands {
                        text.size = number(size).unwrap_or(text.size);
                        text.font = Some(self.font(name, resources, &mut fonts));
                    }
                }
                "Tc" => set_number(operands, &mut text.char_spacing),
                "Tw" => set_number(operands, &mut text.word_spacing),
                "TL" => set_number(operands, &mut text.leading),
                "Ts" => set_number(operands, &mut text.rise),
                "Tz" => {
                    if let Some(scale) = operands.first().and_then(number) {
                        text.horizontal_scale = scale / 100.0;
                    }
                }
                "Tr" => {
                    if let Some(Object::Integer(mode)) = operands.first() {
                        text.render_mode = *mode;
                    }
                }
                "Td" | "TD" => {
                    if let Some(&[tx, ty]) = operand_numbers(operands).as_deref() {
                        if op.operator == "TD" {
                            text.leading = -ty;
                        }
                        text.next_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        text.matrix = m;
                        text.line_matrix = m;
                    }
                }
                "T*" => text.next_line(0.0, -text.leading),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show_text(&mut text, &state, bytes);
                    }
                }
                "'" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        text.next_line(0.0, -text.leading);
                        self.show_text(&mut text, &state, bytes);
                    }
                }
                "\"" => {
                    if let [word, character, Object::String(bytes, _)] = operands {
                        set_number(std::slice::from_ref(word), &mut text.word_spacing);
                        set_number(std::slice::from_ref(character), &mut text.char_spacing);
                        text.next_line(0.0, -text.leading);
                        self.show_text(&mut text, &state, bytes);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        for item in items {
                            match item {
                                Object::String(bytes, _) => self.show_text(&mut text, &state, bytes),
                                other => {
                                    if let Some(adjust) = number(other) {
                                        text.advance(
                                            -adjust / 1000.0 * text.size * text.horizontal_scale,
                                        );
                                    }
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Font resource `name`, or the fallback face when the page does not
    /// define it.
    fn font(
        &self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        cache: &mut HashMap<Vec<u8>, Rc<PdfFont<'a>>>,
    ) -> Rc<PdfFont<'a>> {
        if let Some(font) = cache.get(name) {
            return Rc::clone(font);
        }
        let document = self.document;
        let dict = resources
            .and_then(|res| res.get(b"Font").ok())
            .and_then(|obj| resolve(document, obj))
            .and_then(|obj| obj.as_dict().ok())
            .and_then(|fonts| fonts.get(name).ok())
            .and_then(|obj| resolve(document, obj))
            .and_then(|obj| obj.as_dict().ok());
        let font = Rc::new(match dict {
            Some(dict) => PdfFont::from_dict(document, dict),
            None => {
                debug!(name = %String::from_utf8_lossy(name), "Font resource missing, using fallback face");
                PdfFont::fallback()
            }
        });
        cache.insert(name.to_vec(), Rc::clone(&font));
        font
    }

    fn show_text(&mut self, text: &mut TextState<'a>, state: &GraphicsState, bytes: &[u8]) {
        let font = text
            .font
            .clone()
            .unwrap_or_else(|| Rc::new(PdfFont::fallback()));
        let face = font.face();
        let mut drawn = false;

        for glyph in font.glyphs(bytes) {
            if text.visible() && !glyph.ch.is_whitespace() {
                let glyph_space = Matrix {
                    a: text.size * text.horizontal_scale,
                    b: 0.0,
                    c: 0.0,
                    d: text.size,
                    e: 0.0,
                    f: text.rise,
                };
                let trm = glyph_space.then(&text.matrix).then(&state.ctm);
                let em = (trm.a.hypot(trm.b), trm.c.hypot(trm.d));
                if !self.charge(1, (em.0 * em.1).ceil() as u64) {
                    return;
                }
                drawn |= face.paint(&mut self.canvas, glyph.ch, trm.apply(0.0, 0.0), em, state.fill);
            }

            let width = glyph.width.unwrap_or_else(|| face.advance(glyph.ch));
            let spacing = text.char_spacing + if glyph.word_break { text.word_spacing } else { 0.0 };
            text.advance((width * text.size + spacing) * text.horizontal_scale);
        }

        if drawn {
            self.painted += 1;
        }
    }

    fn fill_rect(&mut self, ctm: &Matrix, [x, y, w, h]: [f32; 4], gray: u8) {
        let corners = [(x, y), (x + w, y), (x, y + h), (x + w, y + h)];
        let Some((x0, y0, x1, y1)) = self.device_bounds(ctm, &corners) else {
            return;
        };
        if !self.charge(0, u64::from(x1 - x0) * u64::from(y1 - y0)) {
            return;
        }
        for py in y0..y1 {
            for px in x0..x1 {
                self.canvas.put_pixel(px, py, Luma([gray]));
            }
        }
        self.painted += 1;
    }

    /// Pixel bounds of the transformed points, clipped to the canvas, at
    /// least one dot wide and high so hairlines survive.
    fn device_bounds(&self, ctm: &Matrix, points: &[(f32, f32)]) -> Option<(u32, u32, u32, u32)> {
        let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
        let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
        for &(x, y) in points {
            let (dx, dy) = ctm.apply(x, y);
            min_x = min_x.min(dx);
            min_y = min_y.min(dy);
            max_x = max_x.max(dx);
            max_y = max_y.max(dy);
        }

        let (width, height) = (self.canvas.width() as f32, self.canvas.height() as f32);
        let x0 = min_x.round().clamp(0.0, width);
        let y0 = min_y.round().clamp(0.0, height);
        let x1 = max_x.round().max(x0 + 1.0).clamp(0.0, width);
        let y1 = max_y.round().max(y0 + 1.0).clamp(0.0, height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    fn draw_xobject(
        &mut self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        state: GraphicsState,
        depth: usize,
    ) {
        let document = self.document;
        let Some(stream) = resources
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|obj| resolve(document, obj))
            .and_then(|obj| obj.as_dict().ok())
            .and_then(|xobjects| xobjects.get(name).ok())
            .and_then(|obj| resolve(document, obj))
            .and_then(|obj| obj.as_stream().ok())
        else {
            warn!(name = %String::from_utf8_lossy(name), "XObject not found");
            return;
        };

        match stream.dict.get(b"Subtype").ok().and_then(|s| s.as_name().ok()) {
            Some(b"Image") => match decode_image(document, stream) {
                Some(image) => self.draw_image(&state, &image),
                None => debug!(name = %String::from_utf8_lossy(name), "Image skipped"),
            },
            Some(b"Form") => self.draw_form(stream, resources, state, depth),
            _ => debug!(name = %String::from_utf8_lossy(name), "Unsupported XObject"),
        }
    }

    fn draw_form(
        &mut self,
        stream: &'a Stream,
        parent_resources: Option<&'a Dictionary>,
        state: GraphicsState,
        depth: usize,
    ) {
        if depth >= MAX_FORM_DEPTH {
            warn!(depth, "Form XObject nesting too deep, skipping");
            return;
        }

        let content = match stream_bytes(stream).map(|raw| decode_content(&raw)) {
            Some(Ok(content)) => content,
            _ => {
                warn!("Form XObject content unreadable, skipping");
                return;
            }
        };

        let matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|obj| obj.as_array().ok())
            .and_then(|arr| Matrix::from_operands(arr));
        let resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|obj| resolve(self.document, obj))
            .and_then(|obj| obj.as_dict().ok())
            .or(parent_resources);

        let mut inner = state;
        if let Some(m) = matrix {
            inner.ctm = m.then(&state.ctm);
        }
        self.run(&content.operations, resources, inner, depth + 1);
    }

    /// Images occupy the unit square of the current user space.
    fn draw_image(&mut self, state: &GraphicsState, image: &PageImage) {
        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
        let (Some((x0, y0, x1, y1)), Some(inverse)) =
            (self.device_bounds(&state.ctm, &corners), state.ctm.invert())
        else {
            return;
        };
        if !self.charge(0, u64::from(x1 - x0) * u64::from(y1 - y0)) {
            return;
        }

        let (iw, ih) = image.pixels.dimensions();
        for py in y0..y1 {
            for px in x0..x1 {
                let (u, v) = inverse.apply(px as f32 + 0.5, py as f32 + 0.5);
                if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                    continue;
                }
                // Image row 0 sits at the top of the unit square.
                let sx = ((u * iw as f32) as u32).min(iw - 1);
                let sy = (((1.0 - v) * ih as f32) as u32).min(ih - 1);
                let sample = image.pixels.get_pixel(sx, sy).0[0];
                if image.stencil {
                    if sample == 0 {
                        self.canvas.put_pixel(px, py, Luma([state.fill]));
                    }
                } else {
                    self.canvas.put_pixel(px, py, Luma([sample]));
                }
            }
        }
        self.painted += 1;
    }
}

fn operand_numbers(operands: &[Object]) -> Option<Vec<f32>> {
    operands.iter().map(number).collect()
}

fn set_number(operands: &[Object], target: &mut f32) {
    if let Some(value) = operands.first().and_then(number) {
        *target = value;
    }
}

/// Fill colour operands (gray, RGB or CMYK, 0..1) as 8-bit luminance.
fn fill_gray(operands: &[Object]) -> Option<u8> {
    let v: Vec<f32> = operands.iter().map(number).collect::<Option<_>>()?;
    let to_byte = |x: f32| (x.clamp(0.0, 1.0) * 255.0).round() as u8;
    match v.as_slice() {
        &[g] => Some(to_byte(g)),
        &[r, g, b] => Some(to_byte(0.299 * r + 0.587 * g + 0.114 * b)),
        &[c, m, y, k] => {
            let rgb = |x: f32| (1.0 - x) * (1.0 - k);
            Some(to_byte(0.299 * rgb(c) + 0.587 * rgb(m) + 0.114 * rgb(y)))
        }
        _ => None,
    }
}

fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Raw stream bytes with any supported filters removed.
fn stream_bytes(stream: &Stream) -> Option<Vec<u8>> {
    if !stream.dict.has(b"Filter") {
        return Some(stream.content.clone());
    }
    stream.decompressed_content().ok()
}

fn dict_int(dict: &Dictionary, key: &[u8]) -> Option<i64> {
    dict.get(key).ok().and_then(|v| v.as_i64().ok())
}

/// Colour components of an image colour space, if we can decode it.
fn components(document: &Document, color_space: Option<&Object>) -> Option<u32> {
    let Some(color_space) = color_space.and_then(|cs| resolve(document, cs)) else {
        return Some(1);
    };
    match color_space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Some(1),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Some(3),
            b"DeviceCMYK" | b"CMYK" => Some(4),
            _ => None,
        },
        Object::Array(items) => {
            let family = items.first()?.as_name().ok()?;
            match family {
                b"ICCBased" => {
                    let profile = resolve(document, items.get(1)?)?.as_stream().ok()?;
                    dict_int(&profile.dict, b"N").map(|n| n as u32)
                }
                b"CalGray" => Some(1),
                b"CalRGB" => Some(3),
                _ => None,
            }
        }
        _ => None,
    }
}

fn decode_image(document: &Document, stream: &Stream) -> Option<PageImage> {
    let dict = &stream.dict;
    let width = u32::try_from(dict_int(dict, b"Width")?).ok()?;
    let height = u32::try_from(dict_int(dict, b"Height")?).ok()?;
    if width == 0 || height == 0 || u64::from(width) * u64::from(height) > MAX_IMAGE_PIXELS {
        warn!(width, height, "Image dimensions unsupported");
        return None;
    }

    let filters = filter_names(dict);
    if filters.iter().any(|f| f.as_slice() == b"DCTDecode") {
        return match image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg) {
            Ok(decoded) => Some(PageImage {
                pixels: decoded.to_luma8(),
                stencil: false,
            }),
            Err(err) => {
                warn!(%err, "JPEG image undecodable");
                None
            }
        };
    }

    let Some(data) = stream_bytes(stream) else {
        let names: Vec<String> = filters
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect();
        warn!(filters = ?names, "Image filter unsupported");
        return None;
    };

    let stencil = dict
        .get(b"ImageMask")
        .ok()
        .and_then(|v| v.as_bool().ok())
        .unwrap_or(false);
    let bits = if stencil {
        1
    } else {
        dict_int(dict, b"BitsPerComponent").unwrap_or(8)
    };
    let channels = if stencil {
        1
    } else {
        components(document, dict.get(b"ColorSpace").ok())?
    };

    let pixels = match (bits, channels) {
        (8, 1 | 3 | 4) => samples_8bit(&data, width, height, channels)?,
        (1, 1) => {
            let mut gray = samples_1bit(&data, width, height)?;
            if stencil && inverted_decode(dict) {
                image::imageops::invert(&mut gray);
            }
            gray
        }
        _ => {
            debug!(bits, channels, "Image sample format unsupported");
            return None;
        }
    };
    Some(PageImage { pixels, stencil })
}

/// `/Decode [1 0]` flips which mask samples paint.
fn inverted_decode(dict: &Dictionary) -> bool {
    dict.get(b"Decode")
        .ok()
        .and_then(|obj| obj.as_array().ok())
        .and_then(|arr| arr.first())
        .and_then(number)
        .is_some_and(|first| first >= 1.0)
}

fn samples_8bit(data: &[u8], width: u32, height: u32, channels: u32) -> Option<GrayImage> {
    let expected = width as usize * height as usize * channels as usize;
    if data.len() < expected {
        warn!(expected, actual = data.len(), "Image data truncated");
        return None;
    }
    Some(GrayImage::from_fn(width, height, |x, y| {
        let idx = (y as usize * width as usize + x as usize) * channels as usize;
        let px = &data[idx..idx + channels as usize];
        let luma = match channels {
            1 => px[0],
            3 => ((299 * u32::from(px[0]) + 587 * u32::from(px[1]) + 114 * u32::from(px[2])) / 1000)
                as u8,
            _ => {
                let k = 255 - u32::from(px[3]);
                let rgb = |c: u8| (255 - u32::from(c)) * k / 255;
                ((299 * rgb(px[0]) + 587 * rgb(px[1]) + 114 * rgb(px[2])) / 1000) as u8
            }
        };
        Luma([luma])
    }))
}

/// 1-bit samples, rows padded to a byte; bit 1 = white.
fn samples_1bit(data: &[u8], width: u32, height: u32) -> Option<GrayImage> {
    let row_bytes = (width as usize).div_ceil(8);
    if data.len() < row_bytes * height as usize {
        warn!(
            expected = row_bytes * height as usize,
            actual = data.len(),
            "Image data truncated"
        );
        return None;
    }
    Some(GrayImage::from_fn(width, height, |x, y| {
        let byte = data[y as usize * row_bytes + x as usize / 8];
        let bit = (byte >> (7 - x % 8)) & 1;
        Luma([if bit == 1 { 255 } else { 0 }])
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures;
    use crate::pdf::reader::PdfReader;
    use lopdf::{Stream, dictionary};

    fn render(pdf: &[u8], width: u32) -> GrayImage {
        let reader = PdfReader::from_bytes(pdf).unwrap();
        let page = reader.page(1).unwrap();
        render_page(&page, width).unwrap()
    }

    fn dark_pixels(img: &GrayImage) -> usize {
        img.pixels().filter(|p| p.0[0] < 128).count()
    }

    #[test]
    fn blank_page_keeps_aspect_ratio() {
        let img = render(&fixtures::build([0, 0, 72, 144], &[""], None), 100);
        assert_eq!(img.dimensions(), (100, 200));
        assert_eq!(dark_pixels(&img), 0);
    }

    #[test]
    fn filled_rect_lands_top_left() {
        // Bottom-left origin in PDF: a square at the top of a 72x72 page.
        let img = render(
            &fixtures::build([0, 0, 72, 72], &["0 g 0 36 36 36 re f"], None),
            72,
        );
        assert_eq!(img.get_pixel(10, 10).0[0], 0);
        assert_eq!(img.get_pixel(60, 60).0[0], 255);
        assert_eq!(dark_pixels(&img), 36 * 36);
    }

    #[test]
    fn save_restore_and_transform() {
        let content = "q 0.5 0 0 0.5 0 0 cm 0 g 0 0 72 72 re f Q 1 g 0 0 1 1 re f";
        let img = render(&fixtures::build([0, 0, 72, 72], &[content], None), 72);
        // Scaled square covers the bottom-left quarter only.
        assert_eq!(img.get_pixel(10, 60).0[0], 0);
        assert_eq!(img.get_pixel(60, 10).0[0], 255);
    }

    #[test]
    fn gray_image_xobject_is_drawn() {
        let image = fixtures::gray_image(2, 2, vec![0, 255, 255, 0]);
        let pdf = fixtures::build([0, 0, 72, 72], &["q 72 0 0 72 0 0 cm /Im1 Do Q"], Some(image));
        let img = render(&pdf, 72);
        // Checkerboard: top-left and bottom-right quadrants are black.
        assert_eq!(img.get_pixel(10, 10).0[0], 0);
        assert_eq!(img.get_pixel(60, 10).0[0], 255);
        assert_eq!(img.get_pixel(60, 60).0[0], 0);
    }

    #[test]
    fn stencil_mask_paints_fill_colour() {
        let mask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 8,
                "Height" => 1,
                "ImageMask" => true,
            },
            vec![0b0000_1111],
        );
        let pdf = fixtures::build([0, 0, 80, 10], &["0 g q 80 0 0 10 0 0 cm /Im1 Do Q"], Some(mask));
        let img = render(&pdf, 80);
        assert_eq!(img.get_pixel(5, 5).0[0], 0);
        assert_eq!(img.get_pixel(75, 5).0[0], 255);
    }

    #[test]
    fn missing_xobject_is_ignored() {
        let img = render(&fixtures::build([0, 0, 72, 72], &["/Nope Do"], None), 72);
        assert_eq!(dark_pixels(&img), 0);
    }

    #[test]
    fn text_only_page_is_painted() {
        let pdf = fixtures::build_with_font(
            [0, 0, 200, 72],
            &["BT /F1 24 Tf 10 30 Td (TOTAL 9.50) Tj ET"],
        );
        let img = render(&pdf, 200);
        assert!(dark_pixels(&img) > 100);

        // Baseline sits 30pt above the bottom edge; glyphs start at x = 10.
        let inked: Vec<(u32, u32)> = img
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] < 128)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(inked.iter().all(|&(x, y)| x >= 9 && y < 44));
        assert!(inked.iter().any(|&(_, y)| y > 30));
    }

    #[test]
    fn undefined_font_falls_back_to_bundled_face() {
        let pdf = fixtures::build([0, 0, 72, 72], &["BT /F9 20 Tf 5 30 Td (Hi) Tj ET"], None);
        assert!(dark_pixels(&render(&pdf, 72)) > 0);
    }

    #[test]
    fn invisible_text_is_not_painted() {
        let pdf = fixtures::build_with_font([0, 0, 72, 72], &["BT 3 Tr /F1 20 Tf 5 30 Td (Hi) Tj ET"]);
        assert_eq!(dark_pixels(&render(&pdf, 72)), 0);
    }

    #[test]
    fn text_positioning_follows_td_and_tj_kerning() {
        // Second word starts far to the right thanks to the TJ adjustment.
        let pdf = fixtures::build_with_font(
            [0, 0, 400, 40],
            &["BT /F1 20 Tf 5 10 Td [(A) -15000 (B)] TJ ET"],
        );
        let img = render(&pdf, 400);
        let columns: Vec<u32> = img
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] < 128)
            .map(|(x, _, _)| x)
            .collect();
        assert!(columns.iter().any(|&x| x < 30));
        assert!(columns.iter().any(|&x| x > 300));
        assert!(!columns.iter().any(|&x| (60..300).contains(&x)));
    }

    #[test]
    fn form_fan_out_stops_at_the_paint_budget() {
        let pdf = fixtures::self_invoking_form(8);
        let reader = PdfReader::from_bytes(&pdf).unwrap();
        let page = reader.page(1).unwrap();
        assert!(matches!(
            render_with_limits(&page, 72, 10_000, MAX_PAINTED_PIXELS),
            Err(EncodeError::InvalidJob(_))
        ));
    }

    #[test]
    fn shallow_form_recursion_renders() {
        let pdf = fixtures::self_invoking_form(1);
        let img = render(&pdf, 72);
        assert_eq!(img.get_pixel(0, 71).0[0], 0);
    }

    #[test]
    fn colour_operands_to_gray() {
        assert_eq!(fill_gray(&[Object::Integer(0)]), Some(0));
        let white = [Object::Integer(1), Object::Integer(1), Object::Integer(1)];
        assert_eq!(fill_gray(&white), Some(255));
        let black_cmyk = [
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(1),
        ];
        assert_eq!(fill_gray(&black_cmyk), Some(0));
    }

    #[test]
    fn matrix_inverse_round_trips() {
        let m = Matrix {
            a: 2.0,
            b: 0.0,
            c: 0.0,
            d: -2.0,
            e: 10.0,
            f: 100.0,
        };
        let inv = m.invert().unwrap();
        let (x, y) = m.apply(3.0, 4.0);
        let (bx, by) = inv.apply(x, y);
        assert!((bx - 3.0).abs() < 1e-4 && (by - 4.0).abs() < 1e-4);
    }
}
