use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::error::Error;
use crate::fonts::{self, FontRegistry};
use crate::model::{Alignment, Document, EmbeddedImage, Paragraph};

const PRODUCER: &str = concat!("simred-deck ", env!("CARGO_PKG_VERSION"));

/// Character attributes shared by the pieces of one run.
#[derive(Clone, Copy, Debug, PartialEq)]
struct TextStyle {
    font: usize,
    size: f32,
    color: [u8; 3],
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum PieceKind {
    Word,
    Space,
    Break,
}

/// An unbreakable piece of WinAnsi text, measured in its run's font.
#[derive(Clone, Debug, PartialEq)]
struct Piece {
    kind: PieceKind,
    style: usize,
    bytes: Vec<u8>,
    width: f32,
}

#[derive(Debug, Default)]
struct Line {
    pieces: Vec<Piece>,
    width: f32,
}

impl Line {
    fn has_words(&self) -> bool {
        self.pieces.iter().any(|p| p.kind == PieceKind::Word)
    }

    fn trim_end(&mut self) {
        while self
            .pieces
            .last()
            .is_some_and(|p| p.kind == PieceKind::Space)
        {
            if let Some(space) = self.pieces.pop() {
                self.width -= space.width;
            }
        }
    }

    fn push(&mut self, piece: Piece) {
        self.width += piece.width;
        self.pieces.push(piece);
    }
}

/// Greedy line breaking at spaces. A word wider than `available` gets a line
/// of its own. Spaces before the first word of a line are dropped.
fn break_lines(pieces: Vec<Piece>, available: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current = Line::default();

    for piece in pieces {
        match piece.kind {
            PieceKind::Break => {
                current.trim_end();
                lines.push(std::mem::take(&mut current));
            }
            PieceKind::Space => {
                if current.has_words() {
                    current.push(piece);
                }
            }
            PieceKind::Word => {
                if current.has_words() && current.width + piece.width > available {
                    current.trim_end();
                    lines.push(std::mem::take(&mut current));
                }
                current.push(piece);
            }
        }
    }
    current.trim_end();
    lines.push(current);
    lines
}

/// A broken line with its advance and baseline offset.
struct LaidLine {
    line: Line,
    height: f32,
    ascent: f32,
}

struct Layout {
    styles: Vec<TextStyle>,
    mark_font: usize,
    lines: Vec<LaidLine>,
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn pdf_dimension(value: u32) -> Result<i32, Error> {
    i32::try_from(value).map_err(|_| Error::Pdf(format!("image dimension {value} too large")))
}

struct Page {
    content: Content,
    images: Vec<(String, Ref)>,
    blank: bool,
}

impl Page {
    fn new() -> Self {
        Self {
            content: Content::new(),
            images: Vec::new(),
            blank: true,
        }
    }
}

struct Renderer<'a> {
    doc: &'a Document,
    pdf: Pdf,
    alloc: Ref,
    fonts: FontRegistry,
    pages: Vec<Page>,
    cursor_y: f32,
    image_count: usize,
}

impl<'a> Renderer<'a> {
    fn new(doc: &'a Document, first_free: Ref) -> Self {
        Self {
            doc,
            pdf: Pdf::new(),
            alloc: first_free,
            fonts: FontRegistry::default(),
            pages: vec![Page::new()],
            cursor_y: doc.page_height - doc.margin_top,
            image_count: 0,
        }
    }

    fn text_width(&self) -> f32 {
        self.doc.page_width - self.doc.margin_left - self.doc.margin_right
    }

    fn page(&mut self) -> &mut Page {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn page_is_blank(&self) -> bool {
        self.pages.last().is_none_or(|p| p.blank)
    }

    fn new_page(&mut self) {
        self.pages.push(Page::new());
        self.cursor_y = self.doc.page_height - self.doc.margin_top;
    }

    /// Starts a new page unless `height` still fits above the bottom margin.
    fn ensure_room(&mut self, height: f32) {
        if self.cursor_y - height < self.doc.margin_bottom && !self.page_is_blank() {
            self.new_page();
        }
    }

    fn paragraph(
        &mut self,
        para: &Paragraph,
        prev: Option<&Paragraph>,
        next: Option<&Paragraph>,
    ) -> Result<(), Error> {
        for _ in 0..para.page_breaks {
            self.new_page();
        }
        if para.page_break_before && !self.page_is_blank() {
            self.new_page();
        }

        if !self.page_is_blank() {
            let contextual = para.contextual_spacing
                && prev.is_some_and(|p| p.style_id.is_some() && p.style_id == para.style_id);
            if !contextual {
                self.cursor_y -= prev.map_or(0.0, |p| p.space_after) + para.space_before;
            }
        }

        if para.keep_next
            && let Some(next) = next.filter(|n| n.page_breaks == 0 && !n.page_break_before)
        {
            let together = self.height(para, false)
                + para.space_after
                + next.space_before
                + self.height(next, true);
            self.ensure_room(together);
        }

        if let Some(image) = &para.image {
            self.image(image, para)?;
        }
        if !para.runs.is_empty() || para.image.is_none() {
            self.text(para);
        }
        Ok(())
    }

    /// Displayed size of `image`, scaled down to the text area.
    fn image_size(&self, image: &EmbeddedImage, para: &Paragraph) -> (f32, f32) {
        let available = self.text_width() - para.indent_left;
        let max_height = self.doc.page_height - self.doc.margin_top - self.doc.margin_bottom;
        let scale = (available / image.display_width)
            .min(max_height / image.display_height)
            .min(1.0);
        (image.display_width * scale, image.display_height * scale)
    }

    /// Vertical extent of `para` without its spacing, or of its first line only.
    fn height(&mut self, para: &Paragraph, first_line: bool) -> f32 {
        let image = para
            .image
            .as_ref()
            .map_or(0.0, |image| self.image_size(image, para).1);
        if !para.runs.is_empty() || para.image.is_none() {
            let lines = self.layout(para).lines;
            let take = if first_line { 1 } else { lines.len() };
            image + lines.iter().take(take).map(|l| l.height).sum::<f32>()
        } else {
            image
        }
    }

    fn image(&mut self, image: &EmbeddedImage, para: &Paragraph) -> Result<(), Error> {
        let available = self.text_width() - para.indent_left;
        let (width, height) = self.image_size(image, para);
        if !(width > 0.0 && height > 0.0) {
            return Ok(());
        }

        let (name, xobject) = self.embed_image(&image.data)?;

        self.ensure_room(height);
        let x = self.doc.margin_left
            + para.indent_left
            + match para.alignment {
                Alignment::Center => (available - width) / 2.0,
                Alignment::Right => available - width,
                Alignment::Left | Alignment::Justify => 0.0,
            };
        let y = self.cursor_y - height;

        let page = self.page();
        page.content
            .save_state()
            .transform([width, 0.0, 0.0, height, x, y])
            .x_object(Name(name.as_bytes()))
            .restore_state();
        page.images.push((name, xobject));
        page.blank = false;
        self.cursor_y = y;
        Ok(())
    }

    /// Writes `data` as an RGB image XObject, with a soft mask for alpha.
    fn embed_image(&mut self, data: &[u8]) -> Result<(String, Ref), Error> {
        let decoded = image::load_from_memory(data)?;
        let width = pdf_dimension(decoded.width())?;
        let height = pdf_dimension(decoded.height())?;
        let pixels = deflate(decoded.to_rgb8().as_raw())?;
        let alpha = if decoded.color().has_alpha() {
            let channel: Vec<u8> = decoded.to_rgba8().pixels().map(|p| p.0[3]).collect();
            Some(deflate(&channel)?)
        } else {
            None
        };

        let image_ref = self.alloc.bump();
        let mask_ref = alpha.as_ref().map(|_| self.alloc.bump());

        let mut xobject = self.pdf.image_xobject(image_ref, &pixels);
        xobject.filter(Filter::FlateDecode);
        xobject.width(width);
        xobject.height(height);
        xobject.color_space().device_rgb();
        xobject.bits_per_component(8);
        if let Some(mask_ref) = mask_ref {
            xobject.s_mask(mask_ref);
        }
        xobject.finish();

        if let (Some(mask_ref), Some(alpha)) = (mask_ref, alpha) {
            let mut mask = self.pdf.image_xobject(mask_ref, &alpha);
            mask.filter(Filter::FlateDecode);
            mask.width(width);
            mask.height(height);
            mask.color_space().device_gray();
            mask.bits_per_component(8);
            mask.finish();
        }

        self.image_count += 1;
        Ok((format!("Im{}", self.image_count), image_ref))
    }

    fn pieces(&mut self, para: &Paragraph) -> (Vec<TextStyle>, Vec<Piece>) {
        let mut styles = Vec::with_capacity(para.runs.len());
        let mut pieces = Vec::new();
        let mut dropped = 0usize;

        for run in &para.runs {
            let font = self.fonts.register(
                &mut self.pdf,
                &mut self.alloc,
                &run.font_name,
                run.bold,
                run.italic,
            );
            let style = styles.len();
            styles.push(TextStyle {
                font,
                size: run.font_size,
                color: run.color.unwrap_or([0, 0, 0]),
            });
            let entry = self.fonts.get(font);

            let mut word = String::new();
            let mut flush = |word: &mut String, pieces: &mut Vec<Piece>| {
                if word.is_empty() {
                    return;
                }
                let bytes = fonts::to_winansi_bytes(word);
                dropped += word.chars().count() - bytes.len();
                word.clear();
                if !bytes.is_empty() {
                    let width = entry.text_width(&bytes, run.font_size);
                    pieces.push(Piece { kind: PieceKind::Word, style, bytes, width });
                }
            };
            for c in run.text.chars() {
                match c {
                    ' ' => {
                        flush(&mut word, &mut pieces);
                        let width = entry.text_width(b" ", run.font_size);
                        pieces.push(Piece { kind: PieceKind::Space, style, bytes: vec![b' '], width });
                    }
                    '\n' => {
                        flush(&mut word, &mut pieces);
                        pieces.push(Piece { kind: PieceKind::Break, style, bytes: Vec::new(), width: 0.0 });
                    }
                    _ => word.push(c),
                }
            }
            flush(&mut word, &mut pieces);
        }

        if dropped > 0 {
            log::debug!("Omitted {dropped} characters outside WinAnsi");
        }
        (styles, pieces)
    }

    fn layout(&mut self, para: &Paragraph) -> Layout {
        let (styles, pieces) = self.pieces(para);
        let available = self.text_width() - para.indent_left;
        let spacing = para.line_spacing.unwrap_or(self.doc.line_spacing);

        let mark_font = self.fonts.register(
            &mut self.pdf,
            &mut self.alloc,
            &para.mark_font_name,
            false,
            false,
        );
        let (mark_line_h, mark_ascent) = {
            let entry = self.fonts.get(mark_font);
            (
                entry.line_h_ratio * para.mark_font_size,
                entry.ascender_ratio * para.mark_font_size,
            )
        };

        let lines = break_lines(pieces, available)
            .into_iter()
            .map(|line| {
                let (line_h, ascent) = line.pieces.iter().fold((0.0f32, 0.0f32), |(h, a), p| {
                    let style = &styles[p.style];
                    let entry = self.fonts.get(style.font);
                    (
                        h.max(entry.line_h_ratio * style.size),
                        a.max(entry.ascender_ratio * style.size),
                    )
                });
                let (line_h, ascent) = if line_h > 0.0 {
                    (line_h, ascent)
                } else {
                    (mark_line_h, mark_ascent)
                };
                LaidLine { line, height: line_h * spacing, ascent }
            })
            .collect();

        Layout { styles, mark_font, lines }
    }

    fn text(&mut self, para: &Paragraph) {
        let Layout { styles, mark_font, lines } = self.layout(para);
        let available = self.text_width() - para.indent_left;

        for (index, LaidLine { line, height, ascent }) in lines.into_iter().enumerate() {
            self.ensure_room(height);
            let baseline = self.cursor_y - ascent;
            let left = self.doc.margin_left + para.indent_left;

            if index == 0 && !para.list_label.is_empty() {
                let label_size = styles.first().map_or(para.mark_font_size, |s| s.size);
                let entry = self.fonts.get(mark_font);
                let name = entry.pdf_name.clone();
                let bytes = fonts::to_winansi_bytes(&para.list_label);
                let content = &mut self.page().content;
                content.set_fill_rgb(0.0, 0.0, 0.0);
                content
                    .begin_text()
                    .set_font(Name(name.as_bytes()), label_size)
                    .next_line(left - para.indent_hanging, baseline)
                    .show(Str(&bytes))
                    .end_text();
            }

            let mut x = left
                + match para.alignment {
                    Alignment::Center => (available - line.width) / 2.0,
                    Alignment::Right => available - line.width,
                    Alignment::Left | Alignment::Justify => 0.0,
                };

            // Consecutive pieces in the same run are drawn as one string.
            let mut groups: Vec<(usize, Vec<u8>, f32)> = Vec::new();
            for piece in &line.pieces {
                if let Some((_, bytes, width)) = groups
                    .last_mut()
                    .filter(|(style, _, _)| *style == piece.style)
                {
                    bytes.extend_from_slice(&piece.bytes);
                    *width += piece.width;
                } else {
                    groups.push((piece.style, piece.bytes.clone(), piece.width));
                }
            }

            for (style, bytes, width) in groups {
                let style = styles[style];
                let name = self.fonts.get(style.font).pdf_name.clone();
                let [r, g, b] = style.color.map(|c| f32::from(c) / 255.0);
                let content = &mut self.page().content;
                content.set_fill_rgb(r, g, b);
                content
                    .begin_text()
                    .set_font(Name(name.as_bytes()), style.size)
                    .next_line(x, baseline)
                    .show(Str(&bytes))
                    .end_text();
                x += width;
            }

            self.page().blank = false;
            self.cursor_y -= height;
        }
    }

    fn finish(mut self, catalog_id: Ref, pages_id: Ref) -> Vec<u8> {
        let page_ids: Vec<(Ref, Ref)> = self
            .pages
            .iter()
            .map(|_| (self.alloc.bump(), self.alloc.bump()))
            .collect();
        let media_box = Rect::new(0.0, 0.0, self.doc.page_width, self.doc.page_height);

        self.pdf.catalog(catalog_id).pages(pages_id);
        self.pdf
            .pages(pages_id)
            .kids(page_ids.iter().map(|(page_id, _)| *page_id))
            .count(page_ids.len() as i32);

        for (page, (page_id, content_id)) in self.pages.into_iter().zip(page_ids) {
            self.pdf.stream(content_id, &page.content.finish());

            let mut writer = self.pdf.page(page_id);
            writer
                .media_box(media_box)
                .parent(pages_id)
                .contents(content_id);
            let mut resources = writer.resources();
            {
                let mut fonts = resources.fonts();
                for entry in self.fonts.entries() {
                    fonts.pair(Name(entry.pdf_name.as_bytes()), entry.font_ref);
                }
            }
            if !page.images.is_empty() {
                let mut xobjects = resources.x_objects();
                for (name, xobject) in &page.images {
                    xobjects.pair(Name(name.as_bytes()), *xobject);
                }
            }
        }

        let mut info = self.pdf.document_info(self.alloc.bump());
        if let Some(title) = &self.doc.title {
            info.title(TextStr(title));
        }
        info.producer(TextStr(PRODUCER));
        info.finish();

        self.pdf.finish()
    }
}

pub fn render(doc: &Document) -> Result<Vec<u8>, Error> {
    let mut alloc = Ref::new(1);
    let catalog_id = alloc.bump();
    let pages_id = alloc.bump();

    let mut renderer = Renderer::new(doc, alloc);
    let mut prev: Option<&Paragraph> = None;
    for (index, para) in doc.paragraphs.iter().enumerate() {
        renderer.paragraph(para, prev, doc.paragraphs.get(index + 1))?;
        prev = Some(para);
    }
    log::debug!("Laid out {} pages", renderer.pages.len());

    Ok(renderer.finish(catalog_id, pages_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(width: f32) -> Piece {
        Piece { kind: PieceKind::Word, style: 0, bytes: b"w".to_vec(), width }
    }

    fn space() -> Piece {
        Piece { kind: PieceKind::Space, style: 0, bytes: b" ".to_vec(), width: 2.0 }
    }

    fn hard_break() -> Piece {
        Piece { kind: PieceKind::Break, style: 0, bytes: Vec::new(), width: 0.0 }
    }

    #[test]
    fn wraps_before_overflowing_word() {
        let pieces = vec![word(40.0), space(), word(40.0), space(), word(40.0)];
        let lines = break_lines(pieces, 90.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].width, 82.0);
        assert_eq!(lines[1].width, 40.0);
        assert_eq!(lines[1].pieces.len(), 1);
    }

    #[test]
    fn lines_never_exceed_available_width() {
        let mut pieces = Vec::new();
        for i in 0..50 {
            pieces.push(word(5.0 + (i % 7) as f32 * 3.0));
            pieces.push(space());
        }
        for line in break_lines(pieces, 60.0) {
            assert!(line.width <= 60.0, "line width {}", line.width);
        }
    }

    #[test]
    fn overlong_word_gets_its_own_line() {
        let lines = break_lines(vec![word(10.0), space(), word(200.0), space(), word(10.0)], 50.0);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].width, 200.0);
    }

    #[test]
    fn hard_breaks_keep_empty_lines() {
        let lines = break_lines(vec![word(10.0), hard_break(), hard_break(), word(10.0)], 50.0);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].pieces.is_empty());
    }

    #[test]
    fn leading_spaces_are_dropped() {
        let lines = break_lines(vec![space(), word(10.0), hard_break(), space(), word(10.0)], 50.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].pieces.len(), 1);
        assert_eq!(lines[1].width, 10.0);
    }

    #[test]
    fn empty_paragraph_is_one_empty_line() {
        let lines = break_lines(Vec::new(), 50.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].width, 0.0);
    }
}
