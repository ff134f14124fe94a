//! In-memory authoring model for a Word document.
//!
//! A [`Deck`] is an ordered list of [`Block`]s. It is assembled once, handed
//! to the DOCX writer and never read back.

use std::io::Cursor;
use std::path::Path;

use crate::error::Error;
pub use crate::model::Alignment;

pub type Rgb = [u8; 3];

pub const POINTS_PER_INCH: f32 = 72.0;

/// A run of text sharing one set of character attributes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub size: Option<f32>,
    pub color: Option<Rgb>,
}

impl Span {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn size(mut self, points: f32) -> Self {
        self.size = Some(points);
        self
    }

    pub fn color(mut self, rgb: Rgb) -> Self {
        self.color = Some(rgb);
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParagraphStyle {
    #[default]
    Normal,
    IntenseQuote,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Paragraph {
    pub spans: Vec<Span>,
    pub style: ParagraphStyle,
    pub alignment: Alignment,
    pub indent_left: Option<f32>, // points
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new().span(Span::new(text))
    }

    pub fn span(mut self, span: Span) -> Self {
        self.spans.push(span);
        self
    }

    pub fn style(mut self, style: ParagraphStyle) -> Self {
        self.style = style;
        self
    }

    pub fn align(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn indent(mut self, points: f32) -> Self {
        self.indent_left = Some(points);
        self
    }

    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Heading {
    /// 0 is the document title, 1..=3 are section levels.
    pub level: u8,
    pub spans: Vec<Span>,
    pub alignment: Alignment,
}

/// A picture read from disk, sized by its display width.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub name: String,
    pub data: Vec<u8>,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub width: f32, // points
    pub alignment: Alignment,
}

impl Image {
    pub fn height(&self) -> f32 {
        if self.pixel_width == 0 {
            return 0.0;
        }
        self.width * self.pixel_height as f32 / self.pixel_width as f32
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Heading(Heading),
    Paragraph(Paragraph),
    BulletItem(Paragraph),
    NumberedItem(Paragraph),
    Image(Image),
    PageBreak,
}

pub struct Deck {
    pub title: String,
    pub font_name: String,
    pub font_size: f32,
    blocks: Vec<Block>,
}

impl Deck {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            font_name: "Calibri".to_string(),
            font_size: 11.0,
            blocks: Vec::new(),
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn push(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    /// Adds a heading, colouring every run when `color` is given.
    pub fn heading(&mut self, text: impl Into<String>, level: u8, color: Option<Rgb>) -> &mut Self {
        let mut span = Span::new(text);
        span.color = color;
        self.push(Block::Heading(Heading {
            level: level.min(3),
            spans: vec![span],
            alignment: Alignment::Left,
        }))
    }

    pub fn paragraph(&mut self, paragraph: Paragraph) -> &mut Self {
        self.push(Block::Paragraph(paragraph))
    }

    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        self.paragraph(Paragraph::text(text))
    }

    pub fn blank(&mut self) -> &mut Self {
        self.paragraph(Paragraph::new())
    }

    pub fn bullet(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Block::BulletItem(Paragraph::text(text)))
    }

    pub fn numbered(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Block::NumberedItem(Paragraph::text(text)))
    }

    pub fn page_break(&mut self) -> &mut Self {
        self.push(Block::PageBreak)
    }

    /// Appends a centered picture `width_in` inches wide. Returns `Ok(false)`
    /// without touching the deck when the file does not exist.
    pub fn picture(&mut self, path: &Path, width_in: f32) -> Result<bool, Error> {
        if !path.is_file() {
            log::debug!("Skipping missing image {}", path.display());
            return Ok(false);
        }
        let data = std::fs::read(path)?;
        let (pixel_width, pixel_height) = image::ImageReader::new(Cursor::new(&data))
            .with_guessed_format()?
            .into_dimensions()?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image.png")
            .to_string();
        self.push(Block::Image(Image {
            name,
            data,
            pixel_width,
            pixel_height,
            width: width_in * POINTS_PER_INCH,
            alignment: Alignment::Center,
        }));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_level_is_capped() {
        let mut deck = Deck::new("t");
        deck.heading("Deep", 7, None);
        let Block::Heading(h) = &deck.blocks()[0] else {
            panic!("expected heading");
        };
        assert_eq!(h.level, 3);
    }

    #[test]
    fn missing_picture_is_skipped() {
        let mut deck = Deck::new("t");
        let added = deck
            .picture(Path::new("definitely/not/here.png"), 6.5)
            .unwrap();
        assert!(!added);
        assert!(deck.blocks().is_empty());
    }

    #[test]
    fn image_height_keeps_aspect_ratio() {
        let img = Image {
            name: "a.png".into(),
            data: Vec::new(),
            pixel_width: 200,
            pixel_height: 100,
            width: 72.0,
            alignment: Alignment::Center,
        };
        assert_eq!(img.height(), 36.0);
    }
}
