use std::io::{Seek, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use zip::write::SimpleFileOptions;

use crate::deck::{Alignment, Block, Deck, Image, Paragraph, ParagraphStyle, Span};
use crate::error::Error;

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const WPD_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const CORE_NS: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";

const REL_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_NUMBERING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const EMU_PER_PT: f32 = 12700.0;
const BULLET_NUM_ID: u32 = 1;
const DECIMAL_NUM_ID: u32 = 2;

// Letter, 1 inch margins
const PAGE_W_TWIPS: u32 = 12240;
const PAGE_H_TWIPS: u32 = 15840;
const MARGIN_TWIPS: u32 = 1440;

fn pts_to_twips(pts: f32) -> i32 {
    (pts * 20.0).round() as i32
}

fn hex(rgb: [u8; 3]) -> String {
    format!("{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

fn jc(alignment: Alignment) -> Option<&'static str> {
    match alignment {
        Alignment::Left => None,
        Alignment::Center => Some("center"),
        Alignment::Right => Some("right"),
        Alignment::Justify => Some("both"),
    }
}

/// Event-level XML output for one package part.
struct Part {
    writer: Writer<Vec<u8>>,
}

impl Part {
    fn new() -> Result<Self, Error> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(Self { writer })
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<&mut Self, Error> {
        let elem = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Start(elem))?;
        Ok(self)
    }

    fn end(&mut self, name: &str) -> Result<&mut Self, Error> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(self)
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<&mut Self, Error> {
        let elem = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Empty(elem))?;
        Ok(self)
    }

    /// Empty element carrying only a `w:val` attribute.
    fn val(&mut self, name: &str, value: &str) -> Result<&mut Self, Error> {
        self.empty(name, &[("w:val", value)])
    }

    fn text(&mut self, text: &str) -> Result<&mut Self, Error> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(self)
    }

    fn text_element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<&mut Self, Error> {
        self.start(name, attrs)?.text(text)?.end(name)
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// Media parts collected while writing the body, in relationship order.
struct Media<'a> {
    images: Vec<&'a Image>,
}

impl<'a> Media<'a> {
    // rId1 and rId2 are styles and numbering
    fn add(&mut self, image: &'a Image) -> (String, usize) {
        self.images.push(image);
        let n = self.images.len();
        (format!("rId{}", n + 2), n)
    }

    fn extension(image: &Image) -> String {
        std::path::Path::new(&image.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| "png".to_string())
    }

    fn part_name(index: usize, image: &Image) -> String {
        format!("image{index}.{}", Self::extension(image))
    }
}

fn write_run(part: &mut Part, span: &Span) -> Result<(), Error> {
    part.start("w:r", &[])?;
    if span.bold || span.italic || span.color.is_some() || span.size.is_some() {
        part.start("w:rPr", &[])?;
        if span.bold {
            part.empty("w:b", &[])?;
        }
        if span.italic {
            part.empty("w:i", &[])?;
        }
        if let Some(color) = span.color {
            part.val("w:color", &hex(color))?;
        }
        if let Some(size) = span.size {
            part.val("w:sz", &((size * 2.0).round() as u32).to_string())?;
        }
        part.end("w:rPr")?;
    }
    for (i, line) in span.text.split('\n').enumerate() {
        if i > 0 {
            part.empty("w:br", &[])?;
        }
        if !line.is_empty() {
            part.text_element("w:t", &[("xml:space", "preserve")], line)?;
        }
    }
    part.end("w:r")?;
    Ok(())
}

fn write_paragraph(
    part: &mut Part,
    style_id: Option<&str>,
    num_id: Option<u32>,
    paragraph: &Paragraph,
) -> Result<(), Error> {
    part.start("w:p", &[])?;
    let align = jc(paragraph.alignment);
    if style_id.is_some() || num_id.is_some() || paragraph.indent_left.is_some() || align.is_some()
    {
        part.start("w:pPr", &[])?;
        if let Some(id) = style_id {
            part.val("w:pStyle", id)?;
        }
        if let Some(num_id) = num_id {
            part.start("w:numPr", &[])?
                .val("w:ilvl", "0")?
                .val("w:numId", &num_id.to_string())?
                .end("w:numPr")?;
        }
        if let Some(indent) = paragraph.indent_left {
            part.empty("w:ind", &[("w:left", &pts_to_twips(indent).to_string())])?;
        }
        if let Some(val) = align {
            part.val("w:jc", val)?;
        }
        part.end("w:pPr")?;
    }
    for span in &paragraph.spans {
        write_run(part, span)?;
    }
    part.end("w:p")?;
    Ok(())
}

fn write_image(part: &mut Part, image: &Image, rel_id: &str, index: usize) -> Result<(), Error> {
    let cx = ((image.width * EMU_PER_PT).round() as u64).to_string();
    let cy = ((image.height() * EMU_PER_PT).round() as u64).to_string();
    let id = index.to_string();
    let picture_name = format!("Picture {index}");

    part.start("w:p", &[])?;
    if let Some(val) = jc(image.alignment) {
        part.start("w:pPr", &[])?.val("w:jc", val)?.end("w:pPr")?;
    }
    part.start("w:r", &[])?
        .start("w:drawing", &[])?
        .start(
            "wp:inline",
            &[("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")],
        )?
        .empty("wp:extent", &[("cx", &cx), ("cy", &cy)])?
        .empty("wp:docPr", &[("id", &id), ("name", &picture_name)])?
        .start("a:graphic", &[])?
        .start("a:graphicData", &[("uri", PIC_NS)])?
        .start("pic:pic", &[])?;

    part.start("pic:nvPicPr", &[])?
        .empty("pic:cNvPr", &[("id", &id), ("name", &image.name)])?
        .empty("pic:cNvPicPr", &[])?
        .end("pic:nvPicPr")?;
    part.start("pic:blipFill", &[])?
        .empty("a:blip", &[("r:embed", rel_id)])?
        .start("a:stretch", &[])?
        .empty("a:fillRect", &[])?
        .end("a:stretch")?
        .end("pic:blipFill")?;
    part.start("pic:spPr", &[])?
        .start("a:xfrm", &[])?
        .empty("a:off", &[("x", "0"), ("y", "0")])?
        .empty("a:ext", &[("cx", &cx), ("cy", &cy)])?
        .end("a:xfrm")?
        .start("a:prstGeom", &[("prst", "rect")])?
        .empty("a:avLst", &[])?
        .end("a:prstGeom")?
        .end("pic:spPr")?;

    part.end("pic:pic")?
        .end("a:graphicData")?
        .end("a:graphic")?
        .end("wp:inline")?
        .end("w:drawing")?
        .end("w:r")?
        .end("w:p")?;
    Ok(())
}

fn document_xml<'a>(deck: &'a Deck, media: &mut Media<'a>) -> Result<Vec<u8>, Error> {
    let mut part = Part::new()?;
    part.start(
        "w:document",
        &[
            ("xmlns:w", WML_NS),
            ("xmlns:r", REL_NS),
            ("xmlns:wp", WPD_NS),
            ("xmlns:a", DML_NS),
            ("xmlns:pic", PIC_NS),
        ],
    )?
    .start("w:body", &[])?;

    for block in deck.blocks() {
        match block {
            Block::Heading(heading) => {
                let style_id = match heading.level {
                    0 => "Title".to_string(),
                    n => format!("Heading{n}"),
                };
                let paragraph = Paragraph {
                    spans: heading.spans.clone(),
                    alignment: heading.alignment,
                    ..Paragraph::default()
                };
                write_paragraph(&mut part, Some(style_id.as_str()), None, &paragraph)?;
            }
            Block::Paragraph(paragraph) => {
                let style_id = match paragraph.style {
                    ParagraphStyle::Normal => None,
                    ParagraphStyle::IntenseQuote => Some("IntenseQuote"),
                };
                write_paragraph(&mut part, style_id, None, paragraph)?;
            }
            Block::BulletItem(paragraph) => {
                write_paragraph(&mut part, Some("ListBullet"), Some(BULLET_NUM_ID), paragraph)?;
            }
            Block::NumberedItem(paragraph) => {
                write_paragraph(&mut part, Some("ListNumber"), Some(DECIMAL_NUM_ID), paragraph)?;
            }
            Block::Image(image) => {
                let (rel_id, index) = media.add(image);
                write_image(&mut part, image, &rel_id, index)?;
            }
            Block::PageBreak => {
                part.start("w:p", &[])?
                    .start("w:r", &[])?
                    .empty("w:br", &[("w:type", "page")])?
                    .end("w:r")?
                    .end("w:p")?;
            }
        }
    }

    let margin = MARGIN_TWIPS.to_string();
    part.start("w:sectPr", &[])?
        .empty(
            "w:pgSz",
            &[
                ("w:w", &PAGE_W_TWIPS.to_string()),
                ("w:h", &PAGE_H_TWIPS.to_string()),
            ],
        )?
        .empty(
            "w:pgMar",
            &[
                ("w:top", &margin),
                ("w:right", &margin),
                ("w:bottom", &margin),
                ("w:left", &margin),
                ("w:header", "720"),
                ("w:footer", "720"),
                ("w:gutter", "0"),
            ],
        )?
        .end("w:sectPr")?
        .end("w:body")?
        .end("w:document")?;
    Ok(part.finish())
}

fn heading_style(
    part: &mut Part,
    id: &str,
    name: &str,
    half_points: &str,
    color: &str,
    before: &str,
) -> Result<(), Error> {
    part.start("w:style", &[("w:type", "paragraph"), ("w:styleId", id)])?
        .val("w:name", name)?
        .val("w:basedOn", "Normal")?
        .val("w:next", "Normal")?
        .start("w:pPr", &[])?
        .empty("w:keepNext", &[])?
        .empty("w:spacing", &[("w:before", before), ("w:after", "0")])?
        .end("w:pPr")?
        .start("w:rPr", &[])?
        .empty("w:b", &[])?
        .val("w:color", color)?
        .val("w:sz", half_points)?
        .end("w:rPr")?
        .end("w:style")?;
    Ok(())
}

fn list_style(part: &mut Part, id: &str, name: &str) -> Result<(), Error> {
    part.start("w:style", &[("w:type", "paragraph"), ("w:styleId", id)])?
        .val("w:name", name)?
        .val("w:basedOn", "Normal")?
        .start("w:pPr", &[])?
        .empty("w:contextualSpacing", &[])?
        .end("w:pPr")?
        .end("w:style")?;
    Ok(())
}

fn styles_xml(deck: &Deck) -> Result<Vec<u8>, Error> {
    let font = deck.font_name.as_str();
    let half_points = ((deck.font_size * 2.0).round() as u32).to_string();

    let mut part = Part::new()?;
    part.start("w:styles", &[("xmlns:w", WML_NS)])?;

    part.start("w:docDefaults", &[])?
        .start("w:rPrDefault", &[])?
        .start("w:rPr", &[])?
        .empty("w:rFonts", &[("w:ascii", font), ("w:hAnsi", font), ("w:cs", font)])?
        .val("w:sz", &half_points)?
        .end("w:rPr")?
        .end("w:rPrDefault")?
        .start("w:pPrDefault", &[])?
        .start("w:pPr", &[])?
        .empty(
            "w:spacing",
            &[("w:after", "160"), ("w:line", "259"), ("w:lineRule", "auto")],
        )?
        .end("w:pPr")?
        .end("w:pPrDefault")?
        .end("w:docDefaults")?;

    part.start(
        "w:style",
        &[("w:type", "paragraph"), ("w:default", "1"), ("w:styleId", "Normal")],
    )?
    .val("w:name", "Normal")?
    .end("w:style")?;

    part.start("w:style", &[("w:type", "paragraph"), ("w:styleId", "Title")])?
        .val("w:name", "Title")?
        .val("w:basedOn", "Normal")?
        .val("w:next", "Normal")?
        .start("w:pPr", &[])?
        .empty("w:spacing", &[("w:after", "300")])?
        .empty("w:contextualSpacing", &[])?
        .end("w:pPr")?
        .start("w:rPr", &[])?
        .val("w:color", "17365D")?
        .val("w:sz", "52")?
        .end("w:rPr")?
        .end("w:style")?;

    heading_style(&mut part, "Heading1", "heading 1", "28", "365F91", "480")?;
    heading_style(&mut part, "Heading2", "heading 2", "26", "4F81BD", "200")?;
    heading_style(&mut part, "Heading3", "heading 3", "22", "4F81BD", "200")?;
    list_style(&mut part, "ListBullet", "List Bullet")?;
    list_style(&mut part, "ListNumber", "List Number")?;

    part.start("w:style", &[("w:type", "paragraph"), ("w:styleId", "IntenseQuote")])?
        .val("w:name", "Intense Quote")?
        .val("w:basedOn", "Normal")?
        .val("w:next", "Normal")?
        .start("w:pPr", &[])?
        .empty("w:spacing", &[("w:before", "200"), ("w:after", "280")])?
        .empty("w:ind", &[("w:left", "936"), ("w:right", "936")])?
        .end("w:pPr")?
        .start("w:rPr", &[])?
        .empty("w:b", &[])?
        .empty("w:i", &[])?
        .val("w:color", "4F81BD")?
        .end("w:rPr")?
        .end("w:style")?;

    part.end("w:styles")?;
    Ok(part.finish())
}

fn abstract_num(part: &mut Part, id: &str, format: &str, text: &str) -> Result<(), Error> {
    part.start("w:abstractNum", &[("w:abstractNumId", id)])?
        .start("w:lvl", &[("w:ilvl", "0")])?
        .val("w:start", "1")?
        .val("w:numFmt", format)?
        .val("w:lvlText", text)?
        .val("w:lvlJc", "left")?
        .start("w:pPr", &[])?
        .empty("w:ind", &[("w:left", "720"), ("w:hanging", "360")])?
        .end("w:pPr")?
        .end("w:lvl")?
        .end("w:abstractNum")?;
    Ok(())
}

fn numbering_xml() -> Result<Vec<u8>, Error> {
    let mut part = Part::new()?;
    part.start("w:numbering", &[("xmlns:w", WML_NS)])?;
    abstract_num(&mut part, "0", "bullet", "\u{2022}")?;
    abstract_num(&mut part, "1", "decimal", "%1.")?;
    for (num_id, abstract_id) in [(BULLET_NUM_ID, "0"), (DECIMAL_NUM_ID, "1")] {
        part.start("w:num", &[("w:numId", &num_id.to_string())])?
            .val("w:abstractNumId", abstract_id)?
            .end("w:num")?;
    }
    part.end("w:numbering")?;
    Ok(part.finish())
}

fn content_types_xml(media: &Media) -> Result<Vec<u8>, Error> {
    let mut extensions: Vec<String> = media
        .images
        .iter()
        .map(|image| Media::extension(image))
        .filter(|ext| ext != "png")
        .collect();
    extensions.sort();
    extensions.dedup();

    let mut part = Part::new()?;
    part.start("Types", &[("xmlns", CONTENT_TYPES_NS)])?
        .empty(
            "Default",
            &[
                ("Extension", "rels"),
                ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
            ],
        )?
        .empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?
        .empty("Default", &[("Extension", "png"), ("ContentType", "image/png")])?;
    for ext in &extensions {
        let mime = match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            _ => "application/octet-stream",
        };
        part.empty("Default", &[("Extension", ext), ("ContentType", mime)])?;
    }
    for (name, content_type) in [
        (
            "/word/document.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
        ),
        (
            "/word/styles.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
        ),
        (
            "/word/numbering.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml",
        ),
        (
            "/docProps/core.xml",
            "application/vnd.openxmlformats-package.core-properties+xml",
        ),
    ] {
        part.empty("Override", &[("PartName", name), ("ContentType", content_type)])?;
    }
    part.end("Types")?;
    Ok(part.finish())
}

fn relationships_xml(targets: &[(String, &str, String)]) -> Result<Vec<u8>, Error> {
    let mut part = Part::new()?;
    part.start("Relationships", &[("xmlns", PKG_REL_NS)])?;
    for (id, kind, target) in targets {
        part.empty("Relationship", &[("Id", id), ("Type", kind), ("Target", target)])?;
    }
    part.end("Relationships")?;
    Ok(part.finish())
}

fn package_rels_xml() -> Result<Vec<u8>, Error> {
    relationships_xml(&[
        ("rId1".to_string(), REL_DOCUMENT, "word/document.xml".to_string()),
        ("rId2".to_string(), REL_CORE, "docProps/core.xml".to_string()),
    ])
}

fn document_rels_xml(media: &Media) -> Result<Vec<u8>, Error> {
    let mut targets = vec![
        ("rId1".to_string(), REL_STYLES, "styles.xml".to_string()),
        ("rId2".to_string(), REL_NUMBERING, "numbering.xml".to_string()),
    ];
    for (i, image) in media.images.iter().enumerate() {
        targets.push((
            format!("rId{}", i + 3),
            REL_IMAGE,
            format!("media/{}", Media::part_name(i + 1, image)),
        ));
    }
    relationships_xml(&targets)
}

fn core_xml(deck: &Deck) -> Result<Vec<u8>, Error> {
    let mut part = Part::new()?;
    part.start("cp:coreProperties", &[("xmlns:cp", CORE_NS), ("xmlns:dc", DC_NS)])?
        .text_element("dc:title", &[], &deck.title)?
        .text_element("cp:revision", &[], "1")?
        .end("cp:coreProperties")?;
    Ok(part.finish())
}

/// Serialise `deck` as a WordprocessingML package.
pub(crate) fn write<W: Write + Seek>(deck: &Deck, out: W) -> Result<(), Error> {
    let mut media = Media { images: Vec::new() };
    let document = document_xml(deck, &mut media)?;

    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut zip = zip::ZipWriter::new(out);

    let parts = [
        ("[Content_Types].xml", content_types_xml(&media)?),
        ("_rels/.rels", package_rels_xml()?),
        ("docProps/core.xml", core_xml(deck)?),
        ("word/document.xml", document),
        ("word/styles.xml", styles_xml(deck)?),
        ("word/numbering.xml", numbering_xml()?),
        ("word/_rels/document.xml.rels", document_rels_xml(&media)?),
    ];
    for (name, xml) in parts {
        zip.start_file(name, options)?;
        zip.write_all(&xml)?;
    }

    for (i, image) in media.images.iter().enumerate() {
        zip.start_file(format!("word/media/{}", Media::part_name(i + 1, image)), options)?;
        zip.write_all(&image.data)?;
    }

    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(part: Part) -> String {
        let xml = String::from_utf8(part.finish()).unwrap();
        xml.split_once("?>").unwrap().1.to_string()
    }

    #[test]
    fn newline_becomes_line_break() {
        let mut part = Part::new().unwrap();
        write_run(&mut part, &Span::new("uno\n\ndos").bold()).unwrap();
        assert_eq!(
            body(part),
            concat!(
                "<w:r><w:rPr><w:b/></w:rPr>",
                "<w:t xml:space=\"preserve\">uno</w:t><w:br/><w:br/>",
                "<w:t xml:space=\"preserve\">dos</w:t></w:r>",
            )
        );
    }

    #[test]
    fn markup_in_text_is_escaped() {
        let deck = Deck::new("Prueba & <ok> \"sí\"");
        let xml = String::from_utf8(core_xml(&deck).unwrap()).unwrap();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let title = doc
            .descendants()
            .find(|n| n.tag_name().name() == "title")
            .and_then(|n| n.text());
        assert_eq!(title, Some("Prueba & <ok> \"sí\""));
    }

    #[test]
    fn jpeg_media_gets_its_own_content_type() {
        let jpeg = Image {
            name: "foto.JPG".to_string(),
            data: Vec::new(),
            pixel_width: 1,
            pixel_height: 1,
            width: 72.0,
            alignment: Alignment::Center,
        };
        let media = Media { images: vec![&jpeg] };
        let xml = String::from_utf8(content_types_xml(&media).unwrap()).unwrap();
        assert!(xml.contains(r#"<Default Extension="jpg" ContentType="image/jpeg"/>"#));
        assert_eq!(Media::part_name(1, &jpeg), "image1.jpg");
    }

    #[test]
    fn generated_parts_are_well_formed() {
        let mut deck = Deck::new("Prueba & <ok>");
        deck.heading("Título", 1, Some([0, 51, 102]));
        deck.bullet("uno");
        deck.numbered("dos");
        deck.page_break();
        let mut media = Media { images: Vec::new() };
        for xml in [
            document_xml(&deck, &mut media).unwrap(),
            styles_xml(&deck).unwrap(),
            numbering_xml().unwrap(),
            content_types_xml(&media).unwrap(),
            package_rels_xml().unwrap(),
            document_rels_xml(&media).unwrap(),
            core_xml(&deck).unwrap(),
        ] {
            let xml = String::from_utf8(xml).unwrap();
            roxmltree::Document::parse(&xml).unwrap();
        }
    }
}
