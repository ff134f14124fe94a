use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use crate::error::Error;
use crate::model::{Alignment, Document, EmbeddedImage, Paragraph, Run};

struct LevelDef {
    num_fmt: String,
    lvl_text: String,
    indent_left: f32,
    indent_hanging: f32,
}

#[derive(Default)]
struct NumberingInfo {
    abstract_nums: HashMap<String, HashMap<u8, LevelDef>>,
    num_to_abstract: HashMap<String, String>,
}

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const WPD_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";

const EMU_PER_PT: f32 = 12700.0;

fn twips_to_pts(twips: f32) -> f32 {
    twips / 20.0
}

pub(crate) fn parse_hex_color(val: &str) -> Option<[u8; 3]> {
    if val == "auto" || val.len() != 6 || !val.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&val[0..2], 16).ok()?;
    let g = u8::from_str_radix(&val[2..4], 16).ok()?;
    let b = u8::from_str_radix(&val[4..6], 16).ok()?;
    Some([r, g, b])
}

fn is_wml(node: roxmltree::Node, name: &str) -> bool {
    node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children().find(|n| is_wml(*n, name))
}

fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

fn twips_attr(node: roxmltree::Node, attr: &str) -> Option<f32> {
    node.attribute((WML_NS, attr))
        .and_then(|v| v.parse::<f32>().ok())
        .map(twips_to_pts)
}

fn half_points(node: roxmltree::Node) -> Option<f32> {
    wml_attr(node, "sz")
        .and_then(|v| v.parse::<f32>().ok())
        .map(|hp| hp / 2.0)
}

/// On/off properties such as `w:b`: present means on unless `w:val` says otherwise.
fn toggle(node: roxmltree::Node, name: &str) -> Option<bool> {
    wml(node, name).map(|n| {
        !matches!(
            n.attribute((WML_NS, "val")),
            Some("0" | "false" | "off")
        )
    })
}

fn latin_typeface<'a>(node: roxmltree::Node<'a, 'a>) -> Option<&'a str> {
    node.children()
        .find(|n| n.tag_name().name() == "latin" && n.tag_name().namespace() == Some(DML_NS))
        .and_then(|n| n.attribute("typeface"))
        .filter(|tf| !tf.is_empty())
}

/// Read access to the parts of an OPC package.
struct Package<R: Read + Seek> {
    zip: zip::ZipArchive<R>,
}

impl<R: Read + Seek> Package<R> {
    fn part_text(&mut self, name: &str) -> Option<String> {
        let mut file = self.zip.by_name(name).ok()?;
        let mut content = String::new();
        file.read_to_string(&mut content).ok()?;
        Some(content)
    }

    fn part_bytes(&mut self, name: &str) -> Option<Vec<u8>> {
        let mut file = self.zip.by_name(name).ok()?;
        let mut content = Vec::new();
        file.read_to_end(&mut content).ok()?;
        Some(content)
    }

    fn first_part_matching(&self, prefix: &str, suffix: &str) -> Option<String> {
        self.zip
            .file_names()
            .find(|n| n.starts_with(prefix) && n.ends_with(suffix))
            .map(str::to_string)
    }
}

struct ThemeFonts {
    major: String,
    minor: String,
}

fn parse_theme<R: Read + Seek>(pkg: &mut Package<R>) -> ThemeFonts {
    let mut fonts = ThemeFonts {
        major: String::from("Calibri Light"),
        minor: String::from("Calibri"),
    };
    let Some(content) = pkg
        .first_part_matching("word/theme/", ".xml")
        .and_then(|name| pkg.part_text(&name))
    else {
        return fonts;
    };
    let Ok(xml) = roxmltree::Document::parse(&content) else {
        return fonts;
    };

    for node in xml.descendants() {
        if node.tag_name().namespace() != Some(DML_NS) {
            continue;
        }
        match node.tag_name().name() {
            "majorFont" => {
                if let Some(tf) = latin_typeface(node) {
                    fonts.major = tf.to_string();
                }
            }
            "minorFont" => {
                if let Some(tf) = latin_typeface(node) {
                    fonts.minor = tf.to_string();
                }
            }
            _ => {}
        }
    }
    fonts
}

fn resolve_font(rfonts: roxmltree::Node, theme: &ThemeFonts, default_font: &str) -> String {
    if let Some(f) = rfonts.attribute((WML_NS, "ascii")) {
        return f.to_string();
    }
    match rfonts.attribute((WML_NS, "asciiTheme")) {
        Some("majorHAnsi") => theme.major.clone(),
        Some("minorHAnsi") => theme.minor.clone(),
        _ => default_font.to_string(),
    }
}

struct StyleDefaults {
    font_size: f32,
    font_name: String,
    space_after: f32,
    line_spacing: f32, // multiplier from w:spacing @line / 240
}

#[derive(Default)]
struct ParagraphStyle {
    font_size: Option<f32>,
    font_name: Option<String>,
    color: Option<[u8; 3]>,
    bold: bool,
    italic: bool,
    space_before: f32,
    space_after: Option<f32>,
    alignment: Option<Alignment>,
    indent_left: Option<f32>,
    contextual_spacing: bool,
    keep_next: bool,
}

struct StylesInfo {
    defaults: StyleDefaults,
    paragraph_styles: HashMap<String, ParagraphStyle>,
}

fn parse_alignment(val: &str) -> Alignment {
    match val {
        "center" => Alignment::Center,
        "right" | "end" => Alignment::Right,
        "both" | "distribute" => Alignment::Justify,
        _ => Alignment::Left,
    }
}

fn parse_styles<R: Read + Seek>(pkg: &mut Package<R>, theme: &ThemeFonts) -> StylesInfo {
    let mut info = StylesInfo {
        defaults: StyleDefaults {
            font_size: 11.0,
            font_name: theme.minor.clone(),
            space_after: 8.0,
            line_spacing: 1.08,
        },
        paragraph_styles: HashMap::new(),
    };

    let Some(content) = pkg.part_text("word/styles.xml") else {
        return info;
    };
    let Ok(xml) = roxmltree::Document::parse(&content) else {
        log::warn!("word/styles.xml is not well-formed, using built-in defaults");
        return info;
    };
    let root = xml.root_element();
    let defaults = &mut info.defaults;

    if let Some(doc_defaults) = wml(root, "docDefaults") {
        if let Some(rpr) = wml(doc_defaults, "rPrDefault").and_then(|n| wml(n, "rPr")) {
            if let Some(size) = half_points(rpr) {
                defaults.font_size = size;
            }
            if let Some(rfonts) = wml(rpr, "rFonts") {
                defaults.font_name = resolve_font(rfonts, theme, &theme.minor);
            }
        }
        let default_spacing = wml(doc_defaults, "pPrDefault")
            .and_then(|n| wml(n, "pPr"))
            .and_then(|n| wml(n, "spacing"));
        if let Some(spacing) = default_spacing {
            if let Some(after) = twips_attr(spacing, "after") {
                defaults.space_after = after;
            }
            if let Some(line) = spacing
                .attribute((WML_NS, "line"))
                .and_then(|v| v.parse::<f32>().ok())
            {
                defaults.line_spacing = line / 240.0;
            }
        }
    }

    for style_node in root.children().filter(|n| is_wml(*n, "style")) {
        if style_node.attribute((WML_NS, "type")) != Some("paragraph") {
            continue;
        }
        let Some(style_id) = style_node.attribute((WML_NS, "styleId")) else {
            continue;
        };

        let ppr = wml(style_node, "pPr");
        let spacing = ppr.and_then(|n| wml(n, "spacing"));
        let rpr = wml(style_node, "rPr");

        let style = ParagraphStyle {
            font_size: rpr.and_then(half_points),
            font_name: rpr
                .and_then(|n| wml(n, "rFonts"))
                .map(|rfonts| resolve_font(rfonts, theme, &info.defaults.font_name)),
            color: rpr
                .and_then(|n| wml_attr(n, "color"))
                .and_then(parse_hex_color),
            bold: rpr.and_then(|n| toggle(n, "b")).unwrap_or(false),
            italic: rpr.and_then(|n| toggle(n, "i")).unwrap_or(false),
            space_before: spacing
                .and_then(|n| twips_attr(n, "before"))
                .unwrap_or(0.0),
            space_after: spacing.and_then(|n| twips_attr(n, "after")),
            alignment: ppr.and_then(|n| wml_attr(n, "jc")).map(parse_alignment),
            indent_left: ppr
                .and_then(|n| wml(n, "ind"))
                .and_then(|n| twips_attr(n, "left")),
            contextual_spacing: ppr.and_then(|n| toggle(n, "contextualSpacing")).unwrap_or(false),
            keep_next: ppr.and_then(|n| toggle(n, "keepNext")).unwrap_or(false),
        };
        info.paragraph_styles.insert(style_id.to_string(), style);
    }

    info
}

fn parse_numbering<R: Read + Seek>(pkg: &mut Package<R>) -> NumberingInfo {
    let mut numbering = NumberingInfo::default();

    let Some(content) = pkg.part_text("word/numbering.xml") else {
        return numbering;
    };
    let Ok(xml) = roxmltree::Document::parse(&content) else {
        return numbering;
    };

    for node in xml.root_element().children() {
        if is_wml(node, "abstractNum") {
            let Some(abs_id) = node.attribute((WML_NS, "abstractNumId")) else {
                continue;
            };
            let mut levels = HashMap::new();
            for lvl in node.children().filter(|n| is_wml(*n, "lvl")) {
                let Some(ilvl) = lvl
                    .attribute((WML_NS, "ilvl"))
                    .and_then(|v| v.parse::<u8>().ok())
                else {
                    continue;
                };
                let ind = wml(lvl, "pPr").and_then(|ppr| wml(ppr, "ind"));
                levels.insert(
                    ilvl,
                    LevelDef {
                        num_fmt: wml_attr(lvl, "numFmt").unwrap_or("bullet").to_string(),
                        lvl_text: wml_attr(lvl, "lvlText").unwrap_or("").to_string(),
                        indent_left: ind.and_then(|n| twips_attr(n, "left")).unwrap_or(0.0),
                        indent_hanging: ind
                            .and_then(|n| twips_attr(n, "hanging"))
                            .unwrap_or(0.0),
                    },
                );
            }
            numbering.abstract_nums.insert(abs_id.to_string(), levels);
        } else if is_wml(node, "num") {
            let Some(num_id) = node.attribute((WML_NS, "numId")) else {
                continue;
            };
            if let Some(abs_id) = wml_attr(node, "abstractNumId") {
                numbering
                    .num_to_abstract
                    .insert(num_id.to_string(), abs_id.to_string());
            }
        }
    }

    numbering
}

/// Relationship id -> package part name for the main document part.
fn parse_relationships<R: Read + Seek>(pkg: &mut Package<R>) -> HashMap<String, String> {
    let mut rels = HashMap::new();
    let Some(content) = pkg.part_text("word/_rels/document.xml.rels") else {
        return rels;
    };
    let Ok(xml) = roxmltree::Document::parse(&content) else {
        return rels;
    };
    for node in xml.descendants().filter(|n| n.tag_name().name() == "Relationship") {
        if node.attribute("TargetMode") == Some("External") {
            continue;
        }
        let (Some(id), Some(target)) = (node.attribute("Id"), node.attribute("Target")) else {
            continue;
        };
        let part = match target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("word/{target}"),
        };
        rels.insert(id.to_string(), part);
    }
    rels
}

fn parse_title<R: Read + Seek>(pkg: &mut Package<R>) -> Option<String> {
    let content = pkg.part_text("docProps/core.xml")?;
    let xml = roxmltree::Document::parse(&content).ok()?;
    xml.descendants()
        .find(|n| n.tag_name().name() == "title" && n.tag_name().namespace() == Some(DC_NS))
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub fn parse(path: &Path) -> Result<Document, Error> {
    let file = std::fs::File::open(path)?;
    parse_reader(file)
}

pub(crate) fn parse_reader<R: Read + Seek>(reader: R) -> Result<Document, Error> {
    let mut pkg = Package {
        zip: zip::ZipArchive::new(reader)?,
    };

    let theme = parse_theme(&mut pkg);
    let styles = parse_styles(&mut pkg, &theme);
    let numbering = parse_numbering(&mut pkg);
    let rels = parse_relationships(&mut pkg);
    let title = parse_title(&mut pkg);

    let xml_content = pkg
        .part_text("word/document.xml")
        .ok_or_else(|| Error::InvalidDocx("missing word/document.xml".into()))?;
    let xml = roxmltree::Document::parse(&xml_content)?;
    let body = wml(xml.root_element(), "body")
        .ok_or_else(|| Error::InvalidDocx("missing w:body".into()))?;

    let sect = wml(body, "sectPr");
    let pg_sz = sect.and_then(|s| wml(s, "pgSz"));
    let pg_mar = sect.and_then(|s| wml(s, "pgMar"));

    let mut paragraphs = Vec::new();
    let mut counters: HashMap<(String, u8), u32> = HashMap::new();
    let mut pending_breaks = 0;

    for node in body.children().filter(|n| is_wml(*n, "p")) {
        let mut para = parse_paragraph(node, &styles, &numbering, &mut counters);
        let content = collect_content(node, &para, &styles, &theme, &rels, &mut pkg);

        para.page_breaks = pending_breaks;
        para.runs = content.runs;
        para.image = content.image;
        pending_breaks = content.page_breaks;

        // A paragraph holding only page breaks does not occupy a line.
        if content.page_breaks > 0 && para.runs.is_empty() && para.image.is_none() {
            pending_breaks += para.page_breaks;
            continue;
        }
        paragraphs.push(para);
    }
    if pending_breaks > 0 {
        // Trailing breaks still open the pages they start.
        let mut para = parse_paragraph(body, &styles, &numbering, &mut counters);
        para.page_breaks = pending_breaks;
        paragraphs.push(para);
    }

    Ok(Document {
        title,
        page_width: pg_sz.and_then(|n| twips_attr(n, "w")).unwrap_or(612.0),
        page_height: pg_sz.and_then(|n| twips_attr(n, "h")).unwrap_or(792.0),
        margin_top: pg_mar.and_then(|n| twips_attr(n, "top")).unwrap_or(72.0),
        margin_bottom: pg_mar.and_then(|n| twips_attr(n, "bottom")).unwrap_or(72.0),
        margin_left: pg_mar.and_then(|n| twips_attr(n, "left")).unwrap_or(72.0),
        margin_right: pg_mar.and_then(|n| twips_attr(n, "right")).unwrap_or(72.0),
        line_spacing: styles.defaults.line_spacing,
        paragraphs,
    })
}

/// Paragraph-level properties, with runs left empty.
fn parse_paragraph(
    node: roxmltree::Node,
    styles: &StylesInfo,
    numbering: &NumberingInfo,
    counters: &mut HashMap<(String, u8), u32>,
) -> Paragraph {
    let ppr = wml(node, "pPr");
    let style_id = ppr.and_then(|ppr| wml_attr(ppr, "pStyle"));
    let style = style_id.and_then(|id| styles.paragraph_styles.get(id));
    let spacing = ppr.and_then(|ppr| wml(ppr, "spacing"));

    let space_before = spacing
        .and_then(|n| twips_attr(n, "before"))
        .or_else(|| style.map(|s| s.space_before))
        .unwrap_or(0.0);
    let space_after = spacing
        .and_then(|n| twips_attr(n, "after"))
        .or_else(|| style.and_then(|s| s.space_after))
        .unwrap_or(styles.defaults.space_after);
    let line_spacing = spacing
        .filter(|n| matches!(n.attribute((WML_NS, "lineRule")), None | Some("auto")))
        .and_then(|n| n.attribute((WML_NS, "line")))
        .and_then(|v| v.parse::<f32>().ok())
        .map(|line| line / 240.0);

    let alignment = ppr
        .and_then(|ppr| wml_attr(ppr, "jc"))
        .map(parse_alignment)
        .or_else(|| style.and_then(|s| s.alignment))
        .unwrap_or(Alignment::Left);

    let contextual_spacing = ppr
        .and_then(|ppr| toggle(ppr, "contextualSpacing"))
        .unwrap_or_else(|| style.is_some_and(|s| s.contextual_spacing));

    let num_pr = ppr.and_then(|ppr| wml(ppr, "numPr"));
    let (mut indent_left, mut indent_hanging, list_label) =
        parse_list_info(num_pr, numbering, counters);
    if let Some(v) = style.and_then(|s| s.indent_left) {
        indent_left = v;
    }

    // Paragraph-level w:ind overrides level def
    if let Some(ind) = ppr.and_then(|ppr| wml(ppr, "ind")) {
        if let Some(v) = twips_attr(ind, "left") {
            indent_left = v;
        }
        if let Some(v) = twips_attr(ind, "hanging") {
            indent_hanging = v;
        }
    }

    let mark_rpr = ppr.and_then(|ppr| wml(ppr, "rPr"));
    let mark_font_size = mark_rpr
        .and_then(half_points)
        .or_else(|| style.and_then(|s| s.font_size))
        .unwrap_or(styles.defaults.font_size);
    let mark_font_name = style
        .and_then(|s| s.font_name.clone())
        .unwrap_or_else(|| styles.defaults.font_name.clone());

    Paragraph {
        runs: Vec::new(),
        style_id: style_id.map(str::to_string),
        space_before,
        space_after,
        alignment,
        indent_left,
        indent_hanging,
        list_label,
        contextual_spacing,
        page_break_before: ppr
            .and_then(|ppr| toggle(ppr, "pageBreakBefore"))
            .unwrap_or(false),
        page_breaks: 0,
        keep_next: ppr
            .and_then(|ppr| toggle(ppr, "keepNext"))
            .unwrap_or_else(|| style.is_some_and(|s| s.keep_next)),
        line_spacing,
        mark_font_size,
        mark_font_name,
        image: None,
    }
}

struct ParagraphContent {
    runs: Vec<Run>,
    image: Option<EmbeddedImage>,
    page_breaks: usize,
}

fn collect_content<R: Read + Seek>(
    node: roxmltree::Node,
    para: &Paragraph,
    styles: &StylesInfo,
    theme: &ThemeFonts,
    rels: &HashMap<String, String>,
    pkg: &mut Package<R>,
) -> ParagraphContent {
    let style = para
        .style_id
        .as_deref()
        .and_then(|id| styles.paragraph_styles.get(id));
    let style_font_size = style
        .and_then(|s| s.font_size)
        .unwrap_or(styles.defaults.font_size);
    let style_color = style.and_then(|s| s.color);

    let mut content = ParagraphContent {
        runs: Vec::new(),
        image: None,
        page_breaks: 0,
    };

    // Runs may sit directly under w:p or inside a w:hyperlink.
    let run_nodes = node.children().flat_map(|child| {
        if is_wml(child, "hyperlink") {
            child.children().filter(|n| is_wml(*n, "r")).collect::<Vec<_>>()
        } else if is_wml(child, "r") {
            vec![child]
        } else {
            Vec::new()
        }
    });

    for run_node in run_nodes {
        let rpr = wml(run_node, "rPr");

        let mut text = String::new();
        for child in run_node.children() {
            if child.tag_name().namespace() != Some(WML_NS) {
                continue;
            }
            match child.tag_name().name() {
                "t" => text.push_str(child.text().unwrap_or("")),
                "tab" => text.push(' '),
                "br" if child.attribute((WML_NS, "type")) == Some("page") => {
                    content.page_breaks += 1;
                }
                "br" | "cr" => text.push('\n'),
                "drawing" => {
                    if let Some(image) = load_drawing(child, rels, pkg) {
                        content.image = Some(image);
                    }
                }
                _ => {}
            }
        }
        if text.is_empty() {
            continue;
        }

        content.runs.push(Run {
            text,
            font_size: rpr.and_then(half_points).unwrap_or(style_font_size),
            font_name: rpr
                .and_then(|n| wml(n, "rFonts"))
                .map(|rfonts| resolve_font(rfonts, theme, &para.mark_font_name))
                .unwrap_or_else(|| para.mark_font_name.clone()),
            bold: rpr
                .and_then(|n| toggle(n, "b"))
                .unwrap_or_else(|| style.is_some_and(|s| s.bold)),
            italic: rpr
                .and_then(|n| toggle(n, "i"))
                .unwrap_or_else(|| style.is_some_and(|s| s.italic)),
            color: rpr
                .and_then(|n| wml_attr(n, "color"))
                .and_then(parse_hex_color)
                .or(style_color),
        });
    }

    content
}

fn load_drawing<R: Read + Seek>(
    drawing: roxmltree::Node,
    rels: &HashMap<String, String>,
    pkg: &mut Package<R>,
) -> Option<EmbeddedImage> {
    let container = drawing.children().find(|n| {
        matches!(n.tag_name().name(), "inline" | "anchor")
            && n.tag_name().namespace() == Some(WPD_NS)
    })?;
    let extent = container
        .children()
        .find(|n| n.tag_name().name() == "extent" && n.tag_name().namespace() == Some(WPD_NS))?;
    let emu = |attr: &str| extent.attribute(attr).and_then(|v| v.parse::<f32>().ok());
    let (cx, cy) = (emu("cx")?, emu("cy")?);

    let rel_id = container
        .descendants()
        .find(|n| n.tag_name().name() == "blip" && n.tag_name().namespace() == Some(DML_NS))
        .and_then(|n| n.attribute((REL_NS, "embed")))?;
    let Some(data) = rels.get(rel_id).and_then(|part| pkg.part_bytes(part)) else {
        log::warn!("Image relationship {rel_id} has no media part, skipping");
        return None;
    };

    Some(EmbeddedImage {
        data,
        display_width: cx / EMU_PER_PT,
        display_height: cy / EMU_PER_PT,
    })
}

fn parse_list_info(
    num_pr: Option<roxmltree::Node>,
    numbering: &NumberingInfo,
    counters: &mut HashMap<(String, u8), u32>,
) -> (f32, f32, String) {
    let none = (0.0, 0.0, String::new());
    let Some(num_pr) = num_pr else {
        return none;
    };
    let Some(num_id) = wml_attr(num_pr, "numId") else {
        return none;
    };
    let ilvl = wml_attr(num_pr, "ilvl")
        .and_then(|v| v.parse::<u8>().ok())
        .unwrap_or(0);

    let Some(def) = numbering
        .num_to_abstract
        .get(num_id)
        .and_then(|abs_id| numbering.abstract_nums.get(abs_id))
        .and_then(|levels| levels.get(&ilvl))
    else {
        return none;
    };

    let counter = counters
        .entry((num_id.to_string(), ilvl))
        .and_modify(|c| *c += 1)
        .or_insert(1);
    let label = if def.num_fmt == "bullet" {
        "\u{2022}".to_string()
    } else {
        def.lvl_text.replace(&format!("%{}", ilvl + 1), &counter.to_string())
    };
    (def.indent_left, def.indent_hanging, label)
}
