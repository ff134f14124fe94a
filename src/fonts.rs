use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use pdf_writer::{Name, Pdf, Rect, Ref};
use ttf_parser::Face;

/// Directories listed here (`:`-separated, `;` on Windows) are searched
/// before the platform font directories.
pub const FONTS_ENV: &str = "SIMRED_FONTS";

pub(crate) struct FontEntry {
    pub(crate) pdf_name: String,
    pub(crate) font_ref: Ref,
    widths_1000: Vec<f32>, // WinAnsi 32..=255
    pub(crate) line_h_ratio: f32,
    pub(crate) ascender_ratio: f32,
}

impl FontEntry {
    /// Advance width in points of WinAnsi-encoded `bytes` at `size`.
    pub(crate) fn text_width(&self, bytes: &[u8], size: f32) -> f32 {
        let units: f32 = bytes
            .iter()
            .filter(|&&b| b >= 32)
            .map(|&b| self.widths_1000.get(usize::from(b - 32)).copied().unwrap_or(0.0))
            .sum();
        units * size / 1000.0
    }
}

/// (lowercase family name, bold, italic) -> font file
type FontLookup = HashMap<(String, bool, bool), PathBuf>;

static FONT_INDEX: OnceLock<FontLookup> = OnceLock::new();

fn font_family_name(face: &Face) -> Option<String> {
    // ID 1 (Family) keeps "Calibri Light" apart from "Calibri".
    face.names()
        .into_iter()
        .filter(|name| name.name_id == ttf_parser::name_id::FAMILY && name.is_unicode())
        .find_map(|name| name.to_string())
}

/// Collections and CFF-flavoured OpenType cannot be embedded as `FontFile2`.
fn has_truetype_outlines(data: &[u8]) -> bool {
    matches!(data.get(..4), Some(&[0, 1, 0, 0]) | Some(b"true"))
        && Face::parse(data, 0).is_ok_and(|face| face.tables().glyf.is_some())
}

fn read_font_style(data: &[u8]) -> Option<(String, bool, bool)> {
    let face = Face::parse(data, 0).ok()?;
    let family = font_family_name(&face)?;
    Some((family, face.is_bold(), face.is_italic()))
}

fn font_directories() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    if let Ok(val) = std::env::var(FONTS_ENV) {
        let sep = if cfg!(windows) { ';' } else { ':' };
        dirs.extend(
            val.split(sep)
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(PathBuf::from),
        );
    }

    #[cfg(target_os = "macos")]
    {
        dirs.extend([
            "/Applications/Microsoft Word.app/Contents/Resources/DFonts".into(),
            "/Library/Fonts".into(),
            "/Library/Fonts/Microsoft".into(),
            "/System/Library/Fonts".into(),
            "/System/Library/Fonts/Supplemental".into(),
        ]);
    }

    #[cfg(target_os = "linux")]
    {
        dirs.extend([
            "/usr/share/fonts".into(),
            "/usr/local/share/fonts".into(),
        ]);
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join(".local/share/fonts"));
        }
    }

    #[cfg(target_os = "windows")]
    {
        match std::env::var("WINDIR") {
            Ok(windir) => dirs.push(PathBuf::from(windir).join("Fonts")),
            Err(_) => dirs.push("C:\\Windows\\Fonts".into()),
        }
    }

    dirs
}

fn scan_font_dirs() -> FontLookup {
    let mut index = FontLookup::new();

    let mut stack = font_directories();
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if !matches!(
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase)
                    .as_deref(),
                Some("ttf" | "otf")
            ) {
                continue;
            }
            let Ok(data) = std::fs::read(&path) else {
                continue;
            };
            if !has_truetype_outlines(&data) {
                log::debug!("Skipping {}: not a TrueType-outline font", path.display());
                continue;
            }
            if let Some((family, bold, italic)) = read_font_style(&data) {
                index.entry((family.to_lowercase(), bold, italic)).or_insert(path);
            }
        }
    }
    log::debug!("Indexed {} font faces", index.len());
    index
}

/// Look up a font file by family name and style.
/// Falls back to the regular variant if the requested bold/italic is not available.
fn find_font_file(font_name: &str, bold: bool, italic: bool) -> Option<PathBuf> {
    let index = FONT_INDEX.get_or_init(scan_font_dirs);
    let key = font_name.to_lowercase();
    index
        .get(&(key.clone(), bold, italic))
        .or_else(|| (bold || italic).then(|| index.get(&(key, false, false))).flatten())
        .cloned()
}

/// WinAnsi (Windows-1252) code for bytes 0x80-0x9F, indexed by `byte - 0x80`.
/// Unassigned slots hold '\0'.
const WINANSI_HIGH: [char; 32] = [
    '\u{20AC}', '\0', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\0', '\u{017D}', '\0',
    '\0', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\0', '\u{017E}', '\u{0178}',
];

fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => WINANSI_HIGH[usize::from(byte - 0x80)],
        _ => char::from(byte),
    }
}

/// WinAnsi byte for `c`, or `None` when the encoding cannot represent it.
pub(crate) fn winansi_byte(c: char) -> Option<u8> {
    match u32::from(c) {
        0x20..=0x7E | 0xA0..=0xFF => u8::try_from(u32::from(c)).ok(),
        _ => WINANSI_HIGH
            .iter()
            .position(|&h| h != '\0' && h == c)
            .and_then(|i| u8::try_from(0x80 + i).ok()),
    }
}

/// Convert a UTF-8 string to WinAnsi bytes for PDF `Str` encoding,
/// dropping characters the encoding cannot represent.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars().filter_map(winansi_byte).collect()
}

/// Approximate Helvetica widths at 1000 units/em for WinAnsi chars 32..=255.
fn helvetica_widths(bold: bool) -> Vec<f32> {
    let scale = if bold { 1.05 } else { 1.0 };
    (32u8..=255u8)
        .map(|b| {
            let w = match b {
                32 => 278.0,                          // space
                33..=47 => 333.0,                     // punctuation
                48..=57 => 556.0,                     // digits
                58..=64 => 333.0,                     // more punctuation
                73 | 74 => 278.0,                     // I J
                77 => 833.0,                          // M
                65..=90 => 667.0,                     // uppercase A-Z
                91..=96 => 333.0,                     // brackets etc.
                102 | 105 | 106 | 108 | 116 => 278.0, // f i j l t
                109 | 119 => 833.0,                   // m w
                97..=122 => 556.0,                    // lowercase a-z
                0x95 => 350.0,                        // bullet
                _ => 556.0,
            };
            w * scale
        })
        .collect()
}

fn helvetica_variant(bold: bool, italic: bool) -> &'static [u8] {
    match (bold, italic) {
        (true, true) => b"Helvetica-BoldOblique",
        (true, false) => b"Helvetica-Bold",
        (false, true) => b"Helvetica-Oblique",
        (false, false) => b"Helvetica",
    }
}

struct Metrics {
    widths: Vec<f32>,
    line_h_ratio: f32,
    ascender_ratio: f32,
}

/// Embed a TrueType font file (raw bytes) into the PDF.
fn embed_truetype(
    pdf: &mut Pdf,
    font_ref: Ref,
    alloc: &mut Ref,
    font_name: &str,
    font_data: &[u8],
) -> Option<Metrics> {
    let face = Face::parse(font_data, 0).ok()?;
    let descriptor_ref = alloc.bump();
    let data_ref = alloc.bump();

    let units = f32::from(face.units_per_em());
    let to_1000 = |v: f32| v / units * 1000.0;
    let cap_height = face
        .capital_height()
        .map(|h| to_1000(f32::from(h)))
        .unwrap_or(700.0);

    let bb = face.global_bounding_box();
    let bbox = Rect::new(
        to_1000(f32::from(bb.x_min)),
        to_1000(f32::from(bb.y_min)),
        to_1000(f32::from(bb.x_max)),
        to_1000(f32::from(bb.y_max)),
    );

    let widths: Vec<f32> = (32u8..=255u8)
        .map(|byte| {
            face.glyph_index(winansi_to_char(byte))
                .and_then(|gid| face.glyph_hor_advance(gid))
                .map(|adv| to_1000(f32::from(adv)))
                .unwrap_or(0.0)
        })
        .collect();

    let data_len = i32::try_from(font_data.len()).ok()?;
    pdf.stream(data_ref, font_data)
        .pair(Name(b"Length1"), data_len);

    let ps_name = font_name.replace(' ', "");

    pdf.font_descriptor(descriptor_ref)
        .name(Name(ps_name.as_bytes()))
        .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
        .bbox(bbox)
        .italic_angle(if face.is_italic() { -12.0 } else { 0.0 })
        .ascent(to_1000(f32::from(face.ascender())))
        .descent(to_1000(f32::from(face.descender())))
        .cap_height(cap_height)
        .stem_v(if face.is_bold() { 140.0 } else { 80.0 })
        .font_file2(data_ref);

    {
        let mut d = pdf.indirect(font_ref).dict();
        d.pair(Name(b"Type"), Name(b"Font"));
        d.pair(Name(b"Subtype"), Name(b"TrueType"));
        d.pair(Name(b"BaseFont"), Name(ps_name.as_bytes()));
        d.pair(Name(b"Encoding"), Name(b"WinAnsiEncoding"));
        d.pair(Name(b"FirstChar"), 32i32);
        d.pair(Name(b"LastChar"), 255i32);
        d.pair(Name(b"FontDescriptor"), descriptor_ref);
        d.insert(Name(b"Widths"))
            .array()
            .items(widths.iter().copied());
    }

    let ascender = f32::from(face.ascender());
    let line_h = ascender - f32::from(face.descender()) + f32::from(face.line_gap());
    Some(Metrics {
        widths,
        line_h_ratio: line_h / units,
        ascender_ratio: ascender / units,
    })
}

pub(crate) fn primary_font_name(name: &str) -> &str {
    name.split(';').next().unwrap_or(name).trim()
}

/// Fonts written to the PDF so far, one entry per family and style.
#[derive(Default)]
pub(crate) struct FontRegistry {
    entries: Vec<FontEntry>,
    by_key: HashMap<(String, bool, bool), usize>,
}

impl FontRegistry {
    pub(crate) fn entries(&self) -> &[FontEntry] {
        &self.entries
    }

    pub(crate) fn get(&self, index: usize) -> &FontEntry {
        &self.entries[index]
    }

    /// Index of the entry for `font_name`, embedding it on first use.
    pub(crate) fn register(
        &mut self,
        pdf: &mut Pdf,
        alloc: &mut Ref,
        font_name: &str,
        bold: bool,
        italic: bool,
    ) -> usize {
        let family = primary_font_name(font_name);
        let key = (family.to_lowercase(), bold, italic);
        if let Some(&index) = self.by_key.get(&key) {
            return index;
        }

        let font_ref = alloc.bump();
        let metrics = find_font_file(family, bold, italic)
            .and_then(|path| {
                let data = std::fs::read(&path).ok()?;
                embed_truetype(pdf, font_ref, alloc, family, &data)
            })
            .unwrap_or_else(|| {
                log::warn!("Font not found: {family} bold={bold} italic={italic}, using Helvetica");
                pdf.type1_font(font_ref)
                    .base_font(Name(helvetica_variant(bold, italic)))
                    .encoding_predefined(Name(b"WinAnsiEncoding"));
                Metrics {
                    widths: helvetica_widths(bold),
                    line_h_ratio: 1.15,
                    ascender_ratio: 0.905,
                }
            });

        let index = self.entries.len();
        self.entries.push(FontEntry {
            pdf_name: format!("F{}", index + 1),
            font_ref,
            widths_1000: metrics.widths,
            line_h_ratio: metrics.line_h_ratio,
            ascender_ratio: metrics.ascender_ratio,
        });
        self.by_key.insert(key, index);
        index
    }
}
