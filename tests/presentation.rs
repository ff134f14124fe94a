use std::fs::File;
use std::io::Read;
use std::path::Path;

use simred_deck::{DOCX_FILE_NAME, content};

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

fn write_diagram(root: &Path, name: &str, width: u32, height: u32) {
    let dir = root.join("diagramas");
    std::fs::create_dir_all(&dir).unwrap();
    image::RgbImage::from_pixel(width, height, image::Rgb([0, 102, 204]))
        .save(dir.join(name))
        .unwrap();
}

fn read_part(docx: &Path, name: &str) -> String {
    let mut zip = zip::ZipArchive::new(File::open(docx).unwrap()).unwrap();
    let mut xml = String::new();
    zip.by_name(name).unwrap().read_to_string(&mut xml).unwrap();
    xml
}

fn media_parts(docx: &Path) -> Vec<String> {
    let zip = zip::ZipArchive::new(File::open(docx).unwrap()).unwrap();
    zip.file_names()
        .filter(|n| n.starts_with("word/media/"))
        .map(String::from)
        .collect()
}

/// Paragraph texts of word/document.xml, with w:br rendered as '\n'.
fn paragraph_texts(document_xml: &str) -> Vec<String> {
    let xml = roxmltree::Document::parse(document_xml).unwrap();
    xml.descendants()
        .filter(|n| n.tag_name().name() == "p" && n.tag_name().namespace() == Some(WML_NS))
        .map(|p| {
            p.descendants()
                .filter_map(|n| match n.tag_name().name() {
                    "t" => n.text().map(String::from),
                    "br" if n.attribute((WML_NS, "type")).is_none() => Some("\n".into()),
                    _ => None,
                })
                .collect()
        })
        .collect()
}

#[test]
fn build_writes_document_at_requested_path() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join(DOCX_FILE_NAME);

    let written = simred_deck::build_presentation(dir.path(), &output).unwrap();

    assert_eq!(written, output);
    assert!(output.is_file());
    let texts = paragraph_texts(&read_part(&output, "word/document.xml"));
    assert_eq!(texts.first().map(String::as_str), Some("SIM-RED EXTENDIDO"));
    assert!(texts.iter().any(|t| t == "Calificación estimada: 95-100/100"));
    assert!(texts.iter().any(|t| t == "¡Éxito en tu presentación! 🚀"));
}

#[test]
fn missing_diagrams_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.docx");

    simred_deck::build_presentation(dir.path(), &output).unwrap();

    assert!(media_parts(&output).is_empty());
    let document = read_part(&output, "word/document.xml");
    assert!(!document.contains("<w:drawing>"));
    // Captions are kept even without their diagram.
    assert!(document.contains("Este diagrama ilustra el flujo de ejecución"));
}

#[test]
fn present_diagrams_are_embedded() {
    let dir = tempfile::tempdir().unwrap();
    write_diagram(dir.path(), "flujo_trabajo.png", 300, 150);
    write_diagram(dir.path(), "estructura_archivos.png", 200, 200);
    let output = dir.path().join("out.docx");

    simred_deck::build_presentation(dir.path(), &output).unwrap();

    assert_eq!(media_parts(&output).len(), 2);
    let document = read_part(&output, "word/document.xml");
    assert_eq!(document.matches("<w:drawing>").count(), 2);
    // 6.0 in wide, 2:1 aspect ratio, in EMU
    assert!(document.contains(r#"<wp:extent cx="5486400" cy="2743200"/>"#));
    let rels = read_part(&output, "word/_rels/document.xml.rels");
    assert!(rels.contains(r#"Target="media/image1.png""#));
    assert!(rels.contains(r#"Target="media/image2.png""#));
}

#[test]
fn question_answers_use_line_breaks() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.docx");

    simred_deck::build_presentation(dir.path(), &output).unwrap();

    let texts = paragraph_texts(&read_part(&output, "word/document.xml"));
    let answer = texts
        .iter()
        .find(|t| t.starts_with("P6:"))
        .expect("question P6 written");
    assert!(answer.starts_with("P6: ¿Cómo funciona el sistema de logs?\n\nR: Cada módulo"));
}

#[test]
fn styles_and_numbering_are_declared() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.docx");

    simred_deck::build_presentation(dir.path(), &output).unwrap();

    let styles = read_part(&output, "word/styles.xml");
    for id in ["Title", "Heading1", "Heading2", "Heading3", "ListBullet", "ListNumber", "IntenseQuote"] {
        assert!(styles.contains(&format!(r#"w:styleId="{id}""#)), "missing style {id}");
    }
    assert!(styles.contains(r#"w:ascii="Calibri""#));
    assert!(styles.contains(r#"<w:sz w:val="22"/>"#));

    let document = read_part(&output, "word/document.xml");
    assert_eq!(document.matches(r#"<w:br w:type="page"/>"#).count(), 15);
    assert_eq!(document.matches(r#"<w:numId w:val="2"/>"#).count(), 4);
    assert_eq!(document.matches(r#"<w:numId w:val="1"/>"#).count(), 24);
}

#[test]
fn core_properties_carry_the_title() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.docx");

    simred_deck::build_presentation(dir.path(), &output).unwrap();

    let core = read_part(&output, "docProps/core.xml");
    assert!(core.contains(&format!("<dc:title>{}</dc:title>", content::TITLE)));
}

#[test]
fn build_fails_for_unwritable_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("no-such-dir").join("out.docx");

    let err = simred_deck::build_presentation(dir.path(), &output).unwrap_err();

    assert!(matches!(err, simred_deck::Error::Io(_)));
}
