use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use simred_deck::deck::{Paragraph, Span};
use simred_deck::{Alignment, DOCX_FILE_NAME, Deck, Error, PDF_FILE_NAME};

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

/// Page objects, not counting the /Pages tree node.
fn pdf_page_count(pdf: &[u8]) -> usize {
    count(pdf, b"/Type /Page") - count(pdf, b"/Type /Pages")
}

/// Records every log message so tests can look for their own.
struct CapturingLogger {
    messages: Mutex<Vec<(log::Level, String)>>,
}

impl log::Log for CapturingLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

fn logger() -> &'static CapturingLogger {
    static LOGGER: OnceLock<CapturingLogger> = OnceLock::new();
    let logger = LOGGER.get_or_init(|| CapturingLogger {
        messages: Mutex::new(Vec::new()),
    });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(log::LevelFilter::Debug);
    }
    logger
}

fn errors_mentioning(needle: &str) -> Vec<String> {
    logger()
        .messages
        .lock()
        .unwrap()
        .iter()
        .filter(|(level, message)| *level == log::Level::Error && message.contains(needle))
        .map(|(_, message)| message.clone())
        .collect()
}

/// Writes a package holding only `document_body` inside `w:body`.
fn write_minimal_docx(path: &Path, document_body: &str) {
    let mut zip = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
    zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    write!(
        zip,
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{document_body}</w:body></w:document>"#
    )
    .unwrap();
    zip.finish().unwrap();
}

/// Byte offset of `needle` in `pdf`, which must occur exactly once.
fn position(pdf: &[u8], needle: &[u8]) -> usize {
    let found: Vec<usize> = pdf
        .windows(needle.len())
        .enumerate()
        .filter(|(_, w)| *w == needle)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(found.len(), 1, "{:?}", String::from_utf8_lossy(needle));
    found[0]
}

fn same_page(pdf: &[u8], first: &[u8], second: &[u8]) -> bool {
    let (a, b) = (position(pdf, first), position(pdf, second));
    a < b && count(&pdf[a..b], b"endstream") == 0
}

fn write_diagram(root: &Path, name: &str, image: image::DynamicImage) {
    let dir = root.join("diagramas");
    std::fs::create_dir_all(&dir).unwrap();
    image.save(dir.join(name)).unwrap();
}

#[test]
fn convert_reports_missing_input() {
    logger();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join(DOCX_FILE_NAME);
    let output = dir.path().join(PDF_FILE_NAME);

    assert!(!simred_deck::convert(&input, &output));
    assert!(!output.exists());
    let errors = errors_mentioning(&input.display().to_string());
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("not found"));
}

#[test]
fn convert_logs_conversion_failures() {
    logger();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("roto.docx");
    std::fs::write(&input, b"PK but not really").unwrap();

    assert!(!simred_deck::convert(&input, &dir.path().join("roto.pdf")));

    let errors = errors_mentioning(&input.display().to_string());
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("ZIP error"));
}

#[test]
fn convert_writes_pdf_for_built_presentation() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join(DOCX_FILE_NAME);
    let output = dir.path().join(PDF_FILE_NAME);
    simred_deck::build_presentation(dir.path(), &input).unwrap();

    assert!(simred_deck::convert(&input, &output));

    let pdf = std::fs::read(&output).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    // 15 explicit page breaks, plus any overflow pages
    assert!(pdf_page_count(&pdf) >= 16, "pages: {}", pdf_page_count(&pdf));
    assert_eq!(count(&pdf, b"/Subtype /Image"), 0);
    assert!(count(&pdf, b"(SIM-RED EXTENDIDO)") >= 1);
    // the emoji before the heading text is dropped along with its space
    assert_eq!(count(&pdf, b"(Tabla de Contenidos) Tj"), 1);
    assert_eq!(count(&pdf, b"( Tabla de Contenidos"), 0);
}

#[test]
fn diagrams_become_image_xobjects() {
    let dir = tempfile::tempdir().unwrap();
    write_diagram(
        dir.path(),
        "arquitectura_sistema.png",
        image::RgbImage::from_pixel(64, 32, image::Rgb([0, 51, 102])).into(),
    );
    write_diagram(
        dir.path(),
        "estructura_archivos.png",
        image::RgbaImage::from_pixel(32, 32, image::Rgba([0, 128, 0, 128])).into(),
    );
    let input = dir.path().join(DOCX_FILE_NAME);
    let output = dir.path().join(PDF_FILE_NAME);
    simred_deck::build_presentation(dir.path(), &input).unwrap();

    assert!(simred_deck::convert(&input, &output));

    let pdf = std::fs::read(&output).unwrap();
    // two pictures plus the soft mask of the one with alpha
    assert_eq!(count(&pdf, b"/Subtype /Image"), 3);
    assert_eq!(count(&pdf, b"/SMask"), 1);
    assert_eq!(count(&pdf, b" Do"), 2);
}

#[test]
fn custom_deck_round_trips_text() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("deck.docx");
    let output = dir.path().join("deck.pdf");

    let mut deck = Deck::new("Prueba");
    deck.heading("Hola", 1, Some([0, 51, 102]));
    deck.paragraph(
        Paragraph::new()
            .align(Alignment::Center)
            .span(Span::new("Hola mundo").bold()),
    );
    deck.bullet("uno");
    deck.numbered("dos");
    simred_deck::write_docx(&deck, &input).unwrap();

    simred_deck::convert_docx_to_pdf(&input, &output).unwrap();

    let pdf = std::fs::read(&output).unwrap();
    assert_eq!(pdf_page_count(&pdf), 1);
    assert_eq!(count(&pdf, b"(Hola mundo) Tj"), 1);
    assert_eq!(count(&pdf, b"(1.) Tj"), 1);
    assert_eq!(count(&pdf, b"(Prueba)"), 1);
}

#[test]
fn page_break_starts_new_page() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("deck.docx");
    let output = dir.path().join("deck.pdf");

    let mut deck = Deck::new("Saltos");
    deck.text("primera");
    deck.page_break();
    deck.text("segunda");
    deck.page_break();
    deck.text("tercera");
    simred_deck::write_docx(&deck, &input).unwrap();

    simred_deck::convert_docx_to_pdf(&input, &output).unwrap();

    let pdf = std::fs::read(&output).unwrap();
    assert_eq!(pdf_page_count(&pdf), 3);
}

#[test]
fn consecutive_page_breaks_leave_a_blank_page() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("deck.docx");
    let output = dir.path().join("deck.pdf");

    let mut deck = Deck::new("Saltos");
    deck.text("antes");
    deck.page_break();
    deck.page_break();
    deck.text("despues");
    simred_deck::write_docx(&deck, &input).unwrap();

    simred_deck::convert_docx_to_pdf(&input, &output).unwrap();

    let pdf = std::fs::read(&output).unwrap();
    assert_eq!(pdf_page_count(&pdf), 3);
}

#[test]
fn leading_page_break_keeps_first_page_blank() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("deck.docx");
    let output = dir.path().join("deck.pdf");

    let mut deck = Deck::new("Salto inicial");
    deck.page_break();
    deck.text("contenido");
    simred_deck::write_docx(&deck, &input).unwrap();

    simred_deck::convert_docx_to_pdf(&input, &output).unwrap();

    let pdf = std::fs::read(&output).unwrap();
    assert_eq!(pdf_page_count(&pdf), 2);
}

#[test]
fn headings_stay_with_the_next_paragraph() {
    let dir = tempfile::tempdir().unwrap();
    // Sweep the heading down the page so one layout lands it at the bottom.
    for fillers in 0..40 {
        let input = dir.path().join(format!("deck{fillers}.docx"));
        let output = dir.path().join(format!("deck{fillers}.pdf"));

        let mut deck = Deck::new("Encabezados");
        for _ in 0..fillers {
            deck.text("Relleno");
        }
        deck.heading("Encabezado", 1, None);
        deck.text("Cuerpo");
        simred_deck::write_docx(&deck, &input).unwrap();

        simred_deck::convert_docx_to_pdf(&input, &output).unwrap();

        let pdf = std::fs::read(&output).unwrap();
        assert!(
            same_page(&pdf, b"(Encabezado) Tj", b"(Cuerpo) Tj"),
            "heading split from its paragraph after {fillers} fillers"
        );
    }
}

#[test]
fn jpeg_pictures_are_embedded() {
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("foto.jpg");
    image::RgbImage::from_pixel(40, 20, image::Rgb([200, 10, 10]))
        .save(&photo)
        .unwrap();
    let input = dir.path().join("deck.docx");
    let output = dir.path().join("deck.pdf");

    let mut deck = Deck::new("Foto");
    assert!(deck.picture(&photo, 2.0).unwrap());
    simred_deck::write_docx(&deck, &input).unwrap();

    assert!(simred_deck::convert(&input, &output));

    let pdf = std::fs::read(&output).unwrap();
    assert_eq!(count(&pdf, b"/Subtype /Image"), 1);
    assert_eq!(count(&pdf, b"/SMask"), 0);
}

#[test]
fn malformed_colour_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("color.docx");
    let output = dir.path().join("color.pdf");
    // six bytes, but not six hex digits
    write_minimal_docx(
        &input,
        "<w:p><w:r><w:rPr><w:color w:val=\"a\u{20AC}bc\"/></w:rPr><w:t>Texto</w:t></w:r></w:p>",
    );

    assert!(simred_deck::convert(&input, &output));

    let pdf = std::fs::read(&output).unwrap();
    assert_eq!(count(&pdf, b"(Texto) Tj"), 1);
}

#[test]
fn long_text_overflows_onto_more_pages() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("deck.docx");
    let output = dir.path().join("deck.pdf");

    let mut deck = Deck::new("Largo");
    for i in 0..120 {
        deck.text(format!("Párrafo número {i} con algo de texto."));
    }
    simred_deck::write_docx(&deck, &input).unwrap();

    simred_deck::convert_docx_to_pdf(&input, &output).unwrap();

    let pdf = std::fs::read(&output).unwrap();
    assert!(pdf_page_count(&pdf) >= 3);
}

#[test]
fn non_zip_input_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.docx");
    std::fs::write(&input, b"this is not a zip archive").unwrap();
    let output = dir.path().join("broken.pdf");

    let err = simred_deck::convert_docx_to_pdf(&input, &output).unwrap_err();

    assert!(matches!(err, Error::Zip(_)), "unexpected error: {err}");
    assert!(!simred_deck::convert(&input, &output));
    assert!(!output.exists());
}

#[test]
fn zip_without_document_part_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.docx");
    {
        let mut zip = zip::ZipWriter::new(std::fs::File::create(&input).unwrap());
        zip.start_file("readme.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.finish().unwrap();
    }

    let err = simred_deck::convert_docx_to_pdf(&input, &dir.path().join("empty.pdf"))
        .unwrap_err();

    assert!(matches!(err, Error::InvalidDocx(_)));
}
