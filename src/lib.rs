mod docx;
mod error;
mod fonts;
mod model;
mod pdf;
mod writer;

pub mod content;
pub mod deck;

pub use deck::{Alignment, Block, Deck};
pub use error::Error;
pub use fonts::FONTS_ENV;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Name the presentation is written under.
pub const DOCX_FILE_NAME: &str = "presentacion_simred.docx";
/// Name the converted presentation is written under.
pub const PDF_FILE_NAME: &str = "presentacion_simred.pdf";

/// Assembles the SIM-RED presentation and writes it to `output`.
///
/// Diagrams are looked up under `root`; missing ones are left out.
pub fn build_presentation(root: &Path, output: &Path) -> Result<PathBuf, Error> {
    let deck = content::presentation(root)?;
    write_docx(&deck, output)?;
    log::info!("Wrote {} ({} blocks)", output.display(), deck.blocks().len());
    Ok(output.to_path_buf())
}

pub fn write_docx(deck: &Deck, output: &Path) -> Result<(), Error> {
    let file = File::create(output)?;
    writer::write(deck, BufWriter::new(file))
}

pub fn convert_docx_to_pdf(input: &Path, output: &Path) -> Result<(), Error> {
    let doc = docx::parse(input)?;
    let bytes = pdf::render(&doc)?;
    std::fs::write(output, bytes).map_err(Error::Io)
}

/// Converts `input` to PDF at `output`, logging instead of returning the
/// failure. Returns `false` when `input` is missing or conversion fails.
pub fn convert(input: &Path, output: &Path) -> bool {
    if !input.exists() {
        log::error!("Input file not found: {}", input.display());
        return false;
    }
    log::info!("Converting {} to PDF", input.display());
    match convert_docx_to_pdf(input, output) {
        Ok(()) => {
            log::info!("Wrote {}", output.display());
            true
        }
        Err(e) => {
            log::error!("Failed to convert {}: {e}", input.display());
            false
        }
    }
}
