use clap::{Parser, Subcommand};
use std::path::PathBuf;

use simred_deck::DOCX_FILE_NAME;

#[derive(Parser)]
#[command(
    name = "simred-deck",
    about = "Build the SIM-RED presentation document and convert it to PDF"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the presentation as a DOCX file
    Build {
        /// Project root holding the diagramas/ directory
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Output DOCX file
        #[arg(long, short, default_value = DOCX_FILE_NAME)]
        output: PathBuf,
    },
    /// Convert a DOCX file to PDF
    Convert {
        /// Input DOCX file
        #[arg(default_value = DOCX_FILE_NAME)]
        input: PathBuf,
        /// Output PDF file (defaults to input with .pdf extension)
        output: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Build { root, output } => {
            match simred_deck::build_presentation(&root, &output) {
                Ok(path) => println!("Documento Word creado exitosamente: {}", path.display()),
                Err(e) => {
                    eprintln!("Error al crear el documento: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Convert { input, output } => {
            let output = output.unwrap_or_else(|| input.with_extension("pdf"));

            if !input.is_file() {
                eprintln!("Error: no se encuentra el archivo {}", input.display());
                std::process::exit(1);
            }
            println!("Convirtiendo {} a PDF...", input.display());
            if !simred_deck::convert(&input, &output) {
                eprintln!("Error al convertir a PDF: {}", input.display());
                std::process::exit(1);
            }
            println!("PDF creado exitosamente: {}", output.display());
        }
    }
}
