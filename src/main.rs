//! This is the main entry point for the FAT32 extraction tool.
//!
//! The program opens a raw FAT32 volume image and recursively extracts its
//! directory tree and file contents into a destination directory.

use fat_extract::traits::LayoutDisplay;
use fat_extract::{FATError, FATVol};
use std::env;
use std::path::PathBuf;
use std::process;

use log::error;

/// Options parsed from the command line.
struct Options {
    /// The path of the raw FAT32 volume image.
    image: PathBuf,
    /// The directory the tree is extracted into.
    dest: PathBuf,
    /// Enable the validation of the Bpb.
    validate: bool,
    /// Print the volume layout before extracting.
    layout: bool,
    /// Verbosity level handed to the logger.
    verbosity: usize,
}

impl Options {
    fn from_args(args: &[String]) -> Result<Options, String> {
        let mut positional = Vec::new();
        let mut validate = true;
        let mut layout = false;
        let mut verbosity = 2;

        for arg in &args[1..] {
            match arg.as_str() {
                "--no-validate" => validate = false,
                "--layout" => layout = true,
                "-v" => verbosity = 3,
                "-q" => verbosity = 0,
                other if other.starts_with('-') => {
                    return Err(format!("Unknown option: {other}"));
                }
                other => positional.push(other),
            }
        }

        match positional.as_slice() {
            [image, dest] => Ok(Options {
                image: PathBuf::from(image),
                dest: PathBuf::from(dest),
                validate,
                layout,
                verbosity,
            }),
            _ => Err(format!(
                "Usage: {} [--no-validate] [--layout] [-v|-q] <image> <destination>",
                args.first().map(String::as_str).unwrap_or("fat_extract")
            )),
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let opts = match Options::from_args(&args) {
        Ok(opts) => opts,
        Err(msg) => {
            eprintln!("{msg}");
            process::exit(2);
        }
    };

    stderrlog::new()
        .module(module_path!())
        .verbosity(opts.verbosity)
        .init()
        .unwrap();

    if let Err(err) = run(&opts) {
        error!("{err}");
        process::exit(1);
    }
}

fn run(opts: &Options) -> Result<(), FATError> {
    let mut vol = FATVol::from_file(&opts.image, opts.validate)?;

    if opts.layout {
        match vol.display_layout(0) {
            Ok(table) => print!("{table}"),
            Err(err) => error!("Layout printing failed: {err}"),
        }
    }

    vol.extract_to(&opts.dest)
}
