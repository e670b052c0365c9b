//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases del proceso de
//! compilación y expone una CLI.

use anyhow::{self, bail, Context};
use bitflags::bitflags;
use blockc::pipeline::{self, Compilation};
use clap::{self, crate_version, Arg, Command};
use color_print::ceprintln;

use std::{
    fs::{self, File},
    io::{self, Read, Write},
};

bitflags! {
    /// Estructuras intermedias que se muestran durante la compilación.
    struct Dumps: u32 {
        const TOKENS = 0x01;
        const CST = 0x02;
        const AST = 0x04;
        const SYMBOLS = 0x08;

        /// Tablas de estáticos, heap y saltos, junto al listado previo
        /// a backpatching.
        const TABLES = 0x10;
    }
}

fn main() -> anyhow::Result<()> {
    // Parsing de CLI
    let args = Command::new("blockc")
        .version(crate_version!())
        .about("Compiles block programs to 256-byte machine images")
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .required(true)
                .help("Source file ('-' for stdin)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .value_name("FILE")
                .default_value("-")
                .help("Output file for hex images ('-' for stdout)"),
        )
        .arg(Arg::new("tokens").long("tokens").help("Dump token lists"))
        .arg(Arg::new("cst").long("cst").help("Dump concrete syntax trees"))
        .arg(Arg::new("ast").long("ast").help("Dump abstract syntax trees"))
        .arg(Arg::new("symbols").long("symbols").help("Dump symbol lists and scopes"))
        .arg(Arg::new("tables").long("tables").help("Dump memory layout tables"))
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Trace each compilation stage"),
        )
        .get_matches();

    // Se extraen argumentos necesarios
    let input = args.value_of("input").unwrap_or("-");
    let output = args.value_of("output").unwrap_or("-");
    let verbose = args.is_present("verbose");

    let mut dumps = Dumps::empty();
    for &(name, flag) in &[
        ("tokens", Dumps::TOKENS),
        ("cst", Dumps::CST),
        ("ast", Dumps::AST),
        ("symbols", Dumps::SYMBOLS),
        ("tables", Dumps::TABLES),
    ] {
        dumps.set(flag, args.is_present(name));
    }

    let (name, text) = read_input(input)?;
    let compilations = pipeline::compile(&name, &text);

    if compilations.is_empty() {
        bail!("No programs found in {}", name);
    }

    let mut images = Vec::new();
    let mut failed = 0;

    for compilation in &compilations {
        report(compilation, dumps, verbose);

        match compilation.hex() {
            Some(hex) if compilation.succeeded() => images.push(hex.join(" ")),
            _ => failed += 1,
        }
    }

    write_images(output, &images)?;

    if failed > 0 {
        bail!(
            "{} of {} programs failed to compile",
            failed,
            compilations.len()
        );
    }

    Ok(())
}

fn read_input(path: &str) -> anyhow::Result<(String, String)> {
    match path {
        "-" => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read from stdin")?;

            Ok((String::from("<stdin>"), text))
        }

        path => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to open for reading: {}", path))?;

            Ok((String::from(path), text))
        }
    }
}

fn write_images(path: &str, images: &[String]) -> anyhow::Result<()> {
    match path {
        // Salida a stdout
        "-" => {
            let stdout = io::stdout();
            let mut stdout = stdout.lock();
            for image in images {
                writeln!(stdout, "{}", image).context("Failed to write to stdout")?;
            }
        }

        // Salida a archivo
        path => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path))?;

            for image in images {
                writeln!(file, "{}", image)
                    .with_context(|| format!("Failed to write to file: {}", path))?;
            }
        }
    }

    Ok(())
}

/// Reporta una compilación en stderr; las imágenes van aparte.
fn report(compilation: &Compilation, dumps: Dumps, verbose: bool) {
    let index = compilation.index;

    if verbose {
        ceprintln!(
            "<green,bold>info</>: program {}: {} tokens",
            index,
            compilation.tokens.len()
        );
    }

    if dumps.contains(Dumps::TOKENS) {
        ceprintln!("<blue,bold>note</>: tokens of program {}", index);
        for token in &compilation.tokens {
            eprintln!(
                "{:<16}{:<8}{}",
                token.val().name(),
                token.val().to_string(),
                token.location()
            );
        }
    }

    if let Some(cst) = &compilation.cst {
        if verbose {
            ceprintln!("<green,bold>info</>: program {}: parsed", index);
        }

        if dumps.contains(Dumps::CST) {
            ceprintln!("<blue,bold>note</>: concrete syntax tree of program {}", index);
            eprint!("{}", cst);
        }
    }

    if let Some(analysis) = &compilation.analysis {
        if verbose {
            ceprintln!(
                "<green,bold>info</>: program {}: analyzed, {} scopes and {} symbols",
                index,
                analysis.scopes.len(),
                analysis.symbols.len()
            );
        }

        if dumps.contains(Dumps::AST) {
            ceprintln!("<blue,bold>note</>: abstract syntax tree of program {}", index);
            eprint!("{}", analysis.ast);
        }

        if dumps.contains(Dumps::SYMBOLS) {
            ceprintln!("<blue,bold>note</>: symbols of program {}", index);
            eprint!("{}", analysis.symbols);
            eprint!("{}", analysis.scopes);
        }
    }

    if let Some(output) = &compilation.output {
        if verbose {
            ceprintln!(
                "<green,bold>info</>: program {}: code ends at {:02X}, {} statics, {} heap strings",
                index,
                output.code_end,
                output.statics.len(),
                output.heap.len()
            );
        }

        if dumps.contains(Dumps::TABLES) {
            ceprintln!("<blue,bold>note</>: memory layout of program {}", index);

            let listing: Vec<_> = output.listing.iter().map(ToString::to_string).collect();
            for row in listing.chunks(32) {
                eprintln!("{}", row.join(" "));
            }

            eprint!("{}", output.statics);
            eprint!("{}", output.heap);
            eprint!("{}", output.jumps);
        }
    }

    if !compilation.diagnostics.is_empty() {
        eprint!("{}", compilation.diagnostics);
    }

    if compilation.succeeded() {
        ceprintln!("<green,bold>info</>: program {} compiled", index);
    } else {
        ceprintln!("<red,bold>error</>: program {} failed to compile", index);
    }
}
