use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of the command tree in src/main.rs
// We need to duplicate this here since build scripts can't access src/ modules
const ENGINES: &[&str] = &["pandoc", "comrak"];

fn input_arg() -> Arg {
    Arg::new("input")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn output_arg() -> Arg {
    Arg::new("output")
        .long("output")
        .short('o')
        .value_hint(ValueHint::FilePath)
}

fn treeviz_arg() -> Arg {
    Arg::new("treeviz").long("treeviz").action(ArgAction::SetTrue)
}

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = Command::new("quill")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert markdown to rich-text document trees and back")
        .arg(
            Arg::new("config")
                .long("config")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("engine")
                .long("engine")
                .value_parser(clap::builder::PossibleValuesParser::new(ENGINES))
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_parser(clap::builder::PossibleValuesParser::new([
                    "off", "error", "warn", "info", "debug", "trace",
                ]))
                .global(true),
        )
        .subcommand(
            Command::new("tokens")
                .arg(input_arg())
                .arg(treeviz_arg())
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("to-tree")
                .arg(input_arg())
                .arg(treeviz_arg())
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("from-tree")
                .arg(input_arg())
                .arg(Arg::new("api-version").long("api-version"))
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("round-trip")
                .arg(input_arg())
                .arg(output_arg()),
        );

    // Generate completions for bash
    generate_to(Bash, &mut cmd, "quill", &outdir)?;

    // Generate completions for zsh
    generate_to(Zsh, &mut cmd, "quill", &outdir)?;

    // Generate completions for fish
    generate_to(Fish, &mut cmd, "quill", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}
