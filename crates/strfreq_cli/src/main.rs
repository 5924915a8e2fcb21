//! `strfreq` command-line entry point.
//!
//! # Responsibility
//! - Dispatch subcommands to the ingestion core.
//! - Map fatal faults to a non-zero exit status.

use std::process::ExitCode;

mod cli;

fn build_parser() -> clap::Command {
    clap::Command::new(cli::consts::BIN_NAME)
        .version(strfreq_core::core_version())
        .about("Ingest population STR allele-frequency tables into a locus store.")
        .subcommand_required(true)
        .subcommand(cli::interfaces::make_ingest_cli())
        .subcommand(cli::interfaces::make_version_cli())
}

fn main() -> ExitCode {
    let matches = build_parser().get_matches();

    let result = match matches.subcommand() {
        Some((cli::consts::INGEST_CMD, sub_matches)) => cli::functions::ingest(sub_matches),
        Some((cli::consts::VERSION_CMD, _)) => {
            println!("strfreq_core version={}", strfreq_core::core_version());
            Ok(())
        }
        _ => unreachable!("subcommand_required is set"),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("strfreq: {err}");
            ExitCode::FAILURE
        }
    }
}
