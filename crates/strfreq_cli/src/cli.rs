use std::error::Error;
use std::path::PathBuf;

use clap::{arg, value_parser, ArgAction, ArgGroup, ArgMatches, Command};

pub mod consts {
    pub const BIN_NAME: &str = "strfreq";
    pub const INGEST_CMD: &str = "ingest";
    pub const VERSION_CMD: &str = "version";

    pub const DEFAULT_ERROR_LOG: &str = "error.log";
    pub const DEFAULT_SKIPPED_ALLELES_LOG: &str = "skipped_alleles.txt";
}

pub mod interfaces {

    use super::*;
    use strfreq_core::config::{DEFAULT_END_TOLERANCE, DEFAULT_SOURCE_TAG};

    pub fn make_ingest_cli() -> Command {
        Command::new(consts::INGEST_CMD)
            .about("Attach per-population allele frequencies from frequency tables to stored loci.")
            .arg(
                arg!(--db <PATH> "Path to the SQLite locus store.")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(--file <PATH> "Frequency table to ingest. May be repeated.")
                    .action(ArgAction::Append)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(--dir <DIR> "Directory of per-chromosome `.tab` tables to ingest.")
                    .value_parser(value_parser!(PathBuf)),
            )
            .group(
                ArgGroup::new("inputs")
                    .args(["file", "dir"])
                    .multiple(true)
                    .required(true),
            )
            .arg(
                arg!(--"source-tag" <TAG> "Source tag of the loci to match against.")
                    .default_value(DEFAULT_SOURCE_TAG),
            )
            .arg(
                arg!(--"end-tolerance" <BP> "Accepted distance between input and stored end coordinates.")
                    .long_help(format!(
                        "Accepted distance between input and stored end coordinates [default: {DEFAULT_END_TOLERANCE}]"
                    ))
                    .value_parser(value_parser!(u32)),
            )
            .arg(
                arg!(--"error-log" <PATH> "File receiving malformed, unmatched and ambiguous lines.")
                    .default_value(consts::DEFAULT_ERROR_LOG)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(--"skipped-alleles-log" <PATH> "File receiving malformed allele entries.")
                    .default_value(consts::DEFAULT_SKIPPED_ALLELES_LOG)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(arg!(--"replace-existing" "Replace records with the same locus, population and sequence instead of appending."))
            .arg(
                arg!(--"log-level" <LEVEL> "trace|debug|info|warn|error.")
                    .default_value(strfreq_core::default_log_level()),
            )
            .arg(arg!(--"log-dir" <DIR> "Absolute directory for rotating log files. Logs go to stderr when omitted."))
            .arg(arg!(--"report-json" "Print the run summary as JSON."))
    }

    pub fn make_version_cli() -> Command {
        Command::new(consts::VERSION_CMD).about("Print the core library version.")
    }
}

pub mod functions {

    use super::*;
    use strfreq_core::db::open_db;
    use strfreq_core::{
        collect_input_files, init_logging, init_stderr_logging, DiagnosticLog, DuplicatePolicy,
        IngestConfig, IngestService, SqliteLocusRepository,
    };

    pub fn ingest(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
        let log_level = matches
            .get_one::<String>("log-level")
            .map(String::as_str)
            .unwrap_or_else(|| strfreq_core::default_log_level());
        match matches.get_one::<String>("log-dir") {
            Some(log_dir) => init_logging(log_level, log_dir)?,
            None => init_stderr_logging(log_level)?,
        }

        let mut inputs: Vec<PathBuf> = matches
            .get_many::<PathBuf>("file")
            .map(|files| files.cloned().collect())
            .unwrap_or_default();
        if let Some(dir) = matches.get_one::<PathBuf>("dir") {
            inputs.extend(collect_input_files(dir)?);
        }
        if inputs.is_empty() {
            return Err("no input frequency tables found".into());
        }

        let config = ingest_config(matches);
        let db_path = matches
            .get_one::<PathBuf>("db")
            .ok_or("missing --db")?;
        let error_log = matches
            .get_one::<PathBuf>("error-log")
            .ok_or("missing --error-log")?;
        let skipped_alleles_log = matches
            .get_one::<PathBuf>("skipped-alleles-log")
            .ok_or("missing --skipped-alleles-log")?;

        let mut conn = open_db(db_path)?;
        let repo = SqliteLocusRepository::try_new(&mut conn)?;
        let mut diagnostics = DiagnosticLog::create(error_log, skipped_alleles_log)?;

        let mut service = IngestService::new(repo, config);
        let report = service.ingest_paths(&inputs, &mut diagnostics)?;
        let summary = service.finish_run(&report)?;

        if matches.get_flag("report-json") {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!(
                "run {}: {} lines read, {} ingested, {} records appended",
                summary.run_id, summary.lines_read, summary.lines_ingested, summary.records_appended
            );
            println!(
                "skipped: {} malformed, {} not found, {} ambiguous; {} malformed alleles",
                summary.input_malformed,
                summary.not_found,
                summary.ambiguous,
                summary.malformed_alleles
            );
        }
        Ok(())
    }

    pub(crate) fn ingest_config(matches: &ArgMatches) -> IngestConfig {
        let defaults = IngestConfig::default();
        let duplicate_policy = if matches.get_flag("replace-existing") {
            DuplicatePolicy::Replace
        } else {
            DuplicatePolicy::Append
        };

        IngestConfig {
            source_tag: matches
                .get_one::<String>("source-tag")
                .cloned()
                .unwrap_or(defaults.source_tag),
            end_tolerance: matches
                .get_one::<u32>("end-tolerance")
                .copied()
                .unwrap_or(defaults.end_tolerance),
            duplicate_policy,
            ..defaults
        }
    }
}
