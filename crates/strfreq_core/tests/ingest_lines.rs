use std::io::Cursor;
use strfreq_core::{
    DiagnosticLog, DuplicatePolicy, IngestConfig, IngestReport, IngestService, InputMalformed,
    LineOutcome, LocusRepository, MalformedReason, MemoryLocusRepository, Population, SkipReason,
};

const HEADER: &str = "chrom\tstart\tend\tacount-AFR\tacount-AMR\tacount-EAS\tacount-EUR\tacount-SAS";
const SEQ_A: &str = "CACATACACACACACACACACACACACACACAC";
const SEQ_B: &str = "CACATACACACACACACACACACACACACACACAC";

fn service_with_locus(end: i64) -> (IngestService<MemoryLocusRepository>, i64) {
    let mut repo = MemoryLocusRepository::new();
    let locus = repo.insert_locus("chr10", 89246, end, "EnsembleTR", Some(2504.0));
    (IngestService::new(repo, IngestConfig::default()), locus.id)
}

fn table(lines: &[&str]) -> Cursor<String> {
    let mut text = String::from(HEADER);
    for line in lines {
        text.push('\n');
        text.push_str(line);
    }
    text.push('\n');
    Cursor::new(text)
}

fn ingest(
    service: &mut IngestService<MemoryLocusRepository>,
    lines: &[&str],
) -> IngestReport {
    let mut report = IngestReport::default();
    let mut diagnostics = DiagnosticLog::discard();
    service
        .ingest_reader("chr10.tab", table(lines), &mut diagnostics, &mut report)
        .unwrap();
    report
}

#[test]
fn frequencies_per_population_sum_to_one_within_rounding() {
    let (mut service, locus) = service_with_locus(89285);
    let line = format!("chr10\t89246\t89285\t{SEQ_A}:2,{SEQ_B}:261\tCA:1,CAC:1,CACA:1\t.\tCA:7,CAG:13\t.");

    let outcome = service.process_line(&line).unwrap();
    assert!(matches!(outcome, LineOutcome::Ingested { appended: 7, .. }));

    let records = service.repo().frequencies_for_locus(locus).unwrap();
    for population in [Population::Afr, Population::Amr, Population::Eur] {
        let population_records: Vec<_> = records
            .iter()
            .filter(|record| record.population == population)
            .collect();
        let sum: f64 = population_records.iter().map(|record| record.frequency).sum();
        let tolerance = 0.005 * population_records.len() as f64;
        assert!((sum - 1.0).abs() <= tolerance, "{population} sums to {sum}");
    }

    let afr: Vec<(&str, u64, f64)> = records
        .iter()
        .filter(|record| record.population == Population::Afr)
        .map(|record| (record.sequence.as_str(), record.count, record.frequency))
        .collect();
    assert_eq!(afr, vec![(SEQ_A, 2, 0.0076), (SEQ_B, 261, 0.99)]);
    assert!(records.iter().all(|record| record.n_effective == Some(2504.0)));
}

#[test]
fn single_allele_field_yields_one_full_frequency_record() {
    let (mut service, locus) = service_with_locus(89285);

    service
        .process_line("chr10 89246 89285 . . CAG:100 . .")
        .unwrap();

    let records = service.repo().frequencies_for_locus(locus).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].population, Population::Eas);
    assert_eq!(records[0].count, 100);
    assert_eq!(records[0].frequency, 1.0);
}

#[test]
fn sentinel_only_line_resolves_without_records() {
    let (mut service, locus) = service_with_locus(89285);

    let outcome = service.process_line("chr10 89246 89285 . . . . .").unwrap();

    assert_eq!(
        outcome,
        LineOutcome::Ingested {
            locus,
            appended: 0,
            malformed: Vec::new(),
        }
    );
    assert!(service.repo().frequencies_for_locus(locus).unwrap().is_empty());
}

#[test]
fn end_coordinate_tolerance_is_two_either_side() {
    for end in 89283..=89287 {
        let (mut service, locus) = service_with_locus(89285);
        let line = format!("chr10 89246 {end} CA:1 . . . .");
        let outcome = service.process_line(&line).unwrap();
        assert!(
            matches!(outcome, LineOutcome::Ingested { locus: id, appended: 1, .. } if id == locus),
            "end {end} should resolve"
        );
    }

    for end in [89282, 89288] {
        let (mut service, _) = service_with_locus(89285);
        let line = format!("chr10 89246 {end} CA:1 . . . .");
        let outcome = service.process_line(&line).unwrap();
        assert!(
            matches!(outcome, LineOutcome::Skipped(SkipReason::NotFound { .. })),
            "end {end} should not resolve"
        );
        assert_eq!(service.repo().frequency_count(), 0);
    }
}

#[test]
fn ambiguous_line_is_skipped_and_next_line_still_ingested() {
    let mut repo = MemoryLocusRepository::new();
    repo.insert_locus("chr10", 89246, 89284, "EnsembleTR", None);
    repo.insert_locus("chr10", 89246, 89286, "EnsembleTR", None);
    let unique = repo.insert_locus("chr10", 90000, 90030, "EnsembleTR", None);
    let mut service = IngestService::new(repo, IngestConfig::default());

    let report = ingest(
        &mut service,
        &["chr10 89246 89285 CA:3 . . . .", "chr10 90000 90030 CA:3 . . . ."],
    );

    assert_eq!(report.ambiguous, 1);
    assert_eq!(report.line_skips.len(), 1);
    assert!(matches!(
        report.line_skips[0].reason,
        SkipReason::Ambiguous { ref candidates, .. } if candidates.len() == 2
    ));
    assert_eq!(report.lines_ingested, 1);
    assert_eq!(service.repo().frequency_count(), 1);
    assert_eq!(
        service.repo().frequencies_for_locus(unique.id).unwrap().len(),
        1
    );
}

#[test]
fn malformed_allele_is_quarantined_and_siblings_are_correct() {
    let (mut service, locus) = service_with_locus(89285);

    let report = ingest(&mut service, &["chr10 89246 89285 CA:1,SEQ_NO_COLON,CAT:3 . . . ."]);

    assert_eq!(report.malformed_alleles, 1);
    assert_eq!(report.allele_skips.len(), 1);
    let skip = &report.allele_skips[0];
    assert_eq!(skip.line_number, 1);
    assert_eq!(skip.allele.population, Population::Afr);
    assert_eq!(skip.allele.entry, "SEQ_NO_COLON");
    assert_eq!(skip.allele.reason, MalformedReason::FieldCount { parts: 1 });

    let records = service.repo().frequencies_for_locus(locus).unwrap();
    let values: Vec<(&str, f64)> = records
        .iter()
        .map(|record| (record.sequence.as_str(), record.frequency))
        .collect();
    assert_eq!(values, vec![("CA", 0.25), ("CAT", 0.75)]);
}

#[test]
fn malformed_lines_are_classified_and_processing_continues() {
    let (mut service, locus) = service_with_locus(89285);

    let report = ingest(
        &mut service,
        &[
            "chr10 start 89285 CA:1 . . . .",
            "chr10 89246",
            "",
            "chr10 89246 89285 CA:1 . . . .",
        ],
    );

    assert_eq!(report.lines_read, 3);
    assert_eq!(report.input_malformed, 2);
    assert_eq!(report.lines_ingested, 1);
    assert!(matches!(
        report.line_skips[0].reason,
        SkipReason::InputMalformed {
            detail: InputMalformed::InvalidInteger { .. }
        }
    ));
    assert!(matches!(
        report.line_skips[1].reason,
        SkipReason::InputMalformed {
            detail: InputMalformed::MissingColumns { found: 2, .. }
        }
    ));
    assert_eq!(report.line_skips[1].line_number, 2);
    assert_eq!(service.repo().frequencies_for_locus(locus).unwrap().len(), 1);
}

#[test]
fn line_with_invalid_utf8_is_skipped_and_later_lines_ingest() {
    let (mut service, locus) = service_with_locus(89285);
    let mut bytes = format!("{HEADER}\n").into_bytes();
    bytes.extend_from_slice(b"chr10 1 2 \xff\xfe . . . .\r\n");
    bytes.extend_from_slice(b"chr10 89246 89285 CA:1 . . . .\n");

    let mut report = IngestReport::default();
    let mut diagnostics = DiagnosticLog::discard();
    service
        .ingest_reader("chr10.tab", Cursor::new(bytes), &mut diagnostics, &mut report)
        .unwrap();

    assert_eq!(report.lines_read, 2);
    assert_eq!(report.input_malformed, 1);
    assert_eq!(report.lines_ingested, 1);
    assert_eq!(
        report.line_skips[0].reason,
        SkipReason::InputMalformed {
            detail: InputMalformed::InvalidEncoding { valid_up_to: 10 }
        }
    );
    assert_eq!(report.line_skips[0].line_number, 1);
    assert!(report.line_skips[0].line.starts_with("chr10 1 2 "));
    assert_eq!(service.repo().frequencies_for_locus(locus).unwrap().len(), 1);
}

#[test]
fn rerunning_with_append_policy_duplicates_records() {
    let (mut service, locus) = service_with_locus(89285);
    let lines = ["chr10 89246 89285 CA:1,CAG:1 . . . ."];

    ingest(&mut service, &lines);
    ingest(&mut service, &lines);

    // Append-only ingestion is not idempotent.
    assert_eq!(service.repo().frequencies_for_locus(locus).unwrap().len(), 4);
}

#[test]
fn rerunning_with_replace_policy_is_idempotent() {
    let mut repo = MemoryLocusRepository::new();
    let locus = repo.insert_locus("chr10", 89246, 89285, "EnsembleTR", None);
    let config = IngestConfig {
        duplicate_policy: DuplicatePolicy::Replace,
        ..IngestConfig::default()
    };
    let mut service = IngestService::new(repo, config);
    let lines = ["chr10 89246 89285 CA:1,CAG:1 . . . ."];

    ingest(&mut service, &lines);
    ingest(&mut service, &lines);

    assert_eq!(service.repo().frequencies_for_locus(locus.id).unwrap().len(), 2);
}

#[test]
fn replace_policy_keeps_repeated_sequences_of_one_line() {
    let mut repo = MemoryLocusRepository::new();
    let locus = repo.insert_locus("chr10", 89246, 89285, "EnsembleTR", None);
    let config = IngestConfig {
        duplicate_policy: DuplicatePolicy::Replace,
        ..IngestConfig::default()
    };
    let mut service = IngestService::new(repo, config);

    let outcome = service
        .process_line("chr10 89246 89285 CA:1,CA:3 . . . .")
        .unwrap();
    assert!(matches!(outcome, LineOutcome::Ingested { appended: 2, .. }));

    let stored: Vec<(u64, f64)> = service
        .repo()
        .frequencies_for_locus(locus.id)
        .unwrap()
        .iter()
        .map(|record| (record.count, record.frequency))
        .collect();
    assert_eq!(stored, vec![(1, 0.25), (3, 0.75)]);
}

#[test]
fn custom_source_tag_and_tolerance_drive_resolution() {
    let mut repo = MemoryLocusRepository::new();
    let locus = repo.insert_locus("chr3", 700, 760, "GangSTR", None);
    let config = IngestConfig {
        source_tag: "GangSTR".to_string(),
        end_tolerance: 5,
        ..IngestConfig::default()
    };
    let mut service = IngestService::new(repo, config);

    let outcome = service.process_line("chr3 700 755 . GT:2 . . .").unwrap();

    assert!(matches!(outcome, LineOutcome::Ingested { locus: id, .. } if id == locus.id));
}

#[test]
fn finish_run_records_summary_in_repository() {
    let (mut service, _) = service_with_locus(89285);
    let report = ingest(
        &mut service,
        &["chr10 89246 89285 CA:1 . . . .", "chr9 1 2 . . . . ."],
    );

    let summary = service.finish_run(&report).unwrap();

    assert_eq!(summary.lines_read, 2);
    assert_eq!(summary.not_found, 1);
    assert_eq!(summary.lines_skipped(), 1);
    assert_eq!(summary.sources, vec!["chr10.tab".to_string()]);
    let repo = service.into_repo();
    assert_eq!(repo.runs(), std::slice::from_ref(&summary));
}

#[test]
fn report_serializes_skip_accounting() {
    let (mut service, _) = service_with_locus(89285);
    let report = ingest(&mut service, &["chr10 1 2 . . . . ."]);

    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["not_found"], 1);
    assert_eq!(json["line_skips"][0]["reason"]["kind"], "not_found");
    assert_eq!(json["line_skips"][0]["reason"]["chromosome"], "chr10");
}
