use std::fs;
use std::path::Path;
use strfreq_core::db::open_db_in_memory;
use strfreq_core::{
    collect_input_files, DiagnosticLog, IngestConfig, IngestError, IngestService, LocusRepository,
    SqliteLocusRepository,
};

const HEADER: &str = "chrom\tstart\tend\tacount-AFR\tacount-AMR\tacount-EAS\tacount-EUR\tacount-SAS\n";

fn write_table(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("{HEADER}{body}")).unwrap();
    path
}

#[test]
fn collect_input_files_lists_sorted_tab_files_only() {
    let dir = tempfile::tempdir().unwrap();
    write_table(dir.path(), "chr2.tab", "");
    write_table(dir.path(), "chr10.tab", "");
    write_table(dir.path(), "notes.txt", "");
    fs::create_dir(dir.path().join("nested.tab")).unwrap();

    let files = collect_input_files(dir.path()).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["chr10.tab", "chr2.tab"]);
}

#[test]
fn directory_batch_ingests_every_table_into_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    write_table(
        dir.path(),
        "chr10.tab",
        "chr10\t89246\t89285\tCACA:2,CACACA:261\t.\t.\t.\t.\n",
    );
    write_table(
        dir.path(),
        "chr21.tab",
        "chr21\t5010\t5041\t.\tGT:5\t.\tGT:1,GTGT:1\t.\nchr21\t7000\t7010\tGT:1\t.\t.\t.\t.\n",
    );
    let error_log = dir.path().join("error.log");
    let skipped_log = dir.path().join("skipped_alleles.txt");

    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteLocusRepository::try_new(&mut conn).unwrap();
    let chr10 = repo
        .insert_locus("chr10", 89246, 89285, "EnsembleTR", Some(2504.0))
        .unwrap();
    let chr21 = repo
        .insert_locus("chr21", 5010, 5040, "EnsembleTR", Some(1800.0))
        .unwrap();

    let inputs = collect_input_files(dir.path()).unwrap();
    let mut diagnostics = DiagnosticLog::create(&error_log, &skipped_log).unwrap();
    let mut service = IngestService::new(repo, IngestConfig::default());
    let report = service.ingest_paths(&inputs, &mut diagnostics).unwrap();
    let summary = service.finish_run(&report).unwrap();

    assert_eq!(report.sources.len(), 2);
    assert_eq!(summary.lines_read, 3);
    assert_eq!(summary.lines_ingested, 2);
    assert_eq!(summary.records_appended, 5);
    assert_eq!(summary.not_found, 1);

    let chr10_records = service.repo().frequencies_for_locus(chr10.id).unwrap();
    assert_eq!(chr10_records.len(), 2);
    assert_eq!(chr10_records[0].frequency, 0.0076);
    let chr21_records = service.repo().frequencies_for_locus(chr21.id).unwrap();
    assert_eq!(chr21_records.len(), 3);
    assert!(chr21_records
        .iter()
        .all(|record| record.n_effective == Some(1800.0)));
    assert_eq!(
        service.repo().load_run(summary.run_id).unwrap(),
        Some(summary)
    );

    let errors = fs::read_to_string(&error_log).unwrap();
    assert_eq!(errors.lines().count(), 1);
    assert!(errors.contains("No matching record found for chr: chr21:7000-7010"));
    assert!(fs::read_to_string(&skipped_log).unwrap().is_empty());
}

#[test]
fn missing_input_aborts_after_flushing_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let table = write_table(
        dir.path(),
        "chr1.tab",
        "chr1\t10\t20\tCA:1,BROKEN\t.\t.\t.\t.\nchr1\t99\t120\tCA:1\t.\t.\t.\t.\n",
    );
    let missing = dir.path().join("chr2.tab");
    let error_log = dir.path().join("error.log");
    let skipped_log = dir.path().join("skipped_alleles.txt");

    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteLocusRepository::try_new(&mut conn).unwrap();
    repo.insert_locus("chr1", 10, 20, "EnsembleTR", None).unwrap();

    let mut diagnostics = DiagnosticLog::create(&error_log, &skipped_log).unwrap();
    let mut service = IngestService::new(repo, IngestConfig::default());
    let err = service
        .ingest_paths(&[table, missing.clone()], &mut diagnostics)
        .unwrap_err();

    assert!(matches!(err, IngestError::Io { ref path, .. } if *path == missing));
    // Diagnostics are still open here, so their content proves the flush.
    let errors = fs::read_to_string(&error_log).unwrap();
    assert!(errors.contains("No matching record found for chr: chr1:99-120"));
    let skipped = fs::read_to_string(&skipped_log).unwrap();
    assert!(skipped.contains("Skipped or malformed allele entry at line 1"));
    assert!(skipped.contains("`BROKEN`"));
}
