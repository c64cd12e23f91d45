//! Test: rRNA Flow - build missing database indexes, then filter with SortMeRNA

use crate::helpers::*;
use metassembly::workflow::rrna::{RrnaFilterConfig, INDEX_SUFFIXES};
use std::fs;
use std::path::Path;

fn setup(dir: &Path) -> RrnaFilterConfig {
    fs::write(dir.join("reads.fq"), "@r\nACGU\n+\nIIII\n").unwrap();
    for db in ["silva-bac-16s-id90", "rfam-5s-database-id98"] {
        fs::write(dir.join(format!("{}.fasta", db)), ">rrna\nACGU\n").unwrap();
    }
    // only the silva database is already indexed
    for suffix in INDEX_SUFFIXES {
        fs::write(dir.join(format!("silva-bac-16s-id90{}", suffix)), "").unwrap();
    }

    let yaml = format!(
        r#"
name: "OLDES6"
reads: "{dir}/reads.fq"
aligned: "{dir}/rRNA"
other: "{dir}/mRNA"
references:
  - "{dir}/silva-bac-16s-id90"
  - "{dir}/rfam-5s-database-id98"
paired_in: true
options:
  num_alignments: "1"
"#,
        dir = dir.display()
    );
    RrnaFilterConfig::from_yaml(&yaml).unwrap()
}

/// Only the unindexed database gets an index stage before the filter
#[tokio::test]
async fn test_filter_indexes_missing_database_only() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path().display().to_string();
    let config = setup(dir.path());

    let mut pipeline = config.to_pipeline();
    assert_eq!(pipeline.stage_names(), vec!["index-rfam-5s-database-id98", "filter"]);

    let runner = MockRunner::new();
    let executed = runner.executed();
    let (engine, _events) = engine_with_events(runner);
    engine.execute(&mut pipeline).await.unwrap();

    assert_pipeline_completed(&pipeline);
    let commands: Vec<String> = executed.lock().unwrap().iter().map(|c| c.to_string()).collect();
    assert_eq!(
        commands[0],
        format!("indexdb_rna --ref {d}/rfam-5s-database-id98.fasta,{d}/rfam-5s-database-id98.idx")
    );
    assert_eq!(
        commands[1],
        format!(
            "sortmerna --ref {d}/silva-bac-16s-id90.fasta,{d}/silva-bac-16s-id90.idx:{d}/rfam-5s-database-id98.fasta,{d}/rfam-5s-database-id98.idx \
             --reads {d}/reads.fq --aligned {d}/rRNA --other {d}/mRNA --fastx --num_alignments 1 --paired_in"
        )
    );
}

/// A database whose FASTA is missing fails its index stage and the filter never runs
#[tokio::test]
async fn test_missing_database_fasta() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    fs::remove_file(dir.path().join("rfam-5s-database-id98.fasta")).unwrap();

    let runner = MockRunner::new();
    let executed = runner.executed();
    let (engine, _events) = engine_with_events(runner);

    let mut pipeline = config.to_pipeline();
    let err = engine.execute(&mut pipeline).await.unwrap_err();

    assert_eq!(err.failed_stage(), Some((1, "index-rfam-5s-database-id98")));
    assert!(executed.lock().unwrap().is_empty());
    assert_stage_skipped(&pipeline, "filter");
}

/// A SortMeRNA failure carries its exit code and diagnostics
#[tokio::test]
async fn test_sortmerna_failure_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());

    let runner = MockRunner::new().script(
        "sortmerna",
        Script::failing(1, "  [process_batch] ERROR: reads file is empty\n"),
    );
    let (engine, _events) = engine_with_events(runner);

    let mut pipeline = config.to_pipeline();
    let err = engine.execute(&mut pipeline).await.unwrap_err();

    assert_eq!(err.failed_stage(), Some((2, "filter")));
    assert_stage_completed(&pipeline, "index-rfam-5s-database-id98");
    assert_stage_failed(&pipeline, "filter", "reads file is empty");
}

/// Gzipped reads are decompressed before indexing and filtering
#[tokio::test]
async fn test_gzipped_reads_decompressed_before_filter() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path().display().to_string();
    let mut config = setup(dir.path());
    fs::remove_file(dir.path().join("reads.fq")).unwrap();
    fs::write(dir.path().join("reads.fq.gz"), "compressed").unwrap();
    config.reads = dir.path().join("reads.fq.gz");

    let runner = MockRunner::new().script(
        "gunzip",
        Script::ok().creating(dir.path().join("reads.fq"), "@r\nACGU\n+\nIIII\n"),
    );
    let executed = runner.executed();
    let (engine, _events) = engine_with_events(runner);

    let mut pipeline = config.to_pipeline();
    engine.execute(&mut pipeline).await.unwrap();

    assert_pipeline_completed(&pipeline);
    assert_eq!(
        programs(&executed),
        vec!["gunzip", "indexdb_rna", "sortmerna"]
    );
    let commands = executed.lock().unwrap();
    assert_eq!(commands[0].to_string(), format!("gunzip {d}/reads.fq.gz"));
    assert!(commands[2].to_string().contains(&format!("--reads {d}/reads.fq ")));
}

/// A failed decompression stops the job before SortMeRNA
#[tokio::test]
async fn test_failed_decompression_stops_filter() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup(dir.path());
    fs::write(dir.path().join("reads.fq.gz"), "compressed").unwrap();
    fs::remove_file(dir.path().join("reads.fq")).unwrap();
    config.reads = dir.path().join("reads.fq.gz");

    let runner = MockRunner::new().script("gunzip", Script::failing(1, "gzip: not in gzip format"));
    let executed = runner.executed();
    let (engine, _events) = engine_with_events(runner);

    let mut pipeline = config.to_pipeline();
    let err = engine.execute(&mut pipeline).await.unwrap_err();

    assert_eq!(err.failed_stage(), Some((1, "decompress")));
    assert_stage_skipped(&pipeline, "filter");
    assert_eq!(programs(&executed), vec!["gunzip"]);
}
