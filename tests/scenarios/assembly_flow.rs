//! Test: Assembly Flow - assemble, index, align, MetaQUAST, then the report row

use crate::helpers::*;
use metassembly::workflow::{AssemblyConfig, AssemblyLayout, AssemblyWorkflow};
use metassembly::PipelineError;
use std::fs;
use std::path::{Path, PathBuf};

const BOWTIE2_LOG: &str = "\
10000 reads; of these:
  10000 (100.00%) were paired; of these:
    650 (6.50%) aligned concordantly 0 times
97.34% overall alignment rate
";

const QUAST_REPORT: &str = "Assembly\tcontigs\n# contigs\t1204\nN50\t3412\n";

fn job(dir: &Path, assembler: &str) -> AssemblyConfig {
    fs::write(dir.join("EST6_forward_paired.fq"), "@r\nA\n+\nI\n").unwrap();
    fs::write(dir.join("EST6_reverse_paired.fq"), "@r\nT\n+\nI\n").unwrap();
    let yaml = format!(
        r#"
name: "EST6"
assembler: {assembler}
out_dir: "{dir}/MGMP"
forward: "{dir}/EST6_forward_paired.fq"
reverse: "{dir}/EST6_reverse_paired.fq"
options:
  memory: "200"
"#,
        assembler = assembler,
        dir = dir.display()
    );
    AssemblyConfig::from_yaml(&yaml).unwrap()
}

/// Bowtie2 writing its alignment and reporting on stderr
fn aligner(layout: &AssemblyLayout, log: &str) -> Script {
    Script::ok()
        .with_stderr(log)
        .creating(&layout.alignment, "@HD\tVN:1.0\n")
}

fn qc_dir(dir: &Path) -> PathBuf {
    dir.join("MGMP/Assembly/EST6/quality_control")
}

/// The full chain runs and the alignment rate lands at the end of MetaQUAST's report
#[tokio::test]
async fn test_metaspades_assembly_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = job(dir.path(), "metaspades");
    let layout = config.layout();

    let runner = MockRunner::new()
        .script(
            "metaspades.py",
            Script::ok().creating(&layout.contigs, ">NODE_1_length_500\nACGT\n"),
        )
        .script("bowtie2", aligner(&layout, BOWTIE2_LOG))
        .script(
            "metaquast.py",
            Script::ok().creating(qc_dir(dir.path()).join("combined_reference/report.tsv"), QUAST_REPORT),
        );
    let executed = runner.executed();
    let (engine, _events) = engine_with_events(runner);

    let outcome = AssemblyWorkflow::new(config).run(&engine).await.unwrap();

    assert_pipeline_completed(&outcome.pipeline);
    assert_eq!(
        programs(&executed),
        vec!["metaspades.py", "bowtie2-build", "bowtie2", "metaquast.py"]
    );

    assert_eq!(outcome.report.reads_aligned, "97.34");
    assert_eq!(outcome.report.path, qc_dir(dir.path()).join("report.tsv"));
    let report = fs::read_to_string(&outcome.report.path).unwrap();
    assert_eq!(report, format!("{}Reads aligned (%)\t97.34\n", QUAST_REPORT));
    assert!(!qc_dir(dir.path()).join("combined_reference/report.tsv").exists());
    assert_eq!(fs::read_to_string(&layout.alignment_log).unwrap(), BOWTIE2_LOG);
}

/// Commands for each stage carry the derived paths and the thread count
#[tokio::test]
async fn test_assembly_command_lines() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path().display().to_string();
    let config = job(dir.path(), "metaspades");
    let layout = config.layout();

    let runner = MockRunner::new()
        .script("metaspades.py", Script::ok().creating(&layout.contigs, ">c\nA\n"))
        .script("bowtie2", aligner(&layout, BOWTIE2_LOG));
    let executed = runner.executed();
    let (engine, _events) = engine_with_events(runner);

    AssemblyWorkflow::new(config).run(&engine).await.unwrap();

    let commands: Vec<String> = executed.lock().unwrap().iter().map(|c| c.to_string()).collect();
    let asm = format!("{d}/MGMP/Assembly/EST6");
    let qc = format!("{asm}/quality_control");
    assert_eq!(
        commands[0],
        format!(
            "metaspades.py -o {asm} -1 {d}/EST6_forward_paired.fq -2 {d}/EST6_reverse_paired.fq --memory 200 --threads 6"
        )
    );
    assert_eq!(
        commands[1],
        format!("bowtie2-build {asm}/contigs.fasta {qc}/index --threads 6")
    );
    assert_eq!(
        commands[2],
        format!(
            "bowtie2 -x {qc}/index -1 {d}/EST6_forward_paired.fq -2 {d}/EST6_reverse_paired.fq -S {qc}/library.sam -a -q -p 6"
        )
    );
    assert_eq!(
        commands[3],
        format!("metaquast.py --output-dir {qc} {asm}/contigs.fasta --threads 6")
    );
}

/// Without a MetaQUAST report the row starts a fresh report.tsv
#[tokio::test]
async fn test_megahit_without_combined_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = job(dir.path(), "megahit");
    let layout = config.layout();
    assert!(layout.contigs.ends_with("final.contigs.fa"));

    let runner = MockRunner::new()
        .script("megahit", Script::ok().creating(&layout.contigs, ">k141_0\nACGT\n"))
        .script("bowtie2", aligner(&layout, "81.02% overall alignment rate\n\n"));
    let executed = runner.executed();
    let (engine, _events) = engine_with_events(runner);

    let outcome = AssemblyWorkflow::new(config).run(&engine).await.unwrap();

    let first = executed.lock().unwrap()[0].clone();
    assert_eq!(first.program(), "megahit");
    assert_eq!(first.args()[0], "-f");
    assert_eq!(
        fs::read_to_string(&outcome.report.path).unwrap(),
        "Reads aligned (%)\t81.02\n"
    );
}

/// An empty aligner log fails the report step, reported as the stage after the last one
#[tokio::test]
async fn test_empty_alignment_log_fails_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = job(dir.path(), "metaspades");
    let layout = config.layout();

    let runner = MockRunner::new()
        .script("metaspades.py", Script::ok().creating(&layout.contigs, ">c\nA\n"))
        .script("bowtie2", aligner(&layout, "\n  \n"));
    let (engine, _events) = engine_with_events(runner);

    let err = AssemblyWorkflow::new(config).run(&engine).await.unwrap_err();

    assert_eq!(err.failed_stage(), Some((5, "report")));
    assert!(matches!(err.root(), PipelineError::Report { .. }));
}

/// An assembler that exits cleanly without writing contigs fails its own stage
#[tokio::test]
async fn test_assembler_without_contigs_fails_assemble() {
    let dir = tempfile::tempdir().unwrap();
    let config = job(dir.path(), "metaspades");

    let runner = MockRunner::new();
    let executed = runner.executed();
    let (engine, _events) = engine_with_events(runner);

    let err = AssemblyWorkflow::new(config).run(&engine).await.unwrap_err();

    assert_eq!(err.failed_stage(), Some((1, "assemble")));
    match err.root() {
        PipelineError::MissingFile { path } => assert!(path.ends_with("contigs.fasta")),
        other => panic!("expected a missing file error, got {:?}", other),
    }
    assert_eq!(programs(&executed), vec!["metaspades.py"]);
}

/// A launcher override replaces the program and prefixes its own arguments
#[tokio::test]
async fn test_launcher_override() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = job(dir.path(), "metaspades");
    config.tools.set(
        metassembly::Tool::MetaSpades,
        metassembly::core::config::Launcher::Command(vec![
            "python".to_string(),
            "/opt/SPAdes/bin/metaspades.py".to_string(),
        ]),
    );
    let layout = config.layout();

    let runner = MockRunner::new()
        .script("python", Script::ok().creating(&layout.contigs, ">c\nA\n"))
        .script("bowtie2", aligner(&layout, BOWTIE2_LOG));
    let executed = runner.executed();
    let (engine, _events) = engine_with_events(runner);

    AssemblyWorkflow::new(config).run(&engine).await.unwrap();

    let first = executed.lock().unwrap()[0].clone();
    assert_eq!(first.program(), "python");
    assert_eq!(first.args()[0], "/opt/SPAdes/bin/metaspades.py");
    assert_eq!(first.args()[1], "-o");
}

/// Extra libraries are passed to MetaSPAdes and must exist before it starts
#[tokio::test]
async fn test_extra_libraries_checked_and_passed() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path().display().to_string();
    let mut config = job(dir.path(), "metaspades");
    config.se_libraries = vec![dir.path().join("single.fq")];
    config.validate().unwrap();

    let runner = MockRunner::new();
    let executed = runner.executed();
    let (engine, _events) = engine_with_events(runner);

    let err = AssemblyWorkflow::new(config.clone()).run(&engine).await.unwrap_err();
    assert_eq!(err.failed_stage(), Some((1, "assemble")));
    assert!(matches!(err.root(), PipelineError::MissingFile { path } if path.ends_with("single.fq")));
    assert!(executed.lock().unwrap().is_empty());

    fs::write(dir.path().join("single.fq"), "@r\nA\n+\nI\n").unwrap();
    let layout = config.layout();
    let runner = MockRunner::new()
        .script("metaspades.py", Script::ok().creating(&layout.contigs, ">c\nA\n"))
        .script("bowtie2", aligner(&layout, BOWTIE2_LOG));
    let executed = runner.executed();
    let (engine, _events) = engine_with_events(runner);

    AssemblyWorkflow::new(config).run(&engine).await.unwrap();
    let first = executed.lock().unwrap()[0].to_string();
    assert!(first.ends_with(&format!("--memory 200 --s1 {d}/single.fq --threads 6")));
}
