use std::fs;
use std::path::Path;

use assert_cmd::Command;
use tempfile::tempdir;

const WORKFLOW: &str = r#"
workflows:
  - name: ci
    resolves: [deploy]
actions:
  - name: build
    uses: docker://golang:1.21
    runs: go build ./...
  - name: deploy
    needs: [build]
    uses: ./deployer
    secrets: [token]
"#;

fn write_workflow(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("workflow.yaml");
    fs::write(&path, content).expect("failed to write workflow file");
    path
}

fn pipewright() -> Command {
    Command::cargo_bin("pipewright").expect("binary present")
}

#[test]
fn create_emits_the_manifest_stream_in_submission_order() {
    let temp = tempdir().unwrap();
    let workflow = write_workflow(temp.path(), WORKFLOW);

    let assert = pipewright()
        .args([
            "create",
            "-f",
            workflow.to_str().unwrap(),
            "--repo",
            "https://github.com/org/repo@main",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("kind: PipelineResource"));
    assert!(stdout.contains("kind: Pipeline"));
    assert!(stdout.contains("kind: PipelineRun"));

    // Resources come before the build task, the pipeline before the run.
    let resource_pos = stdout.find("kind: PipelineResource").unwrap();
    let pipeline_pos = stdout.find("kind: Pipeline\n").unwrap();
    let run_pos = stdout.find("kind: PipelineRun").unwrap();
    assert!(resource_pos < pipeline_pos);
    assert!(pipeline_pos < run_pos);
}

#[test]
fn create_is_deterministic_across_runs() {
    let temp = tempdir().unwrap();
    let workflow = write_workflow(temp.path(), WORKFLOW);

    let run = || {
        let assert = pipewright()
            .args([
                "create",
                "-f",
                workflow.to_str().unwrap(),
                "--repo",
                "https://github.com/org/repo",
                "-o",
                "json",
            ])
            .assert()
            .success();
        String::from_utf8(assert.get_output().stdout.clone()).unwrap()
    };

    assert_eq!(run(), run());
}

#[test]
fn create_fails_for_local_path_without_repo() {
    let temp = tempdir().unwrap();
    let workflow = write_workflow(temp.path(), WORKFLOW);

    pipewright()
        .args(["create", "-f", workflow.to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn parse_round_trips_the_configuration() {
    let temp = tempdir().unwrap();
    let workflow = write_workflow(temp.path(), WORKFLOW);

    let assert = pipewright()
        .args(["parse", "-f", workflow.to_str().unwrap(), "-o", "json"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["workflows"][0]["name"], "ci");
    assert_eq!(parsed["actions"][1]["needs"][0], "build");
}

#[test]
fn validate_rejects_dangling_needs() {
    let temp = tempdir().unwrap();
    let workflow = write_workflow(
        temp.path(),
        r#"
workflows:
  - name: ci
    resolves: [deploy]
actions:
  - name: deploy
    needs: [missing]
    uses: docker://alpine:3.18
"#,
    );

    pipewright()
        .args(["validate", "-f", workflow.to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn validate_accepts_a_clean_workflow() {
    let temp = tempdir().unwrap();
    let workflow = write_workflow(temp.path(), WORKFLOW);

    pipewright()
        .args([
            "validate",
            "-f",
            workflow.to_str().unwrap(),
            "--repo",
            "https://github.com/org/repo",
        ])
        .assert()
        .success();
}
