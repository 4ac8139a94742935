use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn invalid_input_path_exits_with_code_2() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("keyframe-extractor").unwrap();
    cmd.arg(dir.path().join("does-not-exist.mp4"))
        .arg("--out")
        .arg(dir.path().join("out"))
        .assert()
        .code(2)
        .stderr(contains("invalid input path"));
}

#[test]
fn input_path_that_is_a_directory_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("keyframe-extractor").unwrap();
    cmd.arg(dir.path()).arg("--out").arg(dir.path().join("out")).assert().code(2);
}
