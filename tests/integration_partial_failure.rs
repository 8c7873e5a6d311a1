//! A variant of scenario 4 from `spec.md §8` (partial failure, resumable)
//! using two local-path dependencies so the run needs no network: one
//! resolves successfully, the other points at a path that doesn't exist.

mod common;
use common::TestProject;
use predicates::prelude::*;

#[test]
fn one_failing_dependency_does_not_abort_the_others() {
    let project = TestProject::new();

    let good_lib = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(good_lib.path().join("src")).unwrap();

    let deps_file = format!(
        r#"{{ "dependencies": {{ "alpha": "{}", "zzz-nope": "/definitely/does/not/exist" }} }}"#,
        good_lib.path().display()
    );
    project.write_deps_file(&deps_file);

    project
        .pantry_command()
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 installed, 1 failed"));

    assert!(project.path().join("pantry").join("alpha").join("src").exists());
    assert!(project.path().join(".pantry.checkpoint").exists());

    let checkpoint = std::fs::read_to_string(project.path().join(".pantry.checkpoint")).unwrap();
    assert!(checkpoint.contains("alpha"));
    assert!(!checkpoint.contains("zzz-nope"));
}
