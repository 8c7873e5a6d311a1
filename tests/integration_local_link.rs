//! Scenario 5 from `spec.md §8`: a `link:` dependency is materialized via
//! symlinks, and executables under its `zig-out/bin` are linked into
//! `pantry/.bin`, all without any network access.

mod common;
use common::TestProject;

#[test]
fn link_dependency_wires_src_symlink_and_bin_executables() {
    let project = TestProject::new();
    project.write_deps_file(r#"{ "dependencies": { "mylib": "link:mylib" } }"#);

    let source_lib = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(source_lib.path().join("src")).unwrap();
    std::fs::write(source_lib.path().join("src").join("lib.rs"), "// lib").unwrap();
    std::fs::create_dir_all(source_lib.path().join("zig-out").join("bin")).unwrap();
    std::fs::write(
        source_lib.path().join("zig-out").join("bin").join("mylib-cli"),
        "#!/bin/sh\necho hi\n",
    )
    .unwrap();

    std::fs::create_dir_all(project.links_dir()).unwrap();
    #[cfg(unix)]
    std::os::unix::fs::symlink(source_lib.path(), project.links_dir().join("mylib")).unwrap();

    project.pantry_command().arg("install").assert().success();

    assert!(project.path().join("pantry").join("mylib").join("src").exists());
    assert!(project
        .path()
        .join("pantry")
        .join(".bin")
        .join("mylib-cli")
        .exists());
}
