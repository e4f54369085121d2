//! Installer mode (`nametag --update-install <staging> <target>`) run as a
//! real process.

use predicates::prelude::*;

mod common;
use common::TestEnv;

const FAST_INSTALL: &str = "[upgrade]\ninstall_delay_ms = 0\nreplace_attempts = 2\n";

#[test]
fn test_installer_without_paths_fails_and_touches_nothing() {
    let env = TestEnv::with_config(FAST_INSTALL);
    let staging = env.path().join("nametag-update-1");
    std::fs::write(&staging, b"new build").unwrap();

    env.nametag_command()
        .arg("--update-install")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Hello").not())
        .stderr(predicate::str::contains("--update-install <staging> <target>"));

    assert_eq!(std::fs::read(&staging).unwrap(), b"new build");
}

#[test]
fn test_installer_with_one_path_fails_and_touches_nothing() {
    let env = TestEnv::with_config(FAST_INSTALL);
    let staging = env.path().join("nametag-update-1");
    std::fs::write(&staging, b"new build").unwrap();
    let before: Vec<_> = std::fs::read_dir(env.path()).unwrap().map(|e| e.unwrap().path()).collect();

    env.nametag_command().arg("--update-install").arg(&staging).assert().failure().code(1);

    let after: Vec<_> = std::fs::read_dir(env.path()).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(before, after);
    assert_eq!(std::fs::read(&staging).unwrap(), b"new build");
}

#[test]
fn test_installer_failure_keeps_original_binary() {
    let env = TestEnv::with_config(FAST_INSTALL);
    let staging = env.path().join("nametag-update-missing");
    let target = env.path().join("nametag");
    std::fs::write(&target, b"working build").unwrap();

    env.nametag_command()
        .arg("--update-install")
        .arg(&staging)
        .arg(&target)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to replace"));

    assert_eq!(std::fs::read(&target).unwrap(), b"working build");
    assert!(!env.path().join("nametag.backup").exists());
}

#[cfg(unix)]
mod unix {
    use super::*;
    use nametag_cli::test_utils::write_fake_binary;
    use std::os::unix::fs::PermissionsExt;

    // The installer relaunches the target; a script that exits at once keeps
    // the relaunch harmless.
    const NEW_BUILD: &[u8] = b"#!/bin/sh\nexit 0\n";

    #[test]
    fn test_installer_creates_missing_target() {
        let env = TestEnv::with_config(FAST_INSTALL);
        let staging = env.path().join("nametag-update-2");
        let target = env.path().join("bin").join("nametag");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&staging, NEW_BUILD).unwrap();

        env.nametag_command().arg("--update-install").arg(&staging).arg(&target).assert().success();

        assert_eq!(std::fs::read(&target).unwrap(), NEW_BUILD);
        assert!(!staging.exists());
        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_installer_replaces_existing_target() {
        let env = TestEnv::with_config(FAST_INSTALL);
        let staging = env.path().join("nametag-update-3");
        let target = env.path().join("nametag");
        write_fake_binary(&target, b"#!/bin/sh\necho old\n").unwrap();
        std::fs::write(&staging, NEW_BUILD).unwrap();

        env.nametag_command().arg("--update-install").arg(&staging).arg(&target).assert().success();

        assert_eq!(std::fs::read(&target).unwrap(), NEW_BUILD);
        assert!(!staging.exists());
        assert!(!env.path().join("nametag.backup").exists());
    }
}
