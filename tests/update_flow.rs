//! Full update cycle through the library API: manifest check, download,
//! handoff, then the installer run in-process on what was handed off.

use nametag_cli::constants::INSTALLER_FLAG;
use nametag_cli::test_utils::{RecordingSpawner, init_test_logging, manifest_for, write_fake_binary};
use nametag_cli::upgrade::config::{UpgradeConfig, VersionPolicy};
use nametag_cli::upgrade::{InstallRequest, Installer, ReplaceStrategy, UpdateOutcome, Updater};
use nametag_cli::utils::Platform;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Setup {
    server: MockServer,
    dir: TempDir,
    config: UpgradeConfig,
    target: PathBuf,
}

async fn setup(version: &str) -> Setup {
    init_test_logging(None);
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest_for(version, &server.uri())))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let target = dir.path().join("nametag");
    write_fake_binary(&target, b"nametag 1.0.0").unwrap();

    let config = UpgradeConfig {
        staging_dir: Some(dir.path().join("staging")),
        install_delay_ms: 0,
        ..UpgradeConfig::default()
    };

    Setup {
        server,
        dir,
        config,
        target,
    }
}

#[tokio::test]
async fn test_update_then_install() {
    let s = setup("2.0.0").await;
    Mock::given(method("GET"))
        .and(path("/bin/linux"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"nametag 2.0.0".to_vec()))
        .expect(1)
        .mount(&s.server)
        .await;

    let spawner = Arc::new(RecordingSpawner::new());
    let updater = Updater::new(&s.config, s.target.clone())
        .unwrap()
        .with_spawner(spawner.clone())
        .with_platform(Platform::Other)
        .with_current_version("1.0.0");

    let outcome = updater.check_and_update(&format!("{}/latest.json", s.server.uri())).await;
    let UpdateOutcome::HandedOff {
        staging, ..
    } = outcome
    else {
        panic!("expected handoff, got {outcome:?}");
    };

    // The handoff carried exactly (flag, staging, target).
    let calls = spawner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].args,
        vec![OsString::from(INSTALLER_FLAG), staging.clone().into_os_string(), s.target.clone().into_os_string()]
    );

    // Play the installer's part with the recorded arguments.
    let args: Vec<PathBuf> = calls[0].args[1..].iter().map(PathBuf::from).collect();
    let request = InstallRequest::from_args(&args).unwrap();
    let relauncher = Arc::new(RecordingSpawner::new());
    let report = Installer::new(s.config.clone(), relauncher.clone()).run(&request).await.unwrap();

    assert_eq!(report.strategy, ReplaceStrategy::Rename);
    assert!(report.backed_up);
    assert!(report.relaunched);
    assert_eq!(std::fs::read(&s.target).unwrap(), b"nametag 2.0.0");
    assert!(!staging.exists());
    assert!(!s.dir.path().join("nametag.backup").exists());
    assert_eq!(relauncher.calls()[0].program, s.target);
}

#[tokio::test]
async fn test_same_version_leaves_target_alone() {
    let s = setup("1.0.0").await;
    Mock::given(method("GET"))
        .and(path("/bin/linux"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&s.server)
        .await;

    let spawner = Arc::new(RecordingSpawner::new());
    let updater = Updater::new(&s.config, s.target.clone())
        .unwrap()
        .with_spawner(spawner.clone())
        .with_platform(Platform::Other)
        .with_current_version("1.0.0");

    let outcome = updater.check_and_update(&format!("{}/latest.json", s.server.uri())).await;

    assert_eq!(outcome, UpdateOutcome::UpToDate);
    assert!(spawner.calls().is_empty());
    assert_eq!(std::fs::read(&s.target).unwrap(), b"nametag 1.0.0");
}

#[tokio::test]
async fn test_newer_policy_ignores_older_release() {
    let mut s = setup("0.9.0").await;
    s.config.version_policy = VersionPolicy::Newer;

    let spawner = Arc::new(RecordingSpawner::new());
    let updater = Updater::new(&s.config, s.target.clone())
        .unwrap()
        .with_spawner(spawner.clone())
        .with_platform(Platform::Other)
        .with_current_version("1.0.0");

    let outcome = updater.check_and_update(&format!("{}/latest.json", s.server.uri())).await;

    assert_eq!(outcome, UpdateOutcome::UpToDate);
    assert!(spawner.calls().is_empty());
}
