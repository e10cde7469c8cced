//! Integration tests for the publishing pipeline
//!
//! ssh and rsync are replaced by stubs on PATH that record their argument
//! lists, so the test can assert the exact remote-operation sequence.

use camino::Utf8Path;
use std::os::unix::fs::PermissionsExt;
use std::sync::Mutex;

use venvdeb_core::config::PublishConfig;
use venvdeb_core::publish::Publisher;

/// The tests below mutate the process-wide PATH and STUB_LOG while the
/// harness runs tests on parallel threads, so every test takes this lock
/// first.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn write_executable(path: &Utf8Path, content: &str) {
    std::fs::write(path, content).unwrap();
    let mut perms = std::fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).unwrap();
}

fn make_stubs(dir: &Utf8Path) {
    // Both stubs append their invocation to $STUB_LOG
    write_executable(
        &dir.join("ssh"),
        "#!/bin/sh\necho \"ssh $*\" >> \"$STUB_LOG\"\n",
    );
    write_executable(
        &dir.join("rsync"),
        "#!/bin/sh\necho \"rsync $*\" >> \"$STUB_LOG\"\n",
    );
}

#[tokio::test]
async fn test_publish_pipeline_remote_operation_sequence() {
    let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = tempfile::tempdir().unwrap();
    let dir = Utf8Path::from_path(temp_dir.path()).unwrap();

    let stub_dir = dir.join("stubs");
    std::fs::create_dir_all(&stub_dir).unwrap();
    make_stubs(&stub_dir);

    let log = dir.join("calls.log");
    std::env::set_var("STUB_LOG", log.as_str());
    std::env::set_var(
        "PATH",
        format!("{}:{}", stub_dir, std::env::var("PATH").unwrap()),
    );

    let deb = dir.join("myapp_1_amd64.deb");
    std::fs::write(&deb, "deb").unwrap();

    let config = PublishConfig::default();
    let publisher = Publisher::new(&config);

    publisher.publish(&deb, "trusty", "main").await.unwrap();

    let calls = std::fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = calls.lines().collect();

    // Admin, one upload per architecture, admin again
    assert_eq!(lines.len(), 4);

    let admin = "ssh apt@repo.internal update-apt-repo --pool pool --release trusty \
                 --component main --architectures amd64,i386 --sign";
    assert_eq!(lines[0], admin);
    assert_eq!(lines[3], admin);

    assert_eq!(
        lines[1],
        format!(
            "rsync -av {} apt@repo.internal:pool/dists/trusty/main/binary-amd64/",
            deb
        )
    );
    assert_eq!(
        lines[2],
        format!(
            "rsync -av {} apt@repo.internal:pool/dists/trusty/main/binary-i386/",
            deb
        )
    );
}

#[tokio::test]
async fn test_publish_missing_archive_makes_no_remote_calls() {
    let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = tempfile::tempdir().unwrap();
    let dir = Utf8Path::from_path(temp_dir.path()).unwrap();

    let log = dir.join("calls.log");

    let config = PublishConfig::default();
    let publisher = Publisher::new(&config);

    let result = publisher
        .publish(&dir.join("no-such.deb"), "trusty", "main")
        .await;

    assert!(result.is_err());
    assert!(!log.exists());
}
