//! Unit tests for the mount module.

use rstest::rstest;

use super::*;
use crate::test_support::{ScriptedRunner, test_session_config};

const DEVICE: &str = "/dev/xvdf";
const MOUNT_POINT: &str = "/data";

fn session_with(runner: &ScriptedRunner) -> Session<ScriptedRunner> {
    Session::new(test_session_config(), runner.clone()).expect("config should validate")
}

fn df_without_device() -> String {
    String::from(
        "Filesystem     1K-blocks    Used Available Use% Mounted on\n\
         /dev/root       81120644 2340232  78763996   3% /\n",
    )
}

fn df_with_device() -> String {
    format!("{}{DEVICE}       10475520   32928  10442592   1% {MOUNT_POINT}\n", df_without_device())
}

/// Queues the responses consumed by one `validate` pass where the mount
/// point already exists and the device is attached.
fn push_validate_pass(runner: &ScriptedRunner) {
    runner.push_success(); // test -e mount point
    runner.push_success(); // test -e device
    runner.push_success(); // apt-get install xfsprogs
    runner.push_success(); // modprobe guard
}

#[rstest]
fn is_mounted_matches_device_substring() {
    let runner = ScriptedRunner::new();
    runner.push_output(Some(0), df_with_device(), "");
    let session = session_with(&runner);

    assert!(is_mounted(&session, DEVICE).expect("df should succeed"));
}

#[rstest]
fn is_mounted_false_when_absent_from_listing() {
    let runner = ScriptedRunner::new();
    runner.push_output(Some(0), df_without_device(), "");
    let session = session_with(&runner);

    assert!(!is_mounted(&session, DEVICE).expect("df should succeed"));
}

#[rstest]
fn format_and_mount_aborts_on_mounted_device_before_any_mutation() {
    let runner = ScriptedRunner::new();
    runner.push_output(Some(0), df_with_device(), "");
    let session = session_with(&runner);

    let err = format_and_mount(&session, DEVICE, MOUNT_POINT, "xfs")
        .expect_err("mounted device must abort");

    assert_eq!(
        err,
        MountError::AlreadyMounted {
            device: String::from(DEVICE)
        }
    );
    let commands = runner.command_strings();
    assert_eq!(commands.len(), 1, "only the df probe should have run");
    for fragment in ["mkfs", "mount -t", FSTAB] {
        assert!(
            !commands.iter().any(|cmd| cmd.contains(fragment)),
            "no '{fragment}' command may be issued for a mounted device"
        );
    }
}

#[rstest]
fn format_and_mount_issues_mkfs_mount_then_fstab_in_order() {
    let runner = ScriptedRunner::new();
    // format_and_mount: mounted probe + validate (mount point missing).
    runner.push_output(Some(0), df_without_device(), "");
    runner.push_exit_code(1); // test -e mount point: missing
    runner.push_success(); // mkdir -p mount point
    runner.push_success(); // test -e device
    runner.push_success(); // xfsprogs
    runner.push_success(); // modprobe guard
    runner.push_success(); // mkfs
    // mount_device re-runs the guard and validation.
    runner.push_output(Some(0), df_without_device(), "");
    push_validate_pass(&runner);
    runner.push_success(); // mount
    // fstab_add validates once more, then appends.
    push_validate_pass(&runner);
    runner.push_success(); // tee -a /etc/fstab
    runner.push_successes(2); // audit add + commit
    let session = session_with(&runner);

    format_and_mount(&session, DEVICE, MOUNT_POINT, "xfs").expect("unmounted device should mount");

    let commands = runner.command_strings();
    let position = |fragment: &str| {
        commands
            .iter()
            .position(|cmd| cmd.contains(fragment))
            .unwrap_or_else(|| panic!("expected a command containing '{fragment}'"))
    };

    let mkdir = position(&format!("mkdir -p {MOUNT_POINT}"));
    let mkfs = position(&format!("mkfs.xfs -f {DEVICE}"));
    let mount = position(&format!("mount -t xfs {DEVICE} {MOUNT_POINT}"));
    let fstab = position(&format!("tee -a {FSTAB}"));
    assert!(
        mkdir < mkfs && mkfs < mount && mount < fstab,
        "expected mkdir, mkfs, mount, fstab order, got: {commands:#?}"
    );
    assert!(
        commands.iter().any(|cmd| {
            cmd.contains(&format!("{DEVICE}  {MOUNT_POINT}   xfs noatime 0 0"))
        }),
        "fstab record should carry the noatime options, got: {commands:#?}"
    );
}

#[rstest]
fn validate_rejects_unattached_device() {
    let runner = ScriptedRunner::new();
    runner.push_success(); // mount point exists
    runner.push_exit_code(1); // device missing
    let session = session_with(&runner);

    let err = validate(&session, DEVICE, MOUNT_POINT, "xfs")
        .expect_err("missing device must be rejected");

    assert_eq!(
        err,
        MountError::NotAttached {
            device: String::from(DEVICE)
        }
    );
}

#[rstest]
fn validate_skips_xfsprogs_for_other_filesystems() {
    let runner = ScriptedRunner::new();
    runner.push_success(); // mount point exists
    runner.push_success(); // device exists
    runner.push_success(); // modprobe guard
    let session = session_with(&runner);

    validate(&session, DEVICE, MOUNT_POINT, "ext4").expect("validation should pass");

    let commands = runner.command_strings();
    assert!(
        !commands.iter().any(|cmd| cmd.contains("xfsprogs")),
        "ext4 validation must not install xfsprogs, got: {commands:#?}"
    );
    assert!(
        commands
            .iter()
            .any(|cmd| cmd.contains("grep -q ext4 /proc/filesystems || modprobe ext4")),
        "kernel module guard should name the requested filesystem"
    );
}

#[rstest]
fn mount_device_aborts_on_mounted_device() {
    let runner = ScriptedRunner::new();
    runner.push_output(Some(0), df_with_device(), "");
    let session = session_with(&runner);

    let err = mount_device(&session, DEVICE, MOUNT_POINT, "xfs")
        .expect_err("mounted device must abort");

    assert!(matches!(err, MountError::AlreadyMounted { .. }));
}

#[rstest]
fn fstab_add_appends_without_deduplication() {
    let runner = ScriptedRunner::new();
    push_validate_pass(&runner);
    runner.push_success(); // tee
    push_validate_pass(&runner);
    runner.push_success(); // tee again
    let session = session_with(&runner);

    fstab_add(&session, DEVICE, MOUNT_POINT, "xfs").expect("first append should succeed");
    fstab_add(&session, DEVICE, MOUNT_POINT, "xfs").expect("second append should succeed");

    let appends = runner
        .command_strings()
        .iter()
        .filter(|cmd| cmd.contains("tee -a"))
        .count();
    assert_eq!(appends, 2, "each call appends its own record");
}
