//! Block-device formatting and mounting on the managed host.
//!
//! Every mount-family operation refuses to touch a device that is already
//! mounted: formatting or re-mounting a live device would be destructive, so
//! the guard aborts before any `mkfs`, `mount`, or fstab command is issued.

use thiserror::Error;

use crate::audit;
use crate::session::{CommandRunner, Session, SessionError};

/// Default filesystem used when none is requested.
pub const DEFAULT_FILESYSTEM: &str = "xfs";

/// Boot-time mount table on the managed host.
pub const FSTAB: &str = "/etc/fstab";

/// Errors raised while validating, formatting, or mounting a device.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum MountError {
    /// Raised when the device is already present in the mounted-filesystem
    /// listing.
    #[error("device ({device}) is already mounted")]
    AlreadyMounted {
        /// Device path that was found mounted.
        device: String,
    },
    /// Raised when the device path does not exist on the host.
    #[error("device ({device}) missing or not attached")]
    NotAttached {
        /// Device path that was expected to exist.
        device: String,
    },
    /// Transport or remote command failure.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Reports whether `device` appears in the mounted-filesystem listing.
///
/// The check is a substring match against `df` output, so a device that is
/// a prefix of a mounted one also reports as mounted.
///
/// # Errors
///
/// Returns [`SessionError`] when the listing cannot be obtained.
pub fn is_mounted<R: CommandRunner>(
    session: &Session<R>,
    device: &str,
) -> Result<bool, SessionError> {
    let output = session.run_unchecked("df")?;
    Ok(output.stdout.contains(device))
}

/// Checks the host for the device, mount point, and filesystem tooling.
///
/// Creates the mount point when missing, installs `xfsprogs` for the xfs
/// case, and loads the kernel filesystem module if it is not already
/// available.
///
/// # Errors
///
/// Returns [`MountError::NotAttached`] when the device path does not exist,
/// or a [`MountError::Session`] for remote command failures.
pub fn validate<R: CommandRunner>(
    session: &Session<R>,
    device: &str,
    mount_point: &str,
    filesystem: &str,
) -> Result<(), MountError> {
    if !session.exists(mount_point)? {
        session.sudo(&format!("mkdir -p {mount_point}"))?;
    }
    if !session.exists(device)? {
        return Err(MountError::NotAttached {
            device: device.to_owned(),
        });
    }

    if filesystem == "xfs" {
        session.sudo("apt-get install -y xfsprogs")?;
    }

    session.sudo(&format!(
        "grep -q {filesystem} /proc/filesystems || modprobe {filesystem}"
    ))?;
    Ok(())
}

/// Formats `device` with `filesystem`, mounts it on `mount_point`, and
/// persists the mount in the boot-time mount table.
///
/// Formatting is unconditional once the guards pass; any existing data on
/// the device is destroyed.
///
/// # Errors
///
/// Returns [`MountError::AlreadyMounted`] when the device is live,
/// [`MountError::NotAttached`] when it does not exist, or a
/// [`MountError::Session`] for remote command failures.
pub fn format_and_mount<R: CommandRunner>(
    session: &Session<R>,
    device: &str,
    mount_point: &str,
    filesystem: &str,
) -> Result<(), MountError> {
    if is_mounted(session, device)? {
        return Err(MountError::AlreadyMounted {
            device: device.to_owned(),
        });
    }
    validate(session, device, mount_point, filesystem)?;
    session.sudo(&format!("mkfs.{filesystem} -f {device}"))?;
    mount_device(session, device, mount_point, filesystem)?;
    fstab_add(session, device, mount_point, filesystem)?;
    audit::commit(
        session,
        &format!("Mounted {device} on {mount_point} using {filesystem}"),
    )?;
    Ok(())
}

/// Mounts `device` on `mount_point` without formatting or persisting.
///
/// # Errors
///
/// Returns [`MountError::AlreadyMounted`] when the device is live,
/// [`MountError::NotAttached`] when it does not exist, or a
/// [`MountError::Session`] for remote command failures.
pub fn mount_device<R: CommandRunner>(
    session: &Session<R>,
    device: &str,
    mount_point: &str,
    filesystem: &str,
) -> Result<(), MountError> {
    if is_mounted(session, device)? {
        return Err(MountError::AlreadyMounted {
            device: device.to_owned(),
        });
    }
    validate(session, device, mount_point, filesystem)?;
    session.sudo(&format!("mount -t {filesystem} {device} {mount_point}"))?;
    Ok(())
}

/// Appends a mount record for the device to the boot-time mount table.
///
/// No duplicate detection is performed; repeated calls append repeated
/// entries.
///
/// # Errors
///
/// Returns [`MountError::NotAttached`] when the device does not exist, or a
/// [`MountError::Session`] for remote command failures.
pub fn fstab_add<R: CommandRunner>(
    session: &Session<R>,
    device: &str,
    mount_point: &str,
    filesystem: &str,
) -> Result<(), MountError> {
    validate(session, device, mount_point, filesystem)?;
    session.sudo(&format!(
        "echo \"{device}  {mount_point}   {filesystem} noatime 0 0\" | tee -a {FSTAB}"
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests;
