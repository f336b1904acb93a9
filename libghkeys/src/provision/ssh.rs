// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.
use crate::error::Error;
use nix::unistd::{chown, User};
use std::{
    fs::Permissions,
    io::ErrorKind,
    os::unix::fs::{DirBuilderExt, PermissionsExt},
    path::{Path, PathBuf},
};
use tracing::instrument;

/// Path of the `.ssh` directory inside `home`.
pub(crate) fn ssh_dir(home: &Path) -> PathBuf {
    home.join(".ssh")
}

/// Path of the `authorized_keys` file inside `home`.
pub(crate) fn authorized_keys_path(home: &Path) -> PathBuf {
    ssh_dir(home).join("authorized_keys")
}

/// Create `<home>/.ssh` with mode 0700.
///
/// A directory that already exists (for example one copied from
/// `/etc/skel`) is kept, but its mode is reset to 0700.
#[instrument(skip_all, name = "ssh_dir")]
pub(crate) fn create_ssh_dir(home: &Path) -> Result<PathBuf, Error> {
    let ssh_dir = ssh_dir(home);
    tracing::info!(
        target: "libghkeys::ssh::dir",
        "Adding .ssh directory {}",
        ssh_dir.display()
    );

    match std::fs::DirBuilder::new().mode(0o700).create(&ssh_dir) {
        Ok(()) => {}
        Err(error) if error.kind() == ErrorKind::AlreadyExists => {
            tracing::warn!(
                target: "libghkeys::ssh::dir",
                "{} already exists; resetting its mode to 0700",
                ssh_dir.display()
            );
        }
        Err(error) => return Err(error.into()),
    }

    // The process umask may have masked the mode given at creation.
    std::fs::set_permissions(&ssh_dir, Permissions::from_mode(0o700))?;

    Ok(ssh_dir)
}

/// Give `user` ownership of its `.ssh` directory and `authorized_keys`, and
/// restrict `authorized_keys` to mode 0600.
#[instrument(skip_all, name = "fix_permissions", fields(user = %user.name))]
pub(crate) fn fix_permissions(user: &User) -> Result<(), Error> {
    tracing::info!(
        target: "libghkeys::ssh::permissions",
        "Cleaning up, fixing permissions for {}",
        user.name
    );

    let ssh_dir = ssh_dir(&user.dir);
    let authorized_keys = authorized_keys_path(&user.dir);

    std::fs::set_permissions(&authorized_keys, Permissions::from_mode(0o600))?;
    chown(&ssh_dir, Some(user.uid), Some(user.gid))?;
    chown(&authorized_keys, Some(user.uid), Some(user.gid))?;

    tracing::info!(
        target: "libghkeys::ssh::success",
        "Permissions fixed for {}",
        user.name
    );

    Ok(())
}
