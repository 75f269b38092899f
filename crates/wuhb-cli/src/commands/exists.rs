//! `wuhb exists`: check whether a file exists inside a bundle.

use anyhow::Context;
use wuhb_utils::BinderConfig;

use super::{mount_optional, open_session, MountSpec};

/// Returns whether the file exists.
pub fn execute(
    config: &BinderConfig,
    path: &str,
    mount: Option<&MountSpec>,
    cafe: bool,
) -> anyhow::Result<bool> {
    let session = open_session(config)?;
    let _mounted = mount_optional(&session, mount, cafe)?;

    let exists = session
        .file_exists(path)
        .with_context(|| format!("failed to check '{}'", path))?;
    println!("{}", if exists { "yes" } else { "no" });
    Ok(exists)
}
