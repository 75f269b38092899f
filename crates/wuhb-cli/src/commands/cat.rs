//! `wuhb cat`: read a whole file out of a bundle.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use wuhb_utils::BinderConfig;

use super::{mount_optional, open_session, MountSpec};

pub fn execute(
    config: &BinderConfig,
    path: &str,
    mount: Option<&MountSpec>,
    cafe: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let session = open_session(config)?;
    let _mounted = mount_optional(&session, mount, cafe)?;

    let content = session
        .read_whole_file(path)
        .with_context(|| format!("failed to read '{}'", path))?;
    tracing::debug!(path, len = content.len(), "file read");

    match output {
        Some(file) => std::fs::write(file, &content[..])
            .with_context(|| format!("failed to write '{}'", file.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&content)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
