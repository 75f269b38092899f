//! Subcommand implementations and the pieces they share.

pub mod cat;
pub mod exists;
pub mod info;
pub mod rpx;

use anyhow::Context;
use wuhb_utils::{BinderConfig, BundleSource, Session};

/// `NAME=BUNDLE` argument of `--mount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub name: String,
    pub bundle: String,
}

impl std::str::FromStr for MountSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((name, bundle)) if !name.is_empty() && !bundle.is_empty() => Ok(Self {
                name: name.to_string(),
                bundle: bundle.to_string(),
            }),
            _ => Err(format!("expected NAME=BUNDLE, got '{}'", s)),
        }
    }
}

/// Session over the configured module, already initialized.
pub fn open_session(config: &BinderConfig) -> anyhow::Result<Session> {
    let mut session = Session::new(config);
    session
        .init_library()
        .with_context(|| format!("failed to initialize module '{}'", config.module_name))?;
    Ok(session)
}

/// Source selector for `--cafe`.
pub fn bundle_source(cafe: bool) -> BundleSource {
    if cafe {
        BundleSource::FileDescriptorCafeOs
    } else {
        BundleSource::FileDescriptor
    }
}

/// A bundle mounted for the duration of a command.
pub struct Mounted<'a> {
    session: &'a Session,
    name: String,
}

impl<'a> Mounted<'a> {
    pub fn new(
        session: &'a Session,
        spec: &MountSpec,
        source: BundleSource,
    ) -> anyhow::Result<Self> {
        let res = session
            .mount_bundle(&spec.name, &spec.bundle, source)
            .with_context(|| format!("failed to mount '{}' as '{}'", spec.bundle, spec.name))?;
        if res < 0 {
            anyhow::bail!("module could not mount '{}' (result {})", spec.bundle, res);
        }
        tracing::debug!(name = %spec.name, bundle = %spec.bundle, "bundle mounted");
        Ok(Self {
            session,
            name: spec.name.clone(),
        })
    }
}

impl Drop for Mounted<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.session.unmount_bundle(&self.name) {
            tracing::warn!(name = %self.name, error = %err, "unmounting bundle failed");
        }
    }
}

/// Mount `spec` if one was given.
pub fn mount_optional<'a>(
    session: &'a Session,
    spec: Option<&MountSpec>,
    cafe: bool,
) -> anyhow::Result<Option<Mounted<'a>>> {
    spec.map(|spec| Mounted::new(session, spec, bundle_source(cafe)))
        .transpose()
}
