//! `wuhb rpx`: locate the executable payload inside a bundle.

use anyhow::Context;
use wuhb_utils::BinderConfig;

use super::{bundle_source, open_session};

pub fn execute(config: &BinderConfig, bundle: &str, cafe: bool, json: bool) -> anyhow::Result<()> {
    let session = open_session(config)?;
    let info = session
        .get_rpx_info(bundle, bundle_source(cafe))
        .with_context(|| format!("failed to get RPX info for '{}'", bundle))?;

    if json {
        let report = serde_json::json!({
            "bundle": bundle,
            "offset": info.offset,
            "length": info.length,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Offset: {:#x}", info.offset);
        println!("Length: {:#x} ({} bytes)", info.length, info.length);
    }
    Ok(())
}
