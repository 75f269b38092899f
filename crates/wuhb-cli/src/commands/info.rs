//! `wuhb info`: bind the module and report its version and capabilities.

use wuhb_utils::{BinderConfig, Capability};

use super::open_session;
use crate::output::StyledOutput;

pub fn execute(config: &BinderConfig, json: bool, out: &mut StyledOutput) -> anyhow::Result<()> {
    let session = open_session(config)?;
    let version = session.version().unwrap_or_default();

    if json {
        let capabilities: serde_json::Map<String, serde_json::Value> = Capability::ALL
            .into_iter()
            .map(|c| (c.as_str().to_string(), serde_json::Value::Bool(session.has(c))))
            .collect();
        let report = serde_json::json!({
            "module": config.module_name,
            "version": version,
            "capabilities": capabilities,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    out.bold("Module:");
    out.plain(&format!("       {}\n", config.module_name));
    out.bold("Version:");
    out.plain(&format!("      {}\n", version));
    out.newline();
    out.bold("Capabilities:");
    out.newline();
    for capability in Capability::ALL {
        out.plain(&format!("  {:<16}", capability.export_name()));
        if session.has(capability) {
            out.success("available");
        } else {
            out.error("missing");
        }
        out.newline();
    }

    Ok(())
}
