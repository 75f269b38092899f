//! `wuhb`: command-line access to the WUHB bundle utilities module
//!
//! Binds the module, optionally mounts a bundle, and runs one operation:
//! capability report, existence check, whole-file read or RPX lookup.

mod commands;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wuhb_utils::BinderConfig;

use commands::MountSpec;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "WUHB_LOG";

#[derive(Parser)]
#[command(name = "wuhb")]
#[command(about = "Inspect the WUHB utilities module and its bundles", long_about = None)]
#[command(version)]
struct Cli {
    /// Module name or path to the module file
    #[arg(long, global = true)]
    module: Option<String>,

    /// Directory searched for the module (repeatable)
    #[arg(long = "search-path", global = true)]
    search_paths: Vec<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Color output: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the module version and available capabilities
    Info {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a file exists (exit code 1 if it does not)
    Exists {
        /// File path, e.g. "app:/meta/meta.ini"
        path: String,
        /// Mount a bundle first (NAME=BUNDLE)
        #[arg(long)]
        mount: Option<MountSpec>,
        /// Bundle path is a native path
        #[arg(long)]
        cafe: bool,
    },

    /// Print a whole file
    Cat {
        /// File path, e.g. "app:/meta/iconTex.tga"
        path: String,
        /// Mount a bundle first (NAME=BUNDLE)
        #[arg(long)]
        mount: Option<MountSpec>,
        /// Bundle path is a native path
        #[arg(long)]
        cafe: bool,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show where the executable payload lives inside a bundle
    Rpx {
        /// Bundle path
        bundle: String,
        /// Bundle path is a native path
        #[arg(long)]
        cafe: bool,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Configuration file (or environment), then command-line overrides.
    fn binder_config(&self) -> anyhow::Result<BinderConfig> {
        let mut config = match &self.config {
            Some(path) => BinderConfig::from_file(path)
                .with_context(|| format!("failed to load config '{}'", path.display()))?,
            None => BinderConfig::from_env()?,
        };
        if let Some(module) = &self.module {
            config.module_name = module.clone();
        }
        config.search_paths.extend_from_slice(&self.search_paths);
        config.validate()?;
        Ok(config)
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = cli.binder_config()?;
    let mut out = output::StyledOutput::new(output::resolve_color_choice(cli.color.as_deref()));

    match cli.command {
        Commands::Info { json } => commands::info::execute(&config, json, &mut out)?,
        Commands::Exists { path, mount, cafe } => {
            if !commands::exists::execute(&config, &path, mount.as_ref(), cafe)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Cat {
            path,
            mount,
            cafe,
            output,
        } => commands::cat::execute(&config, &path, mount.as_ref(), cafe, output.as_deref())?,
        Commands::Rpx { bundle, cafe, json } => {
            commands::rpx::execute(&config, &bundle, cafe, json)?
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_logging();
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_info() {
        let cli = Cli::try_parse_from(["wuhb", "info", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Info { json: true }));
    }

    #[test]
    fn test_parse_cat_with_mount() {
        let cli = Cli::try_parse_from([
            "wuhb",
            "cat",
            "app:/meta/meta.ini",
            "--mount",
            "app=fs:/vol/external01/app.wuhb",
            "-o",
            "meta.ini",
        ])
        .unwrap();
        match cli.command {
            Commands::Cat {
                path,
                mount,
                cafe,
                output,
            } => {
                assert_eq!(path, "app:/meta/meta.ini");
                assert_eq!(mount.unwrap().name, "app");
                assert!(!cafe);
                assert_eq!(output, Some(PathBuf::from("meta.ini")));
            }
            _ => panic!("expected cat"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_mount() {
        let args = ["wuhb", "exists", "app:/x", "--mount", "app"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "wuhb",
            "rpx",
            "/vol/external01/app.wuhb",
            "--cafe",
            "--module",
            "/opt/libwuhb.so",
            "--search-path",
            "/a",
            "--search-path",
            "/b",
        ])
        .unwrap();
        assert_eq!(cli.module.as_deref(), Some("/opt/libwuhb.so"));
        assert_eq!(
            cli.search_paths,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        match cli.command {
            Commands::Rpx { cafe, json, .. } => assert!(cafe && !json),
            _ => panic!("expected rpx"),
        }
    }

    #[test]
    fn test_config_file_with_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let toml = "module_name = \"from_file\"\nsearch_paths = [\"/etc/wuhb\"]\n";
        file.write_all(toml.as_bytes()).unwrap();
        let config_path = file.path().to_str().unwrap().to_string();

        let cli = Cli::try_parse_from([
            "wuhb",
            "info",
            "--config",
            config_path.as_str(),
            "--search-path",
            "/extra",
        ])
        .unwrap();
        let config = cli.binder_config().unwrap();
        assert_eq!(config.module_name, "from_file");
        assert_eq!(
            config.search_paths,
            vec![PathBuf::from("/etc/wuhb"), PathBuf::from("/extra")]
        );

        let cli = Cli::try_parse_from([
            "wuhb",
            "info",
            "--config",
            config_path.as_str(),
            "--module",
            "override",
        ])
        .unwrap();
        assert_eq!(cli.binder_config().unwrap().module_name, "override");
    }

    #[test]
    fn test_empty_module_override_is_rejected() {
        let cli = Cli::try_parse_from(["wuhb", "info", "--module", ""]).unwrap();
        assert!(cli.binder_config().is_err());
    }
}
