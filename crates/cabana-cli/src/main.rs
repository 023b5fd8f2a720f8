// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use cabana_app::{AppState, TabKind, ViewState};
use cabana_store::Store;
use cabana_store::memory::MemoryBackend;
use config::Config;
use runtime::StoreRuntime;
use std::env;
use std::io::IsTerminal;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    init_tracing();

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `cabana --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let view = options
        .view
        .as_deref()
        .map(ViewState::parse)
        .unwrap_or_default();

    let mut state = AppState::default();
    if !config.show_dashboard() {
        state.active_tab = TabKind::Cabins;
    }

    if options.demo {
        if options.check_only {
            return Ok(());
        }
        let mut runtime = StoreRuntime::new(Store::new(MemoryBackend::demo()));
        return cabana_tui::run_app(&mut state, &mut runtime, view);
    }

    let client = cabana_api::Client::new(
        config.base_url(),
        &config.api_key()?,
        config.bucket(),
        config.timeout()?,
    )
    .with_context(|| {
        format!(
            "invalid [backend] config in {}; fix base_url/api_key/bucket/timeout values",
            options.config_path.display()
        )
    })?;
    if options.check_only {
        return Ok(());
    }

    let mut runtime = StoreRuntime::new(Store::new(client));
    cabana_tui::run_app(&mut state, &mut runtime, view)
}

// Silent unless CABANA_LOG asks for output; the alternate screen owns
// stdout, so diagnostics go to stderr.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("CABANA_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    view: Option<String>,
    demo: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        view: None,
        demo: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--view" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow::anyhow!(
                        "--view requires a query string such as \"discount=with-discount&sortBy=name-desc\""
                    )
                })?;
                options.view = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("cabana");
    println!("  --config <path>          Use a specific config path");
    println!("  --view <query>           Start with a view state, e.g. \"sortBy=regularPrice-desc\"");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch against seeded in-memory data (no network)");
    println!("  --check                  Validate config and backend client setup, then exit");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args};
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/cabana-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_example: false,
                view: None,
                demo: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_captures_the_view_query() -> Result<()> {
        let options = parse_cli_args(
            vec!["--view", "discount=no-discount&sortBy=name-desc"],
            default_options_path(),
        )?;
        assert_eq!(
            options.view.as_deref(),
            Some("discount=no-discount&sortBy=name-desc")
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));

        let error = parse_cli_args(vec!["--view"], default_options_path())
            .expect_err("missing view value should fail");
        assert!(error.to_string().contains("--view requires a query string"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_flag_combinations() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.demo);
        assert!(!options.show_help);

        let options = parse_cli_args(vec!["--demo"], default_options_path())?;
        assert!(options.demo);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }
}
