// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod import;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use rideboard_app::{Overview, OverviewState, ViewMode, parse_iso_day};
use rideboard_db::{AppointmentQuery, Store};
use runtime::DbRuntime;
use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use time::{Date, OffsetDateTime};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

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

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `rideboard --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    init_logging(&config)?;
    tracing::info!(db = %db_path.display(), demo = options.demo, "starting rideboard");

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or RIDEBOARD_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;

    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    if options.demo {
        store.seed_demo_data(options.date.unwrap_or(now.date()), now.offset())?;
    }

    if let Some(import_path) = &options.import_path {
        let report = import::import_snapshot(&store, import_path)?;
        for rejected in &report.rejected {
            eprintln!("skipped: {rejected}");
        }
        eprintln!(
            "imported {} new and {} updated appointments from {} ({} rejected)",
            report.inserted,
            report.updated,
            import_path.display(),
            report.rejected.len()
        );
    }

    let records = store.list_appointments(&AppointmentQuery::default())?;
    tracing::info!(appointments = records.len(), "loaded schedule");
    if options.check_only {
        return Ok(());
    }

    let state = initial_state(options.date, now.date(), config.default_view());
    let mut overview = Overview::new(records, state);
    let mut runtime = DbRuntime::new(&store);
    let result = rideboard_tui::run_app(&mut overview, &mut runtime, config.calendar_bounds());
    tracing::info!("rideboard stopped");
    result
}

/// The dashboard opens on `--date`, or on today. An explicit `--date`
/// always shows the calendar; otherwise `[ui].default_view` applies.
fn initial_state(date: Option<Date>, today: Date, default_view: ViewMode) -> OverviewState {
    let mut state = OverviewState::for_day(date.unwrap_or(today));
    if date.is_none() {
        state.view_mode = default_view;
    }
    state
}

/// Logs go to a file because the dashboard owns the terminal. `RUST_LOG`
/// wins over `[log].level`.
fn init_logging(config: &Config) -> Result<()> {
    let log_path = config.log_path()?;
    if let Some(parent) = log_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| {
            format!(
                "open log file {} -- set [log].file to a writable path",
                log_path.display()
            )
        })?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.log_level())
            .with_context(|| format!("invalid log level {:?}", config.log_level()))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("install log subscriber")?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    import_path: Option<PathBuf>,
    date: Option<Date>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
        import_path: None,
        date: None,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--import" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--import requires a JSON file path"))?;
                options.import_path = Some(PathBuf::from(value.as_ref()));
            }
            "--date" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--date requires a day in YYYY-MM-DD form"))?;
                let day = parse_iso_day(value.as_ref()).ok_or_else(|| {
                    anyhow!(
                        "invalid --date {:?}; use YYYY-MM-DD, for example 2026-06-15",
                        value.as_ref()
                    )
                })?;
                options.date = Some(day);
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
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
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("rideboard: patient transport schedule");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Launch with seeded demo data (in-memory)");
    println!("  --import <file.json>     Load an appointment snapshot before starting");
    println!("  --date <YYYY-MM-DD>      Open the calendar on this day (default: today)");
    println!("  --check                  Validate config + DB (+ import) and exit");
    println!("  --help                   Show this help");
}
