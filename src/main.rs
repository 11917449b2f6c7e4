//! Stormwatch - severe weather notifier.
//!
//! # Usage
//!
//! ```bash
//! # Save the city and where alerts go
//! stormwatch save --city Abuja --phone +2348012345678 --email me@example.com
//!
//! # Run one check now, including the hourly forecast
//! stormwatch check --forecast
//!
//! # Keep checking every `weather.refresh_minutes` until Ctrl-C
//! stormwatch watch
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use stormwatch_core::{App, AppError};
use stormwatch_services::{
    watch, AlertCheck, CheckOutcome, ForecastMode, JsonFileStore, UserRecord, UserRecordStore,
};

#[derive(Parser)]
#[command(name = "stormwatch")]
#[command(author, version, about = "Severe weather alerts by SMS and email")]
struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and store the city and contact details
    Save {
        #[arg(long)]
        city: String,

        /// International format, e.g. +2348012345678
        #[arg(long)]
        phone: String,

        #[arg(long)]
        email: String,
    },
    /// Print the stored details
    Show,
    /// Run one check now
    Check {
        /// Also look at the hourly forecast, whatever the time of day
        #[arg(long)]
        forecast: bool,
    },
    /// Check periodically until interrupted
    Watch,
    /// Send current conditions over both channels
    TestNotify,
}

#[tokio::main]
async fn main() -> Result<()> {
    stormwatch_core::init()?;

    let cli = Cli::parse();
    let app = App::new(cli.config.as_deref()).context("Startup failed")?;

    let result = run(&app, cli.command).await;
    app.shutdown();
    result
}

async fn run(app: &App, command: Commands) -> Result<()> {
    let store = JsonFileStore::new(app.config().record_path());

    match command {
        Commands::Save { city, phone, email } => {
            let record = UserRecord::new(city, phone, email);
            if let Err(problems) = record.validate() {
                for problem in &problems {
                    eprintln!("  - {}", problem);
                }
                return Err(explain(AppError::Validation(problems.join("; "))));
            }
            store.save(&record).map_err(|e| explain(e.into()))?;
            println!("Saved {} -> {} / {}", record.city, record.phone, record.email);
        }
        Commands::Show => match store.load().map_err(|e| explain(e.into()))? {
            Some(record) => {
                println!("City:  {}", record.city);
                println!("Phone: {}", record.phone);
                println!("Email: {}", record.email);
            }
            None => println!("Nothing saved yet. Run `stormwatch save` first."),
        },
        Commands::Check { forecast } => {
            let record = saved_record(&store)?;
            let check = AlertCheck::from_app(app).map_err(explain)?;
            let mode = if forecast {
                ForecastMode::Always
            } else {
                ForecastMode::Auto
            };
            let outcome = check.run(&record, mode).await.map_err(explain)?;
            print_outcome(&outcome);
        }
        Commands::Watch => {
            let check = AlertCheck::from_app(app).map_err(explain)?;
            let every = Duration::from_secs(u64::from(app.config().weather.refresh_minutes) * 60);
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Could not listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            };
            let stats = watch(&check, &store, every, shutdown).await;
            println!(
                "Ran {} check(s): {} alert(s), {} failure(s)",
                stats.cycles, stats.alerts, stats.failures
            );
        }
        Commands::TestNotify => {
            let record = saved_record(&store)?;
            let check = AlertCheck::from_app(app).map_err(explain)?;
            let result = check.send_test_notification(&record).await.map_err(explain)?;
            println!("SMS sent:   {}", result.sms_sent);
            println!("Email sent: {}", result.email_sent);
            for error in &result.errors {
                println!("  {}", error);
            }
            if !result.any_sent() {
                bail!("Test notification was not delivered on any channel");
            }
        }
    }

    Ok(())
}

fn saved_record(store: &JsonFileStore) -> Result<UserRecord> {
    match store.load().map_err(|e| explain(e.into()))? {
        Some(record) => Ok(record),
        None => bail!(
            "No details saved at {}. Run `stormwatch save` first.",
            store.path().display()
        ),
    }
}

/// Lead with the friendly message and keep the technical one as context.
fn explain(e: AppError) -> anyhow::Error {
    let friendly = e.user_message();
    anyhow::Error::new(e).context(friendly)
}

fn print_outcome(outcome: &CheckOutcome) {
    println!("Weather in {}: {}", outcome.city, outcome.current.description);
    println!("{}", outcome.decision.message);

    if let Some(hit) = &outcome.forecast {
        println!(
            "Forecast in {} hour(s): {} ({})",
            hit.hours_ahead, hit.snapshot.description, hit.decision.message
        );
    } else if outcome.forecast_checked {
        println!("No severe weather in the forecast");
    }

    match &outcome.dispatch {
        Some(result) => {
            println!("SMS sent:   {}", result.sms_sent);
            println!("Email sent: {}", result.email_sent);
            for error in &result.errors {
                println!("  {}", error);
            }
        }
        None => println!("No alert sent"),
    }
}
