mod alerts;
mod api;
mod db;
mod digest;
mod router;
mod scheduler;
mod simulate;
mod startup;
mod state;
mod store;

use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rotator_core::{Config, DutyId};

#[derive(Debug, Parser)]
#[command(name = "rotator", version, about = "Team duty rotation service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP server and the cron trigger (default).
    Serve,
    /// Run one advancement pass and print the results.
    Advance {
        /// Date to advance to (defaults to today in the configured offset).
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Only advance this duty.
        #[arg(long)]
        duty: Option<i64>,
    },
    /// Render the daily digest and post it to the team channel.
    Digest {
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Print the digest instead of sending it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Forecast a rotation in memory, weekends off.
    Simulate {
        /// Rotation rule, e.g. `weekly_monday`.
        #[arg(long)]
        rule: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        until: NaiveDate,
        /// Comma-separated member handles, in rotation order.
        #[arg(long, value_delimiter = ',', required = true)]
        members: Vec<String>,
    },
}

fn load_config() -> Config {
    rotator_core::config::load_dotenv();
    Config::from_env()
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.log_summary();
    let pool = db::init_pg_pool(&config.postgres).await;
    let state = Arc::new(startup::build_state(config, pool).await?);

    let jobs = scheduler::spawn(state.clone());
    info!(jobs = jobs.len(), "background jobs started");

    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = router::build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutdown signal received");
        })
        .await?;

    for job in jobs {
        job.abort();
    }
    Ok(())
}

async fn advance(config: Config, date: Option<NaiveDate>, duty: Option<i64>) -> anyhow::Result<()> {
    let pool = db::init_pg_pool(&config.postgres)
        .await
        .context("advance needs a reachable PostgreSQL database")?;
    let state = startup::build_state(config, Some(pool.clone())).await?;
    let today = date.unwrap_or_else(|| state.today());

    let json = match duty {
        Some(id) => {
            let outcome = state.advancer(&pool).advance(DutyId(id), today).await?;
            serde_json::to_string_pretty(&outcome)?
        }
        None => {
            let results = scheduler::advance_pass(&state, &pool, today).await?;
            serde_json::to_string_pretty(&results)?
        }
    };
    println!("{json}");
    Ok(())
}

async fn send_digest(config: Config, date: Option<NaiveDate>, dry_run: bool) -> anyhow::Result<()> {
    let pool = db::init_pg_pool(&config.postgres)
        .await
        .context("digest needs a reachable PostgreSQL database")?;
    let state = startup::build_state(config, Some(pool.clone())).await?;
    let today = date.unwrap_or_else(|| state.today());

    if dry_run {
        let ctx = digest::compose(&pool, today).await?;
        println!("{}", state.digest.render(&ctx)?);
        return Ok(());
    }

    let report = digest::send(&state, &pool, today).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.delivered && !report.text.is_empty() {
        anyhow::bail!("digest was not delivered to any channel");
    }
    Ok(())
}

async fn run_simulation(
    rule: String,
    start: NaiveDate,
    until: NaiveDate,
    members: Vec<String>,
) -> anyhow::Result<()> {
    let rows = simulate::forecast(
        &rule,
        &members,
        start,
        until,
        Arc::new(rotator_calendar::WeekendOracle),
    )
    .await?;

    for row in rows {
        println!("{}  {}  {}", row.start_date, row.end_date, row.handle);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Advance { date, duty } => advance(config, date, duty).await,
        Command::Digest { date, dry_run } => send_digest(config, date, dry_run).await,
        Command::Simulate {
            rule,
            start,
            until,
            members,
        } => run_simulation(rule, start, until, members).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn simulate_arguments_parse() {
        let cli = Cli::try_parse_from([
            "rotator",
            "simulate",
            "--rule",
            "weekly_monday",
            "--start",
            "2024-01-01",
            "--until",
            "2024-02-01",
            "--members",
            "alice,bob",
        ])
        .unwrap();

        match cli.command {
            Some(Command::Simulate { rule, start, members, .. }) => {
                assert_eq!(rule, "weekly_monday");
                assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
                assert_eq!(members, vec!["alice", "bob"]);
            }
            other => panic!("expected simulate, got {other:?}"),
        }
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["rotator"]).unwrap();
        assert!(cli.command.is_none());
    }
}
