//! # CLI Layer
//!
//! Wires the filesystem-backed API, selects the week to work on and routes
//! each subcommand to a handler that renders its `CmdResult`.

use super::render;
use super::setup::{Cli, Commands, ModeArg};
use agendapp::api::{parse_slot, AgendaApi};
use agendapp::blackout::FsBlackouts;
use agendapp::commands::CmdResult;
use agendapp::config::{resolve_data_dir, AgendaConfig};
use agendapp::error::AgendaError;
use agendapp::model::{parse_date, CommitMode};
use agendapp::session::EditSession;
use agendapp::store::fs_backend::FsBackend;
use agendapp::store::ScheduleStore;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

struct AppContext {
    api: AgendaApi<FsBackend, FsBlackouts>,
    owner: String,
    json: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let ctx = init_context(&cli)?;

    match cli.command {
        Some(Commands::Week { date }) => {
            let anchor = anchor_date(date.as_deref().or(cli.week.as_deref()), None)?;
            handle_week(&ctx, anchor)
        }
        Some(Commands::Day { date }) => handle_day(&ctx, &date),
        Some(Commands::Add { mode, blocks }) => {
            let first = blocks.first().map(|b| parse_slot(b)).transpose()?;
            let anchor = anchor_date(cli.week.as_deref(), first.map(|(date, _)| date))?;
            handle_add(&ctx, anchor, mode, &blocks)
        }
        Some(Commands::Move { id, to }) => {
            let mut session = open_block_session(&ctx, cli.week.as_deref(), &id)?;
            let result = ctx.api.move_block(&mut session, &id, &to)?;
            print_outcome(&ctx, &result)
        }
        Some(Commands::Resize { id, range }) => {
            let mut session = open_block_session(&ctx, cli.week.as_deref(), &id)?;
            let result = ctx.api.resize_block(&mut session, &id, &range)?;
            print_outcome(&ctx, &result)
        }
        Some(Commands::Delete { id }) => {
            let mut session = open_block_session(&ctx, cli.week.as_deref(), &id)?;
            let result = ctx.api.delete_block(&mut session, &id)?;
            print_outcome(&ctx, &result)
        }
        Some(Commands::Show) => handle_show(&ctx),
        None => handle_week(&ctx, anchor_date(cli.week.as_deref(), None)?),
    }
}

/// Print an error on stderr, with the interval to fix when there is one.
pub fn report_error(error: &anyhow::Error) {
    eprintln!("{} {:#}", "Error:".red().bold(), error);
    if let Some((date, range)) = error
        .downcast_ref::<AgendaError>()
        .and_then(AgendaError::conflicting_interval)
    {
        eprintln!("  conflicting interval: {} {}", date, range);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let data_dir = resolve_data_dir(cli.data_dir.clone())?;
    let config = AgendaConfig::load(&data_dir)
        .with_context(|| format!("loading configuration from {}", data_dir.display()))?;
    tracing::debug!(data_dir = %data_dir.display(), ?config, "initialized context");

    let store = ScheduleStore::with_backend(FsBackend::new(data_dir.clone()));
    let blackouts = FsBlackouts::new(data_dir);
    Ok(AppContext {
        api: AgendaApi::new(store, blackouts, config),
        owner: cli.owner.clone(),
        json: cli.json,
    })
}

/// `--week` (or an explicit date) wins, then the command's own date, then today.
fn anchor_date(explicit: Option<&str>, implied: Option<NaiveDate>) -> Result<NaiveDate> {
    match (explicit, implied) {
        (Some(date), _) => Ok(parse_date(date)?),
        (None, Some(date)) => Ok(date),
        (None, None) => Ok(Local::now().date_naive()),
    }
}

fn open_session(ctx: &AppContext, anchor: NaiveDate) -> Result<EditSession> {
    Ok(ctx.api.open_session(&ctx.owner, anchor)?)
}

/// Without `--week`, a template id is edited in the first week from today
/// where its weekday is not shadowed by an override.
fn open_block_session(ctx: &AppContext, week: Option<&str>, id: &str) -> Result<EditSession> {
    let anchor = match week {
        Some(date) => parse_date(date)?,
        None => ctx.api.anchor_for(&ctx.owner, id, Local::now().date_naive())?,
    };
    open_session(ctx, anchor)
}

fn handle_week(ctx: &AppContext, anchor: NaiveDate) -> Result<()> {
    let mut session = open_session(ctx, anchor)?;
    let result = ctx.api.week(&mut session)?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&result.listed_events)?);
        return Ok(());
    }
    if let Some(week) = result.week {
        render::print_week(week, &result.listed_events);
    }
    render::print_messages(&result.messages);
    Ok(())
}

fn handle_day(ctx: &AppContext, date: &str) -> Result<()> {
    let result = ctx.api.day(&ctx.owner, date)?;
    match &result.day {
        Some(view) if ctx.json => println!("{}", serde_json::to_string_pretty(view)?),
        Some(view) => {
            render::print_day(view);
            render::print_messages(&result.messages);
        }
        None => render::print_messages(&result.messages),
    }
    Ok(())
}

fn handle_add(ctx: &AppContext, anchor: NaiveDate, mode: ModeArg, blocks: &[String]) -> Result<()> {
    let mode = match mode {
        ModeArg::Weekly => CommitMode::WeeklyTemplate,
        ModeArg::Date => CommitMode::SpecificDate,
    };
    let mut session = open_session(ctx, anchor)?;
    let result = ctx.api.add_blocks(&mut session, blocks, mode)?;
    print_outcome(ctx, &result)
}

fn handle_show(ctx: &AppContext) -> Result<()> {
    let result = ctx.api.show(&ctx.owner)?;
    if let Some(document) = &result.document {
        println!("{}", serde_json::to_string_pretty(document)?);
    }
    if !ctx.json {
        for message in &result.messages {
            eprintln!("{}", message.content.dimmed());
        }
    }
    Ok(())
}

fn print_outcome(ctx: &AppContext, result: &CmdResult) -> Result<()> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&result.affected_blocks)?);
    } else {
        render::print_messages(&result.messages);
        render::print_affected(&result.affected_blocks);
    }
    Ok(())
}
