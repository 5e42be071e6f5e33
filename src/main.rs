use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use colored::Colorize;
use rostersync::archive::ScheduleArchive;
use rostersync::cli::{Cli, Command, Format, OverlayAction};
use rostersync::config::Config;
use rostersync::context::ReconciliationContext;
use rostersync::output;
use rostersync::overlay::{OverlayEntry, OverlayKey, OverlayStore, ShiftPatch};
use rostersync::remote::{load_month_payload, load_roster, load_templates};
use rostersync::timeconv;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        process::exit(2);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let root = match cli.root {
        Some(ref p) => p.clone(),
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    let config = if let Some(ref config_path) = cli.config {
        let content = std::fs::read_to_string(config_path)?;
        toml::from_str(&content)?
    } else {
        Config::load(&root)?
    };

    let overlays = OverlayStore::open(&config.namespace, config.data_dir.as_deref());

    match cli.command {
        Command::Overlay(action) => cmd_overlay(overlays, action),
        Command::Grid { year, month, line } => {
            let mut ctx = load_context(&root, config, overlays, year, month, true)?;
            cmd_grid(&mut ctx, line.as_deref(), &cli.format)
        }
        Command::Plan {
            year,
            month,
            line,
            confirm,
        } => {
            // A plan must diff against a fresh baseline, never an
            // archived one.
            let mut ctx = load_context(&root, config, overlays, year, month, false)?;
            cmd_plan(&mut ctx, &line, confirm, &cli.format)
        }
    }
}

/// Build a context from the fixture files under `root` and load one month.
/// With `allow_stale` set, a failed load falls back to the archived
/// last-known-good schedule when one exists.
fn load_context(
    root: &Path,
    config: Config,
    overlays: OverlayStore,
    year: i32,
    month: u8,
    allow_stale: bool,
) -> Result<ReconciliationContext> {
    let roster = load_roster(&root.join("roster.json"))?;
    let templates = load_templates(&root.join("templates.json"))?;
    let archive = ScheduleArchive::open(&config.namespace, config.data_dir.as_deref());
    let mut ctx = ReconciliationContext::new(config, roster, templates, overlays, archive);

    let payload_path = schedule_path(root, year, month);
    let token = ctx.begin_load();
    if let Err(e) = ctx.load_month(token, year, month, || load_month_payload(&payload_path)) {
        if !(allow_stale && ctx.restore_last_good(year, month)) {
            return Err(e);
        }
        eprintln!(
            "{}",
            format!("warning: reload failed ({e:#}); showing last-known-good schedule").yellow()
        );
    }
    Ok(ctx)
}

fn schedule_path(root: &Path, year: i32, month: u8) -> PathBuf {
    root.join(format!("schedule-{year:04}-{month:02}.json"))
}

fn cmd_grid(ctx: &mut ReconciliationContext, line: Option<&str>, format: &Format) -> Result<()> {
    let mut schedule = ctx
        .schedule()
        .cloned()
        .context("month did not load")?;

    // Render the effective grids: baseline plus pending edits.
    let lines: Vec<String> = schedule.lines.keys().cloned().collect();
    for l in lines {
        if let Some(effective) = ctx.effective(&l) {
            schedule.lines.insert(l, effective);
        }
    }

    output::print_schedule(&schedule, line, format);
    Ok(())
}

fn cmd_plan(
    ctx: &mut ReconciliationContext,
    line: &str,
    confirm: bool,
    format: &Format,
) -> Result<()> {
    let plan = ctx.plan(line)?;
    output::print_plan(&plan, format);

    if confirm {
        let removed = ctx.confirm_applied(line)?;
        println!("confirmed: baseline promoted, {removed} pending edits cleared");
    }
    Ok(())
}

fn cmd_overlay(mut overlays: OverlayStore, action: OverlayAction) -> Result<()> {
    match action {
        OverlayAction::Set {
            line,
            year,
            month,
            employee,
            day,
            start,
            end,
            template,
            amount,
        } => {
            // Direct user-edit path: a malformed time blocks the edit
            // instead of being dropped later.
            anyhow::ensure!(
                timeconv::parse_hhmm(&start).is_some(),
                "invalid start time '{}': expected HH:MM",
                start
            );
            anyhow::ensure!(
                timeconv::parse_hhmm(&end).is_some(),
                "invalid end time '{}': expected HH:MM",
                end
            );
            let days = timeconv::days_in_month(year, month);
            anyhow::ensure!(
                (1..=days).contains(&day),
                "day {} outside {}-{:02} (1..={})",
                day,
                year,
                month,
                days
            );

            let key = OverlayKey::new(&line, year, month, employee, day);
            let patch = ShiftPatch {
                template_id: template,
                start_local: Some(start),
                end_local: Some(end),
                amount,
                ..ShiftPatch::default()
            };
            overlays.set(key.clone(), OverlayEntry::Set(patch))?;
            println!("recorded pending shift at {key}");
        }
        OverlayAction::Delete {
            line,
            year,
            month,
            employee,
            day,
        } => {
            let key = OverlayKey::new(&line, year, month, employee, day);
            overlays.set(key.clone(), OverlayEntry::Delete)?;
            println!("recorded pending deletion at {key}");
        }
        OverlayAction::Clear { line, year, month } => {
            let removed = overlays.clear_matching(|k| k.matches_month(&line, year, month))?;
            println!("cleared {removed} pending edits for {line} {year:04}-{month:02}");
        }
    }
    Ok(())
}
