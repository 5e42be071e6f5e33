use colored::*;

use crate::cli::Format;
use crate::model::{ChangeKind, MonthSchedule, ScheduleGrid, Shift, SyncInstruction, SyncPlan};

fn colorize_kind(kind: ChangeKind) -> ColoredString {
    match kind {
        ChangeKind::Create => "+ create".green(),
        ChangeKind::Update => "~ update".yellow(),
        ChangeKind::Delete => "- delete".red(),
    }
}

fn cell_summary(shift: &Shift) -> String {
    if let Some(label) = &shift.special_label {
        return label.clone();
    }
    let range = match (&shift.start_local, &shift.end_local) {
        (Some(s), Some(e)) => format!("{s}-{e}"),
        _ => "??:??".to_string(),
    };
    match shift.amount {
        Some(amount) if amount > 0 => format!("{range} ({amount})"),
        _ => range,
    }
}

fn print_instruction(kind: ChangeKind, ins: &SyncInstruction) {
    let mut line = format!(
        "  {} emp {} day {:02}: {} +{}min, amount {}",
        colorize_kind(kind),
        ins.employee_id,
        ins.day,
        ins.start_instant,
        ins.duration_minutes,
        ins.amount
    );
    if let Some(template) = ins.template_id {
        line.push_str(&format!(", template {template}"));
    }
    if let Some(remote_id) = &ins.remote_id {
        line.push_str(&format!(" [{remote_id}]"));
    }
    println!("{line}");
}

pub fn print_plan(plan: &SyncPlan, format: &Format) {
    match format {
        Format::Text => {
            println!(
                "{}",
                format!("Plan for line {} ({} changes)", plan.line, plan.len())
                    .bold()
                    .underline()
            );
            for ins in &plan.create {
                print_instruction(ChangeKind::Create, ins);
            }
            for ins in &plan.update {
                print_instruction(ChangeKind::Update, ins);
            }
            for ins in &plan.delete {
                print_instruction(ChangeKind::Delete, ins);
            }
            if plan.is_empty() {
                println!("  {}", "nothing to sync".dimmed());
            }
        }
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(plan).unwrap_or_default());
        }
    }
}

fn print_grid_text(grid: &ScheduleGrid) {
    println!(
        "{}",
        format!("{} {:04}-{:02}", grid.line, grid.year, grid.month)
            .bold()
            .underline()
    );
    for row in &grid.rows {
        let cells: Vec<String> = grid
            .days
            .iter()
            .zip(&row.shifts_by_day)
            .filter_map(|(day, cell)| {
                cell.as_ref()
                    .map(|shift| format!("{:02}={}", day, cell_summary(shift)))
            })
            .collect();
        let summary = if cells.is_empty() {
            "no shifts".dimmed().to_string()
        } else {
            cells.join("  ")
        };
        println!("  {} ({}): {}", row.full_name, row.employee_id, summary);
    }
}

pub fn print_schedule(schedule: &MonthSchedule, line: Option<&str>, format: &Format) {
    match format {
        Format::Text => {
            match line {
                Some(line) => {
                    if let Some(grid) = schedule.lines.get(line) {
                        print_grid_text(grid);
                    } else {
                        println!("{}", format!("unknown line: {line}").red());
                    }
                }
                None => {
                    for grid in schedule.lines.values() {
                        print_grid_text(grid);
                    }
                }
            }
            for v in &schedule.vacations {
                println!(
                    "  {} emp {} days {:02}-{:02}",
                    "vacation".cyan(),
                    v.employee_id,
                    v.start_day,
                    v.end_day
                );
            }
            for b in &schedule.birthdays {
                println!("  {} emp {} day {:02}", "birthday".magenta(), b.employee_id, b.day);
            }
        }
        Format::Json => match line {
            Some(line) => {
                let grid = schedule.lines.get(line);
                println!("{}", serde_json::to_string_pretty(&grid).unwrap_or_default());
            }
            None => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(schedule).unwrap_or_default()
                );
            }
        },
    }
}
