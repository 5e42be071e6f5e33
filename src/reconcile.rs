use std::collections::HashMap;

use anyhow::Result;

use crate::model::{EmployeeRow, ScheduleGrid, Shift, SyncInstruction, SyncPlan};
use crate::timeconv;

/// Field-wise equality deciding whether a cell needs an update.
///
/// Local strings compare as parsed minutes, amounts default to 0,
/// template ids are null-coerced, instants compare as parsed timestamps
/// and durations fall back to recomputation from the local pair. Instant
/// and duration checks are null-tolerant: an absent side defers to the
/// other comparisons instead of forcing an update.
pub fn shifts_equal(a: &Shift, b: &Shift) -> bool {
    let norm = |s: &Option<String>| s.as_deref().and_then(timeconv::parse_hhmm);
    if norm(&a.start_local) != norm(&b.start_local) {
        return false;
    }
    if norm(&a.end_local) != norm(&b.end_local) {
        return false;
    }
    if a.amount.unwrap_or(0) != b.amount.unwrap_or(0) {
        return false;
    }
    if a.template_id != b.template_id {
        return false;
    }

    let instant = |s: &Option<String>| s.as_deref().and_then(timeconv::parse_instant);
    if let (Some(x), Some(y)) = (instant(&a.start_instant), instant(&b.start_instant)) {
        if x != y {
            return false;
        }
    }
    if let (Some(x), Some(y)) = (instant(&a.end_instant), instant(&b.end_instant)) {
        if x != y {
            return false;
        }
    }
    if let (Some(x), Some(y)) = (a.resolved_duration(), b.resolved_duration()) {
        if x != y {
            return false;
        }
    }
    true
}

/// Compare the effective grid against the baseline for one line and
/// produce the batched instruction set.
///
/// Deletes and updates against a baseline cell that was never synced
/// (no remote id) are dropped silently: there is nothing to reconcile
/// remotely. An unresolvable start instant in the create/update path is an
/// error naming the cell, blocking the save rather than losing the edit.
pub fn diff(
    baseline: &ScheduleGrid,
    effective: &ScheduleGrid,
    display_offset_minutes: i32,
) -> Result<SyncPlan> {
    anyhow::ensure!(
        baseline.line == effective.line
            && baseline.year == effective.year
            && baseline.month == effective.month,
        "diff requires grids for the same line and month, got {}/{}-{} vs {}/{}-{}",
        baseline.line,
        baseline.year,
        baseline.month,
        effective.line,
        effective.year,
        effective.month
    );

    let baseline_rows: HashMap<u64, &EmployeeRow> = baseline
        .rows
        .iter()
        .map(|r| (r.employee_id, r))
        .collect();

    let mut plan = SyncPlan {
        line: effective.line.clone(),
        ..SyncPlan::default()
    };

    for row in &effective.rows {
        let base_row = baseline_rows.get(&row.employee_id);
        for (idx, day) in effective.days.iter().enumerate() {
            let after = row.shifts_by_day.get(idx).and_then(|c| c.as_ref());
            let before = base_row
                .and_then(|r| r.shifts_by_day.get(idx))
                .and_then(|c| c.as_ref());

            match (before, after) {
                (None, None) => {}
                (None, Some(shift)) => {
                    plan.create.push(instruction(
                        effective,
                        row.employee_id,
                        *day,
                        shift,
                        None,
                        display_offset_minutes,
                    )?);
                }
                (Some(prior), None) => {
                    // A baseline cell without a remote id was never synced;
                    // deleting it remotely is a no-op.
                    let Some(remote_id) = prior.remote_id.clone() else {
                        continue;
                    };
                    plan.delete.push(instruction(
                        effective,
                        row.employee_id,
                        *day,
                        prior,
                        Some(remote_id),
                        display_offset_minutes,
                    )?);
                }
                (Some(prior), Some(shift)) => {
                    if shifts_equal(prior, shift) {
                        continue;
                    }
                    let Some(remote_id) = prior.remote_id.clone() else {
                        continue;
                    };
                    plan.update.push(instruction(
                        effective,
                        row.employee_id,
                        *day,
                        shift,
                        Some(remote_id),
                        display_offset_minutes,
                    )?);
                }
            }
        }
    }

    Ok(plan)
}

/// Build one write instruction, resolving the authoritative
/// `(start_instant, duration)` pair from the local fields when the cell
/// does not already carry a parseable one.
fn instruction(
    grid: &ScheduleGrid,
    employee_id: u64,
    day: u8,
    shift: &Shift,
    remote_id: Option<String>,
    display_offset_minutes: i32,
) -> Result<SyncInstruction> {
    let stored = shift
        .start_instant
        .as_deref()
        .filter(|s| timeconv::parse_instant(s).is_some())
        .map(|s| s.to_string())
        .zip(shift.resolved_duration());

    let (start_instant, duration_minutes) = match stored {
        Some(pair) => pair,
        None => {
            let span = shift
                .start_local
                .as_deref()
                .zip(shift.end_local.as_deref())
                .and_then(|(s, e)| {
                    timeconv::to_utc(grid.year, grid.month, day, s, e, display_offset_minutes)
                });
            match span {
                Some(span) => (span.start_instant, span.duration_minutes),
                None => anyhow::bail!(
                    "cannot resolve start instant for {}/{}-{:02} employee {} day {}",
                    grid.line,
                    grid.year,
                    grid.month,
                    employee_id,
                    day
                ),
            }
        }
    };

    Ok(SyncInstruction {
        employee_id,
        day,
        template_id: shift.template_id,
        start_instant,
        duration_minutes,
        amount: shift.amount.unwrap_or(0),
        remote_id,
    })
}
