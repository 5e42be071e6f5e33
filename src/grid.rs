use std::collections::BTreeMap;

use crate::model::{MonthSchedule, Roster, ScheduleGrid, Shift, TemplateCatalog};
use crate::remote::{RemoteMonthPayload, RemoteScheduleItem};
use crate::timeconv;

/// A remote item resolved onto one line's calendar, ready for assignment.
struct Placement {
    line: String,
    employee_id: u64,
    day: u8,
    remote_id: String,
    shift: Shift,
}

/// Build the month's grids from a remote payload, roster and catalog.
///
/// Month membership is decided by the local calendar day under the
/// currently selected display offset, so a near-midnight item can move
/// between months when the user switches the shown timezone. Items with an
/// unparseable instant, an out-of-month placement or an unknown employee
/// are discarded.
pub fn build_month_schedule(
    payload: &RemoteMonthPayload,
    roster: &Roster,
    templates: &TemplateCatalog,
    year: i32,
    month: u8,
    display_offset_minutes: i32,
) -> MonthSchedule {
    let mut placements: Vec<Placement> = Vec::new();
    for item in &payload.items {
        placements.extend(resolve_item(
            item,
            roster,
            templates,
            year,
            month,
            display_offset_minutes,
        ));
    }

    // Duplicate (line, employee, day) cells resolve deterministically:
    // sorted by remote id, the last assignment wins regardless of payload
    // iteration order.
    placements.sort_by(|a, b| {
        (&a.line, a.employee_id, a.day, &a.remote_id).cmp(&(
            &b.line,
            b.employee_id,
            b.day,
            &b.remote_id,
        ))
    });

    let mut lines: BTreeMap<String, ScheduleGrid> = roster
        .by_line
        .iter()
        .map(|(line, emps)| {
            let employees: Vec<(u64, String)> = emps
                .iter()
                .map(|e| (e.employee_id, e.full_name.clone()))
                .collect();
            (
                line.clone(),
                ScheduleGrid::empty(line, year, month, &employees),
            )
        })
        .collect();

    // The aggregate view holds every rostered employee once, in line order.
    let mut seen = std::collections::HashSet::new();
    let all_employees: Vec<(u64, String)> = roster
        .by_line
        .values()
        .flatten()
        .filter(|e| seen.insert(e.employee_id))
        .map(|e| (e.employee_id, e.full_name.clone()))
        .collect();
    let mut aggregate = ScheduleGrid::empty("all", year, month, &all_employees);

    for p in &placements {
        if let Some(grid) = lines.get_mut(&p.line) {
            if let Some(cell) = grid.cell_mut(p.employee_id, p.day) {
                *cell = Some(p.shift.clone());
            }
        }
        // Shared items land in the aggregate once per cell; the same
        // sorted order applies, so the same candidate wins there.
        if let Some(cell) = aggregate.cell_mut(p.employee_id, p.day) {
            *cell = Some(p.shift.clone());
        }
    }

    MonthSchedule {
        year,
        month,
        lines,
        aggregate,
        vacations: payload.vacation_spans(),
        birthdays: payload.birthday_markers(),
    }
}

/// Resolve one remote item into zero or more per-line placements.
fn resolve_item(
    item: &RemoteScheduleItem,
    roster: &Roster,
    templates: &TemplateCatalog,
    year: i32,
    month: u8,
    display_offset_minutes: i32,
) -> Vec<Placement> {
    let template = item.template_id.and_then(|id| templates.find(id));

    let duration = item
        .duration_minutes
        .or(template.and_then(|t| t.duration_minutes))
        .unwrap_or(0);

    let Some(placement) = timeconv::to_local(
        &item.due_instant,
        duration,
        display_offset_minutes,
        false,
    ) else {
        return Vec::new(); // unparseable instant
    };

    // Authoritative month-membership test: the local calendar day.
    if placement.year != year || placement.month != month {
        return Vec::new();
    }

    let lines = item_lines(item, roster);
    if lines.is_empty() {
        return Vec::new(); // employee unknown to every roster line
    }

    let shift = Shift {
        template_id: item.template_id,
        start_local: Some(placement.start_local.clone()),
        end_local: Some(placement.end_local.clone()),
        start_instant: Some(item.due_instant.clone()),
        end_instant: timeconv::end_instant(&item.due_instant, duration),
        duration_minutes: Some(duration),
        amount: item.amount.or(template.and_then(|t| t.amount)),
        special_label: template.and_then(|t| t.special_label.clone()),
        remote_id: Some(item.remote_id.clone()),
    };

    lines
        .into_iter()
        .map(|line| Placement {
            line,
            employee_id: item.employee_id,
            day: placement.day,
            remote_id: item.remote_id.clone(),
            shift: shift.clone(),
        })
        .collect()
}

/// Line membership: the item's own recognized department tags, else the
/// lines that roster the employee. A shared item replicates into every
/// matching line.
fn item_lines(item: &RemoteScheduleItem, roster: &Roster) -> Vec<String> {
    let tagged: Vec<String> = item
        .departments
        .iter()
        .filter(|d| roster.by_line.contains_key(*d))
        .cloned()
        .collect();
    if !tagged.is_empty() {
        return tagged;
    }
    roster
        .lines_of(item.employee_id)
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}
