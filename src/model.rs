use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::timeconv;

/// Hard cap on the number of day columns in a grid.
pub const MAX_GRID_DAYS: u8 = 31;

/// A single shift assignment occupying one day-cell for one employee.
///
/// `start_instant`/`end_instant` (ISO-8601) are authoritative; the local
/// `HH:MM` strings are display fields recomputed when the user switches the
/// shown timezone. `remote_id` is present once the shift exists in the
/// remote tracker and absent for locally created, not-yet-synced shifts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Shift {
    pub template_id: Option<u32>,
    pub start_local: Option<String>,
    pub end_local: Option<String>,
    pub start_instant: Option<String>,
    pub end_instant: Option<String>,
    pub duration_minutes: Option<u32>,
    pub amount: Option<u32>,
    pub special_label: Option<String>,
    pub remote_id: Option<String>,
}

impl Shift {
    /// Duration in minutes, recomputed from the local time pair when not
    /// explicitly stored.
    pub fn resolved_duration(&self) -> Option<u32> {
        if self.duration_minutes.is_some() {
            return self.duration_minutes;
        }
        let start = timeconv::parse_hhmm(self.start_local.as_deref()?)?;
        let end = timeconv::parse_hhmm(self.end_local.as_deref()?)?;
        Some(timeconv::wrapping_duration(start, end))
    }

    /// True if the shift suppresses time-range rendering (day off, vacation
    /// and similar catalog labels).
    pub fn is_special(&self) -> bool {
        self.special_label.is_some()
    }
}

/// One employee's row in a grid: cells index-aligned with the day list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeRow {
    pub employee_id: u64,
    pub full_name: String,
    pub shifts_by_day: Vec<Option<Shift>>,
}

/// The per-line, per-employee, per-day matrix of shift cells for one month.
///
/// Invariant: `days` is the gap-free `1..=days_in_month` sequence (capped at
/// [`MAX_GRID_DAYS`]) and every row's `shifts_by_day` has `days.len()` cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleGrid {
    pub line: String,
    pub year: i32,
    pub month: u8,
    pub days: Vec<u8>,
    pub rows: Vec<EmployeeRow>,
}

impl ScheduleGrid {
    /// Build an empty grid for the given roster rows.
    pub fn empty(line: &str, year: i32, month: u8, employees: &[(u64, String)]) -> Self {
        let day_count = timeconv::days_in_month(year, month).min(MAX_GRID_DAYS);
        let days: Vec<u8> = (1..=day_count).collect();
        let rows = employees
            .iter()
            .map(|(id, name)| EmployeeRow {
                employee_id: *id,
                full_name: name.clone(),
                shifts_by_day: vec![None; days.len()],
            })
            .collect();
        Self {
            line: line.to_string(),
            year,
            month,
            days,
            rows,
        }
    }

    /// Cell lookup by employee id and 1-based day number.
    pub fn cell(&self, employee_id: u64, day: u8) -> Option<&Shift> {
        let row = self.rows.iter().find(|r| r.employee_id == employee_id)?;
        let idx = self.days.iter().position(|d| *d == day)?;
        row.shifts_by_day.get(idx)?.as_ref()
    }

    /// Mutable cell slot; `None` when the address is outside the grid.
    pub fn cell_mut(&mut self, employee_id: u64, day: u8) -> Option<&mut Option<Shift>> {
        let idx = self.days.iter().position(|d| *d == day)?;
        let row = self
            .rows
            .iter_mut()
            .find(|r| r.employee_id == employee_id)?;
        row.shifts_by_day.get_mut(idx)
    }
}

/// A span of vacation days for one employee. Display-only, never diffed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VacationSpan {
    pub employee_id: u64,
    pub start_day: u8,
    pub end_day: u8,
}

/// An employee's birthday falling inside the displayed month. Display-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Birthday {
    pub employee_id: u64,
    pub day: u8,
}

/// All grids for one month: one per line plus the all-lines aggregate,
/// with the two display-only adjacency overlays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthSchedule {
    pub year: i32,
    pub month: u8,
    pub lines: BTreeMap<String, ScheduleGrid>,
    pub aggregate: ScheduleGrid,
    pub vacations: Vec<VacationSpan>,
    pub birthdays: Vec<Birthday>,
}

/// A shift definition from the template catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftTemplate {
    pub template_id: u32,
    pub start_local: Option<String>,
    pub end_local: Option<String>,
    pub duration_minutes: Option<u32>,
    pub amount: Option<u32>,
    pub special_label: Option<String>,
}

/// Template catalog keyed by line, with flat lookup by template id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateCatalog {
    pub by_line: BTreeMap<String, Vec<ShiftTemplate>>,
}

impl TemplateCatalog {
    pub fn find(&self, template_id: u32) -> Option<&ShiftTemplate> {
        self.by_line
            .values()
            .flatten()
            .find(|t| t.template_id == template_id)
    }
}

/// One employee in the roster input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: u64,
    pub full_name: String,
    pub department_id: Option<String>,
}

/// Roster input: line identifier to its ordered employee list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    pub by_line: BTreeMap<String, Vec<Employee>>,
}

impl Roster {
    /// Lines whose roster contains the given employee.
    pub fn lines_of(&self, employee_id: u64) -> Vec<&str> {
        self.by_line
            .iter()
            .filter(|(_, emps)| emps.iter().any(|e| e.employee_id == employee_id))
            .map(|(line, _)| line.as_str())
            .collect()
    }
}

/// The kind of change a sync instruction requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the remote write payload.
#[derive(Debug, Clone, Serialize)]
pub struct SyncInstruction {
    pub employee_id: u64,
    pub day: u8,
    pub template_id: Option<u32>,
    pub start_instant: String,
    pub duration_minutes: u32,
    pub amount: u32,
    /// Baseline remote id; present on update/delete, absent on create.
    pub remote_id: Option<String>,
}

/// The batched instruction set for one line, submitted as one unit per save.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncPlan {
    pub line: String,
    pub create: Vec<SyncInstruction>,
    pub update: Vec<SyncInstruction>,
    pub delete: Vec<SyncInstruction>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    pub fn len(&self) -> usize {
        self.create.len() + self.update.len() + self.delete.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_grid_shape() {
        let grid = ScheduleGrid::empty("L1", 2026, 2, &[(1, "A".into()), (2, "B".into())]);
        assert_eq!(grid.days, (1..=28).collect::<Vec<u8>>());
        for row in &grid.rows {
            assert_eq!(row.shifts_by_day.len(), grid.days.len());
        }
    }

    #[test]
    fn test_empty_grid_full_month() {
        let grid = ScheduleGrid::empty("L1", 2026, 1, &[]);
        assert_eq!(*grid.days.last().unwrap(), MAX_GRID_DAYS);
        assert_eq!(grid.days.len(), 31);
    }

    #[test]
    fn test_cell_lookup_out_of_range() {
        let grid = ScheduleGrid::empty("L1", 2026, 4, &[(1, "A".into())]);
        assert!(grid.cell(1, 31).is_none());
        assert!(grid.cell(99, 1).is_none());
    }

    #[test]
    fn test_cell_mut_roundtrip() {
        let mut grid = ScheduleGrid::empty("L1", 2026, 4, &[(1, "A".into())]);
        *grid.cell_mut(1, 5).unwrap() = Some(Shift {
            amount: Some(100),
            ..Shift::default()
        });
        assert_eq!(grid.cell(1, 5).unwrap().amount, Some(100));
    }

    #[test]
    fn test_resolved_duration_prefers_stored() {
        let shift = Shift {
            start_local: Some("08:00".into()),
            end_local: Some("20:00".into()),
            duration_minutes: Some(600),
            ..Shift::default()
        };
        assert_eq!(shift.resolved_duration(), Some(600));
    }

    #[test]
    fn test_resolved_duration_recomputes_from_locals() {
        let shift = Shift {
            start_local: Some("22:00".into()),
            end_local: Some("06:00".into()),
            ..Shift::default()
        };
        assert_eq!(shift.resolved_duration(), Some(480));
    }

    #[test]
    fn test_roster_lines_of() {
        let mut roster = Roster::default();
        roster.by_line.insert(
            "L1".into(),
            vec![Employee {
                employee_id: 42,
                full_name: "A".into(),
                department_id: None,
            }],
        );
        roster.by_line.insert(
            "L2".into(),
            vec![Employee {
                employee_id: 42,
                full_name: "A".into(),
                department_id: None,
            }],
        );
        assert_eq!(roster.lines_of(42), vec!["L1", "L2"]);
        assert!(roster.lines_of(7).is_empty());
    }

    #[test]
    fn test_template_catalog_find() {
        let mut catalog = TemplateCatalog::default();
        catalog.by_line.insert(
            "L1".into(),
            vec![ShiftTemplate {
                template_id: 7,
                start_local: Some("08:00".into()),
                end_local: Some("20:00".into()),
                duration_minutes: Some(720),
                amount: Some(1500),
                special_label: None,
            }],
        );
        assert!(catalog.find(7).is_some());
        assert!(catalog.find(8).is_none());
    }
}
