#[cfg(test)]
pub mod helpers {
    use crate::model::{ScheduleGrid, Shift};

    pub fn local_shift(start: &str, end: &str, amount: u32) -> Shift {
        Shift {
            start_local: Some(start.to_string()),
            end_local: Some(end.to_string()),
            amount: Some(amount),
            ..Shift::default()
        }
    }

    pub fn remote_shift(remote_id: &str, start: &str, end: &str, amount: u32) -> Shift {
        Shift {
            remote_id: Some(remote_id.to_string()),
            ..local_shift(start, end, amount)
        }
    }

    /// August 2026 grid with one row (employee 42) and the given cells.
    pub fn simple_grid(line: &str, cells: &[(u8, Shift)]) -> ScheduleGrid {
        let mut grid = ScheduleGrid::empty(line, 2026, 8, &[(42, "Ada".to_string())]);
        for (day, shift) in cells {
            *grid.cell_mut(42, *day).unwrap() = Some(shift.clone());
        }
        grid
    }
}
