use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::model::MonthSchedule;
use crate::overlay::state_dir;

/// Durable last-known-good month schedules.
///
/// Every successfully committed month load (and every confirmed save) is
/// archived under its `YYYY-MM` key, so the grid can still be shown when a
/// later reload fails. Same snapshot idiom as the overlay store: one
/// bincode blob, write-tmp-then-rename, corrupt or missing loads as empty.
#[derive(Debug, Default)]
pub struct ScheduleArchive {
    months: BTreeMap<String, MonthSchedule>,
    snapshot: Option<PathBuf>,
}

fn month_key(year: i32, month: u8) -> String {
    format!("{year:04}-{month:02}")
}

impl ScheduleArchive {
    /// An archive with no backing file.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open (or create) the durable archive for a namespace.
    pub fn open(namespace: &str, data_dir: Option<&Path>) -> Self {
        let Some(path) = state_dir(namespace, data_dir).map(|d| d.join("months.bin")) else {
            return Self::default();
        };
        let months = fs::read(&path)
            .ok()
            .and_then(|data| bincode::deserialize(&data).ok())
            .unwrap_or_default();
        Self {
            months,
            snapshot: Some(path),
        }
    }

    pub fn get(&self, year: i32, month: u8) -> Option<&MonthSchedule> {
        self.months.get(&month_key(year, month))
    }

    /// Archive a month's schedule, replacing any earlier copy.
    pub fn store(&mut self, schedule: &MonthSchedule) -> Result<()> {
        self.months
            .insert(month_key(schedule.year, schedule.month), schedule.clone());
        self.persist()
    }

    pub fn remove(&mut self, year: i32, month: u8) -> Result<()> {
        if self.months.remove(&month_key(year, month)).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("tmp");
        let data = bincode::serialize(&self.months)?;
        fs::write(&tmp_path, &data)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}
