use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::model::{ScheduleGrid, Shift, TemplateCatalog};

/// Address of one grid cell: `(line, year, month, employee, day)`.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct OverlayKey {
    pub line: String,
    pub year: i32,
    pub month: u8,
    pub employee_id: u64,
    pub day: u8,
}

impl OverlayKey {
    pub fn new(line: &str, year: i32, month: u8, employee_id: u64, day: u8) -> Self {
        Self {
            line: line.to_string(),
            year,
            month,
            employee_id,
            day,
        }
    }

    /// True if the key belongs to the given line and month (the unit a
    /// save confirms).
    pub fn matches_month(&self, line: &str, year: i32, month: u8) -> bool {
        self.line == line && self.year == year && self.month == month
    }
}

impl fmt::Display for OverlayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{:04}-{:02}:{}:{:02}",
            self.line, self.year, self.month, self.employee_id, self.day
        )
    }
}

/// A pending local edit for one cell: either a full shift payload (no
/// remote id — that always comes from the baseline) or a deletion marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OverlayEntry {
    Set(ShiftPatch),
    Delete,
}

/// The editable shift fields an overlay may carry. Omitted fields keep the
/// baseline cell's values when the entry is applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShiftPatch {
    pub template_id: Option<u32>,
    pub start_local: Option<String>,
    pub end_local: Option<String>,
    pub start_instant: Option<String>,
    pub end_instant: Option<String>,
    pub duration_minutes: Option<u32>,
    pub amount: Option<u32>,
    pub special_label: Option<String>,
}

impl ShiftPatch {
    /// True when the patch edits any time field. Time fields apply as a
    /// group: a patch that rewrites the local pair must not leave the
    /// baseline's stale instants behind, or the diff would emit the old
    /// start instant for the new wall-clock times.
    fn touches_time(&self) -> bool {
        self.start_local.is_some()
            || self.end_local.is_some()
            || self.start_instant.is_some()
            || self.end_instant.is_some()
            || self.duration_minutes.is_some()
    }
}

/// Durable map of pending local edits, merged onto a freshly loaded
/// baseline to produce the effective grid.
///
/// Persistence follows the snapshot idiom: one bincode blob written with
/// write-tmp-then-rename; a corrupt or missing snapshot loads as empty.
#[derive(Debug, Default)]
pub struct OverlayStore {
    entries: BTreeMap<OverlayKey, OverlayEntry>,
    snapshot: Option<PathBuf>,
}

impl OverlayStore {
    /// A store with no backing file; edits live for the process only.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open (or create) the durable store for a namespace, typically the
    /// remote system's base URL or workspace root.
    pub fn open(namespace: &str, data_dir: Option<&Path>) -> Self {
        let Some(path) = snapshot_path(namespace, data_dir) else {
            return Self::default();
        };
        let entries = fs::read(&path)
            .ok()
            .and_then(|data| bincode::deserialize(&data).ok())
            .unwrap_or_default();
        Self {
            entries,
            snapshot: Some(path),
        }
    }

    /// Upsert an overlay entry and persist immediately.
    pub fn set(&mut self, key: OverlayKey, entry: OverlayEntry) -> Result<()> {
        self.entries.insert(key, entry);
        self.persist()
    }

    pub fn get(&self, key: &OverlayKey) -> Option<&OverlayEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &OverlayKey> {
        self.entries.keys()
    }

    /// Remove every entry whose key matches the predicate; returns how
    /// many were dropped. Used after a confirmed save to clear exactly the
    /// line/month that was applied.
    pub fn clear_matching<F>(&mut self, predicate: F) -> Result<usize>
    where
        F: Fn(&OverlayKey) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|k, _| !predicate(k));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Produce the effective grid: baseline plus every entry addressing a
    /// cell present in the grid. Pure over the baseline, so applying the
    /// same store twice yields the same result as applying it once.
    pub fn apply_to(&self, baseline: &ScheduleGrid, templates: &TemplateCatalog) -> ScheduleGrid {
        let mut effective = baseline.clone();
        for (key, entry) in &self.entries {
            if !key.matches_month(&baseline.line, baseline.year, baseline.month) {
                continue;
            }
            let Some(cell) = effective.cell_mut(key.employee_id, key.day) else {
                continue;
            };
            *cell = match entry {
                OverlayEntry::Delete => None,
                OverlayEntry::Set(patch) => {
                    Some(merge_patch(baseline.cell(key.employee_id, key.day), patch, templates))
                }
            };
        }
        effective
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("tmp");
        let data = bincode::serialize(&self.entries)?;
        fs::write(&tmp_path, &data)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// Merge a patch onto the baseline cell. `remote_id` always comes from
/// the baseline (an overlay can never invent one); `template_id` and
/// `amount` fall back to the baseline when omitted; `special_label` is
/// recomputed from the template catalog when not supplied explicitly.
/// Time fields apply as a group (see [`ShiftPatch::touches_time`]).
fn merge_patch(
    baseline: Option<&Shift>,
    patch: &ShiftPatch,
    templates: &TemplateCatalog,
) -> Shift {
    let base = baseline.cloned().unwrap_or_default();
    let template_id = patch.template_id.or(base.template_id);
    let special_label = patch.special_label.clone().or_else(|| {
        template_id
            .and_then(|id| templates.find(id))
            .and_then(|t| t.special_label.clone())
    });

    if patch.touches_time() {
        Shift {
            template_id,
            start_local: patch.start_local.clone(),
            end_local: patch.end_local.clone(),
            start_instant: patch.start_instant.clone(),
            end_instant: patch.end_instant.clone(),
            duration_minutes: patch.duration_minutes,
            amount: patch.amount.or(base.amount),
            special_label,
            remote_id: base.remote_id,
        }
    } else {
        Shift {
            template_id,
            start_local: base.start_local,
            end_local: base.end_local,
            start_instant: base.start_instant,
            end_instant: base.end_instant,
            duration_minutes: base.duration_minutes,
            amount: patch.amount.or(base.amount),
            special_label,
            remote_id: base.remote_id,
        }
    }
}

/// Durable-state directory under the platform data dir, namespaced by a
/// hash of the caller-supplied namespace string.
pub(crate) fn state_dir(namespace: &str, data_dir: Option<&Path>) -> Option<PathBuf> {
    let base = match data_dir {
        Some(dir) => dir.to_path_buf(),
        None => dirs::data_dir()?,
    };
    let ns_hash = blake3::hash(namespace.as_bytes());
    let hex = format!("{}", ns_hash.to_hex());
    Some(base.join("rostersync").join(&hex[..16]))
}

fn snapshot_path(namespace: &str, data_dir: Option<&Path>) -> Option<PathBuf> {
    Some(state_dir(namespace, data_dir)?.join("overlays.bin"))
}
