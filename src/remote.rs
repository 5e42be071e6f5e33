use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{Birthday, Employee, Roster, ShiftTemplate, TemplateCatalog, VacationSpan};

/// One scheduling item as the remote tracker exposes it.
///
/// Field names mirror the remote wire shape; everything beyond these fields
/// is opaque to the core and dropped at this boundary. `remote_id`,
/// `employee_id` and `due_instant` are required — a payload missing them is
/// rejected at deserialization rather than inspected downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteScheduleItem {
    pub remote_id: String,
    pub employee_id: u64,
    /// Absolute due instant, ISO-8601. Parsed (and possibly discarded)
    /// during grid construction, not here.
    pub due_instant: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub template_id: Option<u32>,
    #[serde(default)]
    pub amount: Option<u32>,
    /// Department/line tags; an item may carry several (a shared shift)
    /// or none (line inferred from the roster).
    #[serde(default)]
    pub departments: Vec<String>,
}

/// A month's worth of remote payload plus the display-only adjacency data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMonthPayload {
    #[serde(default)]
    pub items: Vec<RemoteScheduleItem>,
    #[serde(default)]
    pub vacations: Vec<RemoteVacation>,
    #[serde(default)]
    pub birthdays: Vec<RemoteBirthday>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteVacation {
    pub employee_id: u64,
    pub start_day: u8,
    pub end_day: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBirthday {
    pub employee_id: u64,
    pub day: u8,
}

impl RemoteMonthPayload {
    pub fn vacation_spans(&self) -> Vec<VacationSpan> {
        self.vacations
            .iter()
            .map(|v| VacationSpan {
                employee_id: v.employee_id,
                start_day: v.start_day,
                end_day: v.end_day,
            })
            .collect()
    }

    pub fn birthday_markers(&self) -> Vec<Birthday> {
        self.birthdays
            .iter()
            .map(|b| Birthday {
                employee_id: b.employee_id,
                day: b.day,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteEmployee {
    employee_id: u64,
    full_name: String,
    #[serde(default)]
    department_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteTemplate {
    template_id: u32,
    #[serde(default)]
    start_local: Option<String>,
    #[serde(default)]
    end_local: Option<String>,
    #[serde(default)]
    duration_minutes: Option<u32>,
    #[serde(default)]
    amount: Option<u32>,
    #[serde(default)]
    special_label: Option<String>,
}

/// Load the roster input (`line -> [employee]`) from a JSON file.
pub fn load_roster(path: &Path) -> Result<Roster> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read roster: {}", path.display()))?;
    let raw: BTreeMap<String, Vec<RemoteEmployee>> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse roster: {}", path.display()))?;

    let by_line = raw
        .into_iter()
        .map(|(line, emps)| {
            let emps = emps
                .into_iter()
                .map(|e| Employee {
                    employee_id: e.employee_id,
                    full_name: e.full_name,
                    department_id: e.department_id,
                })
                .collect();
            (line, emps)
        })
        .collect();
    Ok(Roster { by_line })
}

/// Load the template catalog (`line -> [template]`) from a JSON file.
pub fn load_templates(path: &Path) -> Result<TemplateCatalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read templates: {}", path.display()))?;
    let raw: BTreeMap<String, Vec<RemoteTemplate>> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse templates: {}", path.display()))?;

    let by_line = raw
        .into_iter()
        .map(|(line, templates)| {
            let templates = templates
                .into_iter()
                .map(|t| ShiftTemplate {
                    template_id: t.template_id,
                    start_local: t.start_local,
                    end_local: t.end_local,
                    duration_minutes: t.duration_minutes,
                    amount: t.amount,
                    special_label: t.special_label,
                })
                .collect();
            (line, templates)
        })
        .collect();
    Ok(TemplateCatalog { by_line })
}

/// Load a month's remote schedule payload from a JSON file.
pub fn load_month_payload(path: &Path) -> Result<RemoteMonthPayload> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schedule payload: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse schedule payload: {}", path.display()))
}
