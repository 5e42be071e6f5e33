use std::time::Duration;

use anyhow::Result;

use crate::archive::ScheduleArchive;
use crate::cache::{CacheOptions, RequestCache};
use crate::config::Config;
use crate::grid::build_month_schedule;
use crate::model::{MonthSchedule, ScheduleGrid, Roster, SyncPlan, TemplateCatalog};
use crate::overlay::OverlayStore;
use crate::reconcile;
use crate::remote::RemoteMonthPayload;

/// Identifies one month-load attempt. Only the most recently issued token
/// may commit its result; anything older is discarded unrendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadToken(u64);

/// Everything the reconciliation engine owns for one editing session:
/// the request cache, the overlay store, the loaded month's baselines and
/// the latest-request token. Owned by the hosting application and threaded
/// through calls instead of living in module globals.
pub struct ReconciliationContext {
    pub config: Config,
    pub cache: RequestCache<RemoteMonthPayload>,
    pub overlays: OverlayStore,
    pub archive: ScheduleArchive,
    pub roster: Roster,
    pub templates: TemplateCatalog,
    schedule: Option<MonthSchedule>,
    load_seq: u64,
}

/// Cache key for one month's remote payload.
pub fn schedule_cache_key(year: i32, month: u8) -> String {
    format!("schedule:{:04}-{:02}", year, month)
}

impl ReconciliationContext {
    pub fn new(
        config: Config,
        roster: Roster,
        templates: TemplateCatalog,
        overlays: OverlayStore,
        archive: ScheduleArchive,
    ) -> Self {
        Self {
            config,
            cache: RequestCache::new(),
            overlays,
            archive,
            roster,
            templates,
            schedule: None,
            load_seq: 0,
        }
    }

    /// Issue a token for a new month-load; any load still in flight under
    /// an older token becomes stale.
    pub fn begin_load(&mut self) -> LoadToken {
        self.load_seq += 1;
        LoadToken(self.load_seq)
    }

    /// Fetch (through the cache), build and commit a month's baselines.
    ///
    /// Returns `Ok(false)` when the token was superseded while the fetch
    /// ran: the result is dropped and shared state stays untouched. A
    /// fetch failure is surfaced to the caller and caches nothing.
    pub fn load_month<F>(
        &mut self,
        token: LoadToken,
        year: i32,
        month: u8,
        fetch: F,
    ) -> Result<bool>
    where
        F: FnOnce() -> Result<RemoteMonthPayload>,
    {
        let opts = CacheOptions::ttl(Duration::from_millis(self.config.cache_ttl_ms));
        let payload = self
            .cache
            .cached(&schedule_cache_key(year, month), opts, fetch)?;

        if token.0 != self.load_seq {
            return Ok(false); // superseded by a newer request
        }

        let schedule = build_month_schedule(
            &payload,
            &self.roster,
            &self.templates,
            year,
            month,
            self.config.display_offset_minutes,
        );
        self.archive.store(&schedule)?;
        self.schedule = Some(schedule);
        Ok(true)
    }

    /// Fall back to the archived last-known-good schedule for a month.
    /// Returns false when nothing was archived for it.
    pub fn restore_last_good(&mut self, year: i32, month: u8) -> bool {
        match self.archive.get(year, month) {
            Some(schedule) => {
                self.schedule = Some(schedule.clone());
                true
            }
            None => false,
        }
    }

    /// The loaded month, if any.
    pub fn schedule(&self) -> Option<&MonthSchedule> {
        self.schedule.as_ref()
    }

    /// The last-synchronized grid for a line.
    pub fn baseline(&self, line: &str) -> Option<&ScheduleGrid> {
        self.schedule.as_ref()?.lines.get(line)
    }

    /// Baseline plus pending overlay edits.
    pub fn effective(&self, line: &str) -> Option<ScheduleGrid> {
        let baseline = self.baseline(line)?;
        Some(self.overlays.apply_to(baseline, &self.templates))
    }

    /// Diff the effective grid against the baseline for one line.
    ///
    /// A failure leaves the baseline and the overlay store untouched.
    pub fn plan(&self, line: &str) -> Result<SyncPlan> {
        let baseline = self
            .baseline(line)
            .ok_or_else(|| anyhow::anyhow!("no loaded baseline for line {line}"))?;
        let effective = self.overlays.apply_to(baseline, &self.templates);
        reconcile::diff(baseline, &effective, self.config.display_offset_minutes)
    }

    /// Mark a line's plan as confirmed by the remote system: the effective
    /// grid becomes the new baseline, exactly that line/month's overlay
    /// entries are cleared, and the month's cache entry is invalidated so
    /// the next reload refetches. Returns the number of cleared entries.
    pub fn confirm_applied(&mut self, line: &str) -> Result<usize> {
        let effective = self
            .effective(line)
            .ok_or_else(|| anyhow::anyhow!("no loaded baseline for line {line}"))?;
        let (year, month) = (effective.year, effective.month);

        let schedule = self
            .schedule
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("no loaded month"))?;
        schedule.lines.insert(line.to_string(), effective);

        let removed = self
            .overlays
            .clear_matching(|k| k.matches_month(line, year, month))?;
        self.cache.invalidate_key(&schedule_cache_key(year, month));
        if let Some(schedule) = &self.schedule {
            self.archive.store(schedule)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Employee;
    use crate::overlay::{OverlayEntry, OverlayKey, ShiftPatch};
    use crate::remote::RemoteScheduleItem;

    fn test_context() -> ReconciliationContext {
        let mut roster = Roster::default();
        roster.by_line.insert(
            "L1".into(),
            vec![Employee {
                employee_id: 42,
                full_name: "Ada".into(),
                department_id: None,
            }],
        );
        ReconciliationContext::new(
            Config::default(),
            roster,
            TemplateCatalog::default(),
            OverlayStore::in_memory(),
            ScheduleArchive::in_memory(),
        )
    }

    fn payload_one_shift() -> RemoteMonthPayload {
        RemoteMonthPayload {
            items: vec![RemoteScheduleItem {
                remote_id: "R1".into(),
                employee_id: 42,
                due_instant: "2026-08-05T08:00:00Z".into(),
                duration_minutes: Some(720),
                template_id: None,
                amount: Some(1500),
                departments: vec![],
            }],
            ..RemoteMonthPayload::default()
        }
    }

    #[test]
    fn test_load_and_plan_empty() {
        let mut ctx = test_context();
        let token = ctx.begin_load();
        assert!(ctx.load_month(token, 2026, 8, || Ok(payload_one_shift())).unwrap());

        let plan = ctx.plan("L1").unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_stale_token_discarded() {
        let mut ctx = test_context();
        let stale = ctx.begin_load();
        let fresh = ctx.begin_load();

        // The older load completes second; its result must be dropped.
        assert!(ctx
            .load_month(fresh, 2026, 8, || Ok(payload_one_shift()))
            .unwrap());
        assert!(!ctx
            .load_month(stale, 2026, 9, || Ok(RemoteMonthPayload::default()))
            .unwrap());

        let schedule = ctx.schedule().unwrap();
        assert_eq!((schedule.year, schedule.month), (2026, 8));
    }

    #[test]
    fn test_fetch_error_leaves_state_untouched() {
        let mut ctx = test_context();
        let token = ctx.begin_load();
        assert!(ctx.load_month(token, 2026, 8, || Ok(payload_one_shift())).unwrap());

        let token = ctx.begin_load();
        let err = ctx.load_month(token, 2026, 9, || anyhow::bail!("network down"));
        assert!(err.is_err());
        assert_eq!(ctx.schedule().unwrap().month, 8);
    }

    #[test]
    fn test_plan_without_load_errors() {
        let ctx = test_context();
        assert!(ctx.plan("L1").is_err());
    }

    #[test]
    fn test_confirm_applied_promotes_and_clears() {
        let mut ctx = test_context();
        let token = ctx.begin_load();
        ctx.load_month(token, 2026, 8, || Ok(payload_one_shift())).unwrap();

        // Pending edit for L1 plus one for another month that must survive.
        ctx.overlays
            .set(
                OverlayKey::new("L1", 2026, 8, 42, 5),
                OverlayEntry::Set(ShiftPatch {
                    start_local: Some("09:00".into()),
                    end_local: Some("21:00".into()),
                    amount: Some(1500),
                    ..ShiftPatch::default()
                }),
            )
            .unwrap();
        ctx.overlays
            .set(OverlayKey::new("L1", 2026, 9, 42, 5), OverlayEntry::Delete)
            .unwrap();

        let plan = ctx.plan("L1").unwrap();
        assert_eq!(plan.update.len(), 1);

        let removed = ctx.confirm_applied("L1").unwrap();
        assert_eq!(removed, 1);
        assert_eq!(ctx.overlays.len(), 1);

        // New baseline equals the former effective grid: nothing pending.
        let plan = ctx.plan("L1").unwrap();
        assert!(plan.is_empty());
        assert_eq!(
            ctx.baseline("L1").unwrap().cell(42, 5).unwrap().start_local.as_deref(),
            Some("09:00")
        );
        // The preserved remote id still allows later edits to update.
        assert_eq!(
            ctx.baseline("L1").unwrap().cell(42, 5).unwrap().remote_id.as_deref(),
            Some("R1")
        );
    }

    #[test]
    fn test_restore_last_good_after_failed_reload() {
        let mut ctx = test_context();
        let token = ctx.begin_load();
        ctx.load_month(token, 2026, 8, || Ok(payload_one_shift())).unwrap();
        ctx.cache.clear_all();

        let token = ctx.begin_load();
        assert!(ctx
            .load_month(token, 2026, 8, || anyhow::bail!("network down"))
            .is_err());

        assert!(ctx.restore_last_good(2026, 8));
        assert!(ctx.baseline("L1").unwrap().cell(42, 5).is_some());
        assert!(!ctx.restore_last_good(2026, 9));
    }

    #[test]
    fn test_cache_serves_second_load() {
        let mut ctx = test_context();
        let mut calls = 0;

        let token = ctx.begin_load();
        ctx.load_month(token, 2026, 8, || {
            calls += 1;
            Ok(payload_one_shift())
        })
        .unwrap();
        // Borrow of `calls` ends with the closure; a second fetch within
        // the TTL must be served from the cache.
        let token = ctx.begin_load();
        ctx.load_month(token, 2026, 8, || {
            panic!("second load within TTL must hit the cache")
        })
        .unwrap();
        assert_eq!(calls, 1);
    }
}
