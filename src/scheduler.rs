// src/scheduler.rs
//! # Cast scheduler
//! The long-running control loop. Each tick reads the latest display record
//! and the persisted [`CastState`], consults the wall clock, and issues at
//! most one device transition: start, refresh, or stop. Failed commands
//! never advance state; the same transition is retried on the next tick.
//!
//! `tick` takes `now` as a parameter so every transition is replayable in
//! tests without touching the clock.

use chrono::NaiveDateTime;
use metrics::{counter, gauge};

use crate::config::SchedulerConfig;
use crate::device::DeviceCommander;
use crate::fingerprint::fingerprint;
use crate::hours::in_early_start_window;
use crate::notify::{AlertPayload, NotifierMux, Severity};
use crate::record::{self, DisplayRecord, EventStatus};
use crate::state::{self, CastState};

/// Consecutive device-command failures before one warning alert goes out.
const FAILURE_ALERT_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// Nothing to do (idle, or showing unchanged content).
    Idle,
    Started,
    Refreshed,
    /// Content changed but the cooldown suppressed the re-cast.
    Suppressed,
    Stopped,
    CommandFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Whether the persisted state changed and needs a write.
    pub mutated: bool,
    pub action: TickAction,
}

impl TickOutcome {
    fn idle() -> Self {
        Self {
            mutated: false,
            action: TickAction::Idle,
        }
    }
}

pub struct CastScheduler<D: DeviceCommander> {
    cfg: SchedulerConfig,
    device: D,
    notifier: NotifierMux,
    state: CastState,
    consecutive_failures: u32,
}

impl<D: DeviceCommander> CastScheduler<D> {
    pub fn new(cfg: SchedulerConfig, device: D, notifier: NotifierMux) -> Self {
        Self {
            cfg,
            device,
            notifier,
            state: CastState::default(),
            consecutive_failures: 0,
        }
    }

    /// Resume from the persisted state file (missing/corrupt = first run).
    pub async fn load(cfg: SchedulerConfig, device: D, notifier: NotifierMux) -> Self {
        let state = state::load_state(&cfg.state_path).await;
        Self {
            cfg,
            device,
            notifier,
            state,
            consecutive_failures: 0,
        }
    }

    /// Seed a specific state, for tests and replay.
    pub fn with_state(mut self, state: CastState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &CastState {
        &self.state
    }

    /// The combined gate: the producer wants this shown, and either the
    /// venue is open, the event is about to start, or it is already live.
    fn display_eligible(&self, r: &DisplayRecord, now: NaiveDateTime) -> bool {
        if !r.should_display {
            return false;
        }
        if r.event.status == EventStatus::Active {
            return true;
        }
        if let (Some(date), Some(time)) = (r.event.date, r.event.scheduled_time) {
            if date == now.date()
                && in_early_start_window(date, time, now, self.cfg.early_start_offset())
            {
                return true;
            }
        }
        self.cfg.hours.contains(now)
    }

    /// Run one scheduling step against the given record and wall clock.
    pub async fn tick(&mut self, now: NaiveDateTime, record: Option<&DisplayRecord>) -> TickOutcome {
        crate::metrics::ensure_described();
        counter!("scheduler_ticks_total").increment(1);
        gauge!("scheduler_last_tick_ts").set(now.and_utc().timestamp() as f64);

        match record {
            Some(r) if self.display_eligible(r, now) => {
                if self.state.is_active {
                    self.continue_session(r, now).await
                } else {
                    self.start_session(r, now).await
                }
            }
            _ => {
                if self.state.is_active {
                    self.end_session(now).await
                } else {
                    TickOutcome::idle()
                }
            }
        }
    }

    /// Idle→Showing. Stop first: harmless when already idle, and guarantees
    /// a clean slate if a previous session leaked.
    async fn start_session(&mut self, r: &DisplayRecord, now: NaiveDateTime) -> TickOutcome {
        if let Err(e) = self.device.stop().await {
            return self.command_failed("stop-before-start", e, now).await;
        }
        if let Err(e) = self.device.start(&self.cfg.cast_url).await {
            return self.command_failed("start", e, now).await;
        }
        self.note_command_success();

        let fp = fingerprint(&r.event);
        self.state
            .begin_session(r.event.external_reference.clone(), fp, now);
        counter!("cast_starts_total").increment(1);
        gauge!("cast_active").set(1.0);
        tracing::info!(
            event = %r.event.name,
            reference = %r.event.external_reference,
            "cast started"
        );
        TickOutcome {
            mutated: true,
            action: TickAction::Started,
        }
    }

    /// Showing→Showing: re-cast on real content change (outside the
    /// cooldown), then run the one-shot failsafe re-verification.
    async fn continue_session(&mut self, r: &DisplayRecord, now: NaiveDateTime) -> TickOutcome {
        let current_fp = fingerprint(&r.event);
        let mut outcome = TickOutcome::idle();

        if self.state.last_fingerprint.as_deref() != Some(current_fp.as_str()) {
            if self.in_cooldown(now) {
                tracing::debug!(
                    fingerprint = %current_fp,
                    last = ?self.state.last_fingerprint,
                    "content changed inside cooldown, re-cast suppressed"
                );
                outcome.action = TickAction::Suppressed;
            } else {
                match self.recast(r, &current_fp, now).await {
                    Ok(()) => {
                        tracing::info!(event = %r.event.name, "content changed, display re-cast");
                        outcome = TickOutcome {
                            mutated: true,
                            action: TickAction::Refreshed,
                        };
                    }
                    Err(e) => return self.command_failed("refresh", e, now).await,
                }
            }
        }

        // Failsafe: one corrective check per session, anchored to the
        // event's own scheduled start so a stale upstream "active" status
        // still gets caught.
        if !self.state.failsafe_done {
            if let Some(anchor) = self.failsafe_anchor(r) {
                if now >= anchor + self.cfg.failsafe_delay() {
                    let drifted = self.state.active_reference.as_deref()
                        != Some(r.event.external_reference.as_str())
                        || self.state.last_fingerprint.as_deref() != Some(current_fp.as_str());
                    if drifted {
                        tracing::info!(
                            reference = %r.event.external_reference,
                            "failsafe: content drifted since cast, forcing re-cast"
                        );
                        if let Err(e) = self.recast(r, &current_fp, now).await {
                            // At-most-once: the check is consumed even when
                            // the forced re-cast fails.
                            self.state.failsafe_done = true;
                            let mut failed = self.command_failed("failsafe-refresh", e, now).await;
                            failed.mutated = true;
                            return failed;
                        }
                        outcome.action = TickAction::Refreshed;
                    } else {
                        tracing::debug!("failsafe: content verified unchanged");
                    }
                    self.state.failsafe_done = true;
                    outcome.mutated = true;
                }
            }
        }

        outcome
    }

    /// Showing→Idle.
    async fn end_session(&mut self, now: NaiveDateTime) -> TickOutcome {
        if let Err(e) = self.device.stop().await {
            return self.command_failed("stop", e, now).await;
        }
        self.note_command_success();
        self.state.clear();
        counter!("cast_stops_total").increment(1);
        gauge!("cast_active").set(0.0);
        tracing::info!("cast stopped, device back to idle content");
        TickOutcome {
            mutated: true,
            action: TickAction::Stopped,
        }
    }

    async fn recast(&mut self, r: &DisplayRecord, fp: &str, now: NaiveDateTime) -> anyhow::Result<()> {
        self.device.refresh(&self.cfg.cast_url).await?;
        self.note_command_success();
        self.state
            .note_refresh(r.event.external_reference.clone(), fp.to_string(), now);
        counter!("cast_refreshes_total").increment(1);
        Ok(())
    }

    fn in_cooldown(&self, now: NaiveDateTime) -> bool {
        match self.state.cast_started_at {
            Some(started) => now - started < self.cfg.cooldown(),
            None => false,
        }
    }

    /// The failsafe clock anchors to the event's scheduled start; a record
    /// with no schedule falls back to when the cast began.
    fn failsafe_anchor(&self, r: &DisplayRecord) -> Option<NaiveDateTime> {
        match (r.event.date, r.event.scheduled_time) {
            (Some(d), Some(t)) => Some(d.and_time(t)),
            _ => self.state.cast_started_at,
        }
    }

    fn note_command_success(&mut self) {
        self.consecutive_failures = 0;
    }

    async fn command_failed(
        &mut self,
        command: &str,
        err: anyhow::Error,
        now: NaiveDateTime,
    ) -> TickOutcome {
        self.consecutive_failures += 1;
        counter!("device_failures_total").increment(1);
        tracing::warn!(
            error = ?err,
            command,
            consecutive = self.consecutive_failures,
            "device command failed; state unchanged, retrying next tick"
        );
        if self.consecutive_failures == FAILURE_ALERT_THRESHOLD {
            let alert = AlertPayload {
                severity: Severity::Warning,
                title: "cast device unresponsive".to_string(),
                body: format!(
                    "{} consecutive command failures on '{}' (last: {command}: {err:#})",
                    self.consecutive_failures, self.cfg.device_name
                ),
                timestamp_iso: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
            };
            self.notifier.notify(&alert).await;
        }
        TickOutcome {
            mutated: false,
            action: TickAction::CommandFailed,
        }
    }

    /// Poll forever. Each tick is cheap and idempotent; there is no backoff
    /// beyond "try again next tick".
    pub async fn run(mut self) {
        tracing::info!(
            device = self.device.name(),
            interval_secs = self.cfg.tick_interval_secs,
            record = %self.cfg.record_path.display(),
            "cast scheduler running"
        );
        let mut ticker = tokio::time::interval(self.cfg.tick_interval());
        loop {
            ticker.tick().await;
            let now = chrono::Local::now().naive_local();
            let record = record::load_display_record(&self.cfg.record_path).await;
            let outcome = self.tick(now, record.as_ref()).await;
            if outcome.mutated {
                if let Err(e) = state::store_state(&self.cfg.state_path, &self.state).await {
                    tracing::warn!(error = ?e, "persisting cast state failed");
                }
            }
        }
    }
}
