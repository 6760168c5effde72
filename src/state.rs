// src/state.rs
//! The scheduler's durable memory: one JSON document, upserted every tick
//! that mutates it. Loading tolerates a missing or corrupt file (first-run
//! defaults); storing goes through a temp file and rename so a crash
//! mid-write never leaves a torn state visible.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CastState {
    /// True iff we believe the device is currently showing event content.
    pub is_active: bool,
    /// External reference of the event currently on screen.
    pub active_reference: Option<String>,
    pub cast_started_at: Option<NaiveDateTime>,
    /// Fingerprint of the last record body that was cast.
    pub last_fingerprint: Option<String>,
    /// Whether the one-time post-start re-verification ran for this session.
    pub failsafe_done: bool,
}

impl CastState {
    /// Record a successful Idle→Showing transition.
    pub fn begin_session(&mut self, reference: String, fingerprint: String, now: NaiveDateTime) {
        self.is_active = true;
        self.active_reference = Some(reference);
        self.cast_started_at = Some(now);
        self.last_fingerprint = Some(fingerprint);
        self.failsafe_done = false;
    }

    /// Record a successful re-cast of updated content. The cooldown clock
    /// restarts; the failsafe flag is a per-session property and stays put.
    pub fn note_refresh(&mut self, reference: String, fingerprint: String, now: NaiveDateTime) {
        self.active_reference = Some(reference);
        self.cast_started_at = Some(now);
        self.last_fingerprint = Some(fingerprint);
    }

    /// Record a successful Showing→Idle transition.
    pub fn clear(&mut self) {
        *self = CastState::default();
    }
}

/// Load the state file. Missing or unreadable content is a first run, not an
/// error; the system self-heals rather than crashing.
pub async fn load_state(path: &Path) -> CastState {
    match fs::read_to_string(path).await {
        Ok(s) => match serde_json::from_str(&s) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "corrupt cast state, starting fresh");
                CastState::default()
            }
        },
        Err(_) => CastState::default(),
    }
}

/// Persist the state atomically: write a sibling temp file, then rename over
/// the live path.
pub async fn store_state(path: &Path, state: &CastState) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating state dir {}", dir.display()))?;
    }
    let body = serde_json::to_vec_pretty(state).context("serializing cast state")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &body)
        .await
        .with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("renaming {} into place", tmp.display()))?;
    Ok(())
}
