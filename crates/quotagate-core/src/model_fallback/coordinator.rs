//! Model fallback coordinator.

use chrono::{DateTime, Duration as TimeDelta, Utc};
use parking_lot::RwLock;
use quotagate_types::{format_wait_time, next_midnight_utc, ConfigError, ModelFallbackConfig};
use std::collections::HashMap;
use std::sync::Arc;

use super::classifier::{classify_model_error, parse_retry_hint};
use super::types::{ModelAvailability, ModelErrorKind, ModelState};
use crate::clock::{Clock, SystemClock};

/// Chooses between a primary and a fallback model from their live state.
///
/// The model set is fixed at construction, so the map itself needs no lock;
/// each record has its own.
pub struct ModelFallbackCoordinator {
    config: ModelFallbackConfig,
    models: HashMap<String, Arc<RwLock<ModelState>>>,
    clock: Arc<dyn Clock>,
}

impl ModelFallbackCoordinator {
    pub fn new(config: ModelFallbackConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ModelFallbackConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate_models()?;
        let models = [&config.primary_model, &config.fallback_model]
            .into_iter()
            .map(|name| (name.clone(), Arc::new(RwLock::new(ModelState::new(name)))))
            .collect();
        tracing::info!(
            "Model fallback configured: primary={}, fallback={}",
            config.primary_model,
            config.fallback_model
        );
        Ok(Self { config, models, clock })
    }

    pub fn primary_model(&self) -> &str {
        &self.config.primary_model
    }

    pub fn fallback_model(&self) -> &str {
        &self.config.fallback_model
    }

    fn is_available(&self, name: &str, now: DateTime<Utc>) -> bool {
        self.models.get(name).map_or(true, |state| state.read().is_available_at(now))
    }

    /// Primary if available, else fallback if available, else primary.
    ///
    /// Flags past their reset time count as cleared even before
    /// `check_and_restore_models` has run, so an idle coordinator never
    /// keeps steering away from a recovered model.
    pub fn get_current_model(&self) -> String {
        let now = self.clock.now();
        let primary = &self.config.primary_model;
        let fallback = &self.config.fallback_model;

        if self.is_available(primary, now) {
            return primary.clone();
        }
        if self.is_available(fallback, now) {
            tracing::debug!("Primary model {} unavailable, using fallback {}", primary, fallback);
            return fallback.clone();
        }
        // Both down: let the primary's own error reach the caller
        tracing::debug!("Both models unavailable, returning primary {}", primary);
        primary.clone()
    }

    /// Restore expired models, then pick one. Restorations are logged and
    /// reflected in `model_status`.
    pub fn select_model(&self) -> String {
        self.check_and_restore_models();
        self.get_current_model()
    }

    /// Mark `name` rate limited until `reset_time`.
    ///
    /// Ignored while the model is quota exhausted. A repeated mark keeps
    /// the later reset time.
    pub fn mark_model_rate_limited(&self, name: &str, reset_time: DateTime<Utc>) {
        let Some(state) = self.models.get(name) else {
            tracing::debug!("mark_model_rate_limited for unknown model {}, ignoring", name);
            return;
        };
        let mut guard = state.write();
        if guard.quota_exhausted {
            tracing::debug!("Model {} already quota exhausted, ignoring rate limit", name);
            return;
        }
        if guard.rate_limited {
            if guard.rate_limit_reset_time.map_or(true, |current| reset_time > current) {
                guard.rate_limit_reset_time = Some(reset_time);
            }
            return;
        }
        guard.rate_limited = true;
        guard.rate_limit_reset_time = Some(reset_time);
        tracing::warn!("Model {} rate limited until {}", name, reset_time);
    }

    /// Mark `name` quota exhausted until `reset_time`, superseding any rate limit.
    pub fn mark_model_quota_exhausted(&self, name: &str, reset_time: DateTime<Utc>) {
        let Some(state) = self.models.get(name) else {
            tracing::debug!("mark_model_quota_exhausted for unknown model {}, ignoring", name);
            return;
        };
        let mut guard = state.write();
        guard.rate_limited = false;
        guard.rate_limit_reset_time = None;
        if guard.quota_exhausted {
            if guard.quota_reset_time.map_or(true, |current| reset_time > current) {
                guard.quota_reset_time = Some(reset_time);
            }
            return;
        }
        guard.quota_exhausted = true;
        guard.quota_reset_time = Some(reset_time);
        tracing::warn!("Model {} quota exhausted until {}", name, reset_time);
    }

    /// Clear every flag whose reset time has passed. Returns the restored model names.
    pub fn check_and_restore_models(&self) -> Vec<String> {
        let now = self.clock.now();
        let mut restored = Vec::new();
        for name in [&self.config.primary_model, &self.config.fallback_model] {
            let Some(state) = self.models.get(name.as_str()) else {
                continue;
            };
            let mut guard = state.write();
            if guard.restore(now) && guard.is_available() {
                tracing::info!("Model {} restored", guard.name);
                restored.push(guard.name.clone());
            }
        }
        restored
    }

    /// Classify a backend error for `name` and mark the model accordingly.
    ///
    /// Returns `None` when the error is not a rate limit or quota signal.
    pub fn handle_model_error(&self, name: &str, error_text: &str) -> Option<ModelErrorKind> {
        let kind = classify_model_error(error_text)?;
        let now = self.clock.now();
        match kind {
            ModelErrorKind::DailyQuota => {
                self.mark_model_quota_exhausted(name, next_midnight_utc(now));
            }
            ModelErrorKind::RateLimited => {
                let secs = parse_retry_hint(error_text)
                    .unwrap_or(self.config.rate_limit_cooldown_secs)
                    .max(1);
                let secs = i64::try_from(secs.min(86_400)).unwrap_or(86_400);
                self.mark_model_rate_limited(name, now + TimeDelta::seconds(secs));
            }
        }
        Some(kind)
    }

    /// Availability of `name`; `None` for unknown models.
    pub fn model_status(&self, name: &str) -> Option<ModelAvailability> {
        self.models.get(name).map(|state| state.read().availability())
    }

    /// One line per model, primary first.
    pub fn status_summary(&self) -> String {
        let now = self.clock.now();
        [&self.config.primary_model, &self.config.fallback_model]
            .into_iter()
            .filter_map(|name| {
                let availability = self.model_status(name)?;
                let line = match availability.until().map(|until| (until - now).to_std()) {
                    Some(Ok(wait)) => {
                        format!("{}: {} (resets in {})", name, availability, format_wait_time(wait))
                    }
                    _ => format!("{}: {}", name, availability),
                };
                Some(line)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
