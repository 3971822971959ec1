//! Process-wide system settings.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Inactivity threshold used when nothing has been configured.
pub const DEFAULT_SELF_DESTRUCT_DAYS: u32 = 5;

/// Upper bound accepted for the threshold (one hundred years).
pub const MAX_SELF_DESTRUCT_DAYS: u32 = 36_500;

/// Singleton settings record, stored as one JSON value.
///
/// Missing fields fall back to their defaults so older stored values keep loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// When true only admins may use the queue.
    pub is_maintenance: bool,
    /// Days without an upload or completion before the system self-destructs.
    pub self_destruct_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            is_maintenance: false,
            self_destruct_days: DEFAULT_SELF_DESTRUCT_DAYS,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.self_destruct_days == 0 {
            return Err(Error::Validation(
                "selfDestructDays must be a positive number of days".to_string(),
            ));
        }
        if self.self_destruct_days > MAX_SELF_DESTRUCT_DAYS {
            return Err(Error::Validation(format!(
                "selfDestructDays must not exceed {MAX_SELF_DESTRUCT_DAYS}"
            )));
        }
        Ok(())
    }
}

/// Partial update as submitted by the admin panel.
///
/// Days arrive as a signed number so that negative input is reported as a
/// validation failure instead of a decoding error.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub is_maintenance: Option<bool>,
    pub self_destruct_days: Option<i64>,
}

impl SettingsUpdate {
    /// Apply on top of `current`, rejecting out-of-range values.
    pub fn apply(self, current: Settings) -> Result<Settings> {
        let mut next = current;
        if let Some(flag) = self.is_maintenance {
            next.is_maintenance = flag;
        }
        if let Some(days) = self.self_destruct_days {
            next.self_destruct_days = u32::try_from(days)
                .ok()
                .filter(|d| *d > 0)
                .ok_or_else(|| {
                    Error::Validation(format!(
                        "selfDestructDays must be a positive number of days, got {days}"
                    ))
                })?;
        }
        next.validate()?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_stored_value_keeps_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"isMaintenance": true}"#).unwrap();
        assert!(settings.is_maintenance);
        assert_eq!(settings.self_destruct_days, DEFAULT_SELF_DESTRUCT_DAYS);
    }

    #[test]
    fn update_rejects_negative_and_zero_days() {
        let current = Settings::default();
        for days in [-3, 0] {
            let update = SettingsUpdate {
                is_maintenance: None,
                self_destruct_days: Some(days),
            };
            assert!(matches!(update.apply(current), Err(Error::Validation(_))));
        }
    }

    #[test]
    fn update_only_touches_given_fields() {
        let current = Settings {
            is_maintenance: false,
            self_destruct_days: 9,
        };
        let next = SettingsUpdate {
            is_maintenance: Some(true),
            self_destruct_days: None,
        }
        .apply(current)
        .unwrap();
        assert!(next.is_maintenance);
        assert_eq!(next.self_destruct_days, 9);
    }
}
