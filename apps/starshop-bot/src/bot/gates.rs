use chrono::{DateTime, Timelike, Utc};
use tracing::{debug, warn};

use crate::config::{Config, WorkingHours};
use crate::services::notification_service::NotificationSink;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// True when the client language (e.g. `ru`, `ru-RU`) falls in a blocked locale.
pub fn locale_blocked(config: &Config, language_code: Option<&str>) -> bool {
    let Some(code) = language_code else {
        return false;
    };
    let primary = code
        .split(['-', '_'])
        .next()
        .unwrap_or(code)
        .to_ascii_lowercase();
    config
        .blocked_locales
        .iter()
        .any(|blocked| blocked.eq_ignore_ascii_case(&primary))
}

/// True when the phone number starts with a blocked dialling prefix. The leading `+` is
/// optional on both sides since clients send either form.
pub fn phone_blocked(config: &Config, phone_number: &str) -> bool {
    let digits = phone_number.trim().trim_start_matches('+');
    config.blocked_phone_prefixes.iter().any(|prefix| {
        let prefix = prefix.trim_start_matches('+');
        !prefix.is_empty() && digits.starts_with(prefix)
    })
}

/// Checks the required channel. Lookup failures count as not subscribed; with no channel
/// configured everyone passes.
pub async fn is_subscribed(config: &Config, sink: &dyn NotificationSink, user_id: i64) -> bool {
    let Some(channel) = config.channel_id.as_deref() else {
        return true;
    };

    match sink.membership(channel, user_id).await {
        Ok(status) => {
            debug!("User {} membership in {}: {:?}", user_id, channel, status);
            status.is_subscribed()
        }
        Err(e) => {
            warn!("Failed to check channel membership for user {}: {}", user_id, e);
            false
        }
    }
}

pub fn is_open(now: DateTime<Utc>, hours: &WorkingHours) -> bool {
    let hour = now.with_timezone(&hours.offset).hour();
    hour >= hours.open_hour && hour < hours.close_hour
}
