use std::env;

use anyhow::{Context, Result, bail};
use chrono::{FixedOffset, Offset, Utc};

/// Opening window of the order desk, in whole hours of the business offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub open_hour: u32,
    /// Exclusive; `24` means "until midnight".
    pub close_hour: u32,
    pub offset: FixedOffset,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            open_hour: 9,
            close_hour: 24,
            offset: FixedOffset::east_opt(2 * 3600).unwrap_or_else(|| Utc.fix()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub bot_username: String,
    pub operator_ids: Vec<i64>,
    pub channel_id: Option<String>,
    pub database_url: Option<String>,
    pub orders_database_url: Option<String>,
    pub public_url: Option<String>,
    pub port: u16,
    pub public_dir: String,
    pub storefront_url: String,
    pub showcase_url: String,
    pub fragment_url: String,
    pub support_url: String,
    pub proofs_channel_url: String,
    pub dashboard_url: String,
    pub blocked_locales: Vec<String>,
    pub blocked_phone_prefixes: Vec<String>,
    pub working_hours: WorkingHours,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bot_token = env::var("TELEGRAM_TOKEN")
            .or_else(|_| env::var("BOT_TOKEN"))
            .context("TELEGRAM_TOKEN is not set")?;

        let operator_ids = match non_empty("OPERATOR_IDS") {
            Some(list) => parse_ids(&list)?,
            None => {
                let legacy: Vec<String> = ["ADMIN_ID", "SECOND_ADMIN_ID"]
                    .iter()
                    .filter_map(|key| non_empty(key))
                    .collect();
                parse_ids(&legacy.join(","))?
            }
        };

        let database_url = non_empty("DATABASE_URL");
        let orders_database_url = non_empty("ORDERS_DATABASE_URL").or_else(|| database_url.clone());

        let port = non_empty("PORT")
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("PORT must be a number")?
            .unwrap_or(3000);

        let working_hours = parse_working_hours(
            non_empty("BUSINESS_HOURS").as_deref(),
            non_empty("BUSINESS_UTC_OFFSET_HOURS").as_deref(),
        )?;

        Ok(Self {
            bot_token,
            bot_username: non_empty("BOT_USERNAME").unwrap_or_else(|| "PandaStores_bot".to_string()),
            operator_ids,
            channel_id: non_empty("CHANNEL_ID"),
            database_url,
            orders_database_url,
            public_url: non_empty("PUBLIC_URL").map(|u| u.trim_end_matches('/').to_string()),
            port,
            public_dir: non_empty("PUBLIC_DIR").unwrap_or_else(|| "public".to_string()),
            storefront_url: non_empty("STOREFRONT_URL")
                .unwrap_or_else(|| "https://pandastores.onrender.com".to_string()),
            showcase_url: non_empty("SHOWCASE_URL")
                .unwrap_or_else(|| "https://pandastores.netlify.app".to_string()),
            fragment_url: non_empty("FRAGMENT_URL")
                .unwrap_or_else(|| "https://fragment.com/stars".to_string()),
            support_url: non_empty("SUPPORT_URL")
                .unwrap_or_else(|| "https://t.me/OMAR_M_SHEHATA".to_string()),
            proofs_channel_url: non_empty("PROOFS_CHANNEL_URL")
                .unwrap_or_else(|| "https://t.me/Buy_StarsTG".to_string()),
            dashboard_url: non_empty("DASHBOARD_URL")
                .unwrap_or_else(|| "https://pandastores.onrender.com/admin.html".to_string()),
            blocked_locales: split_list(&non_empty("BLOCKED_LOCALES").unwrap_or_else(|| "ru".into())),
            blocked_phone_prefixes: split_list(
                &non_empty("BLOCKED_PHONE_PREFIXES").unwrap_or_else(|| "+7".into()),
            ),
            working_hours,
        })
    }

    pub fn is_operator(&self, user_id: i64) -> bool {
        self.operator_ids.contains(&user_id)
    }

    pub fn webhook_url(&self) -> Option<String> {
        self.public_url.as_ref().map(|base| format!("{base}/webhook"))
    }

    pub fn referral_link(&self, code: &str) -> String {
        format!("https://t.me/{}?start={}", self.bot_username, code)
    }

    /// Link to join the required channel, when it is addressed by username.
    pub fn channel_link(&self) -> Option<String> {
        self.channel_id
            .as_deref()
            .and_then(|id| id.strip_prefix('@'))
            .map(|name| format!("https://t.me/{name}"))
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_ids(raw: &str) -> Result<Vec<i64>> {
    split_list(raw)
        .iter()
        .map(|id| {
            id.parse::<i64>()
                .with_context(|| format!("invalid operator id: {id}"))
        })
        .collect()
}

fn parse_working_hours(hours: Option<&str>, offset: Option<&str>) -> Result<WorkingHours> {
    let mut parsed = WorkingHours::default();

    if let Some(hours) = hours {
        let (open, close) = hours
            .split_once('-')
            .with_context(|| format!("BUSINESS_HOURS must look like 9-24, got {hours}"))?;
        parsed.open_hour = open.trim().parse().context("invalid opening hour")?;
        parsed.close_hour = close.trim().parse().context("invalid closing hour")?;
        if parsed.open_hour >= parsed.close_hour || parsed.close_hour > 24 {
            bail!("BUSINESS_HOURS window {hours} is empty or exceeds a day");
        }
    }

    if let Some(offset) = offset {
        let hours: i32 = offset.parse().context("BUSINESS_UTC_OFFSET_HOURS must be an integer")?;
        parsed.offset = FixedOffset::east_opt(hours * 3600)
            .with_context(|| format!("UTC offset out of range: {hours}"))?;
    }

    Ok(parsed)
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            bot_token: "test-token".into(),
            bot_username: "TestStars_bot".into(),
            operator_ids: vec![9001, 9002],
            channel_id: Some("@stars_channel".into()),
            database_url: None,
            orders_database_url: None,
            public_url: Some("https://stars.example".into()),
            port: 0,
            public_dir: "public".into(),
            storefront_url: "https://stars.example/shop".into(),
            showcase_url: "https://showcase.example".into(),
            fragment_url: "https://fragment.com/stars".into(),
            support_url: "https://t.me/support".into(),
            proofs_channel_url: "https://t.me/proofs".into(),
            dashboard_url: "https://stars.example/admin.html".into(),
            blocked_locales: vec!["ru".into()],
            blocked_phone_prefixes: vec!["+7".into()],
            working_hours: WorkingHours::default(),
        }
    }
}
