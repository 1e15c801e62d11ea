use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::NaiveTime;

use crate::{
    attachments::FitMode,
    errors::Error,
    policy::{ActiveWindow, ChannelPolicy},
    Result,
};

/// Max print dimension (dots) when the profile is unknown.
pub const DEFAULT_MAX_DIMENSION: u32 = 512;

/// Known printer profiles and their printable width in dots.
const PROFILES: &[(&str, u32)] = &[
    ("default", 512),
    ("TM-T88II", 512),
    ("TM-T88III", 512),
    ("TM-T88IV", 512),
    ("TM-T88V", 512),
    ("TM-T20II", 512),
    ("TM-P20", 384),
    ("TM-P60II", 384),
];

/// Printable width for `profile`, if it is a known profile name.
pub fn profile_max_dimension(profile: &str) -> Option<u32> {
    PROFILES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(profile))
        .map(|(_, dots)| *dots)
}

/// Typed configuration for the bridge.
///
/// Loaded once at startup from the environment (plus an optional `.env`).
/// Every required value is validated here so a bad deployment fails before
/// connecting to anything.
#[derive(Clone, Debug)]
pub struct Config {
    // Chat platform
    pub telegram_bot_token: String,
    pub ack_emoji: String,

    // Printer
    pub printer_vendor: u16,
    pub printer_product: u16,
    pub printer_profile: String,
    pub printer_device: Option<PathBuf>,
    pub printer_max_dimension: u32,

    // Channels / schedule
    pub normal_channels: Vec<i64>,
    pub inverted_channels: Vec<i64>,
    pub active_window: ActiveWindow,

    // Rate limiting
    pub rate_limit_enabled: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,

    // Attachments
    pub max_attachments: usize,
    pub max_attachment_bytes: u64,
    pub fetch_timeout: Duration,
    pub decode_timeout: Duration,
    pub fetch_concurrency: usize,
    pub image_fit: FitMode,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv(Path::new(".env"))?;
        Self::from_source(env_str)
    }

    /// Build a config from an arbitrary key lookup (the process env in production).
    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            get(key).ok_or_else(|| {
                Error::Config(format!("{key} environment variable is required"))
            })
        };

        // Chat platform
        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }
        let ack_emoji = get("ACK_EMOJI")
            .and_then(non_empty)
            .unwrap_or_else(|| "✍".to_string());

        // Printer
        let printer_vendor = parse_hex_u16("PRINTER_VENDOR", &required("PRINTER_VENDOR")?)?;
        let printer_product = parse_hex_u16("PRINTER_ID", &required("PRINTER_ID")?)?;
        let printer_profile = required("PRINTER_PROFILE")?.trim().to_string();
        if printer_profile.is_empty() {
            return Err(Error::Config("PRINTER_PROFILE must not be empty".to_string()));
        }
        let printer_device = get("PRINTER_DEVICE").and_then(non_empty).map(PathBuf::from);
        let printer_max_dimension = match get("PRINTER_MAX_DIMENSION") {
            Some(v) => parse_positive("PRINTER_MAX_DIMENSION", &v)?,
            None => profile_max_dimension(&printer_profile).unwrap_or(DEFAULT_MAX_DIMENSION),
        };

        // Channels
        let normal_channels = parse_csv_i64("NORMAL_CHANNELS", &required("NORMAL_CHANNELS")?)?;
        let inverted_channels =
            parse_csv_i64("INVERTED_CHANNELS", &required("INVERTED_CHANNELS")?)?;
        ChannelPolicy::new(&normal_channels, &inverted_channels)?;

        let active_window = parse_active_times(&required("ACTIVE_TIMES")?)?;

        // Rate limiting
        let rate_limit_enabled = match get("RATE_LIMIT_ENABLED") {
            Some(v) => parse_bool("RATE_LIMIT_ENABLED", &v)?,
            None => true,
        };
        let rate_limit_requests = match get("RATE_LIMIT_REQUESTS") {
            Some(v) => parse_positive("RATE_LIMIT_REQUESTS", &v)?,
            None => 5,
        };
        let rate_limit_window = Duration::from_secs(match get("RATE_LIMIT_WINDOW") {
            Some(v) => parse_positive::<u64>("RATE_LIMIT_WINDOW", &v)?,
            None => 120,
        });

        // Attachments
        let max_attachments = match get("MAX_ATTACHMENTS") {
            Some(v) => parse_positive("MAX_ATTACHMENTS", &v)?,
            None => 2,
        };
        let max_attachment_bytes = match get("MAX_ATTACHMENT_BYTES") {
            Some(v) => parse_positive("MAX_ATTACHMENT_BYTES", &v)?,
            None => 1_000_000,
        };
        let fetch_timeout = Duration::from_millis(match get("FETCH_TIMEOUT_MS") {
            Some(v) => parse_positive::<u64>("FETCH_TIMEOUT_MS", &v)?,
            None => 5_000,
        });
        let decode_timeout = Duration::from_millis(match get("DECODE_TIMEOUT_MS") {
            Some(v) => parse_positive::<u64>("DECODE_TIMEOUT_MS", &v)?,
            None => 5_000,
        });
        let fetch_concurrency = match get("FETCH_CONCURRENCY") {
            Some(v) => parse_positive("FETCH_CONCURRENCY", &v)?,
            None => 4,
        };
        let image_fit = match get("IMAGE_FIT") {
            Some(v) => v.parse::<FitMode>()?,
            None => FitMode::Proportional,
        };

        Ok(Self {
            telegram_bot_token,
            ack_emoji,
            printer_vendor,
            printer_product,
            printer_profile,
            printer_device,
            printer_max_dimension,
            normal_channels,
            inverted_channels,
            active_window,
            rate_limit_enabled,
            rate_limit_requests,
            rate_limit_window,
            max_attachments,
            max_attachment_bytes,
            fetch_timeout,
            decode_timeout,
            fetch_concurrency,
            image_fit,
        })
    }

    pub fn channel_policy(&self) -> Result<ChannelPolicy> {
        ChannelPolicy::new(&self.normal_channels, &self.inverted_channels)
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Export the entries of the `.env` file at `path` without overriding
/// variables already set. Returns how many were applied; a missing file is not
/// an error.
fn load_dotenv(path: &Path) -> Result<usize> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut applied = 0;
    for (key, value) in parse_dotenv(&contents) {
        if env::var_os(&key).is_none() {
            env::set_var(&key, value);
            applied += 1;
        }
    }
    Ok(applied)
}

/// `KEY=value` pairs from `.env` contents.
///
/// Blank lines and `#` comments are skipped, an `export ` prefix is accepted,
/// and one pair of matching quotes around the value is removed.
fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|&q| value.strip_prefix(q)?.strip_suffix(q))
        .unwrap_or(value)
}

fn parse_hex_u16(key: &str, raw: &str) -> Result<u16> {
    let s = raw.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(digits, 16)
        .map_err(|_| Error::Config(format!("{key} must be a hex USB id, got {raw:?}")))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{key} must be a boolean, got {raw:?}"))),
    }
}

fn parse_positive<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(Error::Config(format!(
            "{key} must be a positive integer, got {raw:?}"
        ))),
    }
}

fn parse_csv_i64(key: &str, raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| Error::Config(format!("{key} contains an invalid chat id: {s:?}")))
        })
        .collect()
}

/// Parse `"start,end"` where each bound is `H` (whole hour) or `HH:MM`.
fn parse_active_times(raw: &str) -> Result<ActiveWindow> {
    let parts: Vec<&str> = raw.split(',').map(|s| s.trim()).collect();
    let [start, end] = parts.as_slice() else {
        return Err(Error::Config(format!(
            "ACTIVE_TIMES must be two comma-separated times, got {raw:?}"
        )));
    };
    ActiveWindow::new(parse_time_of_day(start)?, parse_time_of_day(end)?)
}

fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    let parsed = if s.contains(':') {
        NaiveTime::parse_from_str(s, "%H:%M").ok()
    } else {
        s.parse::<u32>()
            .ok()
            .and_then(|h| NaiveTime::from_hms_opt(h, 0, 0))
    };
    parsed.ok_or_else(|| Error::Config(format!("ACTIVE_TIMES has an invalid time: {s:?}")))
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
