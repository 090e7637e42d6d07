//! Engine configuration parsed from environment variables.
//!
//! Every variable is optional; absent ones take the defaults below. A value
//! that is present but unparseable is an error rather than a silent default,
//! so a typo in `.env` is caught at startup.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::collab::UserInfo;
use crate::consts::{
    DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_PADDING, DEFAULT_CANVAS_WIDTH, DEFAULT_EVENT_CAPACITY, DEFAULT_HISTORY_LIMIT,
    DEFAULT_PRESENCE_COLOR,
};
use crate::geometry::{CanvasBounds, ResizeMode};
use crate::store::StoreConfig;

pub const DEFAULT_DASHBOARD_ID: &str = "default-dashboard";
pub const DEFAULT_DATA_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PREFS_PATH: &str = "dashboard-prefs.json";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: expected {expected}, got {value:?}")]
    Invalid { var: &'static str, expected: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub dashboard_id: String,
    pub store: StoreConfig,
    pub canvas: CanvasBounds,
    pub resize_mode: ResizeMode,
    pub collab_enabled: bool,
    pub user: UserInfo,
    pub data_timeout: Duration,
    pub prefs_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dashboard_id: DEFAULT_DASHBOARD_ID.into(),
            store: StoreConfig::default(),
            canvas: CanvasBounds::default(),
            resize_mode: ResizeMode::default(),
            collab_enabled: true,
            user: UserInfo { name: None, color: Some(DEFAULT_PRESENCE_COLOR.into()) },
            data_timeout: Duration::from_secs(DEFAULT_DATA_TIMEOUT_SECS),
            prefs_path: PathBuf::from(DEFAULT_PREFS_PATH),
        }
    }
}

impl EngineConfig {
    /// Build config from the process environment, after loading `.env` if present.
    ///
    /// Optional:
    /// - `DASHBOARD_ID`: default `default-dashboard`
    /// - `DASHBOARD_HISTORY_LIMIT`: default 100
    /// - `DASHBOARD_EVENT_CAPACITY`: default 256
    /// - `CANVAS_WIDTH` / `CANVAS_HEIGHT` / `CANVAS_PADDING`: default 1200 / 800 / 20
    /// - `RESIZE_ANCHOR_EDGES`: default `false`
    /// - `COLLAB_ENABLED`: default `true`
    /// - `COLLAB_USER_NAME` / `COLLAB_USER_COLOR`: default unset / `#000000`
    /// - `DATA_REQUEST_TIMEOUT_SECS`: default 30
    /// - `PREFS_PATH`: default `dashboard-prefs.json`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for a malformed number or boolean.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!(error = %e, "could not read .env");
            }
        }
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(value) => Some(value),
            Err(_) => None,
        })
    }

    /// Build config from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`EngineConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store = StoreConfig {
            history_limit: parse_num(var("DASHBOARD_HISTORY_LIMIT"), "DASHBOARD_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?,
            event_capacity: parse_num(var("DASHBOARD_EVENT_CAPACITY"), "DASHBOARD_EVENT_CAPACITY", DEFAULT_EVENT_CAPACITY)?,
        };
        let canvas = CanvasBounds::new(
            parse_num(var("CANVAS_WIDTH"), "CANVAS_WIDTH", DEFAULT_CANVAS_WIDTH)?,
            parse_num(var("CANVAS_HEIGHT"), "CANVAS_HEIGHT", DEFAULT_CANVAS_HEIGHT)?,
            parse_num(var("CANVAS_PADDING"), "CANVAS_PADDING", DEFAULT_CANVAS_PADDING)?,
        );
        let resize_mode = if parse_bool(var("RESIZE_ANCHOR_EDGES"), "RESIZE_ANCHOR_EDGES", false)? {
            ResizeMode::AnchorOppositeEdge
        } else {
            ResizeMode::SizeOnly
        };
        let user = UserInfo {
            name: var("COLLAB_USER_NAME"),
            color: var("COLLAB_USER_COLOR").or(defaults.user.color),
        };

        Ok(Self {
            dashboard_id: var("DASHBOARD_ID").unwrap_or(defaults.dashboard_id),
            store,
            canvas,
            resize_mode,
            collab_enabled: parse_bool(var("COLLAB_ENABLED"), "COLLAB_ENABLED", true)?,
            user,
            data_timeout: Duration::from_secs(parse_num(
                var("DATA_REQUEST_TIMEOUT_SECS"),
                "DATA_REQUEST_TIMEOUT_SECS",
                DEFAULT_DATA_TIMEOUT_SECS,
            )?),
            prefs_path: var("PREFS_PATH").map_or(defaults.prefs_path, PathBuf::from),
        })
    }
}

fn parse_num<T: std::str::FromStr>(raw: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid { var, expected: "a number", value: raw })
}

fn parse_bool(raw: Option<String>, var: &'static str, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { var, expected: "a boolean", value: raw }),
    }
}
