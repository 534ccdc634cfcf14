use std::collections::HashSet;

use serde::Deserialize;

use crate::application::{AppError, AppResult};
use crate::domain::{Condition, WatchKind, WatchSpec};

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Destination channel id for notifications.
    pub notify_channel: String,
    #[serde(default = "default_fetch_timeout_seconds")]
    pub fetch_timeout_seconds: u64,
    #[serde(default = "default_shutdown_grace_seconds")]
    pub shutdown_grace_seconds: u64,
    #[serde(default)]
    pub dibs: Vec<DibCfg>,
}

fn default_fetch_timeout_seconds() -> u64 {
    30
}

fn default_shutdown_grace_seconds() -> u64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct DibCfg {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DibKind,
    pub url: String,
    /// Required for `type: html`.
    pub selector: Option<String>,
    /// Boolean condition over a matched element. Required for `type: html`.
    #[serde(rename = "if")]
    pub condition: Option<String>,
    pub message: String,
    /// Duration string, e.g. `10m` or `1h`.
    pub interval: String,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DibKind {
    Html,
    Diff,
}

impl Config {
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let raw = expand_env(&raw);
        let cfg: Config = serde_yaml::from_str(&raw)?;
        Ok(cfg)
    }

    /// Validate every watch definition and convert to domain descriptors.
    /// Selectors and conditions are checked here, once, at startup.
    pub fn to_watch_specs(&self) -> AppResult<Vec<WatchSpec>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for dib in &self.dibs {
            if !seen.insert(dib.name.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate watch name: {}",
                    dib.name
                )));
            }

            let interval = humantime::parse_duration(&dib.interval).map_err(|e| {
                AppError::Config(format!(
                    "watch {}: bad interval {:?}: {}",
                    dib.name, dib.interval, e
                ))
            })?;
            if interval.is_zero() {
                return Err(AppError::Config(format!(
                    "watch {}: interval must be non-zero",
                    dib.name
                )));
            }

            let kind = match dib.kind {
                DibKind::Diff => WatchKind::Diff,
                DibKind::Html => {
                    let selector = dib.selector.clone().ok_or_else(|| {
                        AppError::Config(format!(
                            "watch {}: html watches require a selector",
                            dib.name
                        ))
                    })?;
                    scraper::Selector::parse(&selector).map_err(|e| {
                        AppError::Config(format!(
                            "watch {}: invalid selector {:?}: {}",
                            dib.name, selector, e
                        ))
                    })?;

                    let raw = dib.condition.as_deref().ok_or_else(|| {
                        AppError::Config(format!(
                            "watch {}: html watches require an `if` condition",
                            dib.name
                        ))
                    })?;
                    let condition = Condition::parse(raw).map_err(|e| {
                        AppError::Config(format!(
                            "watch {}: invalid condition {:?}: {}",
                            dib.name, raw, e
                        ))
                    })?;

                    WatchKind::Html {
                        selector,
                        condition,
                    }
                }
            };

            out.push(WatchSpec {
                name: dib.name.clone(),
                url: dib.url.clone(),
                message: dib.message.clone(),
                interval,
                kind,
            });
        }

        Ok(out)
    }
}

/// very small ${VAR} expansion to keep config simple
fn expand_env(s: &str) -> String {
    let mut out = s.to_string();
    for (k, v) in std::env::vars() {
        out = out.replace(&format!("${{{}}}", k), &v);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE: &str = r#"
notify_channel: "123456789"
dibs:
  - name: ps5-stock
    type: html
    url: https://shop.example/ps5
    selector: ".stock-status"
    if: 'ieq(text, "in stock")'
    message: PS5 back in stock
    interval: 10m
  - name: changelog
    type: diff
    url: https://release.example/notes
    message: release notes changed
    interval: 1h
"#;

    #[test]
    fn parses_a_full_config() {
        let cfg: Config = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(cfg.notify_channel, "123456789");
        assert_eq!(cfg.fetch_timeout_seconds, 30);
        assert_eq!(cfg.shutdown_grace_seconds, 10);

        let specs = cfg.to_watch_specs().unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "ps5-stock");
        assert_eq!(specs[0].interval, Duration::from_secs(600));
        assert!(matches!(specs[0].kind, WatchKind::Html { .. }));
        assert_eq!(specs[1].interval, Duration::from_secs(3600));
        assert!(matches!(specs[1].kind, WatchKind::Diff));
    }

    fn single_dib(yaml: &str) -> Config {
        serde_yaml::from_str(&format!("notify_channel: \"1\"\ndibs:\n{yaml}")).unwrap()
    }

    #[test]
    fn html_watch_without_selector_is_rejected() {
        let cfg = single_dib(
            r#"
  - name: broken
    type: html
    url: https://example.com
    if: 'text == "x"'
    message: m
    interval: 5m
"#,
        );
        let err = cfg.to_watch_specs().unwrap_err();
        assert!(err.to_string().contains("require a selector"), "{err}");
    }

    #[test]
    fn html_watch_with_malformed_condition_is_rejected_at_startup() {
        let cfg = single_dib(
            r#"
  - name: broken
    type: html
    url: https://example.com
    selector: ".price"
    if: 'text === "x"'
    message: m
    interval: 5m
"#,
        );
        let err = cfg.to_watch_specs().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("invalid condition"), "{err}");
    }

    #[test]
    fn bad_interval_is_rejected() {
        let cfg = single_dib(
            r#"
  - name: broken
    type: diff
    url: https://example.com
    message: m
    interval: soon
"#,
        );
        assert!(cfg.to_watch_specs().is_err());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let cfg = single_dib(
            r#"
  - name: twin
    type: diff
    url: https://example.com/a
    message: m
    interval: 5m
  - name: twin
    type: diff
    url: https://example.com/b
    message: m
    interval: 5m
"#,
        );
        let err = cfg.to_watch_specs().unwrap_err();
        assert!(err.to_string().contains("duplicate watch name"), "{err}");
    }

    #[test]
    fn expands_environment_variables() {
        std::env::set_var("DIBSY_TEST_CHANNEL", "424242");
        let cfg: Config =
            serde_yaml::from_str(&expand_env("notify_channel: \"${DIBSY_TEST_CHANNEL}\"\ndibs: []"))
                .unwrap();
        assert_eq!(cfg.notify_channel, "424242");
    }
}
