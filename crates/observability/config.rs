use std::env;

use tracing::Level;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AlertOrigin {
    pub(crate) service: String,
    pub(crate) stage: String,
    pub(crate) component: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DiscordAlertConfig {
    pub(crate) webhook_url: Url,
    pub(crate) min_level: Level,
}

#[derive(Debug, Clone)]
pub(crate) struct AlertSettings {
    pub(crate) origin: AlertOrigin,
    pub(crate) discord: Option<DiscordAlertConfig>,
    /// Logged once tracing is up.
    pub(crate) warnings: Vec<String>,
}

impl AlertSettings {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_lookup(component, |key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(component: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let component = component.trim().to_string();

        let origin = AlertOrigin {
            service: non_empty("SERVICE_NAME").unwrap_or_else(|| component.clone()),
            stage: non_empty("STAGE").unwrap_or_else(|| "local".to_string()),
            component,
        };

        let mut warnings = Vec::new();
        let enabled = match non_empty("ALERT_NOTIFY_ENABLED") {
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                warnings.push(format!("ALERT_NOTIFY_ENABLED is invalid (value: {raw}); assuming true"));
                true
            }),
            None => true,
        };

        let webhook_url = match non_empty("ALERT_DISCORD_WEBHOOK_URL") {
            Some(raw) if enabled => match Url::parse(raw.trim()) {
                Ok(url) => Some(url),
                Err(err) => {
                    // The URL embeds a credential, so only the parse error is reported.
                    warnings.push(format!(
                        "ALERT_DISCORD_WEBHOOK_URL is invalid ({err}); alerts disabled"
                    ));
                    None
                }
            },
            _ => None,
        };

        let discord = webhook_url.map(|webhook_url| {
            let min_level = match non_empty("ALERT_NOTIFY_LEVEL") {
                Some(raw) => parse_level(&raw).unwrap_or_else(|| {
                    warnings.push(format!(
                        "ALERT_NOTIFY_LEVEL is invalid (value: {raw}); defaulting to ERROR"
                    ));
                    Level::ERROR
                }),
                None => Level::ERROR,
            };
            DiscordAlertConfig {
                webhook_url,
                min_level,
            }
        });

        Self {
            origin,
            discord,
            warnings,
        }
    }
}

fn parse_level(input: &str) -> Option<Level> {
    match input.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        _ => None,
    }
}

fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> AlertSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AlertSettings::from_lookup("backend", |key| vars.get(key).cloned())
    }

    #[test]
    fn alerts_disabled_without_webhook() {
        let settings = settings(&[]);
        assert!(settings.discord.is_none());
        assert_eq!(settings.origin.service, "backend");
        assert_eq!(settings.origin.stage, "local");
    }

    #[test]
    fn webhook_and_level_are_read() {
        let settings = settings(&[
            ("ALERT_DISCORD_WEBHOOK_URL", "https://discord.test/api/webhooks/1/abc"),
            ("ALERT_NOTIFY_LEVEL", "warn"),
            ("STAGE", "production"),
        ]);

        let discord = settings.discord.unwrap();
        assert_eq!(discord.min_level, Level::WARN);
        assert_eq!(settings.origin.stage, "production");
    }

    #[test]
    fn explicit_disable_wins_over_webhook() {
        let settings = settings(&[
            ("ALERT_DISCORD_WEBHOOK_URL", "https://discord.test/api/webhooks/1/abc"),
            ("ALERT_NOTIFY_ENABLED", "off"),
        ]);
        assert!(settings.discord.is_none());
    }

    #[test]
    fn bad_values_produce_warnings_without_leaking_url() {
        let settings = settings(&[
            ("ALERT_DISCORD_WEBHOOK_URL", "not a url secret-part"),
            ("ALERT_NOTIFY_LEVEL", "loud"),
        ]);

        assert!(settings.discord.is_none());
        assert_eq!(settings.warnings.len(), 1);
        assert!(!settings.warnings[0].contains("secret-part"));
    }
}
