//! Tracing setup shared by every binary: an env-filtered formatter plus an
//! optional layer that forwards high-severity events to a Discord channel.

mod config;
mod discord;
mod layer;
mod notifier;

use std::sync::Arc;

use anyhow::Result;
use config::AlertSettings;
use discord::DiscordAlertSink;
use layer::AlertLayer;
use notifier::AlertDispatcher;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Must be called from inside a tokio runtime when alerts are enabled.
pub fn init_observability(component: &str) -> Result<()> {
    let settings = AlertSettings::from_env(component);

    let alert_layer = match settings.discord.as_ref() {
        Some(discord) => {
            let sink = DiscordAlertSink::new(discord.webhook_url.clone())?;
            let dispatcher = AlertDispatcher::spawn(vec![Arc::new(sink)]);
            Some(
                AlertLayer::new(dispatcher, settings.origin.clone())
                    .with_filter(LevelFilter::from_level(discord.min_level)),
            )
        }
        None => None,
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(alert_layer)
        .with(env_filter)
        .try_init()?;

    for warning in &settings.warnings {
        warn!(
            service = %settings.origin.service,
            stage = %settings.origin.stage,
            warning = %warning,
            "observability: config warning"
        );
    }

    info!(
        service = %settings.origin.service,
        stage = %settings.origin.stage,
        component = %settings.origin.component,
        alerts_enabled = settings.discord.is_some(),
        "observability: tracing initialised"
    );

    Ok(())
}
