use anyhow::{Context, Result};

use super::{
    config_model::{Auth, BackendServer, Database, DotEnvyConfig, MercadoPago, Subscription},
    stage::Stage,
};

pub const DEFAULT_REVOCATION_TTL_SECS: u64 = 24 * 60 * 60;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?
            .parse()
            .context("SERVER_PORT_BACKEND is invalid")?,
        body_limit: parse_or("SERVER_BODY_LIMIT", 10)?,
        timeout: parse_or("SERVER_TIMEOUT", 30)?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
    };

    let config = DotEnvyConfig {
        stage: get_stage(),
        backend_server,
        database,
        auth: load_auth()?,
        mercado_pago: load_mercado_pago()?,
        subscription: load_subscription()?,
    };

    check_stage_requirements(&config)?;

    Ok(config)
}

pub fn load_auth() -> Result<Auth> {
    Ok(Auth {
        jwt_secret: optional("AUTH_JWT_SECRET"),
        jwks_url: optional("AUTH_JWKS_URL"),
        issuer: optional("AUTH_ISSUER"),
        audience: optional("AUTH_AUDIENCE"),
        legacy_api_url: optional("AUTH_LEGACY_API_URL"),
        legacy_secret_key: optional("AUTH_LEGACY_SECRET_KEY"),
        legacy_token_prefixes: optional("AUTH_LEGACY_TOKEN_PREFIXES")
            .map(|raw| split_list(&raw))
            .unwrap_or_default(),
        webhook_secret: optional("AUTH_WEBHOOK_SECRET"),
        revocation_ttl_secs: parse_or("AUTH_REVOCATION_TTL_SECS", DEFAULT_REVOCATION_TTL_SECS)?,
    })
}

pub fn load_mercado_pago() -> Result<MercadoPago> {
    Ok(MercadoPago {
        access_token: required("MERCADO_PAGO_ACCESS_TOKEN")?,
        webhook_secret: optional("MERCADO_PAGO_WEBHOOK_SECRET"),
        notification_url: optional("MERCADO_PAGO_NOTIFICATION_URL"),
        currency: optional("MERCADO_PAGO_CURRENCY").unwrap_or_else(|| "BRL".to_string()),
    })
}

pub fn load_subscription() -> Result<Subscription> {
    Ok(Subscription {
        eager_activation: parse_or("SUBSCRIPTION_EAGER_ACTIVATION", false)?,
        default_callback_url: required("SUBSCRIPTION_DEFAULT_CALLBACK_URL")?,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or_default();
    Stage::try_from(&stage_str).unwrap_or_default()
}

/// Production never runs with unsigned webhooks.
pub fn check_stage_requirements(config: &DotEnvyConfig) -> Result<()> {
    if !config.stage.is_production() {
        return Ok(());
    }

    if config.mercado_pago.webhook_secret.is_none() {
        anyhow::bail!("MERCADO_PAGO_WEBHOOK_SECRET is required in production");
    }
    if config.auth.webhook_secret.is_none() {
        anyhow::bail!("AUTH_WEBHOOK_SECRET is required in production");
    }
    if config.auth.jwt_secret.is_none()
        && config.auth.jwks_url.is_none()
        && config.auth.legacy_api_url.is_none()
    {
        anyhow::bail!("no credential verification is configured (AUTH_JWT_SECRET, AUTH_JWKS_URL or AUTH_LEGACY_API_URL)");
    }

    Ok(())
}

pub fn required(key: &str) -> Result<String> {
    optional(key).with_context(|| format!("{key} is invalid"))
}

pub fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw.parse().with_context(|| format!("{key} is invalid")),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(stage: Stage) -> DotEnvyConfig {
        DotEnvyConfig {
            stage,
            backend_server: BackendServer {
                port: 8080,
                body_limit: 10,
                timeout: 30,
            },
            database: Database {
                url: "postgres://localhost/marketplace".to_string(),
            },
            auth: Auth {
                jwt_secret: Some("secret".to_string()),
                revocation_ttl_secs: DEFAULT_REVOCATION_TTL_SECS,
                ..Default::default()
            },
            mercado_pago: MercadoPago {
                access_token: "TEST-token".to_string(),
                webhook_secret: None,
                notification_url: None,
                currency: "BRL".to_string(),
            },
            subscription: Subscription {
                eager_activation: false,
                default_callback_url: "https://app.test/checkout".to_string(),
            },
        }
    }

    #[test]
    fn local_stage_accepts_unsigned_webhooks() {
        assert!(check_stage_requirements(&config(Stage::Local)).is_ok());
    }

    #[test]
    fn production_requires_webhook_secrets() {
        let mut config = config(Stage::Production);
        let err = check_stage_requirements(&config).unwrap_err();
        assert!(err.to_string().contains("MERCADO_PAGO_WEBHOOK_SECRET"));

        config.mercado_pago.webhook_secret = Some("mp".to_string());
        let err = check_stage_requirements(&config).unwrap_err();
        assert!(err.to_string().contains("AUTH_WEBHOOK_SECRET"));

        config.auth.webhook_secret = Some("whsec_abc".to_string());
        assert!(check_stage_requirements(&config).is_ok());
    }

    #[test]
    fn token_prefixes_are_split_and_trimmed() {
        assert_eq!(split_list(" sess_, ,legacy_ "), vec!["sess_", "legacy_"]);
    }
}
