use super::stage::Stage;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub stage: Stage,
    pub backend_server: BackendServer,
    pub database: Database,
    pub auth: Auth,
    pub mercado_pago: MercadoPago,
    pub subscription: Subscription,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// MiB.
    pub body_limit: u64,
    /// Seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct Auth {
    pub jwt_secret: Option<String>,
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub legacy_api_url: Option<String>,
    pub legacy_secret_key: Option<String>,
    pub legacy_token_prefixes: Vec<String>,
    pub webhook_secret: Option<String>,
    pub revocation_ttl_secs: u64,
}

#[derive(Debug, Clone)]
pub struct MercadoPago {
    pub access_token: String,
    pub webhook_secret: Option<String>,
    pub notification_url: Option<String>,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct Subscription {
    pub eager_activation: bool,
    pub default_callback_url: String,
}
