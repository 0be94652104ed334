use serde::Deserialize;

/// Service configuration (spec §6 "Configuration"), loaded from
/// `AUDIT_QUERY_`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub metrics_port: u16,

    pub database_url: String,
    pub max_audit_window_days: i64,
    pub max_event_window_days: i64,
    pub default_page_size: u32,
    pub max_page_size: u32,

    pub nats_url: String,
    pub nats_stream: String,
    pub nats_activity_subject_prefix: String,
    pub nats_event_subject_prefix: String,

    pub otel_endpoint: Option<String>,
    pub otel_sampling_ratio_ppm: u32,

    pub policy_feed_base_url: Option<String>,
    pub policy_feed_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("AUDIT_QUERY_").from_env::<Self>()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8443,
            metrics_port: 9090,
            database_url: String::new(),
            max_audit_window_days: 30,
            max_event_window_days: 60,
            default_page_size: 100,
            max_page_size: 1000,
            nats_url: "nats://127.0.0.1:4222".to_string(),
            nats_stream: "telemetry".to_string(),
            nats_activity_subject_prefix: "telemetry.activity".to_string(),
            nats_event_subject_prefix: "telemetry.event".to_string(),
            otel_endpoint: None,
            otel_sampling_ratio_ppm: 100_000,
            policy_feed_base_url: None,
            policy_feed_api_key: None,
        }
    }
}
