use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use telemetry_common::adapters::policy_feed::PolicyFeedConsumer;
use telemetry_common::adapters::UpstreamConfig;
use telemetry_models::policy::ActivityPolicy;
use telemetry_query_engine::{CompiledPolicy, PolicyCache, PolicyIndex};
use tracing::{info, warn, Level};

mod config;
mod handlers;
mod identity;
mod validation;

use config::Config;

/// Fetch the active policy set from the lifecycle controller and compile
/// it into a process-wide index. A policy that fails to compile is
/// dropped with a warning rather than failing startup (spec §4.3 "a
/// policy that fails to compile is simply not ready").
async fn build_policy_index(config: &Config) -> PolicyIndex {
    let Some(base_url) = config.policy_feed_base_url.clone() else {
        info!("no policy feed configured; starting with an empty policy index");
        return PolicyIndex::build(std::iter::empty());
    };

    let upstream = UpstreamConfig {
        base_url,
        api_key: config.policy_feed_api_key.clone(),
        ..UpstreamConfig::default()
    };

    let consumer = match PolicyFeedConsumer::new(upstream) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "failed to build policy feed client; starting with an empty policy index");
            return PolicyIndex::build(std::iter::empty());
        }
    };

    let raw_policies = match consumer.list_policies().await {
        Ok(docs) => docs,
        Err(e) => {
            warn!(error = %e, "failed to fetch policies at startup; starting with an empty policy index");
            return PolicyIndex::build(std::iter::empty());
        }
    };

    let compiled = raw_policies.into_iter().filter_map(|doc| {
        let policy: ActivityPolicy = match serde_json::from_value(serde_json::json!({
            "name": doc.name,
            "resource": {"apiGroup": doc.api_group, "kind": doc.kind},
            "auditRules": doc.rules.get("auditRules").cloned().unwrap_or(serde_json::json!([])),
            "eventRules": doc.rules.get("eventRules").cloned().unwrap_or(serde_json::json!([])),
        })) {
            Ok(p) => p,
            Err(e) => {
                warn!(policy = %doc.name, error = %e, "skipping malformed policy document");
                return None;
            }
        };

        match CompiledPolicy::compile(&policy) {
            Ok(compiled) => Some(Arc::new(compiled)),
            Err(e) => {
                warn!(policy = %policy.name, error = %e, "skipping policy that failed to compile");
                None
            }
        }
    });

    PolicyIndex::build(compiled)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    dotenv::dotenv().ok();
    let config = Config::from_env().expect("failed to load configuration");

    info!("starting audit-query-service on {}:{}", config.host, config.port);

    let db_pool = telemetry_database::create_pool(&config.database_url)
        .await
        .expect("failed to create database pool");

    let bus_client = async_nats::connect(&config.nats_url)
        .await
        .expect("failed to connect to message bus");

    let policy_index = build_policy_index(&config).await;
    let policy_cache = Arc::new(PolicyCache::new(policy_index));

    let metrics_port = config.metrics_port;
    let metrics_host = config.host.clone();

    let metrics_server = HttpServer::new(|| App::new().configure(handlers::health::configure))
        .bind((metrics_host.as_str(), metrics_port))?
        .run();
    tokio::spawn(metrics_server);

    let bind_host = config.host.clone();
    let bind_port = config.port;

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(bus_client.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(policy_cache.clone()))
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure)
    })
    .bind((bind_host.as_str(), bind_port))?
    .run()
    .await
}
