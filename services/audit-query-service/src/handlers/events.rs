//! Native Event resource surface (spec §4.8, §6): full CRUD plus watch,
//! mounted under the versioned telemetry group and the two legacy Event
//! path shapes. List uses a fixed 24h look-back, distinct from the
//! configurable window `EventQuery` accepts.

use crate::config::Config;
use crate::identity::Identity;
use crate::streaming::WatchStream;
use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use telemetry_common::error::AppError;
use telemetry_database::PgPool;
use telemetry_models::event::{EventSource, EventType, InvolvedObject};
use telemetry_query_engine::selector;
use telemetry_query_engine::filter::RecordType;

const NATIVE_LIST_WINDOW: Duration = Duration::hours(24);

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub uid: Option<String>,
    pub involved_object: InvolvedObject,
    pub reason: String,
    pub message: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub source: EventSource,
    pub reporting_component: Option<String>,
    pub reporting_instance: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    pub reason: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<EventType>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub source: Option<EventSource>,
    pub reporting_component: Option<String>,
    pub reporting_instance: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    field_selector: Option<String>,
    limit: Option<u32>,
    #[serde(rename = "continue")]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdentityQuery {
    uid: String,
}

#[post("/namespaces/{namespace}/events")]
async fn create(
    pool: web::Data<PgPool>,
    bus: web::Data<async_nats::Client>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<CreateEventRequest>,
) -> Result<HttpResponse, AppError> {
    let now = Utc::now();
    let scope = Identity::from_request(&req).scope();
    let namespace = path.into_inner();
    let body = body.into_inner();

    let input = telemetry_store::NewEvent {
        namespace,
        name: body.name,
        uid: body.uid,
        involved_object: body.involved_object,
        reason: body.reason,
        message: body.message,
        event_type: body.event_type,
        first_timestamp: body.first_timestamp,
        last_timestamp: body.last_timestamp,
        source: body.source,
        reporting_component: body.reporting_component,
        reporting_instance: body.reporting_instance,
    };

    let view = telemetry_store::create_event(pool.get_ref(), Some(bus.get_ref()), &scope, input, now).await?;
    Ok(HttpResponse::Created().json(view))
}

#[get("/namespaces/{namespace}/events/{name}")]
async fn get_one(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let scope = Identity::from_request(&req).scope();
    let (namespace, name) = path.into_inner();
    let view = telemetry_store::get_event(pool.get_ref(), &scope, &namespace, &name).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[get("/namespaces/{namespace}/events")]
async fn list(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
    let now = Utc::now();
    let scope = Identity::from_request(&req).scope();
    let namespace = path.into_inner();
    let start = now - NATIVE_LIST_WINDOW;
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);

    let result = telemetry_store::list_events(
        pool.get_ref(),
        &scope,
        Some(namespace.as_str()),
        start,
        now,
        query.field_selector.as_deref(),
        query.cursor.as_deref(),
        limit,
        now,
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "items": result.records,
        "continue": result.continue_token,
    })))
}

#[put("/namespaces/{namespace}/events/{name}")]
async fn update(
    pool: web::Data<PgPool>,
    bus: web::Data<async_nats::Client>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
    identity: web::Query<IdentityQuery>,
    body: web::Json<UpdateEventRequest>,
) -> Result<HttpResponse, AppError> {
    let now = Utc::now();
    let scope = Identity::from_request(&req).scope();
    let (namespace, name) = path.into_inner();
    let body = body.into_inner();

    let patch = telemetry_store::EventUpdate {
        reason: body.reason,
        message: body.message,
        event_type: body.event_type,
        last_timestamp: body.last_timestamp,
        source: body.source,
        reporting_component: body.reporting_component,
        reporting_instance: body.reporting_instance,
    };

    let view = telemetry_store::update_event(
        pool.get_ref(),
        Some(bus.get_ref()),
        &scope,
        &namespace,
        &name,
        &identity.uid,
        patch,
        now,
    )
    .await?;
    Ok(HttpResponse::Ok().json(view))
}

#[delete("/namespaces/{namespace}/events/{name}")]
async fn delete_one(
    pool: web::Data<PgPool>,
    bus: web::Data<async_nats::Client>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
    identity: web::Query<IdentityQuery>,
) -> Result<HttpResponse, AppError> {
    let scope = Identity::from_request(&req).scope();
    let (namespace, name) = path.into_inner();
    telemetry_store::delete_event(
        pool.get_ref(),
        Some(bus.get_ref()),
        &scope,
        &namespace,
        &name,
        &identity.uid,
    )
    .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize)]
pub struct WatchQuery {
    field_selector: Option<String>,
    namespace: Option<String>,
}

#[get("/events/watch")]
async fn watch(
    bus: web::Data<async_nats::Client>,
    req: HttpRequest,
    query: web::Query<WatchQuery>,
) -> Result<HttpResponse, AppError> {
    let scope = Identity::from_request(&req).scope();
    let selector_source = query.field_selector.clone();
    if let Some(src) = &selector_source {
        // Validate eagerly so a bad selector fails the request instead of
        // silently dropping every frame once the watch is running.
        selector::compile(src, RecordType::Event, 0)?;
    }

    let subject = telemetry_bus::event_subject(&scope, query.namespace.as_deref());
    let predicate = move |record: &telemetry_models::EventRecordView| -> bool {
        let Some(src) = &selector_source else { return true };
        selector::evaluate(src, RecordType::Event, &record.to_record_value()).unwrap_or(false)
    };

    let watch = telemetry_bus::start_watch(bus.get_ref().clone(), subject, predicate, 128).await?;
    Ok(HttpResponse::Ok()
        .content_type("application/json-seq")
        .streaming(WatchStream::new(watch)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(watch)
        .service(create)
        .service(list)
        .service(get_one)
        .service(update)
        .service(delete_one);
}
