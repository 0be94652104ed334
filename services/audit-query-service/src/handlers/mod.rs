use actix_web::web;

pub mod activities;
pub mod activity_query;
pub mod audit_log_query;
pub mod event_query;
pub mod events;
pub mod facets;
pub mod health;
pub mod policy_preview;

const GROUP: &str = "/apis/telemetry.miloapis.com/v1alpha1";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(GROUP)
            .configure(audit_log_query::configure)
            .configure(activity_query::configure)
            .configure(event_query::configure)
            .configure(facets::configure)
            .configure(policy_preview::configure)
            .configure(activities::configure)
            .configure(events::configure),
    )
    // Legacy Event shapes (spec §6): the same native CRUD/watch surface,
    // reachable at the paths older clients expect.
    .service(web::scope("/api/v1").configure(events::configure))
    .service(web::scope("/apis/events.k8s.io/v1").configure(events::configure));
}
