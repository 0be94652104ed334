//! Live-stream fan-out over the message bus (C7, spec §4.7) plus the
//! publish-side helper the store gateways use to notify watchers (C8
//! "optionally publish... keyed by uid (or uid-resourceVersion) to enable
//! broker-side deduplication").
//!
//! Each watch gets its own ephemeral NATS subscription and a bounded
//! `mpsc` channel; the forwarding task never blocks on a slow client —
//! `try_send` drops records once the channel is full and emits a single
//! `Error` frame after a threshold of consecutive drops, per spec §4.7's
//! cooperative scheduling model.

use async_nats::HeaderMap;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use telemetry_common::error::AppError;
use telemetry_models::scope::{Scope, ScopeType};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Consecutive full-channel sends before an `Error` frame is synthesised
/// for the watcher (spec §4.7 "after a threshold").
const DROP_THRESHOLD: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum FrameType {
    Added,
    Modified,
    Deleted,
    Error,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Frame<T> {
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Frame<T> {
    fn added(object: T) -> Self {
        Self { frame_type: FrameType::Added, object: Some(object), error: None }
    }

    fn modified(object: T) -> Self {
        Self { frame_type: FrameType::Modified, object: Some(object), error: None }
    }

    fn deleted(object: T) -> Self {
        Self { frame_type: FrameType::Deleted, object: Some(object), error: None }
    }

    fn error(message: impl Into<String>) -> Self {
        Self { frame_type: FrameType::Error, object: None, error: Some(message.into()) }
    }
}

/// Wire shape published to the bus: the operation that produced `object`,
/// so a watcher's delivery loop can tell a create from an update from a
/// delete instead of treating every message as `Modified` (spec §4.7).
#[derive(serde::Serialize)]
struct OutgoingEnvelope<'a, T> {
    op: FrameType,
    object: &'a T,
}

#[derive(serde::Deserialize)]
struct IncomingEnvelope<T> {
    op: FrameType,
    object: T,
}

/// Subject prefix for activity watches. Subjects encode scope so the bus
/// does most of the filtering (spec §4.7) before a record ever reaches an
/// in-memory predicate.
pub fn activity_subject(scope: &Scope) -> String {
    match scope.scope_type {
        ScopeType::Platform => "telemetry.activity.>".to_string(),
        _ => format!("telemetry.activity.{}.{}.>", scope.scope_type, scope.scope_name),
    }
}

/// Subject prefix for event watches, additionally scoped by namespace
/// when the client supplies one.
pub fn event_subject(scope: &Scope, namespace: Option<&str>) -> String {
    let base = match scope.scope_type {
        ScopeType::Platform => "telemetry.event".to_string(),
        _ => format!("telemetry.event.{}.{}", scope.scope_type, scope.scope_name),
    };
    match namespace {
        Some(ns) => format!("{base}.{ns}.>"),
        None => format!("{base}.>"),
    }
}

/// Handle to a running watch: the frame receiver plus the token that
/// releases the subscription and stops the forwarding task.
pub struct Watch<T> {
    pub frames: mpsc::Receiver<Frame<T>>,
    pub cancel: CancellationToken,
}

/// Start a watch on `subject`. `predicate` is the compiled field-selector
/// or filter expression evaluated in-memory per spec §4.7 step 2; records
/// the predicate rejects are dropped silently (they never reached a
/// client-visible frame in the first place).
pub async fn start_watch<T, F>(
    client: async_nats::Client,
    subject: String,
    predicate: F,
    buffer: usize,
) -> Result<Watch<T>, AppError>
where
    T: DeserializeOwned + Send + 'static,
    F: Fn(&T) -> bool + Send + 'static,
{
    let mut subscription = client
        .subscribe(subject.clone())
        .await
        .map_err(|e| AppError::Bus(format!("failed to subscribe to {subject}: {e}")))?;

    let (tx, rx) = mpsc::channel(buffer);
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();

    tokio::spawn(async move {
        let mut consecutive_drops: u32 = 0;
        loop {
            tokio::select! {
                _ = task_cancel.cancelled() => break,
                next = subscription.next() => {
                    let Some(message) = next else { break };
                    let envelope: IncomingEnvelope<T> = match serde_json::from_slice(&message.payload) {
                        Ok(envelope) => envelope,
                        Err(e) => {
                            tracing::warn!(subject = %subject, error = %e, "dropping unparsable bus message");
                            continue;
                        }
                    };
                    if !predicate(&envelope.object) {
                        continue;
                    }
                    let frame = match envelope.op {
                        FrameType::Added => Frame::added(envelope.object),
                        FrameType::Deleted => Frame::deleted(envelope.object),
                        FrameType::Modified | FrameType::Error => Frame::modified(envelope.object),
                    };
                    match tx.try_send(frame) {
                        Ok(()) => consecutive_drops = 0,
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            consecutive_drops += 1;
                            if consecutive_drops >= DROP_THRESHOLD {
                                let _ = tx.try_send(Frame::error(
                                    "watch channel saturated; records were dropped",
                                ));
                                consecutive_drops = 0;
                            }
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => break,
                    }
                }
            }
        }
    });

    Ok(Watch { frames: rx, cancel })
}

/// Publish a record for watchers, keyed for broker-side deduplication
/// (spec §4.8: `uid`, or `uid-resourceVersion` for updates). `op` is
/// carried in the envelope so a watcher can emit the matching `Frame`
/// variant instead of assuming every message is a `Modified`.
pub async fn publish<T: Serialize>(
    client: &async_nats::Client,
    subject: String,
    dedup_key: &str,
    op: FrameType,
    payload: &T,
) -> Result<(), AppError> {
    let envelope = OutgoingEnvelope { op, object: payload };
    let bytes = serde_json::to_vec(&envelope)
        .map_err(|e| AppError::Internal(format!("failed to encode bus message: {e}")))?;
    let mut headers = HeaderMap::new();
    headers.insert("Nats-Msg-Id", dedup_key);
    client
        .publish_with_headers(subject, headers, bytes.into())
        .await
        .map_err(|e| AppError::Bus(format!("failed to publish: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_scope_has_wildcard_subject() {
        assert_eq!(activity_subject(&Scope::platform()), "telemetry.activity.>");
    }

    #[test]
    fn tenant_scope_narrows_subject() {
        let scope = Scope { scope_type: ScopeType::Organization, scope_name: "acme".into() };
        assert_eq!(activity_subject(&scope), "telemetry.activity.Organization.acme.>");
    }

    #[test]
    fn event_subject_includes_namespace_when_present() {
        let scope = Scope::platform();
        assert_eq!(event_subject(&scope, Some("prod")), "telemetry.event.prod.>");
        assert_eq!(event_subject(&scope, None), "telemetry.event.>");
    }

    /// The envelope written by `publish` and the one read back by the
    /// watch delivery loop must agree on `op`, so a create is never
    /// indistinguishable from an update once it crosses the bus.
    #[test]
    fn envelope_round_trips_the_operation_tag() {
        for op in [FrameType::Added, FrameType::Modified, FrameType::Deleted] {
            let outgoing = OutgoingEnvelope { op, object: &"payload".to_string() };
            let bytes = serde_json::to_vec(&outgoing).unwrap();
            let incoming: IncomingEnvelope<String> = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(incoming.op, op);
            assert_eq!(incoming.object, "payload");
        }
    }

    #[test]
    fn frame_constructors_set_the_matching_frame_type() {
        assert_eq!(Frame::added(1).frame_type, FrameType::Added);
        assert_eq!(Frame::modified(1).frame_type, FrameType::Modified);
        assert_eq!(Frame::deleted(1).frame_type, FrameType::Deleted);
    }
}
