//! Payload normalization
//!
//! Pure transform from caller events to enriched events. Both adapters run
//! it independently on the same input and must get identical output.

use std::borrow::Cow;

use contracts::{ClientConfig, Event, EventBatch, ENVIRONMENT_FIELD, HOST_FIELD, RESERVED_FIELDS};

/// Normalize every event of a batch
///
/// Never mutates the caller's batch.
pub fn normalize(batch: &EventBatch, config: &ClientConfig) -> EventBatch {
    batch
        .iter()
        .map(|event| normalize_event(event, config))
        .collect()
}

/// Normalize a single event
///
/// 1. Namespace every non-reserved key (position kept)
/// 2. Merge static fields where the (namespaced) key is absent
/// 3. Force `environment` and `host`
pub fn normalize_event(event: &Event, config: &ClientConfig) -> Event {
    let namespace = config.namespace.as_deref();

    let mut normalized: Event = event
        .iter()
        .map(|(key, value)| (namespaced(key, namespace), value.clone()))
        .collect();

    for (key, value) in config.static_fields.iter() {
        normalized.insert_if_absent(namespaced(key, namespace), value.clone());
    }

    normalized.insert(ENVIRONMENT_FIELD, config.environment.as_str());
    normalized.insert(HOST_FIELD, config.host_name.as_str());
    normalized
}

fn namespaced<'a>(key: &'a str, namespace: Option<&str>) -> Cow<'a, str> {
    match namespace {
        Some(prefix) if !RESERVED_FIELDS.contains(&key) && !key.starts_with(prefix) => {
            Cow::Owned(format!("{prefix}{key}"))
        }
        _ => Cow::Borrowed(key),
    }
}
