//! Versioned JSON documents for the two settings stores.
//!
//! ```text
//! {"version":1,"services":[{"component":"pkg/cls","uid":10001,...}]}
//! ```

use serde::{Deserialize, Serialize};
use shared_types::{AidGroup, ComponentName, PatternFilter, PollingLoopFilter, Uid};

use super::settings::{DynamicOverride, OtherServiceStatus};
use crate::error::StoreError;

/// Current document version.
pub const SETTINGS_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Document<T> {
    version: u32,
    #[serde(default = "Vec::new")]
    services: Vec<T>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DynamicEntry {
    component: String,
    uid: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    off_host_se: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    should_default_to_observe_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    aid_groups: Vec<AidGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    polling_loop_filters: Vec<PollingLoopFilter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pattern_filters: Vec<PatternFilter>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OtherEntry {
    component: String,
    uid: Uid,
    checked: bool,
}

fn decode_document<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<Vec<T>, StoreError> {
    // Peek at the version first so a newer layout reports the right error.
    let raw: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| StoreError::Malformed(e.to_string()))?;
    let found = raw
        .get("version")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| StoreError::Malformed("missing version".into()))?;
    if found != u64::from(SETTINGS_VERSION) {
        return Err(StoreError::UnsupportedVersion {
            found: u32::try_from(found).unwrap_or(u32::MAX),
            expected: SETTINGS_VERSION,
        });
    }
    let doc: Document<T> =
        serde_json::from_value(raw).map_err(|e| StoreError::Malformed(e.to_string()))?;
    Ok(doc.services)
}

fn encode_document<T: Serialize>(services: Vec<T>) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(&Document {
        version: SETTINGS_VERSION,
        services,
    })
    .map_err(|e| StoreError::Encode(e.to_string()))
}

/// Decodes the dynamic-settings store. Entries with an unparseable
/// component name are skipped.
pub fn decode_overrides(bytes: &[u8]) -> Result<Vec<(ComponentName, DynamicOverride)>, StoreError> {
    let entries: Vec<DynamicEntry> = decode_document(bytes)?;
    Ok(entries
        .into_iter()
        .filter_map(|e| {
            let component: ComponentName = e.component.parse().ok()?;
            let aid_groups = e
                .aid_groups
                .into_iter()
                .map(|g| (g.category.clone(), g))
                .collect();
            Some((
                component,
                DynamicOverride {
                    uid: e.uid,
                    off_host_se: e.off_host_se,
                    should_default_to_observe_mode: e.should_default_to_observe_mode,
                    aid_groups,
                    polling_loop_filters: e.polling_loop_filters,
                    pattern_filters: e.pattern_filters,
                },
            ))
        })
        .collect())
}

pub fn encode_overrides<'a, I>(entries: I) -> Result<Vec<u8>, StoreError>
where
    I: IntoIterator<Item = (&'a ComponentName, &'a DynamicOverride)>,
{
    let services = entries
        .into_iter()
        .map(|(component, o)| DynamicEntry {
            component: component.flatten(),
            uid: o.uid,
            off_host_se: o.off_host_se.clone(),
            should_default_to_observe_mode: o.should_default_to_observe_mode.clone(),
            aid_groups: o.aid_groups.values().cloned().collect(),
            polling_loop_filters: o.polling_loop_filters.clone(),
            pattern_filters: o.pattern_filters.clone(),
        })
        .collect();
    encode_document(services)
}

/// Decodes the "other" status store.
pub fn decode_others(bytes: &[u8]) -> Result<Vec<(ComponentName, OtherServiceStatus)>, StoreError> {
    let entries: Vec<OtherEntry> = decode_document(bytes)?;
    Ok(entries
        .into_iter()
        .filter_map(|e| {
            let component: ComponentName = e.component.parse().ok()?;
            Some((
                component,
                OtherServiceStatus {
                    uid: e.uid,
                    checked: e.checked,
                },
            ))
        })
        .collect())
}

pub fn encode_others<'a, I>(entries: I) -> Result<Vec<u8>, StoreError>
where
    I: IntoIterator<Item = (&'a ComponentName, &'a OtherServiceStatus)>,
{
    let services = entries
        .into_iter()
        .map(|(component, s)| OtherEntry {
            component: component.flatten(),
            uid: s.uid,
            checked: s.checked,
        })
        .collect();
    encode_document(services)
}
