//! Best-effort binding of an attendee record to a resolved configuration.
//!
//! Nothing in here can fail a request: an unreachable record service, a malformed body, a
//! non-numeric seed or a missing index all end with "no record" and a log line.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::schema::ResolvedConfig;

pub const DEFAULT_SEED: &str = "1";

/// Name under which the serialized record travels with the configuration.
pub const RECORD_FIELD: &str = "attendeeData";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub id: String,
    pub created_at: String,
    pub index: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: ureq::Error,
    },
    #[error("record service at {url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("malformed record collection: {0}")]
    Body(#[from] serde_json::Error),
}

/// Supplier of the full record collection.
pub trait RecordSource: Send + Sync {
    fn fetch_records(&self) -> Result<Vec<Value>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct RecordCollection {
    #[serde(default)]
    data: Vec<Value>,
}

/// Fetches `{ data: [...] }` from the record service's attendee listing.
#[derive(Debug, Clone)]
pub struct HttpRecordSource {
    url: String,
    agent: ureq::Agent,
}

impl HttpRecordSource {
    pub fn new(config: &UpstreamConfig) -> Self {
        let url = format!(
            "{}/{}",
            config.api_url.trim_end_matches('/'),
            config.attendees_path.trim_start_matches('/')
        );
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(config.timeout_secs.map(Duration::from_secs))
            .build();
        Self {
            url,
            agent: agent_config.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RecordSource for HttpRecordSource {
    fn fetch_records(&self) -> Result<Vec<Value>, FetchError> {
        let transport = |source| FetchError::Transport {
            url: self.url.clone(),
            source,
        };
        let mut response = self
            .agent
            .get(self.url.as_str())
            .call()
            .map_err(|err| match err {
                ureq::Error::StatusCode(status) => FetchError::Status {
                    url: self.url.clone(),
                    status,
                },
                other => transport(other),
            })?;
        let body = response.body_mut().read_to_string().map_err(transport)?;
        let collection: RecordCollection = serde_json::from_str(&body)?;
        Ok(collection.data)
    }
}

/// A fixed record collection, e.g. loaded from a JSON file for offline rendering.
#[derive(Debug, Clone, Default)]
pub struct StaticRecords {
    records: Vec<Value>,
}

impl StaticRecords {
    pub fn new(records: Vec<Value>) -> Self {
        Self { records }
    }

    /// Accepts the same `{ data: [...] }` body the record service returns.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        let collection: RecordCollection = serde_json::from_str(body)?;
        Ok(Self::new(collection.data))
    }
}

impl RecordSource for StaticRecords {
    fn fetch_records(&self) -> Result<Vec<Value>, FetchError> {
        Ok(self.records.clone())
    }
}

/// A configuration field that a record field replaces when the record carries a non-empty value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOverride {
    pub record_field: &'static str,
    pub config_field: &'static str,
}

/// Resolved configuration plus the serialized record bound to it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedConfig {
    config: ResolvedConfig,
    record: Option<String>,
}

impl EnrichedConfig {
    pub fn new(config: ResolvedConfig, record: Option<String>) -> Self {
        Self { config, record }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn record_data(&self) -> Option<&str> {
        self.record.as_deref()
    }

    /// The bound record as loose JSON. Unparsable data counts as no record.
    pub fn record_value(&self) -> Option<Value> {
        let data = self.record.as_deref()?;
        match serde_json::from_str::<Value>(data) {
            Ok(value) if value.is_object() => Some(value),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unparsable {RECORD_FIELD}");
                None
            }
        }
    }

    /// The bound record with every attendee field present.
    pub fn attendee(&self) -> Option<Attendee> {
        let data = self.record.as_deref()?;
        serde_json::from_str(data).ok()
    }
}

impl From<ResolvedConfig> for EnrichedConfig {
    fn from(config: ResolvedConfig) -> Self {
        Self::new(config, None)
    }
}

/// Returns the record's value for `field` when an override maps a non-empty record field onto
/// it, otherwise `fallback`.
pub fn preferred<'a>(
    record: Option<&'a Value>,
    overrides: &[RecordOverride],
    field: &str,
    fallback: &'a str,
) -> &'a str {
    let Some(record) = record else {
        return fallback;
    };
    overrides
        .iter()
        .filter(|entry| entry.config_field == field)
        .find_map(|entry| {
            record
                .get(entry.record_field)
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
        })
        .unwrap_or(fallback)
}

/// First record whose integer `index` equals the seed. A non-numeric seed matches nothing.
pub fn find_record<'a>(records: &'a [Value], seed: &str) -> Option<&'a Value> {
    let wanted: i64 = seed.trim().parse().ok()?;
    records
        .iter()
        .find(|record| record.get("index").and_then(index_value) == Some(wanted))
}

fn index_value(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|number| number.fract() == 0.0)
            .map(|number| number as i64)
    })
}

/// Fetches the collection and serializes the record matching `seed`.
pub fn lookup_record(source: &dyn RecordSource, seed: &str) -> Option<String> {
    let records = match source.fetch_records() {
        Ok(records) => records,
        Err(err) => {
            tracing::warn!(error = %err, "record fetch failed, rendering without a record");
            return None;
        }
    };
    let Some(record) = find_record(&records, seed) else {
        tracing::info!(seed, "no record with a matching index");
        return None;
    };
    match serde_json::to_string(record) {
        Ok(data) => {
            tracing::debug!(seed, "bound record to configuration");
            Some(data)
        }
        Err(err) => {
            tracing::warn!(error = %err, seed, "failed to serialize record");
            None
        }
    }
}

pub fn enrich(
    config: ResolvedConfig,
    seed: Option<&str>,
    source: &dyn RecordSource,
) -> EnrichedConfig {
    let seed = seed
        .map(str::trim)
        .filter(|seed| !seed.is_empty())
        .unwrap_or(DEFAULT_SEED);
    let record = lookup_record(source, seed);
    EnrichedConfig::new(config, record)
}
