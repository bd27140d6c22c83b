//! Synchronous client for the **MDB indicators API**.
//!
//! The API is a handful of JSON GET endpoints:
//! - `metric-values/?metric_id=..&metric_id=..&year_from=2000` observations, one row per
//!   (metric, institution, year)
//! - `mdbs/` the institution listing (`mdb_id`, `mdb_code`, `mdb_name`)
//! - `metrics/` metric metadata (`metric_id`, `metric_name`, `source`)
//!
//! Every response goes through a keyed [`ResponseCache`] shared by all clones of a
//! [`Client`]. A hit within the TTL returns the stored payload without touching the network;
//! a failed request evicts its key so the next call retries. There is no automatic retry.
//!
//! Typical usage:
//! ```no_run
//! # use mdbi_rs::{Client, api::Since};
//! let client = Client::new("http://localhost:8000/api");
//! let rows = client.fetch_values(
//!     "/metric-values/",
//!     &["sp_01".into(), "sp_02".into()],
//!     Since::YearFrom(2000),
//! )?;
//! # Ok::<(), mdbi_rs::FetchError>(())
//! ```

use crate::cache::ResponseCache;
use crate::error::FetchError;
use crate::models::{Entity, MetricMeta, RawRow};
use chrono::NaiveDate;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Base URL used when neither `Client::new` nor `MDBI_API_URL` say otherwise.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const BASE_URL_ENV: &str = "MDBI_API_URL";

/// TTL for observation payloads.
pub const VALUES_TTL: Duration = Duration::from_secs(5 * 60);
/// TTL for the slower-moving listings (entities, metric metadata).
pub const LISTING_TTL: Duration = Duration::from_secs(10 * 60);

pub const DEFAULT_VALUES_PATH: &str = "/metric-values/";
pub const ENTITIES_PATH: &str = "/mdbs/";
pub const METRICS_PATH: &str = "/metrics/";

/// Lower bound of a values query. Endpoint families differ in which one they accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Since {
    YearFrom(i32),
    StartDate(NaiveDate),
}

impl Since {
    fn to_query_pair(self) -> (&'static str, String) {
        match self {
            Since::YearFrom(y) => ("year_from", y.to_string()),
            Since::StartDate(d) => ("start_date", d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Per-request cache behaviour.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Defaults to the request path (including the query string).
    pub cache_key: Option<String>,
    pub ttl: Duration,
    /// Skip the cache read but still store the fresh payload.
    pub revalidate: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            cache_key: None,
            ttl: VALUES_TTL,
            revalidate: false,
        }
    }
}

impl RequestOptions {
    pub fn ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    pub base_url: String,
    http: HttpClient,
    cache: Arc<ResponseCache>,
}

impl Default for Client {
    fn default() -> Self {
        let base = std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(base)
    }
}

// Allow -, _, . unescaped in metric ids
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

fn enc(part: &str) -> String {
    percent_encoding::utf8_percent_encode(part.trim(), SAFE).to_string()
}

/// Trim, drop blanks, de-duplicate and sort metric ids so equivalent requests share a cache key.
pub fn normalize_metric_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = ids
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    out.sort();
    out.dedup();
    out
}

/// `metric_id=a&metric_id=b&year_from=2000`, or `None` when no metric id survives normalisation.
pub fn values_query(metric_ids: &[String], since: Since) -> Option<String> {
    let ids = normalize_metric_ids(metric_ids.iter().map(String::as_str));
    if ids.is_empty() {
        return None;
    }
    let mut parts: Vec<String> = ids.iter().map(|id| format!("metric_id={}", enc(id))).collect();
    let (k, v) = since.to_query_pair();
    parts.push(format!("{k}={}", enc(&v)));
    Some(parts.join("&"))
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30)) // total request timeout
            .connect_timeout(Duration::from_secs(10)) // connect timeout
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(concat!("mdbi_rs/", env!("CARGO_PKG_VERSION"))) // set user agent
            .build()
            .expect("reqwest client build");
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            cache: Arc::new(ResponseCache::default()),
        }
    }

    /// Share an existing cache (e.g. one driven by a manual clock in tests).
    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Drop cached payloads whose key starts with `prefix` (all of them for `None`).
    pub fn invalidate_cache(&self, prefix: Option<&str>) -> usize {
        self.cache.invalidate(prefix)
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// GET `path` (relative to `base_url`) and return the decoded JSON body.
    pub fn get_json(&self, path: &str, opts: &RequestOptions) -> Result<Value, FetchError> {
        let key = opts.cache_key.clone().unwrap_or_else(|| path.to_string());
        if !opts.revalidate
            && let Some(hit) = self.cache.get(&key, opts.ttl)
        {
            return Ok(hit);
        }

        let url = self.url_for(path);
        log::debug!("GET {url}");
        match self.request(&url) {
            Ok(v) => {
                if !opts.ttl.is_zero() {
                    self.cache.set(key, v.clone());
                }
                Ok(v)
            }
            Err(e) => {
                self.cache.remove(&key);
                Err(e)
            }
        }
    }

    fn request(&self, url: &str) -> Result<Value, FetchError> {
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        let text = resp.text().map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Observations for `metric_ids`. An empty id list issues no request.
    pub fn fetch_values(
        &self,
        endpoint_path: &str,
        metric_ids: &[String],
        since: Since,
    ) -> Result<Vec<RawRow>, FetchError> {
        let Some(query) = values_query(metric_ids, since) else {
            return Ok(Vec::new());
        };
        let path = format!("{endpoint_path}?{query}");
        let payload = self.get_json(&path, &RequestOptions::ttl(VALUES_TTL))?;
        Ok(decode_rows(&payload))
    }

    pub fn fetch_entities(&self) -> Result<Vec<Entity>, FetchError> {
        let payload = self.get_json(ENTITIES_PATH, &RequestOptions::ttl(LISTING_TTL))?;
        Ok(decode_rows(&payload))
    }

    pub fn fetch_metric_metadata(&self) -> Result<Vec<MetricMeta>, FetchError> {
        let payload = self.get_json(METRICS_PATH, &RequestOptions::ttl(LISTING_TTL))?;
        Ok(decode_rows(&payload))
    }
}

/// Decode a top-level array element by element. Non-array payloads yield nothing and
/// malformed elements are skipped.
pub fn decode_rows<T: DeserializeOwned>(payload: &Value) -> Vec<T> {
    let Some(arr) = payload.as_array() else {
        log::debug!("payload is not an array; treating as empty");
        return Vec::new();
    };
    let mut out = Vec::with_capacity(arr.len());
    let mut skipped = 0usize;
    for item in arr {
        match serde_json::from_value::<T>(item.clone()) {
            Ok(v) => out.push(v),
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        log::debug!("skipped {skipped} malformed rows");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_is_normalised() {
        let q = values_query(
            &["sp_02".into(), " sp_01 ".into(), "sp_02".into(), "".into()],
            Since::YearFrom(2000),
        );
        assert_eq!(
            q.as_deref(),
            Some("metric_id=sp_01&metric_id=sp_02&year_from=2000")
        );
    }

    #[test]
    fn query_with_start_date_and_escaping() {
        let d = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        let q = values_query(&["a b".into()], Since::StartDate(d)).unwrap();
        assert_eq!(q, "metric_id=a%20b&start_date=2010-01-01");
    }

    #[test]
    fn empty_ids_build_no_query() {
        assert!(values_query(&["  ".into()], Since::YearFrom(2000)).is_none());
    }

    #[test]
    fn decode_rows_skips_bad_elements() {
        let payload = json!([
            {"mdb_id": 1, "year": 2020, "value": 1.0},
            {"year": 2020},
            {"mdb_id": 2, "year": 2021, "value": 2.0}
        ]);
        let rows: Vec<RawRow> = decode_rows(&payload);
        assert_eq!(rows.len(), 2);
        let none: Vec<RawRow> = decode_rows(&json!({"detail": "x"}));
        assert!(none.is_empty());
    }

    #[test]
    fn base_url_is_trimmed() {
        let c = Client::new("http://example.test/api/");
        assert_eq!(c.url_for("/mdbs/"), "http://example.test/api/mdbs/");
        assert_eq!(c.url_for("mdbs/"), "http://example.test/api/mdbs/");
    }
}
