//! Chart loads: values, entity listing and metric metadata fetched in parallel.
//!
//! A load is complete only when all three requests have resolved. Only the values fetch is
//! fatal; listing failures degrade to `None` (labels fall back to raw ids, no attribution).
//! Each load carries the generation it was issued under so that a late result can be told
//! apart from the current one.

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use crate::api::{Client, Since};
use crate::error::FetchError;
use crate::models::{Entity, MetricMeta, RawRow};

/// Anything that can answer the three chart queries. Implemented by [`Client`]; tests plug
/// in fakes.
pub trait DataSource: Send + Sync {
    fn fetch_values(
        &self,
        endpoint_path: &str,
        metric_ids: &[String],
        since: Since,
    ) -> Result<Vec<RawRow>, FetchError>;
    fn fetch_entities(&self) -> Result<Vec<Entity>, FetchError>;
    fn fetch_metric_metadata(&self) -> Result<Vec<MetricMeta>, FetchError>;
}

impl DataSource for Client {
    fn fetch_values(
        &self,
        endpoint_path: &str,
        metric_ids: &[String],
        since: Since,
    ) -> Result<Vec<RawRow>, FetchError> {
        Client::fetch_values(self, endpoint_path, metric_ids, since)
    }

    fn fetch_entities(&self) -> Result<Vec<Entity>, FetchError> {
        Client::fetch_entities(self)
    }

    fn fetch_metric_metadata(&self) -> Result<Vec<MetricMeta>, FetchError> {
        Client::fetch_metric_metadata(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub generation: u64,
    pub endpoint_path: String,
    /// Normalised ids; empty means "nothing to fetch".
    pub metric_ids: Vec<String>,
    pub since: Since,
}

#[derive(Debug, Clone, Default)]
pub struct LoadedData {
    pub rows: Vec<RawRow>,
    pub entities: Option<Vec<Entity>>,
    pub metrics: Option<Vec<MetricMeta>>,
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub generation: u64,
    pub result: Result<LoadedData, FetchError>,
}

fn optional<T>(what: &str, res: Result<T, FetchError>) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("{what} unavailable, continuing without it: {e}");
            None
        }
    }
}

/// Run the three fetches concurrently and wait for all of them.
pub fn load_chart_data<S: DataSource + ?Sized>(source: &S, req: &LoadRequest) -> LoadOutcome {
    let (values, entities, metrics) = thread::scope(|scope| {
        let entities = scope.spawn(|| source.fetch_entities());
        let metrics = scope.spawn(|| source.fetch_metric_metadata());
        let values = source.fetch_values(&req.endpoint_path, &req.metric_ids, req.since);
        (values, join(entities), join(metrics))
    });

    let result = match values {
        Ok(rows) => Ok(LoadedData {
            rows,
            entities: optional("entity listing", entities),
            metrics: optional("metric metadata", metrics),
        }),
        Err(e) => {
            log::error!(
                "values fetch failed for {:?} (generation {}): {e}",
                req.metric_ids,
                req.generation
            );
            Err(e)
        }
    };
    LoadOutcome {
        generation: req.generation,
        result,
    }
}

/// A panicked listing thread is treated like a failed request of that listing.
fn join<T>(
    handle: thread::ScopedJoinHandle<'_, Result<T, FetchError>>,
) -> Result<T, FetchError> {
    handle.join().unwrap_or_else(|_| {
        Err(FetchError::Decode {
            url: String::new(),
            message: "listing worker panicked".into(),
        })
    })
}

/// Run [`load_chart_data`] on a background thread and deliver the outcome on `tx`.
pub fn spawn_load<S>(source: Arc<S>, req: LoadRequest, tx: Sender<LoadOutcome>)
where
    S: DataSource + ?Sized + 'static,
{
    thread::spawn(move || {
        let outcome = load_chart_data(source.as_ref(), &req);
        if tx.send(outcome).is_err() {
            log::debug!("load {} finished after its receiver closed", req.generation);
        }
    });
}
