use std::sync::Arc;
use std::time::Duration;

use absensi_core::{FaceSignature, Roster};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;
use crate::engine::{EngineError, EngineHandle};
use crate::roster::RosterStore;

/// Status value marking a person as currently enrolled.
const ACTIVE_STATUS: &str = "aktif";

/// Failures that abort a whole cycle. The published roster is left untouched.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("roster fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("malformed roster listing: {0}")]
    Malformed(String),
}

/// Per-person failures; the person is skipped and the cycle continues.
#[derive(Error, Debug)]
enum EntryError {
    #[error("photo download failed: {0}")]
    Download(#[from] reqwest::Error),
    #[error(transparent)]
    Encode(#[from] EngineError),
}

/// Outcome counters of one successful cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Items in the listing.
    pub listed: usize,
    /// Items with the active status.
    pub active: usize,
    /// People now on the roster.
    pub loaded: usize,
    /// Active people whose photo showed no face.
    pub no_face: usize,
    /// Active people skipped because of an error.
    pub failed: usize,
}

/// One item of the remote listing. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct ListingRecord {
    name: Option<String>,
    foto: Option<String>,
    status: Option<String>,
}

/// Rebuilds the roster from the remote listing.
pub struct RosterSync {
    client: reqwest::Client,
    roster_url: String,
    roster_timeout: Duration,
    photo_timeout: Duration,
    engine: EngineHandle,
    store: Arc<RosterStore>,
}

impl RosterSync {
    pub fn new(config: &Config, engine: EngineHandle, store: Arc<RosterStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            roster_url: config.roster_url.clone(),
            roster_timeout: config.roster_timeout,
            photo_timeout: config.photo_timeout,
            engine,
            store,
        }
    }

    /// Run one cycle: fetch the listing, compute a signature per active
    /// person, then publish the result even if it is empty.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        tracing::info!(url = %self.roster_url, "roster sync started");

        let items = self.fetch_listing().await?;
        let mut report = SyncReport {
            listed: items.len(),
            ..SyncReport::default()
        };
        let mut roster = Roster::new();

        for item in items {
            let Ok(record) = serde_json::from_value::<ListingRecord>(item) else {
                continue;
            };
            if record.status.as_deref() != Some(ACTIVE_STATUS) {
                continue;
            }
            report.active += 1;

            let Some(photo_url) = record.foto.filter(|u| !u.trim().is_empty()) else {
                continue;
            };
            let Some(name) = record.name else {
                tracing::warn!(photo = %photo_url, "active entry without a name, skipped");
                report.failed += 1;
                continue;
            };

            match self.signature_from_photo(&photo_url).await {
                Ok(Some(signature)) => {
                    tracing::info!(name = %name, "loaded face");
                    roster.push(name, signature);
                    report.loaded += 1;
                }
                Ok(None) => {
                    tracing::warn!(name = %name, "no face detected in photo");
                    report.no_face += 1;
                }
                Err(e) => {
                    tracing::warn!(name = %name, error = %e, "failed to process photo");
                    report.failed += 1;
                }
            }
        }

        self.store.replace(roster);
        tracing::info!(
            listed = report.listed,
            active = report.active,
            loaded = report.loaded,
            no_face = report.no_face,
            failed = report.failed,
            "roster sync finished"
        );
        Ok(report)
    }

    async fn fetch_listing(&self) -> Result<Vec<Value>, SyncError> {
        let payload: Value = self
            .client
            .get(&self.roster_url)
            .timeout(self.roster_timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        listing_items(payload)
    }

    /// Signature of the first face in the photo, `None` if it has no face.
    async fn signature_from_photo(&self, url: &str) -> Result<Option<FaceSignature>, EntryError> {
        let bytes = self
            .client
            .get(url)
            .timeout(self.photo_timeout)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let signatures = self.engine.encode(bytes.to_vec()).await?;
        Ok(signatures.into_iter().next())
    }
}

/// Accept a bare array, or an object whose `data` member is an array.
fn listing_items(payload: Value) -> Result<Vec<Value>, SyncError> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(SyncError::Malformed("`data` is not a list".into())),
            None => Err(SyncError::Malformed("object has no `data` list".into())),
        },
        _ => Err(SyncError::Malformed("expected a list or an object".into())),
    }
}
