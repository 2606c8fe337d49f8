//! Cached view of the donor list.
//!
//! Donors change rarely, so the list is read through a `ReadThroughCache`
//! instead of hitting the database on every screen.

use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use crate::cache::{Clock, ReadThroughCache};
use crate::error::DashboardError;
use crate::models::{decode_collection, Donor, Keyed};
use crate::source::{DocumentSource, DONORS_PATH};

/// Donor lists older than five minutes are refetched.
pub const DEFAULT_DONOR_TTL: Duration = Duration::from_millis(300_000);

pub type DonorList = Arc<Vec<Keyed<Donor>>>;

pub struct DonorDirectory {
    source: Arc<dyn DocumentSource>,
    cache: ReadThroughCache<Vec<Keyed<Donor>>>,
    ttl: Duration,
}

impl DonorDirectory {
    pub fn new(source: Arc<dyn DocumentSource>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            source,
            cache: ReadThroughCache::new(DONORS_PATH, clock),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Donor list, at most `ttl` old.
    pub async fn donors(&self) -> Result<DonorList, DashboardError> {
        self.donors_within(self.ttl).await
    }

    /// Donor list, at most `max_age` old. `Duration::ZERO` always refetches.
    pub async fn donors_within(&self, max_age: Duration) -> Result<DonorList, DashboardError> {
        let source = Arc::clone(&self.source);
        self.cache
            .get_with(max_age, move || async move {
                let docs = source.read(DONORS_PATH).await?;
                Ok(decode_collection::<Donor>(DONORS_PATH, docs))
            })
            .await
            .map_err(|source| {
                error!(error = %source, "Donor list fetch failed");
                DashboardError::Fetch {
                    path: DONORS_PATH,
                    source,
                }
            })
    }

    /// Refetch now, whatever the age of the cached list.
    pub async fn refresh(&self) -> Result<DonorList, DashboardError> {
        self.cache.invalidate();
        self.donors().await
    }

    /// Donors whose name or email contains `query`, ignoring case.
    pub async fn search(&self, query: &str) -> Result<Vec<Keyed<Donor>>, DashboardError> {
        let donors = self.donors().await?;
        Ok(donors
            .iter()
            .filter(|d| d.record.matches(query))
            .cloned()
            .collect())
    }

    /// "5m ago" style age of the cached list, `None` before the first fetch.
    pub fn last_refreshed(&self) -> Option<String> {
        self.cache.age_display()
    }
}
