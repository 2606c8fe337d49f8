//! The state a front end holds on to: one donor directory, one record
//! service, one clock, all sharing a single document source.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, warn};

use crate::cache::{Clock, SystemClock};
use crate::config::Config;
use crate::directory::DonorDirectory;
use crate::error::DashboardError;
use crate::models::CurrentUser;
use crate::records::RecordService;
use crate::source::{DocumentSource, RealtimeDbClient};
use crate::summary::MonthlySummary;

pub struct Dashboard {
    pub donors: DonorDirectory,
    pub records: RecordService,
    clock: Arc<dyn Clock>,
    timezone: FixedOffset,
}

impl Dashboard {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        clock: Arc<dyn Clock>,
        config: &Config,
        current_user: Option<CurrentUser>,
    ) -> Self {
        Self {
            donors: DonorDirectory::new(Arc::clone(&source), Arc::clone(&clock), config.donor_ttl()),
            records: RecordService::new(source, current_user),
            clock,
            timezone: config.timezone(),
        }
    }

    /// Build a dashboard against the configured database.
    pub fn connect(config: &Config, current_user: Option<CurrentUser>) -> Result<Self> {
        let url = config
            .database_url
            .as_deref()
            .context("No database URL configured (set CHARITYDESK_DATABASE_URL)")?;

        let mut client = RealtimeDbClient::new(url)?;
        if let Some(token) = &config.auth_token {
            client.set_token(token.clone());
        } else {
            debug!("No auth token configured, using unauthenticated access");
        }

        if current_user.is_none() {
            warn!("No current user, writes will not be attributed");
        }
        info!(database = %url, user = ?current_user.as_ref().map(|u| &u.uid), "Dashboard connected");

        Ok(Self::new(Arc::new(client), Arc::new(SystemClock), config, current_user))
    }

    /// Now, in the dashboard's timezone
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now().with_timezone(&self.timezone)
    }

    pub async fn current_month_summary(&self) -> Result<MonthlySummary, DashboardError> {
        let now = self.now();
        self.records.monthly_summary(&now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::source::{MemorySource, FINANCES_PATH};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[tokio::test]
    async fn test_current_month_uses_configured_offset() {
        let source = Arc::new(
            MemorySource::new()
                .with_collection(
                    FINANCES_PATH,
                    json!({
                        "-Nt1": {"type": "income", "amount": 100, "date": "2024-03-31"},
                        "-Nt2": {"type": "income", "amount": 60, "date": "2024-04-01"}
                    }),
                )
                .unwrap(),
        );
        // 02:00 UTC on April 1st is still March 31st at UTC-5
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 4, 1, 2, 0, 0).unwrap()));

        let config = Config {
            utc_offset_minutes: -300,
            ..Default::default()
        };
        let dashboard = Dashboard::new(source.clone(), clock.clone(), &config, None);
        let summary = dashboard.current_month_summary().await.unwrap();
        assert_eq!(summary.income, 100.0);

        let utc_dashboard = Dashboard::new(source, clock, &Config::default(), None);
        let summary = utc_dashboard.current_month_summary().await.unwrap();
        assert_eq!(summary.income, 60.0);
    }

    #[test]
    fn test_connect_requires_database_url() {
        let err = Dashboard::connect(&Config::default(), None).err().expect("missing url is an error");
        assert!(err.to_string().contains("No database URL"));
    }
}
