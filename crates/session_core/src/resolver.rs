use std::time::Duration;

use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use shared::protocol::QueryReply;
use tokio::sync::Mutex;

use crate::error::ResolveError;

pub const DEFAULT_RESPONSE_LATENCY: Duration = Duration::from_millis(1500);

const QUERY_PLACEHOLDER: &str = "{query}";

pub const RESPONSE_TEMPLATES: [&str; 4] = [
    "Searching ARGO float database for: \"{query}\". Found 23 matching profiles in the specified region. Processing CTD data...",
    "Analyzing NetCDF files for your query. Retrieved temperature and salinity data from 15 active floats. Would you like me to generate visualizations?",
    "Query processed successfully! Found BGC sensor data from 8 floats. The data shows interesting patterns in chlorophyll concentrations. Shall I display the depth profiles?",
    "Searching Indian Ocean ARGO database... Located 12 matching float trajectories. Temperature anomalies detected at 500m depth. Would you like to see the geospatial distribution?",
];

/// Maps a trimmed, non-empty query to an assistant reply.
#[async_trait]
pub trait QueryResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<QueryReply, ResolveError>;
}

pub fn render_template(index: usize, query: &str) -> Option<String> {
    RESPONSE_TEMPLATES
        .get(index)
        .map(|template| template.replace(QUERY_PLACEHOLDER, query))
}

/// Offline stand-in for the data service: waits a fixed latency, then answers
/// with one of the canned templates picked uniformly at random.
pub struct CannedResolver {
    latency: Duration,
    rng: Mutex<StdRng>,
}

impl CannedResolver {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(latency: Duration, seed: u64) -> Self {
        Self {
            latency,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    async fn next_template_index(&self) -> usize {
        self.rng.lock().await.gen_range(0..RESPONSE_TEMPLATES.len())
    }
}

impl Default for CannedResolver {
    fn default() -> Self {
        Self::new(DEFAULT_RESPONSE_LATENCY)
    }
}

#[async_trait]
impl QueryResolver for CannedResolver {
    async fn resolve(&self, query: &str) -> Result<QueryReply, ResolveError> {
        tokio::time::sleep(self.latency).await;

        let index = self.next_template_index().await;
        let content = render_template(index, query).ok_or_else(|| {
            ResolveError::InvalidResponse(format!("no response template at index {index}"))
        })?;
        tracing::debug!(template = index, "resolved query from canned templates");

        Ok(QueryReply {
            content,
            has_attachable_data: true,
        })
    }
}

pub struct MissingQueryBackend;

#[async_trait]
impl QueryResolver for MissingQueryBackend {
    async fn resolve(&self, _query: &str) -> Result<QueryReply, ResolveError> {
        Err(ResolveError::Unreachable(
            "query backend is unavailable".to_string(),
        ))
    }
}
