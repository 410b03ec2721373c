//! In-process agent simulation against a live origin.
//!
//! Registers the caching agent in an [`AgentHost`] backed by memory storage,
//! optionally cuts the network, then replays each path from one page and
//! reports where the response came from.

use std::fmt;
use std::sync::Arc;

use rwa_discount_agent::{
    AgentHost, CacheStorage, ConnectivityGate, DEFAULT_HTTP_TIMEOUT, HostError, HttpNetwork,
    MemoryCacheStorage, Network, NetworkError, ResponseSource, StorageError,
};
use rwa_discount_core::{CacheName, Connectivity, FetchRequest};
use thiserror::Error;
use url::Url;

use super::descriptor::DESCRIPTOR_PATH;

/// Errors that stop a simulation.
#[derive(Debug, Error)]
pub enum SimulateError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Registration failed: {0}")]
    Host(#[from] HostError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// How one replayed request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Served {
        status: u16,
        source: ResponseSource,
        intercepted: bool,
    },
    Failed(String),
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Served {
                status,
                source,
                intercepted: true,
            } => write!(f, "{status} from {source}"),
            Self::Served { status, .. } => write!(f, "{status} from network (not intercepted)"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// One replayed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub path: String,
    pub navigation: bool,
    pub outcome: StepOutcome,
}

/// Result of a simulation.
#[derive(Debug)]
pub struct Report {
    pub cache_name: CacheName,
    pub stored: Vec<String>,
    pub steps: Vec<Step>,
}

/// Paths without a file extension are treated as page navigations.
fn is_navigation(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or_default();
    last.is_empty() || !last.contains('.')
}

/// Register against `origin` through `gate`, then replay `paths`.
///
/// # Errors
///
/// Returns `SimulateError` if registration fails; individual request failures
/// are reported as steps.
pub async fn simulate<N: Network + 'static>(
    gate: Arc<ConnectivityGate<N>>,
    origin: &Url,
    offline: bool,
    paths: &[String],
) -> Result<Report, SimulateError> {
    let storage = Arc::new(MemoryCacheStorage::new());
    let host = AgentHost::new(storage.clone(), gate.clone());

    let registration = host.register(&origin.join(DESCRIPTOR_PATH)?, "/").await?;
    let cache_name = registration
        .active
        .map(|worker| worker.cache_name)
        .ok_or(HostError::NotRegistered)?;
    tracing::info!(cache = %cache_name, "Agent installed and active");

    if offline {
        gate.set_connectivity(Connectivity::Offline);
    }

    let page = host.open_client();
    let mut steps = Vec::with_capacity(paths.len());
    for path in paths {
        let url = origin.join(path)?;
        let navigation = is_navigation(path);
        let request = if navigation {
            FetchRequest::navigate(url)
        } else {
            FetchRequest::get(url)
        };

        let outcome = match host.fetch(page, request).await {
            Ok(served) => StepOutcome::Served {
                status: served.response.status,
                source: served.source,
                intercepted: served.intercepted,
            },
            Err(e) => StepOutcome::Failed(e.to_string()),
        };
        // Let write-backs land before the next request.
        host.idle().await;
        steps.push(Step {
            path: path.clone(),
            navigation,
            outcome,
        });
    }

    let stored = storage
        .entries(&cache_name)
        .await?
        .into_iter()
        .map(|key| key.to_string())
        .collect();

    Ok(Report {
        cache_name,
        stored,
        steps,
    })
}

/// Run a simulation against a live origin and print the report.
///
/// # Errors
///
/// Returns `SimulateError` if the agent cannot be registered.
pub async fn run(origin: &Url, offline: bool, paths: &[String]) -> Result<(), SimulateError> {
    let network = HttpNetwork::new(Some(origin.clone()), DEFAULT_HTTP_TIMEOUT)?;
    let gate = Arc::new(ConnectivityGate::new(network));
    let report = simulate(gate, origin, offline, paths).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("store: {}", report.cache_name);
        for step in &report.steps {
            let kind = if step.navigation { "navigate" } else { "get" };
            println!("  {kind:<8} {:<32} {}", step.path, step.outcome);
        }
        println!("stored ({}):", report.stored.len());
        for key in &report.stored {
            println!("  {key}");
        }
    }
    Ok(())
}
