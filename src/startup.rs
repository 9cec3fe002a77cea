//! Application startup and server initialization.
//!
//! Startup runs in a fixed order: every probe is initialised and registered,
//! the registry is frozen, one poll unit per probe is spawned, and only then
//! is the HTTP listener bound. Any failure before serving is fatal.

use std::sync::Arc;

use prometheus::IntCounter;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::ConfigV1;
use crate::metrics::{MetricRegistry, MetricRegistryBuilder, RegistrationError};
use crate::probes::{create_probe, Probe, ProbeError};
use crate::routes;
use crate::scheduler::{PollScheduler, ZeroIntervalError};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Init(#[from] ProbeError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Schedule(#[from] ZeroIntervalError),

    #[error("could not bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Initialised probes with their metrics registered, not yet polling.
pub struct Exporter {
    registry: MetricRegistry,
    units: Vec<(Arc<dyn Probe>, IntCounter)>,
}

impl Exporter {
    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Spawns one poll unit per probe and hands out the frozen registry.
    pub fn start_polling(
        self,
        scheduler: &PollScheduler,
    ) -> (Arc<MetricRegistry>, Vec<JoinHandle<()>>) {
        let handles = self
            .units
            .into_iter()
            .map(|(probe, errors)| scheduler.spawn(probe, errors))
            .collect();
        (Arc::new(self.registry), handles)
    }
}

/// Runs `init` on each probe and registers its metrics, in order.
///
/// Stops at the first failure; no poll unit exists yet at that point.
pub fn build_exporter(probes: Vec<Box<dyn Probe>>) -> Result<Exporter, StartupError> {
    let mut builder = MetricRegistryBuilder::new();
    let mut units = Vec::with_capacity(probes.len());

    for mut probe in probes {
        info!("Starting probe '{}'", probe.get_name());
        probe.init()?;

        let probe: Arc<dyn Probe> = Arc::from(probe);
        let errors = builder.register_probe(probe.clone())?;
        units.push((probe, errors));
    }

    Ok(Exporter {
        registry: builder.finish(),
        units,
    })
}

/// Initializes the configured probes and serves the metrics endpoint.
///
/// # Errors
///
/// Returns an error if a probe fails to initialise, a metric cannot be
/// registered, the listener cannot bind, or the server stops with an error.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), StartupError> {
    let probes = config.probes.iter().map(create_probe).collect();
    let exporter = build_exporter(probes)?;

    let scheduler = PollScheduler::new(config.poll_interval(), config.error_log_interval())?;
    let (metrics, _units) = exporter.start_polling(&scheduler);

    let state = AppState {
        config: config.clone(),
        metrics,
    };
    let app = routes::create_router(state);

    info!("Starting metrics HTTP endpoint on {}", config.bind_address);
    let listener = TcpListener::bind(&config.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.bind_address.clone(),
            source,
        })?;

    axum::serve(listener, app).await.map_err(StartupError::Serve)
}
