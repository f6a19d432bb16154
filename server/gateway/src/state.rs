use crate::config::Config;
use crate::hub::ConnectionHub;
use std::sync::Arc;
use vp_control::MeetingRegistry;
use vp_media::MediaRelay;
use vp_metrics::{ControlMetrics, MeetingsMetrics, TransferMetrics};
use vp_transfer::TransferCoordinator;

/// Everything a connection task or the media listener needs, bundled the
/// way the teacher's `GatewayState` bundles its control/session/voice
/// handles for per-connection tasks to clone out of an `Arc`.
pub struct AppState {
    pub config: Config,
    pub registry: Arc<MeetingRegistry>,
    pub transfer: Arc<TransferCoordinator>,
    pub hub: Arc<ConnectionHub>,
    pub media: Arc<MediaRelay>,
    pub meetings_metrics: MeetingsMetrics,
    pub control_metrics: ControlMetrics,
    pub transfer_metrics: TransferMetrics,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(MeetingRegistry::new(config.max_meetings));
        let transfer = Arc::new(TransferCoordinator::new(config.transfer_config()));
        let hub = Arc::new(ConnectionHub::new());
        let media_metrics = Arc::new(vp_metrics::MediaMetricsImpl::new("vp", Default::default()));
        let media = Arc::new(MediaRelay::new(registry.clone(), media_metrics));

        AppState {
            config,
            registry,
            transfer,
            hub,
            media,
            meetings_metrics: MeetingsMetrics::new("vp"),
            control_metrics: ControlMetrics::new("vp"),
            transfer_metrics: TransferMetrics::new("vp"),
        }
    }
}
