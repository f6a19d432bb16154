pub mod config;
pub mod control;
pub mod http;
pub mod labels;
pub mod media;
pub mod meetings;
pub mod transfer;

pub use config::MetricsConfig;
pub use control::ControlMetrics;
pub use http::MetricsServer;
pub use labels::{BoundedLabel, LabelPolicy};
pub use media::MediaMetricsImpl;
pub use meetings::MeetingsMetrics;
pub use transfer::TransferMetrics;
