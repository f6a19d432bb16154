mod config;
mod dispatcher;
mod frame;
mod hub;
mod listener;
mod media_listener;
mod state;

use clap::Parser;
use config::Config;
use state::AppState;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let config = Config::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(err) => {
            error!(?err, "failed to start async runtime");
            return ExitCode::from(2);
        }
    };

    runtime.block_on(run(config))
}

async fn run(config: Config) -> ExitCode {
    let metrics_cfg = vp_metrics::MetricsConfig {
        listen: config.metrics_listen.clone(),
        namespace: "vp",
    };
    let metrics_server = match vp_metrics::MetricsServer::install(metrics_cfg) {
        Ok(s) => s,
        Err(err) => {
            error!(?err, "failed to install metrics recorder");
            return ExitCode::from(1);
        }
    };
    tokio::spawn(async move {
        if let Err(err) = metrics_server.serve().await {
            error!(?err, "metrics server exited");
        }
    });

    let state = Arc::new(AppState::new(config));

    let sweep_state = state.clone();
    let sweep_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        loop {
            interval.tick().await;
            let outbound = sweep_state.transfer.sweep_timeouts();
            for o in outbound {
                if let Ok(frame) = dispatcher::encode_outbound(&sweep_state, &o) {
                    sweep_state.hub.send_to(o.to, frame);
                }
            }
        }
    });

    let control_state = state.clone();
    let control_task = tokio::spawn(async move {
        if let Err(err) = listener::serve(control_state).await {
            error!(?err, "control listener exited");
        }
    });

    let media_state = state.clone();
    let media_task = tokio::spawn(async move {
        if let Err(err) = media_listener::serve(media_state).await {
            error!(?err, "media listener exited");
        }
    });

    info!("server started");

    let sweep_abort = sweep_task.abort_handle();
    let control_abort = control_task.abort_handle();
    let media_abort = media_task.abort_handle();

    let exit = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal, draining");
            ExitCode::SUCCESS
        }
        res = control_task => {
            error!(?res, "control listener task ended unexpectedly");
            ExitCode::from(1)
        }
        res = media_task => {
            error!(?res, "media listener task ended unexpectedly");
            ExitCode::from(1)
        }
    };

    sweep_abort.abort();
    control_abort.abort();
    media_abort.abort();
    exit
}
