use crate::state::AppState;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{info, warn};

/// Fixed upper bound on one UDP datagram's size; generously above any
/// realistic video/audio frame over the wire formats in use.
const MAX_DATAGRAM_BYTES: usize = 2048;

pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = state.config.udp_addr();
    let socket = UdpSocket::bind(&addr).await?;
    info!(%addr, "media listener bound");

    let mut buf = vec![0u8; MAX_DATAGRAM_BYTES];
    loop {
        let (len, src) = socket.recv_from(&mut buf).await?;
        match state.media.handle_datagram(src, &buf[..len]) {
            Ok((_sender, targets)) => {
                for target in targets {
                    if let Err(e) = socket.send_to(&buf[..len], target).await {
                        warn!(%target, ?e, "failed to forward media datagram");
                    }
                }
            }
            Err(e) => {
                tracing::debug!(%src, ?e, "dropped malformed or unroutable media datagram");
            }
        }
    }
}
