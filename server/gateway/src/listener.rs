use crate::dispatcher::{encode_outbound, Dispatcher};
use crate::frame::{read_client_message, Frame};
use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;
use tracing::{info, warn};

const WRITE_QUEUE_DEPTH: usize = 128;

pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = state.config.tcp_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "control listener bound");

    loop {
        let (socket, peer) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(state, socket, peer).await {
                warn!(%peer, ?err, "control connection ended with an error");
            }
        });
    }
}

async fn handle_connection(
    state: Arc<AppState>,
    socket: tokio::net::TcpStream,
    peer: std::net::SocketAddr,
) -> anyhow::Result<()> {
    state.control_metrics.conn_accepted();
    let (mut read_half, mut write_half) = socket.into_split();
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(WRITE_QUEUE_DEPTH);
    let kill = Arc::new(Notify::new());

    let write_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if write_half.write_all(&frame).await.is_err() {
                break;
            }
            if write_half.flush().await.is_err() {
                break;
            }
        }
    });

    let mut dispatcher = Dispatcher::new(state.clone());
    let idle_timeout = Duration::from_millis(state.config.idle_timeout_ms);
    let mut registered = false;

    let result = async {
        loop {
            let read = timeout(idle_timeout, read_client_message(&mut read_half, state.config.max_frame_bytes));
            let msg = tokio::select! {
                r = read => match r {
                    Ok(Ok(Some(Frame::Message(msg)))) => msg,
                    Ok(Ok(Some(Frame::UnknownType(ty)))) => {
                        warn!(%peer, %ty, "discarding frame with unrecognized type");
                        continue;
                    }
                    Ok(Ok(None)) => break,
                    Ok(Err(e)) => return Err(e),
                    Err(_) => {
                        info!(%peer, "idle timeout, closing connection");
                        break;
                    }
                },
                _ = kill.notified() => {
                    info!(%peer, "write queue overflowed, closing connection");
                    break;
                }
            };

            let outbound = dispatcher.handle(msg);
            if !registered {
                if let Some(id) = dispatcher.participant_id() {
                    state.hub.register(id, tx.clone(), kill.clone());
                    registered = true;
                }
            }
            for o in outbound {
                match encode_outbound(&state, &o) {
                    Ok(frame) => state.hub.send_to(o.to, frame),
                    Err(e) => warn!(?e, "failed to encode outbound message"),
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    if let Some(id) = dispatcher.participant_id() {
        state.hub.unregister(id);
        let mut outbound = state.registry.leave(id).unwrap_or_default();
        outbound.extend(state.transfer.abort_for_participant(id));
        for o in outbound {
            if let Ok(frame) = encode_outbound(&state, &o) {
                state.hub.send_to(o.to, frame);
            }
        }
    }
    write_task.abort();
    state.control_metrics.conn_closed();
    result
}
