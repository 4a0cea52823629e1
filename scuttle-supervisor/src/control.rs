use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;

use crate::shutdown::ShutdownSignal;

/// Accepts plain-text `STOP\n` lines on `127.0.0.1:<port>` and triggers `signal`
/// when one arrives. Any other line, or a
/// connection that drops without sending one, is ignored.
pub async fn serve(port: u16, signal: Arc<ShutdownSignal>) {
    let listener = match TcpListener::bind(("127.0.0.1", port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(port, error = %err, "failed to bind control port");
            return;
        }
    };
    tracing::info!(port, "control port listening");

    loop {
        let Ok((stream, _addr)) = listener.accept().await else { continue };
        let signal = signal.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim() == "STOP" {
                    tracing::info!("STOP received on control port");
                    signal.trigger();
                    return;
                }
            }
        });
    }
}
