//! TCP listener: one task per client, one command per line.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use media_capture_core::CaptureProvider;

use crate::controller::MediaController;
use crate::error::ServerError;
use crate::protocol::{Command, Reply};

/// Longest accepted command line, newline excluded.
pub const MAX_COMMAND_LEN: usize = 4096;

pub async fn bind(address: &str) -> Result<TcpListener, ServerError> {
    let listener = TcpListener::bind(address).await.map_err(|source| ServerError::Bind {
        address: address.to_string(),
        source,
    })?;
    log::info!("The server is running on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accept clients until the listener fails.
pub async fn serve<P>(listener: TcpListener, controller: Arc<MediaController<P>>) -> Result<(), ServerError>
where
    P: CaptureProvider + 'static,
{
    loop {
        let (stream, peer) = listener.accept().await?;
        log::info!("Client connected: {}", peer);
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, controller).await {
                log::warn!("Client {} error: {}", peer, e);
            }
            log::info!("Client disconnected: {}", peer);
        });
    }
}

async fn handle_client<P>(stream: TcpStream, controller: Arc<MediaController<P>>) -> Result<(), ServerError>
where
    P: CaptureProvider + 'static,
{
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(128);

    loop {
        buf.clear();
        let read = (&mut reader)
            .take(MAX_COMMAND_LEN as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            break;
        }
        if buf.last() != Some(&b'\n') && buf.len() > MAX_COMMAND_LEN {
            log::warn!("Command longer than {} bytes, closing connection", MAX_COMMAND_LEN);
            let reply = Reply::error(format!("command longer than {} bytes", MAX_COMMAND_LEN));
            writer.write_all(&reply.encode()).await?;
            writer.flush().await?;
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        if line.trim().is_empty() {
            continue;
        }
        let command = Command::parse(&line);
        let controller = Arc::clone(&controller);
        let replies = tokio::task::spawn_blocking(move || controller.handle(&command))
            .await
            .unwrap_or_else(|e| vec![Reply::error(format!("command task failed: {}", e))]);

        for reply in &replies {
            writer.write_all(&reply.encode()).await?;
        }
        writer.flush().await?;
    }
    Ok(())
}
