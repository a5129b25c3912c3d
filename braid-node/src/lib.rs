//! TCP front end for a braid [`Hub`].
//!
//! Each connection attaches one client to one document. The first frame must
//! be a `Join`; after that the connection relays the client's operations to
//! the session and forwards operations applied by everyone else.

use braid_sync::codec::{self, read_frame, write_frame};
use braid_sync::{
    DocumentSession, ErrorMessage, Frame, Hub, SyncError, SyncResult, WireMessage,
};
use braid_types::SiteId;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Accepts connections until the listener fails.
pub async fn serve(listener: TcpListener, hub: Arc<Hub>) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "accepted connection");
        let hub = Arc::clone(&hub);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, hub).await {
                warn!(%peer, "connection closed with error: {}", e);
            }
        });
    }
}

enum Flow {
    Continue,
    Close,
}

/// Runs one client connection to completion.
pub async fn handle_connection(stream: TcpStream, hub: Arc<Hub>) -> SyncResult<()> {
    let (mut reader, mut writer) = stream.into_split();

    let join = match read_frame::<char, _>(&mut reader).await? {
        Some(WireMessage::Join(join)) => join,
        Some(other) => {
            let reply = WireMessage::<char>::Error(ErrorMessage::unexpected(other.kind()));
            write_frame(&mut writer, &reply).await?;
            return Ok(());
        }
        None => return Ok(()),
    };

    let session = hub.open(join.document).await?;
    // Subscribe first so nothing applied while the client catches up is lost.
    let mut frames = hub.bus().subscribe(&join.document);
    let replies = session.join(&join).await?;
    let rejected = matches!(replies.first(), Some(WireMessage::Error(_)));
    for reply in &replies {
        write_frame(&mut writer, reply).await?;
    }
    if rejected {
        return Ok(());
    }
    let site = join.site;
    info!(document = %join.document, %site, "client attached");

    // Frame reads are not cancel safe, so they run in their own task.
    let (tx, mut incoming) = mpsc::channel(64);
    let reader_task = tokio::spawn(async move {
        loop {
            let next = read_frame::<char, _>(&mut reader).await;
            let done = !matches!(next, Ok(Some(_)));
            if tx.send(next).await.is_err() || done {
                break;
            }
        }
    });

    let result = loop {
        tokio::select! {
            message = incoming.recv() => match message {
                Some(Ok(Some(message))) => {
                    match handle_message(&session, site, message, &mut writer).await {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Close) => break Ok(()),
                        Err(e) => break Err(e),
                    }
                }
                Some(Ok(None)) | None => break Ok(()),
                Some(Err(e)) => break Err(e),
            },
            frame = frames.recv() => match frame {
                Ok(frame) => {
                    if let Err(e) = forward(site, &frame, &mut writer).await {
                        break Err(e);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%site, skipped, "connection lagged behind the bus, sending snapshot");
                    let snapshot = session.snapshot_message().await;
                    if let Err(e) = write_frame(&mut writer, &snapshot).await {
                        break Err(e);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break Err(SyncError::ChannelClosed),
            },
        }
    };

    reader_task.abort();
    session.leave(site).await;
    info!(document = %session.document(), %site, "client detached");
    result
}

async fn handle_message<W>(
    session: &DocumentSession,
    site: SiteId,
    message: WireMessage<char>,
    writer: &mut W,
) -> SyncResult<Flow>
where
    W: AsyncWrite + Unpin,
{
    match message {
        WireMessage::Insert(_) | WireMessage::Delete(_) => {
            let Some(op) = message.into_operation() else {
                return Ok(Flow::Continue);
            };
            match session.receive(site, op).await {
                Ok(_) => {}
                Err(SyncError::Crdt(e)) => {
                    // The client diverged from what this host can integrate;
                    // it starts over from the current state.
                    warn!(%site, "rejected operation: {}", e);
                    let error = WireMessage::<char>::Error(ErrorMessage::rejected(&e));
                    write_frame(writer, &error).await?;
                    write_frame(writer, &session.snapshot_message().await).await?;
                }
                Err(e) => return Err(e),
            }
        }
        WireMessage::Resync(resync) => {
            for reply in session.resync(site, &resync.vector).await? {
                write_frame(writer, &reply).await?;
            }
        }
        WireMessage::Ack(ack) => session.acknowledge(site, &ack.vector).await,
        WireMessage::Leave(_) => return Ok(Flow::Close),
        other => {
            let reply = WireMessage::<char>::Error(ErrorMessage::unexpected(other.kind()));
            write_frame(writer, &reply).await?;
        }
    }
    Ok(Flow::Continue)
}

/// Sends an operation frame from the bus to the client unless the client
/// originated it. Host-to-host traffic stays on the bus.
async fn forward<W>(site: SiteId, frame: &Frame, writer: &mut W) -> SyncResult<()>
where
    W: AsyncWrite + Unpin,
{
    let (message, _) = codec::decode::<char>(frame)?;
    match message.operation_origin() {
        Some(origin) if origin != site => codec::write_raw_frame(writer, frame).await,
        _ => Ok(()),
    }
}
