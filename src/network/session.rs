//! One bridge session: handshake, frame loop, send correlation.

use super::roster::Roster;
use super::transport::{OutgoingMessage, Transport};
use crate::error::DeliveryError;
use crate::handlers::{NotifySettings, Registry};
use crate::state::TargetStore;
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use pingwire_proto::{
    ChannelId, ConversationContext, Inbound, JsonLineCodec, Outbound, ProtocolError,
    SendOutcome, UserId,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// Outbound frames buffered ahead of the socket writer.
const OUTBOUND_QUEUE: usize = 256;

/// Transport backed by a live bridge connection.
pub struct BridgeTransport {
    self_id: UserId,
    outbound: mpsc::Sender<Outbound>,
    pending: DashMap<u64, oneshot::Sender<SendOutcome>>,
    next_nonce: AtomicU64,
    roster: Arc<Roster>,
    send_timeout: Duration,
}

impl BridgeTransport {
    pub fn new(
        self_id: UserId,
        outbound: mpsc::Sender<Outbound>,
        roster: Arc<Roster>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            self_id,
            outbound,
            pending: DashMap::new(),
            next_nonce: AtomicU64::new(1),
            roster,
            send_timeout,
        }
    }

    /// Hand a `send_result` to whoever is waiting on that nonce.
    pub fn complete(&self, nonce: u64, outcome: SendOutcome) {
        match self.pending.remove(&nonce) {
            Some((_, waiter)) => {
                let _ = waiter.send(outcome);
            }
            None => debug!(nonce, "send_result for unknown or expired nonce"),
        }
    }

    /// Fail every in-flight send with [`DeliveryError::Closed`].
    pub fn close(&self) {
        self.pending.clear();
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    fn self_id(&self) -> UserId {
        self.self_id
    }

    async fn send(&self, channel: ChannelId, message: OutgoingMessage) -> Result<(), DeliveryError> {
        let nonce = self.next_nonce.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(nonce, tx);

        let frame = Outbound::Send {
            nonce,
            channel_id: channel,
            content: message.content,
            mentions: message.mentions,
            reply_to: message.reply_to,
            mention_reply_author: message.mention_reply_author,
            delete_after_ms: message
                .delete_after
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        };
        if self.outbound.send(frame).await.is_err() {
            self.pending.remove(&nonce);
            return Err(DeliveryError::Closed);
        }

        match tokio::time::timeout(self.send_timeout, rx).await {
            Err(_) => {
                self.pending.remove(&nonce);
                Err(DeliveryError::TimedOut)
            }
            Ok(Err(_)) => Err(DeliveryError::Closed),
            Ok(Ok(SendOutcome::Delivered)) => Ok(()),
            Ok(Ok(SendOutcome::Forbidden { detail })) => Err(DeliveryError::Forbidden(detail)),
            Ok(Ok(SendOutcome::Failed { detail })) => Err(DeliveryError::Failed(detail)),
        }
    }

    async fn present_members(&self, context: &ConversationContext) -> HashSet<UserId> {
        context
            .channel_id()
            .map(|channel| self.roster.members(channel))
            .unwrap_or_default()
    }

    fn channel_name(&self, channel: ChannelId) -> Option<String> {
        self.roster.name(channel)
    }
}

/// Everything a session needs from the daemon.
#[derive(Clone)]
pub struct SessionParams {
    pub store: Arc<TargetStore>,
    pub notify: NotifySettings,
    pub send_timeout: Duration,
    pub max_frame_len: usize,
    /// How long a new connection may take to send `ready`.
    pub handshake_timeout: Duration,
}

/// Serve one bridge connection until it closes.
///
/// Frames before `ready` are dropped. A connection that has not sent
/// `ready` within the handshake timeout is closed, so it cannot hold the
/// gateway. Malformed frames are logged and skipped; I/O errors and
/// oversized frames end the session.
pub async fn run<S>(stream: S, params: &SessionParams) -> Result<(), ProtocolError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let framed = Framed::new(
        stream,
        JsonLineCodec::<Inbound, Outbound>::with_max_len(params.max_frame_len),
    );
    let (mut sink, mut frames) = framed.split();

    let (out_tx, mut out_rx) = mpsc::channel::<Outbound>(OUTBOUND_QUEUE);
    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if let Err(e) = sink.send(frame).await {
                warn!(error = %e, "Bridge write failed");
                break;
            }
        }
    });

    let handshake_start = Instant::now();
    let self_id = loop {
        let remaining = params
            .handshake_timeout
            .saturating_sub(handshake_start.elapsed());
        let Ok(next) = tokio::time::timeout(remaining, frames.next()).await else {
            warn!(
                timeout_ms = params.handshake_timeout.as_millis() as u64,
                "Handshake timeout, closing bridge connection"
            );
            writer.abort();
            return Ok(());
        };
        match next {
            None => {
                writer.abort();
                return Ok(());
            }
            Some(Ok(Inbound::Ready { self_id })) => break self_id,
            Some(Ok(frame)) => warn!(?frame, "Dropping frame received before ready"),
            Some(Err(e)) if e.is_recoverable() => warn!(error = %e, "Skipping bad frame"),
            Some(Err(e)) => {
                writer.abort();
                return Err(e);
            }
        }
    };
    info!(%self_id, "Bridge ready");

    let roster = Arc::new(Roster::new());
    let transport = Arc::new(BridgeTransport::new(
        self_id,
        out_tx,
        Arc::clone(&roster),
        params.send_timeout,
    ));
    let registry = Arc::new(Registry::new(
        Arc::clone(&params.store),
        transport.clone(),
        params.notify.clone(),
    ));

    let result = loop {
        let frame = match frames.next().await {
            None => break Ok(()),
            Some(Ok(frame)) => frame,
            Some(Err(e)) if e.is_recoverable() => {
                warn!(error = %e, "Skipping bad frame");
                continue;
            }
            Some(Err(e)) => break Err(e),
        };

        match frame {
            Inbound::Ready { self_id: again } if again != self_id => {
                warn!(%self_id, %again, "Ignoring ready with a different identity");
            }
            Inbound::Ready { .. } => {}
            Inbound::SendResult { nonce, outcome } => transport.complete(nonce, outcome),
            Inbound::ChannelUpsert {
                context,
                name,
                members,
            } => roster.upsert(context, name, members),
            Inbound::MemberAdd {
                channel_id,
                user_id,
            } => {
                if !roster.add_member(channel_id, user_id) {
                    debug!(%channel_id, %user_id, "member_add for unannounced channel");
                }
            }
            Inbound::Event(event) => {
                roster.apply(&event);
                registry.dispatch(event);
            }
        }
    };

    transport.close();
    writer.abort();
    result
}
