//! One connection attempt: handshake, authorization, then the live loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, timeout, Instant};

use gimptrack_core::{error::TrackerError, protocol::SysFrame, AuthState};

use crate::session::{Inner, SessionOptions};
use crate::transport::codec::{decode, Inbound};
use crate::transport::{Endpoint, Link};

/// How an attempt ended.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// Link closed on request; `clean` is false when teardown timed out.
    Closed { clean: bool },
    Failed(TrackerError),
}

pub(crate) async fn run(
    inner: Arc<Inner>,
    generation: u64,
    options: SessionOptions,
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let outcome = drive(&inner, generation, &options, &mut outbound, &mut shutdown).await;
    match &outcome {
        Outcome::Closed { clean } => tracing::info!(generation, clean, "session closed"),
        Outcome::Failed(e) => tracing::warn!(
            generation,
            code = e.client_code().as_str(),
            error = %e,
            "session ended"
        ),
    }
    inner.finish(generation, outcome);
}

async fn drive(
    inner: &Arc<Inner>,
    generation: u64,
    options: &SessionOptions,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    shutdown: &mut oneshot::Receiver<()>,
) -> Outcome {
    let endpoint = match Endpoint::parse(&options.url) {
        Ok(e) => e,
        Err(e) => return Outcome::Failed(e),
    };

    // ---- transport handshake
    let opened = tokio::select! {
        _ = &mut *shutdown => return Outcome::Closed { clean: true },
        res = timeout(options.handshake_timeout, inner.connector.open(&endpoint, &options.credential)) => res,
    };
    let mut link = match opened {
        Err(_) => return Outcome::Failed(TrackerError::Timeout("handshake")),
        Ok(Err(e)) => return Outcome::Failed(e),
        Ok(Ok(link)) => link,
    };
    tracing::debug!(generation, transport = link.transport(), "link open");

    if !inner.mark_connected(generation) {
        return close(&mut *link, options.teardown_timeout).await;
    }

    // ---- authorization
    let deadline = Instant::now() + options.handshake_timeout;
    loop {
        tokio::select! {
            _ = &mut *shutdown => return close(&mut *link, options.teardown_timeout).await,
            _ = sleep_until(deadline) => {
                let _ = close(&mut *link, options.teardown_timeout).await;
                return Outcome::Failed(TrackerError::Timeout("authorization"));
            }
            frame = link.recv() => match frame {
                Ok(Some(text)) => match decode(&text) {
                    Ok(Inbound::Sys(SysFrame::Authed { user })) => {
                        tracing::debug!(generation, ?user, "authorized");
                        break;
                    }
                    Ok(Inbound::Sys(frame)) => {
                        if let Some(err) = frame.as_error() {
                            return reject(inner, generation, &mut *link, err, options.teardown_timeout).await;
                        }
                    }
                    Ok(Inbound::Other(env)) => {
                        tracing::trace!(svc = %env.svc, msg_type = %env.msg_type, "frame ignored before authorization");
                    }
                    Err(e) => tracing::warn!(generation, error = %e, "undecodable frame ignored"),
                },
                Ok(None) => {
                    return Outcome::Failed(TrackerError::Transport("collector closed during handshake".into()));
                }
                Err(e) => return Outcome::Failed(e),
            }
        }
    }

    if !inner.mark_authorized(generation) {
        return close(&mut *link, options.teardown_timeout).await;
    }

    // ---- live loop
    loop {
        tokio::select! {
            _ = &mut *shutdown => return close(&mut *link, options.teardown_timeout).await,

            // outbound writer
            maybe_out = outbound.recv() => match maybe_out {
                Some(frame) => {
                    let sent = tokio::select! {
                        _ = &mut *shutdown => return close(&mut *link, options.teardown_timeout).await,
                        res = link.send(frame) => res,
                    };
                    if let Err(e) = sent {
                        return Outcome::Failed(e);
                    }
                }
                // Attempt handles dropped: this generation is gone.
                None => return close(&mut *link, options.teardown_timeout).await,
            },

            // inbound reader
            frame = link.recv() => match frame {
                Ok(Some(text)) => match decode(&text) {
                    Ok(Inbound::Sys(frame)) => match frame.as_error() {
                        Some(TrackerError::AuthFailed) => {
                            return reject(inner, generation, &mut *link, TrackerError::AuthFailed, options.teardown_timeout).await;
                        }
                        Some(err) => tracing::warn!(generation, error = %err, "collector reported an error"),
                        None => {}
                    },
                    Ok(Inbound::Other(env)) => {
                        tracing::trace!(svc = %env.svc, msg_type = %env.msg_type, "inbound frame ignored");
                    }
                    Err(e) => tracing::warn!(generation, error = %e, "undecodable frame ignored"),
                },
                Ok(None) => {
                    return Outcome::Failed(TrackerError::Transport("collector closed the connection".into()));
                }
                Err(e) => return Outcome::Failed(e),
            }
        }
    }
}

/// Collector-side rejection. A credential failure is announced as
/// UNAUTHORIZED before DISCONNECTING; anything else ends as a failure.
async fn reject(
    inner: &Arc<Inner>,
    generation: u64,
    link: &mut dyn Link,
    err: TrackerError,
    bound: Duration,
) -> Outcome {
    let announced = matches!(err, TrackerError::AuthFailed)
        && inner.begin_teardown(generation, AuthState::Unauthorized);
    let _ = close(link, bound).await;
    if announced {
        Outcome::Closed { clean: true }
    } else {
        Outcome::Failed(err)
    }
}

/// Bounded close. Only a timeout counts as unclean: a link that errors while
/// closing is gone either way.
async fn close(link: &mut dyn Link, bound: Duration) -> Outcome {
    match timeout(bound, link.close()).await {
        Ok(Ok(())) => Outcome::Closed { clean: true },
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "close failed");
            Outcome::Closed { clean: true }
        }
        Err(_) => {
            tracing::warn!(transport = link.transport(), "teardown timed out");
            Outcome::Closed { clean: false }
        }
    }
}
