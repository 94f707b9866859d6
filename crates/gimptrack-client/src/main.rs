//! gimptrack: reads a JSON-lines host feed on stdin and reports to the
//! collector configured in `gimptrack.yaml` (or the path given as the first
//! argument).

use std::collections::VecDeque;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use gimptrack_client::{
    config,
    feed::{FeedLine, HostSample},
    session::{ChannelListener, Notification, SessionManager},
    tracker::Tracker,
};
use gimptrack_core::ConnectionState;

const TICK: Duration = Duration::from_millis(600);

#[tokio::main]
async fn main() -> gimptrack_core::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "gimptrack.yaml".to_string());
    let cfg = config::load_from_file(&path)?;

    let session = SessionManager::from_config(&cfg)?;
    let mut tracker = Tracker::from_config(session, &cfg);
    let (listener, mut status) = ChannelListener::channel();
    tracker.session().add_connection_listener(listener);
    tracing::info!(config = %path, url = %cfg.collector.url, "gimptrack starting");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(TICK);
    let mut sample = HostSample::default();
    let mut pending: VecDeque<FeedLine> = VecDeque::new();
    let mut eof = false;

    // One feed line per tick; ticks without a queued line reuse the last sample.
    loop {
        tokio::select! {
            line = lines.next_line(), if !eof => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match FeedLine::parse(&line) {
                    Ok(parsed) => pending.push_back(parsed),
                    Err(e) => tracing::warn!(error = %e, "skipping feed line"),
                },
                Ok(None) => eof = true,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    eof = true;
                }
            },
            _ = tick.tick() => {
                if let Some(line) = pending.pop_front() {
                    if let Some(s) = line.sample {
                        sample = s;
                    }
                    for event in line.events {
                        tracker.handle(event, &sample);
                    }
                }
                tracker.on_tick(&sample);
                if eof && pending.is_empty() {
                    break;
                }
            }
        }
    }

    tracing::info!("feed closed, disconnecting");
    if tracker.session().connection_state() != ConnectionState::Disconnected {
        tracker.shutdown();
        let closed = async {
            while let Some(n) = status.recv().await {
                if n == Notification::Status(ConnectionState::Disconnected) {
                    break;
                }
            }
        };
        let bound = cfg.collector.teardown_timeout() + Duration::from_secs(1);
        if tokio::time::timeout(bound, closed).await.is_err() {
            tracing::warn!("gave up waiting for disconnect");
        }
    }
    Ok(())
}
