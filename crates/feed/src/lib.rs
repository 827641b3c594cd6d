//! Live ticker subscription for one view.
//!
//! Best-effort live update, freeze on disconnect: the socket is opened once,
//! the subscribe frame is sent once, and ticks are forwarded in arrival order
//! until the server goes away, the socket errors, or the view drops its tick
//! receiver. There is no reconnect and no backoff; when the feed ends the
//! view keeps its last known prices.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use merger_common::error::AppError;
use merger_common::types::{FeedState, Tick};
use merger_engine::ticker::{parse_ticker_frame, subscribe_frame};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A single ticker subscription.
pub struct LiveFeed {
    url: String,
    channel: String,
    product_ids: Vec<String>,
    state: watch::Sender<FeedState>,
}

impl LiveFeed {
    pub fn new(url: impl Into<String>, channel: impl Into<String>, product_ids: Vec<String>) -> Self {
        let (state, _) = watch::channel(FeedState::Disconnected);
        Self {
            url: url.into(),
            channel: channel.into(),
            product_ids,
            state,
        }
    }

    pub fn state(&self) -> FeedState {
        *self.state.borrow()
    }

    /// Observe state transitions. The channel closes once the feed is done.
    pub fn watch_state(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    fn transition(&self, next: FeedState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(url = %self.url, from = %previous, to = %next, "Live feed state change");
    }

    /// Drive the subscription until it ends. Always finishes in `Closed`.
    ///
    /// Dropping the receiving half of `ticks` tears the connection down.
    pub async fn run(self, ticks: mpsc::Sender<Tick>) -> FeedState {
        self.transition(FeedState::Connecting);

        match self.connect_and_stream(&ticks).await {
            Ok(()) => tracing::info!(url = %self.url, "Live feed closed"),
            Err(e) => tracing::warn!(
                url = %self.url,
                error = %e,
                "Live feed stopped, prices frozen at last known values"
            ),
        }

        self.transition(FeedState::Closed);
        self.state()
    }

    async fn connect_and_stream(&self, ticks: &mpsc::Sender<Tick>) -> Result<(), AppError> {
        let connected = tokio::select! {
            _ = ticks.closed() => None,
            conn = connect_async(self.url.as_str()) => Some(conn),
        };
        // View went away before the socket opened
        let Some(conn) = connected else {
            return Ok(());
        };
        let (mut ws, _) = conn.map_err(|e| AppError::Feed(format!("connect failed: {e}")))?;

        let frame = subscribe_frame(&self.channel, &self.product_ids);
        ws.send(Message::Text(frame.into()))
            .await
            .map_err(|e| AppError::Feed(format!("subscribe failed: {e}")))?;

        self.transition(FeedState::Subscribed);
        tracing::info!(
            url = %self.url,
            channel = %self.channel,
            products = ?self.product_ids,
            "Subscribed to live ticker"
        );

        stream_ticks(&mut ws, ticks).await
    }
}

async fn stream_ticks(ws: &mut WsStream, ticks: &mpsc::Sender<Tick>) -> Result<(), AppError> {
    loop {
        let next = tokio::select! {
            _ = ticks.closed() => None,
            msg = ws.next() => Some(msg),
        };

        let Some(msg) = next else {
            tracing::debug!("View torn down, closing live feed");
            let _ = ws.close(None).await;
            return Ok(());
        };

        match msg {
            None => return Ok(()),
            Some(Ok(Message::Text(text))) => {
                if !forward(text.as_str(), ticks).await {
                    let _ = ws.close(None).await;
                    return Ok(());
                }
            }
            Some(Ok(Message::Binary(bin))) => match std::str::from_utf8(&bin) {
                Ok(text) => {
                    if !forward(text, ticks).await {
                        let _ = ws.close(None).await;
                        return Ok(());
                    }
                }
                Err(e) => tracing::debug!(error = %e, "Ignoring non-utf8 binary frame"),
            },
            Some(Ok(Message::Ping(payload))) => {
                let _ = ws.send(Message::Pong(payload)).await;
            }
            Some(Ok(Message::Close(frame))) => {
                tracing::warn!(?frame, "Ticker server closed the connection");
                return Ok(());
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(AppError::Feed(format!("websocket error: {e}"))),
        }
    }
}

/// Forward every tick in a frame. Returns `false` once the view is gone.
async fn forward(text: &str, ticks: &mpsc::Sender<Tick>) -> bool {
    for tick in parse_ticker_frame(text) {
        if ticks.send(tick).await.is_err() {
            return false;
        }
    }
    true
}
