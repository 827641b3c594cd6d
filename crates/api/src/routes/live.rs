//! Live view over Server-Sent Events.
//!
//! Each connection is one mounted view: the loader runs once, a ticker
//! subscription is opened for the two products, and every tick that moves a
//! tracked price pushes a freshly rendered `view` event. The first event is
//! `mounted`, carrying the view id that amount changes are posted against.
//! Feed state changes go out as `feed` events. When the upstream feed ends the
//! stream stays open with frozen prices; when the client disconnects the
//! upstream socket is closed.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use merger_common::error::AppError;
use merger_common::types::FeedState;
use merger_engine::view::{AllocationView, RawViewInputs, Side};
use merger_feed::LiveFeed;

use crate::state::{AppState, LiveViews, ViewCommand};

/// Ticks buffered between the feed task and the view task.
const TICK_BUFFER: usize = 64;
/// Events buffered between the view task and the HTTP response.
const EVENT_BUFFER: usize = 16;
/// Input changes buffered per view.
const COMMAND_BUFFER: usize = 16;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/live", get(live_view))
        .route("/api/live/{view_id}/amount", post(change_amount))
}

/// Body of an amount change. `value` is the raw field text.
#[derive(Debug, Deserialize)]
pub struct AmountChange {
    pub side: Side,
    pub value: String,
}

/// GET /api/live — Mount a live view and stream it to the client.
async fn live_view(
    State(state): State<AppState>,
    Query(raw): Query<RawViewInputs>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let view = state.mount_view(&raw).await?;
    let feed = LiveFeed::new(
        state.config.ticker_ws_url.clone(),
        state.config.ticker_channel.clone(),
        view.product_ids(),
    );

    let view_id = Uuid::new_v4();
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    state.live_views.register(view_id, cmd_tx).await;

    let (out_tx, out_rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn(drive_view(
        view_id,
        view,
        feed,
        cmd_rx,
        out_tx,
        state.live_views.clone(),
    ));

    let stream = futures_util::stream::unfold(out_rx, |mut rx| async move {
        rx.recv().await.map(|event| (Ok(event), rx))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// POST /api/live/:view_id/amount — Re-enter one token amount on a mounted view.
///
/// The view recomputes with its current prices; nothing is reloaded.
async fn change_amount(
    State(state): State<AppState>,
    Path(view_id): Path<Uuid>,
    Json(change): Json<AmountChange>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .live_views
        .send(
            &view_id,
            ViewCommand::SetAmount {
                side: change.side,
                text: change.value,
            },
        )
        .await?;
    Ok(Json(json!({ "updated": true })))
}

/// Own the view state for one connection: apply ticks and input changes,
/// push renders.
///
/// Ticks and commands are handled one at a time, so the view is only ever
/// written here.
async fn drive_view(
    view_id: Uuid,
    mut view: AllocationView,
    feed: LiveFeed,
    mut commands: mpsc::Receiver<ViewCommand>,
    out: mpsc::Sender<Event>,
    registry: Arc<LiveViews>,
) {
    let (tick_tx, mut tick_rx) = mpsc::channel(TICK_BUFFER);
    let mut state_rx = feed.watch_state();
    let mut last_state = *state_rx.borrow_and_update();
    let mut state_open = true;
    let mut ticks_open = true;
    let feed_task = tokio::spawn(feed.run(tick_tx));

    tracing::info!(%view_id, products = ?view.product_ids(), "Live view mounted");

    if emit(&out, "mounted", &json!({ "view_id": view_id })).await
        && emit(&out, "view", &view.render()).await
    {
        loop {
            tokio::select! {
                _ = out.closed() => break,
                changed = state_rx.changed(), if state_open => match changed {
                    Ok(()) => {
                        let state = *state_rx.borrow_and_update();
                        if state != last_state {
                            last_state = state;
                            if !emit(&out, "feed", &json!({ "state": state })).await {
                                break;
                            }
                        }
                    }
                    Err(_) => state_open = false,
                },
                tick = tick_rx.recv(), if ticks_open => match tick {
                    Some(tick) => {
                        if view.apply_tick(&tick) && !emit(&out, "view", &view.render()).await {
                            break;
                        }
                    }
                    None => {
                        // Feed is over: prices stay frozen, inputs still recompute
                        ticks_open = false;
                        if last_state != FeedState::Closed {
                            last_state = FeedState::Closed;
                            if !emit(&out, "feed", &json!({ "state": FeedState::Closed })).await {
                                break;
                            }
                        }
                    }
                },
                Some(command) = commands.recv() => match command {
                    ViewCommand::SetAmount { side, text } => {
                        view.set_amount(side, &text);
                        tracing::debug!(
                            %view_id,
                            ?side,
                            amount = view.amount(side),
                            price = view.price(side),
                            "Amount changed"
                        );
                        if !emit(&out, "view", &view.render()).await {
                            break;
                        }
                    }
                },
            }
        }
    }

    registry.remove(&view_id).await;
    drop(tick_rx);
    let _ = feed_task.await;
    tracing::info!(%view_id, "Live view torn down");
}

/// Encode and send one SSE event. Returns `false` once the client is gone.
async fn emit<T: Serialize>(out: &mpsc::Sender<Event>, name: &'static str, payload: &T) -> bool {
    let event = match Event::default().event(name).json_data(payload) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, event = name, "Failed to encode live event");
            return true;
        }
    };
    out.send(event).await.is_ok()
}
