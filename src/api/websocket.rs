//! Live dashboard feed over WebSocket.
//!
//! `GET /ws?build_id=N` streams events of one build; without the parameter
//! every event is sent. The ingest key is checked before the upgrade, so a
//! bad key gets a plain HTTP 401 instead of an open socket. The feed is
//! one-way: frames from the client only matter for keep-alive and close.

use std::time::{Duration, Instant};

use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use actix_ws::{Message, MessageStream, Session};
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::ApiKeyAuth;
use crate::error::AppError;
use crate::services::{EventBroadcaster, EventFeed, FeedItem};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// A client silent for this long is dropped.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(40);

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub build_id: Option<i32>,
}

pub async fn websocket_handler(
    req: HttpRequest,
    stream: web::Payload,
    broadcaster: web::Data<EventBroadcaster>,
) -> Result<HttpResponse, actix_web::Error> {
    let client = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();

    if let Err(err) = ApiKeyAuth::from_request(&req, &mut actix_web::dev::Payload::None).await {
        warn!(client = %client, "Live feed rejected: bad API key");
        return Ok(err.error_response());
    }

    let query = web::Query::<FeedQuery>::from_query(req.query_string())
        .map_err(|e| AppError::InvalidInput(format!("Invalid feed query: {}", e)))?;
    let build_id = query.into_inner().build_id;

    let (response, session, inbound) = actix_ws::handle(&req, stream)?;
    let feed = broadcaster.subscribe(build_id);
    info!(client = %client, build_id = ?build_id, "Live feed opened");

    actix_web::rt::spawn(serve_feed(session, inbound, feed, client));
    Ok(response)
}

async fn serve_feed(
    mut session: Session,
    mut inbound: MessageStream,
    mut feed: EventFeed,
    client: String,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    let mut last_heard = Instant::now();

    let reason = loop {
        tokio::select! {
            frame = inbound.next() => match frame {
                Some(Ok(Message::Ping(bytes))) => {
                    last_heard = Instant::now();
                    if session.pong(&bytes).await.is_err() {
                        break "send failed";
                    }
                }
                Some(Ok(Message::Pong(_))) => last_heard = Instant::now(),
                Some(Ok(Message::Close(_))) | None => break "client closed",
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(client = %client, error = %e, "Live feed protocol error");
                    break "protocol error";
                }
            },

            item = feed.next() => match item {
                Some(FeedItem::Event(message)) => match serde_json::to_string(&message) {
                    Ok(json) => {
                        if session.text(json).await.is_err() {
                            break "send failed";
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to encode live event"),
                },
                Some(FeedItem::Missed(count)) => {
                    warn!(client = %client, missed = count, "Live feed subscriber fell behind");
                }
                None => break "feed closed",
            },

            _ = heartbeat.tick() => {
                if last_heard.elapsed() > CLIENT_TIMEOUT {
                    break "heartbeat timeout";
                }
                if session.ping(b"").await.is_err() {
                    break "send failed";
                }
            }
        }
    };

    let _ = session.close(None).await;
    info!(client = %client, reason, "Live feed closed");
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(websocket_handler)));
}
