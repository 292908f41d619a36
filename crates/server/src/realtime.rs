//! Realtime catalog channel over WebSocket.
//!
//! Every connected client receives `productAdded` / `productDeleted` frames.
//! Clients may also send `newProduct` / `deleteProduct` frames, which go
//! through the same store operations as the HTTP routes.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use models::product::id_from_value;
use models::{Product, ProductInput};
use service::notify::{ProductAnnouncer, ProductEvent};
use service::ServiceError;

use crate::state::AppState;

/// Fan-out of catalog events to whoever is subscribed right now.
/// Nothing is buffered for clients that connect later.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<ProductEvent>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProductEvent> {
        self.tx.subscribe()
    }

    fn publish(&self, event: ProductEvent) {
        // An error only means no listener is connected.
        if let Ok(receivers) = self.tx.send(event) {
            debug!(receivers, "catalog event published");
        }
    }
}

impl ProductAnnouncer for Broadcaster {
    fn product_created(&self, product: &Product) {
        self.publish(ProductEvent::Created(product.clone()));
    }

    fn product_deleted(&self, id: &str) {
        self.publish(ProductEvent::Deleted(id.to_string()));
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data")]
enum ClientFrame {
    #[serde(rename = "newProduct")]
    NewProduct(ProductInput),
    #[serde(rename = "deleteProduct")]
    DeleteProduct { id: Value },
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.events.subscribe();
    info!("realtime client connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Ok(text) = serde_json::to_string(&event) else { continue };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "realtime client lagged; events dropped"),
                Err(RecvError::Closed) => break,
            },
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = handle_client_frame(&state, &text).await {
                        let reply = serde_json::json!({"event": "error", "data": e.to_string()});
                        if sender.send(Message::Text(reply.to_string())).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "realtime socket error");
                    break;
                }
            },
        }
    }
    info!("realtime client disconnected");
}

async fn handle_client_frame(state: &AppState, text: &str) -> Result<(), ServiceError> {
    let frame: ClientFrame = serde_json::from_str(text)
        .map_err(|e| ServiceError::Validation(format!("unrecognized frame: {}", e)))?;
    match frame {
        ClientFrame::NewProduct(input) => {
            state.products.create(input).await?;
        }
        ClientFrame::DeleteProduct { id } => {
            let id = id_from_value(&id).ok_or_else(|| ServiceError::Validation("id is required".into()))?;
            state.products.delete_by_id(&id).await?;
        }
    }
    Ok(())
}
