//! Infrastructure wiring: stock ledger backend, event bus, realtime fan-out.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use tracing::{debug, info};

use storeledger_events::{EventBus, EventEnvelope, InMemoryEventBus};
use storeledger_infra::{
    AppConfig, InMemoryStockLedger, LedgerError, PostgresStockLedger, PublishingStockLedger,
    Repositories, Services, StockLedger, StorageBackend,
};
use storeledger_inventory::StockEvent;

pub type MovementBus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

/// Realtime message broadcast via SSE.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub topic: String,
    pub payload: JsonValue,
}

impl RealtimeMessage {
    fn from_envelope(envelope: &EventEnvelope<JsonValue>) -> Self {
        // Unwrap the event variant; unknown payloads pass through untouched.
        let movement = serde_json::from_value::<StockEvent>(envelope.payload().clone())
            .ok()
            .and_then(|e| serde_json::to_value(e.into_movement()).ok())
            .unwrap_or_else(|| envelope.payload().clone());
        Self {
            topic: envelope.event_type().to_string(),
            payload: serde_json::json!({
                "event_id": envelope.event_id().to_string(),
                "aggregate_type": envelope.aggregate_type(),
                "aggregate_key": envelope.aggregate_key(),
                "sequence_number": envelope.sequence_number(),
                "occurred_at": envelope.occurred_at().to_rfc3339(),
                "movement": movement,
            }),
        }
    }
}

/// Everything a handler needs.
pub struct AppServices {
    services: Services,
    bus: MovementBus,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
}

impl AppServices {
    /// Wire the backend selected by `config.storage`.
    pub async fn from_config(config: &AppConfig) -> Result<Self, LedgerError> {
        let bus: MovementBus = Arc::new(InMemoryEventBus::new());
        let ledger: Arc<dyn StockLedger> = match (config.storage, &config.database) {
            (StorageBackend::Postgres, Some(db)) => {
                let pg = PostgresStockLedger::connect(&db.url, db.max_connections).await?;
                info!(max_connections = db.max_connections, "postgres stock ledger ready");
                Arc::new(PublishingStockLedger::new(pg, bus.clone()))
            }
            (StorageBackend::Postgres, None) => {
                return Err(LedgerError::Store("postgres storage without a database url".into()));
            }
            (StorageBackend::Memory, _) => {
                info!("in-memory stock ledger ready");
                Arc::new(PublishingStockLedger::new(InMemoryStockLedger::new(), bus.clone()))
            }
        };
        Ok(Self::wire(ledger, bus, config.event_buffer))
    }

    /// Fully in-memory wiring (tests/dev).
    pub fn in_memory(event_buffer: usize) -> Self {
        let bus: MovementBus = Arc::new(InMemoryEventBus::new());
        let ledger = PublishingStockLedger::new(InMemoryStockLedger::new(), bus.clone());
        Self::wire(Arc::new(ledger), bus, event_buffer)
    }

    fn wire(ledger: Arc<dyn StockLedger>, bus: MovementBus, event_buffer: usize) -> Self {
        let (realtime_tx, _) = broadcast::channel(event_buffer.max(1));
        spawn_realtime_bridge(&bus, realtime_tx.clone());
        Self {
            services: Services::new(ledger, Repositories::in_memory()),
            bus,
            realtime_tx,
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn bus(&self) -> &MovementBus {
        &self.bus
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }
}

/// Forward committed movements from the (blocking) bus into the async
/// broadcast channel. Runs on its own thread until the bus is dropped.
fn spawn_realtime_bridge(bus: &MovementBus, tx: broadcast::Sender<RealtimeMessage>) {
    let subscription = bus.subscribe();
    std::thread::spawn(move || {
        while let Ok(envelope) = subscription.recv() {
            // No SSE clients is not an error.
            if tx.send(RealtimeMessage::from_envelope(&envelope)).is_err() {
                debug!("movement published with no stream subscribers");
            }
        }
    });
}

pub fn movement_sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(m) => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        // Lagged receivers skip what they missed.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
