//! Postgres-backed stock ledger.
//!
//! Each adjustment runs in one transaction:
//! 1. materialize the entry row if absent (`INSERT … ON CONFLICT DO NOTHING`)
//! 2. lock it (`SELECT … FOR UPDATE`)
//! 3. decide with the `StockEntry` aggregate
//! 4. write the new quantity and insert the movement
//! 5. commit
//!
//! A rejected adjustment rolls back, including any row materialized in step 1.
//! Transfers lock both rows in key order so opposite transfers cannot deadlock.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | LedgerError |
//! |------------|----------------------|-------------|
//! | Database (unique violation) | `23505` | `Domain(Conflict)` |
//! | Database (check constraint violation) | `23514` | `Domain(InvariantViolation)` |
//! | Database (other) / pool / IO | any | `Store` |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, info, instrument, warn};
use uuid::Uuid;

use storeledger_catalog::{ProductId, StoreId};
use storeledger_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use storeledger_inventory::{
    AdjustStock, MovementDirection, MovementId, StockEntry, StockKey, StockMovement,
    TransferOutcome, TransferStock, execute_transfer,
};

use super::{LedgerError, MovementFilter, StockLedger, keep_latest};

const MIGRATION: &str = include_str!("../../migrations/0001_stock_ledger.sql");

#[derive(Debug, Clone)]
pub struct PostgresStockLedger {
    pool: PgPool,
}

impl PostgresStockLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool and apply the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let ledger = Self::new(pool);
        ledger.migrate().await?;
        Ok(ledger)
    }

    /// Create tables and indexes if missing (idempotent).
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        sqlx::raw_sql(MIGRATION)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StockLedger for PostgresStockLedger {
    #[instrument(skip(self, cmd), fields(key = %cmd.key, amount = cmd.amount, direction = %cmd.direction), err)]
    async fn adjust(&self, cmd: AdjustStock) -> Result<StockMovement, LedgerError> {
        // Reject before opening a transaction.
        if cmd.amount == 0 {
            return Err(DomainError::validation("amount must be positive").into());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        ensure_entry_row(&mut tx, cmd.key).await?;
        let mut entry = lock_entry(&mut tx, cmd.key)
            .await?
            .unwrap_or_else(|| StockEntry::empty(cmd.key));

        let events = match entry.handle(&cmd) {
            Ok(events) => events,
            Err(e) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(e.into());
            }
        };
        for ev in &events {
            entry.apply(ev);
        }
        let movement = events
            .into_iter()
            .next()
            .map(|e| e.into_movement())
            .ok_or_else(|| DomainError::invariant("adjustment produced no movement"))?;

        write_entry(&mut tx, &entry).await?;
        insert_movement(&mut tx, &movement).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        info!(quantity = entry.quantity(), movement_id = %movement.movement_id, "stock adjusted");
        Ok(movement)
    }

    #[instrument(
        skip(self, cmd),
        fields(product = %cmd.product_id, from = %cmd.from_store, to = %cmd.to_store, amount = cmd.amount),
        err
    )]
    async fn transfer(&self, cmd: TransferStock) -> Result<TransferOutcome, LedgerError> {
        cmd.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let source_key = cmd.source_key();
        let destination_key = cmd.destination_key();

        // Lock in a global order.
        let mut source: Option<StockEntry> = None;
        let mut destination: Option<StockEntry> = None;
        let mut ordered = [source_key, destination_key];
        ordered.sort();
        for key in ordered {
            if key == destination_key {
                ensure_entry_row(&mut tx, key).await?;
                destination = lock_entry(&mut tx, key).await?;
            } else {
                source = lock_entry(&mut tx, key).await?;
            }
        }

        let mut destination = destination.unwrap_or_else(|| StockEntry::empty(destination_key));

        let outcome = match execute_transfer(source.as_mut(), &mut destination, &cmd) {
            Ok(outcome) => outcome,
            Err(e) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(e.into());
            }
        };

        match &outcome {
            TransferOutcome::Completed { outbound, inbound } => {
                if let Some(source) = &source {
                    write_entry(&mut tx, source).await?;
                }
                write_entry(&mut tx, &destination).await?;
                insert_movement(&mut tx, outbound).await?;
                insert_movement(&mut tx, inbound).await?;
                tx.commit()
                    .await
                    .map_err(|e| map_sqlx_error("commit_transaction", e))?;
                info!("stock transferred");
            }
            TransferOutcome::Rejected { available, .. } => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                warn!(available, "transfer rejected");
            }
        }

        Ok(outcome)
    }

    async fn entry(&self, key: StockKey) -> Result<Option<StockEntry>, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT product_id, store_id, quantity, version
            FROM stock_entries
            WHERE product_id = $1 AND store_id = $2
            "#,
        )
        .bind(key.product_id.0.as_uuid())
        .bind(key.store_id.0.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_entry", e))?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn entries(&self) -> Result<Vec<StockEntry>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, store_id, quantity, version
            FROM stock_entries
            ORDER BY product_id, store_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_entries", e))?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn entries_for_store(&self, store_id: StoreId) -> Result<Vec<StockEntry>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, store_id, quantity, version
            FROM stock_entries
            WHERE store_id = $1
            ORDER BY product_id
            "#,
        )
        .bind(store_id.0.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_store_entries", e))?;

        rows.iter().map(entry_from_row).collect()
    }

    #[instrument(skip(self, filter), fields(movement_count = tracing::field::Empty), err)]
    async fn movements(&self, filter: &MovementFilter) -> Result<Vec<StockMovement>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT movement_id, product_id, store_id, quantity, direction, occurred_at
            FROM stock_movements
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR store_id = $2)
              AND ($3::text IS NULL OR direction = $3)
              AND ($4::timestamptz IS NULL OR occurred_at >= $4)
            ORDER BY occurred_at ASC, seq ASC
            "#,
        )
        .bind(filter.product_id.map(|p| *p.0.as_uuid()))
        .bind(filter.store_id.map(|s| *s.0.as_uuid()))
        .bind(filter.direction.map(|d| d.as_str()))
        .bind(filter.since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_movements", e))?;

        let movements = rows
            .iter()
            .map(movement_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Span::current().record("movement_count", movements.len());
        Ok(keep_latest(movements, filter.limit))
    }
}

async fn ensure_entry_row(
    tx: &mut Transaction<'_, Postgres>,
    key: StockKey,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO stock_entries (product_id, store_id, quantity, version)
        VALUES ($1, $2, 0, 0)
        ON CONFLICT (product_id, store_id) DO NOTHING
        "#,
    )
    .bind(key.product_id.0.as_uuid())
    .bind(key.store_id.0.as_uuid())
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("ensure_entry", e))?;
    Ok(())
}

async fn lock_entry(
    tx: &mut Transaction<'_, Postgres>,
    key: StockKey,
) -> Result<Option<StockEntry>, LedgerError> {
    let row = sqlx::query(
        r#"
        SELECT product_id, store_id, quantity, version
        FROM stock_entries
        WHERE product_id = $1 AND store_id = $2
        FOR UPDATE
        "#,
    )
    .bind(key.product_id.0.as_uuid())
    .bind(key.store_id.0.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_entry", e))?;

    row.as_ref().map(entry_from_row).transpose()
}

async fn write_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: &StockEntry,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        UPDATE stock_entries
        SET quantity = $3, version = $4, updated_at = NOW()
        WHERE product_id = $1 AND store_id = $2
        "#,
    )
    .bind(entry.product_id().0.as_uuid())
    .bind(entry.store_id().0.as_uuid())
    .bind(to_db_quantity(entry.quantity())?)
    .bind(to_db_quantity(entry.version())?)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("write_entry", e))?;
    Ok(())
}

async fn insert_movement(
    tx: &mut Transaction<'_, Postgres>,
    m: &StockMovement,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (movement_id, product_id, store_id, quantity, direction, occurred_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(m.movement_id.0.as_uuid())
    .bind(m.product_id.0.as_uuid())
    .bind(m.store_id.0.as_uuid())
    .bind(to_db_quantity(m.quantity)?)
    .bind(m.direction.as_str())
    .bind(m.occurred_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_movement", e))?;
    Ok(())
}

fn to_db_quantity(value: u64) -> Result<i64, LedgerError> {
    i64::try_from(value)
        .map_err(|_| DomainError::validation("quantity exceeds storable range").into())
}

fn from_db_quantity(value: i64, column: &str) -> Result<u64, LedgerError> {
    u64::try_from(value)
        .map_err(|_| LedgerError::Store(format!("negative {column} in stock table: {value}")))
}

fn entry_from_row(row: &PgRow) -> Result<StockEntry, LedgerError> {
    let read = |e: sqlx::Error| LedgerError::Store(format!("failed to read entry row: {e}"));

    let product_id: Uuid = row.try_get("product_id").map_err(read)?;
    let store_id: Uuid = row.try_get("store_id").map_err(read)?;
    let quantity: i64 = row.try_get("quantity").map_err(read)?;
    let version: i64 = row.try_get("version").map_err(read)?;

    Ok(StockEntry::from_parts(
        StockKey::new(
            ProductId::new(AggregateId::from_uuid(product_id)),
            StoreId::new(AggregateId::from_uuid(store_id)),
        ),
        from_db_quantity(quantity, "quantity")?,
        from_db_quantity(version, "version")?,
    ))
}

fn movement_from_row(row: &PgRow) -> Result<StockMovement, LedgerError> {
    let read = |e: sqlx::Error| LedgerError::Store(format!("failed to read movement row: {e}"));

    let movement_id: Uuid = row.try_get("movement_id").map_err(read)?;
    let product_id: Uuid = row.try_get("product_id").map_err(read)?;
    let store_id: Uuid = row.try_get("store_id").map_err(read)?;
    let quantity: i64 = row.try_get("quantity").map_err(read)?;
    let direction: String = row.try_get("direction").map_err(read)?;
    let occurred_at: DateTime<Utc> = row.try_get("occurred_at").map_err(read)?;

    let direction = MovementDirection::parse(&direction)
        .ok_or_else(|| LedgerError::Store(format!("unknown movement direction '{direction}'")))?;

    Ok(StockMovement {
        movement_id: MovementId::new(AggregateId::from_uuid(movement_id)),
        product_id: ProductId::new(AggregateId::from_uuid(product_id)),
        store_id: StoreId::new(AggregateId::from_uuid(store_id)),
        quantity: from_db_quantity(quantity, "quantity")?,
        direction,
        occurred_at,
    })
}

/// Map SQLx errors to LedgerError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> LedgerError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation: duplicate movement id.
                Some("23505") => DomainError::conflict(msg).into(),
                // Check constraint: a quantity would have gone negative.
                Some("23514") => DomainError::invariant(msg).into(),
                _ => LedgerError::Store(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            LedgerError::Store(format!("connection pool closed in {}", operation))
        }
        _ => LedgerError::Store(format!("sqlx error in {}: {}", operation, err)),
    }
}
