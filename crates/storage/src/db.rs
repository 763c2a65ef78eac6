use basket_core::{Money, ReceiptId, UserId};
use basket_ocr::ParsedReceipt;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;

pub type DbPool = Pool<Sqlite>;

/// Default cap for [`most_bought_items`].
pub const MOST_BOUGHT_LIMIT: i64 = 10;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    tracing::info!(path = %path.display(), "receipt database ready");

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS receipts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            store_name TEXT NOT NULL,
            subtotal_cents INTEGER NOT NULL,
            tax_cents INTEGER NOT NULL DEFAULT 0,
            total_cents INTEGER NOT NULL,
            raw_text TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS receipt_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            receipt_id INTEGER NOT NULL,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            qty INTEGER NOT NULL,
            unit_price_cents INTEGER NOT NULL,
            total_price_cents INTEGER NOT NULL,
            FOREIGN KEY (receipt_id) REFERENCES receipts(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_receipts_user ON receipts (user_id, created_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_receipt_items_receipt ON receipt_items (receipt_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_receipt_items_user ON receipt_items (user_id, name)")
        .execute(pool)
        .await?;

    Ok(())
}

// ── Records ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRecord {
    pub id: ReceiptId,
    pub user_id: UserId,
    pub store_name: String,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub raw_text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItemRecord {
    pub id: i64,
    pub receipt_id: ReceiptId,
    pub user_id: UserId,
    pub name: String,
    pub qty: u32,
    pub unit_price: Money,
    pub total_price: Money,
}

/// Per-name purchase totals across all of a user's receipts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MostBoughtItem {
    pub name: String,
    /// Sum of quantities, not number of receipts.
    pub times_bought: i64,
    pub total_spent: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub removed: u64,
    pub removed_items: u64,
}

type ReceiptRow = (i64, String, String, i64, i64, i64, String, DateTime<Utc>);
type ItemRow = (i64, i64, String, String, i64, i64, i64);

const RECEIPT_COLUMNS: &str =
    "id, user_id, store_name, subtotal_cents, tax_cents, total_cents, raw_text, created_at";
const ITEM_COLUMNS: &str =
    "id, receipt_id, user_id, name, qty, unit_price_cents, total_price_cents";

fn receipt_from_row(r: ReceiptRow) -> ReceiptRecord {
    ReceiptRecord {
        id: ReceiptId(r.0),
        user_id: UserId(r.1),
        store_name: r.2,
        subtotal: Money::from_cents(r.3),
        tax: Money::from_cents(r.4),
        total: Money::from_cents(r.5),
        raw_text: r.6,
        created_at: r.7,
    }
}

fn item_from_row(r: ItemRow) -> ReceiptItemRecord {
    ReceiptItemRecord {
        id: r.0,
        receipt_id: ReceiptId(r.1),
        user_id: UserId(r.2),
        name: r.3,
        qty: u32::try_from(r.4).unwrap_or(1),
        unit_price: Money::from_cents(r.5),
        total_price: Money::from_cents(r.6),
    }
}

// ── Writes ───────────────────────────────────────────────────────────────────

fn cents(field: &str, amount: Money) -> Result<i64, sqlx::Error> {
    amount
        .to_cents()
        .ok_or_else(|| sqlx::Error::Encode(format!("{field} {amount} is out of range").into()))
}

/// Store a parsed receipt and its line items atomically.
pub async fn insert_receipt(
    pool: &DbPool,
    user_id: &UserId,
    raw_text: &str,
    parsed: &ParsedReceipt,
) -> Result<ReceiptId, sqlx::Error> {
    let subtotal = cents("subtotal", parsed.subtotal)?;
    let tax = cents("tax", parsed.tax)?;
    let total = cents("total", parsed.total)?;
    let items = parsed
        .items
        .iter()
        .map(|item| -> Result<_, sqlx::Error> {
            Ok((item, cents("unit price", item.unit_price)?, cents("total price", item.total_price)?))
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    let mut tx = pool.begin().await?;

    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO receipts (user_id, store_name, subtotal_cents, tax_cents, total_cents, raw_text, created_at) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id"
    )
    .bind(user_id.as_str())
    .bind(&parsed.store_name)
    .bind(subtotal)
    .bind(tax)
    .bind(total)
    .bind(raw_text)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    for (item, unit_cents, total_cents) in items {
        sqlx::query(
            "INSERT INTO receipt_items (receipt_id, user_id, name, qty, unit_price_cents, total_price_cents) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(id)
        .bind(user_id.as_str())
        .bind(&item.name)
        .bind(i64::from(item.qty))
        .bind(unit_cents)
        .bind(total_cents)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(receipt_id = id, user = %user_id, items = parsed.items.len(), "receipt stored");

    Ok(ReceiptId(id))
}

/// Remove a receipt and its items. Unknown ids remove nothing.
pub async fn delete_receipt(pool: &DbPool, id: ReceiptId) -> Result<DeleteOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let removed_items = sqlx::query("DELETE FROM receipt_items WHERE receipt_id = ?")
        .bind(id.0)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let removed = sqlx::query("DELETE FROM receipts WHERE id = ?")
        .bind(id.0)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    Ok(DeleteOutcome { removed, removed_items })
}

// ── Reads ────────────────────────────────────────────────────────────────────

/// A user's receipts, newest first.
pub async fn list_receipts(pool: &DbPool, user_id: &UserId) -> Result<Vec<ReceiptRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ReceiptRow>(&format!(
        "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE user_id = ? ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(receipt_from_row).collect())
}

pub async fn get_receipt_by_id(pool: &DbPool, id: ReceiptId) -> Result<Option<ReceiptRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, ReceiptRow>(&format!(
        "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE id = ?"
    ))
    .bind(id.0)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(receipt_from_row))
}

/// Items of one receipt in the order they were printed.
pub async fn get_receipt_items(pool: &DbPool, id: ReceiptId) -> Result<Vec<ReceiptItemRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM receipt_items WHERE receipt_id = ? ORDER BY id"
    ))
    .bind(id.0)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(item_from_row).collect())
}

/// Sum of receipt totals for a user; zero when they have none.
pub async fn total_spent(pool: &DbPool, user_id: &UserId) -> Result<Money, sqlx::Error> {
    let (cents,): (i64,) =
        sqlx::query_as("SELECT COALESCE(SUM(total_cents), 0) FROM receipts WHERE user_id = ?")
            .bind(user_id.as_str())
            .fetch_one(pool)
            .await?;

    Ok(Money::from_cents(cents))
}

/// Item names ranked by total quantity bought.
pub async fn most_bought_items(
    pool: &DbPool,
    user_id: &UserId,
    limit: i64,
) -> Result<Vec<MostBoughtItem>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, i64, i64)>(
        r#"
        SELECT name, SUM(qty) AS times_bought, SUM(total_price_cents) AS total_spent_cents
        FROM receipt_items
        WHERE user_id = ?
        GROUP BY name
        ORDER BY times_bought DESC, name ASC
        LIMIT ?
        "#,
    )
    .bind(user_id.as_str())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, times_bought, cents)| MostBoughtItem {
            name,
            times_bought,
            total_spent: Money::from_cents(cents),
        })
        .collect())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
