pub mod db;

pub use db::{
    create_db, delete_receipt, get_receipt_by_id, get_receipt_items, insert_receipt,
    list_receipts, most_bought_items, total_spent, DbPool, DeleteOutcome, MostBoughtItem,
    ReceiptItemRecord, ReceiptRecord, MOST_BOUGHT_LIMIT,
};
