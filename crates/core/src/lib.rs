pub mod ids;
pub mod money;

pub use ids::{ReceiptId, UserId};
pub use money::Money;
