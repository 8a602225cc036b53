mod retry;
mod wallet;

pub use retry::{retry_read, RetryConfig};
pub use wallet::{Balance, TransferReceipt, XmrWallet};
