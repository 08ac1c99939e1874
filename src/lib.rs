pub mod config;
pub mod errors;
pub mod ledger;
pub mod pool;
pub mod utils;

// Re-export commonly used items
pub use errors::{ErrorKind, LedgerError, StakingError};
pub use ledger::{Address, Amount, Role, TokenEvent, TokenLedger};
pub use pool::{PoolEvent, Position, RewardPool, Timestamp, ValueLedger};

// Re-export the fixed-point constants used in reward math
pub use pool::math::{ONE, SECONDS_PER_DAY};
