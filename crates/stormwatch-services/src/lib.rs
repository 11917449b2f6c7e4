pub mod check;
pub mod record;
pub mod watch;

pub use check::{AlertCheck, CheckOutcome, ForecastHit, ForecastMode};
pub use record::{JsonFileStore, MemoryStore, UserRecord, UserRecordStore};
pub use watch::{watch, WatchStats};
