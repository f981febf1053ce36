//! Grove Round Records
//!
//! The persistence boundary for battle rounds.
//!
//! - **Records**: immutable [`RoundRecord`]s, one per simulation run
//! - **Store**: append-only [`RoundStore`], RocksDB-backed or in-memory
//! - **Winner log**: append-only human-readable winner lines
//!
//! # Example
//!
//! ```no_run
//! use grove_rounds::{NewRound, RocksRoundStore, RoundStore};
//!
//! # fn run() -> grove_rounds::Result<()> {
//! let store = RocksRoundStore::open("./grove-data/rounds")?;
//! let players = vec!["alice".to_string(), "bob".to_string()];
//! let outcome = grove_arena::simulate(&players, "seed");
//! let saved = store.append(NewRound::from_outcome("seed", players, outcome))?;
//! assert_eq!(store.latest()?.map(|r| r.id), Some(saved.id));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod record;
pub mod store;
pub mod winner_log;

pub use error::{Error, Result};
pub use record::{NewRound, RoundRecord};
pub use store::{MemoryRoundStore, RocksRoundStore, RoundStore};
pub use winner_log::{FileWinnerLog, WinnerLine, WinnerSink};
