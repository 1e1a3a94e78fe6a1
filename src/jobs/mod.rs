//! Background maintenance jobs over the WAL.
//!
//! Two jobs run on independent timers: recovery replays failed entries into
//! the downstream indexes, cleanup purges applied entries past retention and
//! compacts the log. Both can also be triggered manually through the admin
//! API.

pub mod cleanup;
pub mod recovery;
pub mod scheduler;

pub use cleanup::CleanupStats;
pub use recovery::RecoveryStats;
pub use scheduler::JobScheduler;
