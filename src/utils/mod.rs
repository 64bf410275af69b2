pub mod command;
pub mod defaults_file;
pub mod disk;
pub mod hooks;
pub mod mysql;
pub mod streams;
pub mod xtrabackup;

// Trait-based abstractions for testability
pub mod executor;

// Re-export commonly used types and traits (used by test crate)
pub use executor::{CommandExecutor, RealExecutor};
pub use mysql::{CliConnector, MysqlClient, MysqlConnector};
pub use streams::{OutputSink, StreamMethod};
