//! End-to-end pipeline tests
//!
//! These run the plugin against fake tool scripts, so they need a POSIX
//! shell and are serialized to keep script installation and execution from
//! racing with other tests.

#![cfg(unix)]

mod backup;
mod dry_run;
mod estimate;
