//! Shared test harness modules for the sync binaries.

mod helpers;
mod quality_unit;
