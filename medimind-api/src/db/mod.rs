//! Database queries for medimind-api
//!
//! Schema and row decoding live in `medimind_common::db`.

pub mod prescriptions;
pub mod schedules;
pub mod users;

pub use medimind_common::db::{init_database, PrescriptionRow, ScheduleRow, UserRow};
