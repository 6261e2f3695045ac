//! Domain models shared by the API, pipeline and scheduler

pub mod medicine;
pub mod schedule;
pub mod timing;

pub use medicine::Medicine;
pub use schedule::{NewSchedule, ScheduleChanges};
pub use timing::{capitalize, filter_valid_timings, Timing};
