pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{AvailabilityWindow, DaySchedule, ExpertProfile, TherapistError};
pub use services::availability::{
    build_week_schedule, day_of_week_label, expand_day, expand_window, next_occurrence,
    slot_duration, weekday_to_day_of_week, SLOT_DURATION_MINUTES,
};
pub use services::{AvailabilityService, DirectoryService};
