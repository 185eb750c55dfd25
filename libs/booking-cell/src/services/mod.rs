pub mod booking;
pub mod conflict;
pub mod holds;
pub mod lifecycle;
pub mod notify;

pub use booking::BookingService;
pub use conflict::ConflictDetectionService;
pub use holds::{slot_holds, SlotHoldRegistry};
pub use lifecycle::AppointmentLifecycleService;
pub use notify::NotificationService;
