pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    Appointment, AppointmentStatus, BookAppointmentRequest, BookingError, DaySlots, SlotStatus,
    SlotView,
};
pub use router::booking_routes;
pub use services::{slot_holds, BookingService, SlotHoldRegistry};
