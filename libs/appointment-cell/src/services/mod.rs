pub mod booking;
pub mod lifecycle;
pub mod repository;

pub use booking::{AppointmentBookingService, ResourceKey};
pub use lifecycle::AppointmentLifecycleService;
pub use repository::AppointmentRepository;
