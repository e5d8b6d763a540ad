pub mod recurrence;
pub mod schedule;
pub mod availability;

pub use recurrence::RecurrenceResolver;
pub use schedule::ScheduleService;
pub use availability::{AvailabilityService, BookedSlotSource, ClinicClock};
