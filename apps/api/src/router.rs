use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use appointment_cell::services::{AppointmentBookingService, AppointmentRepository};
use schedule_cell::router::schedule_routes;
use schedule_cell::services::{AvailabilityService, ScheduleService};
use schedule_cell::ScheduleState;
use shared_config::AppConfig;
use triage_cell::router::triage_routes;
use triage_cell::services::TriageService;

/// Every service of the scheduling core, wired over one shared store.
pub struct ClinicServices {
    pub schedules: Arc<ScheduleService>,
    pub availability: Arc<AvailabilityService>,
    pub booking: Arc<AppointmentBookingService>,
    pub triage: Arc<TriageService>,
}

impl ClinicServices {
    pub fn new(config: &AppConfig) -> Self {
        let schedules = Arc::new(ScheduleService::new());
        let appointments = Arc::new(AppointmentRepository::new());
        let availability = Arc::new(AvailabilityService::new(
            config,
            schedules.clone(),
            appointments.clone(),
        ));
        let booking = Arc::new(AppointmentBookingService::new(
            config,
            appointments,
            availability.clone(),
        ));
        let triage = Arc::new(TriageService::new(config, booking.clone(), availability.clone()));

        Self { schedules, availability, booking, triage }
    }
}

pub fn create_router(config: Arc<AppConfig>) -> Router {
    let services = ClinicServices::new(&config);

    let schedule_state = Arc::new(ScheduleState {
        schedules: services.schedules.clone(),
        availability: services.availability.clone(),
    });

    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/schedules", schedule_routes(schedule_state))
        .nest("/appointments", appointment_routes(services.booking.clone()))
        .nest("/triage", triage_routes(services.triage.clone()))
}
