pub mod triage;

pub use triage::TriageService;
