pub mod environment_service;
pub mod project_service;
pub mod reservation;
pub mod reset_report;

pub use environment_service::{EnvironmentService, EnvironmentServiceReset};
pub use project_service::{Project, ProjectService, ResetFrequency, UNLIMITED};
pub use reservation::Reservation;
pub use reset_report::{ProjectResetReport, ServiceResetFailure};
