pub mod environment_service_repository;
pub mod project_service_repository;
pub mod reservation_repository;

pub use environment_service_repository::EnvironmentServiceRepository;
pub use project_service_repository::ProjectServiceRepository;
pub use reservation_repository::ReservationRepository;
