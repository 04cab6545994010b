pub mod environment_service_postgres;
pub mod project_service_postgres;
pub mod quota_store_in_memory;
pub mod reservation_postgres;

pub use environment_service_postgres::EnvironmentServicePostgresRepository;
pub use project_service_postgres::ProjectServicePostgresRepository;
pub use quota_store_in_memory::InMemoryQuotaStore;
pub use reservation_postgres::ReservationPostgresRepository;
