pub mod reservation_grpc;
pub mod tonic_service;

pub use reservation_grpc::{GrpcError, ReservationGrpcService, ReservationParams, ReserveParams};
pub use tonic_service::ReservationServiceTonic;
