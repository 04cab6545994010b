pub mod cancellation;
pub mod commit_reservation;
pub mod reserve_quota;
pub mod reset_due_quotas;
pub mod rollback_reservation;

pub use commit_reservation::{CommitReservationError, CommitReservationUseCase};
pub use reserve_quota::{ReserveQuotaError, ReserveQuotaUseCase};
pub use reset_due_quotas::{ResetDueQuotasError, ResetDueQuotasOutput, ResetDueQuotasUseCase};
pub use rollback_reservation::{RollbackReservationError, RollbackReservationUseCase};
