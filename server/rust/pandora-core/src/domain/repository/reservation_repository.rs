use async_trait::async_trait;

use crate::domain::entity::Reservation;

/// ReservationRepository は予約の永続化を担当する。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// ID で予約を取得する。
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Reservation>>;

    /// 予約レコードのみを作成する。
    async fn create(&self, reservation: &Reservation) -> anyhow::Result<()>;

    /// 予約を削除する。削除された場合 true を返す。
    async fn delete(&self, id: &str) -> anyhow::Result<bool>;

    /// 対応する `available_request` を1減算し予約を作成する（原子的）。
    /// 残量がない、または対象が存在しない場合は何も変えず false を返す。
    async fn reserve(&self, reservation: &Reservation) -> anyhow::Result<bool>;

    /// 予約を削除し、対応する `available_request` を1加算する（原子的）。
    /// 予約が既に存在しない場合は何も変えず false を返す。
    async fn rollback(&self, reservation: &Reservation) -> anyhow::Result<bool>;
}
