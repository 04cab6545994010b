// proto 生成コードをインクルード。
// prost-build (tonic-build) によって生成されたファイルを使用。

#[allow(clippy::all, clippy::pedantic)]
pub mod pandora {
    pub mod v1 {
        include!("pandora.v1.rs");
    }
}
