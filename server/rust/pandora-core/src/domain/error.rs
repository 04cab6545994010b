/// ErrorKind はユースケースエラーをトランスポート非依存に分類する。
///
/// gRPC / REST の各アダプタはこの分類だけを見てステータスを決定する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    AlreadyExists,
    RestrictionViolation,
    Unauthorized,
    Internal,
}

impl ErrorKind {
    /// REST エラーレスポンスの `code` フィールドに使う識別子。
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "SYS_PANDORA_NOT_FOUND",
            ErrorKind::Validation => "SYS_PANDORA_VALIDATION_ERROR",
            ErrorKind::AlreadyExists => "SYS_PANDORA_ALREADY_EXISTS",
            ErrorKind::RestrictionViolation => "SYS_PANDORA_RESTRICTION_VIOLATION",
            ErrorKind::Unauthorized => "SYS_PANDORA_UNAUTHORIZED",
            ErrorKind::Internal => "SYS_PANDORA_INTERNAL_ERROR",
        }
    }
}
