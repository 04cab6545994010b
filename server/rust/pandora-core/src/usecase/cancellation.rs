use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Cancelled は呼び出し元のコンテキストがキャンセルされたことを表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// ctx がキャンセルされた時点で fut を破棄し `Cancelled` を返す。
/// キャンセル済みの ctx では fut を一度もポーリングしない。
pub async fn run_cancellable<F>(ctx: &CancellationToken, fut: F) -> Result<F::Output, Cancelled>
where
    F: Future,
{
    tokio::select! {
        biased;
        () = ctx.cancelled() => Err(Cancelled),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_completes_when_not_cancelled() {
        let ctx = CancellationToken::new();
        let out = run_cancellable(&ctx, async { 42 }).await;
        assert_eq!(out, Ok(42));
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_future() {
        let ctx = CancellationToken::new();
        ctx.cancel();
        let polled = AtomicBool::new(false);
        let out = run_cancellable(&ctx, async {
            polled.store(true, Ordering::SeqCst);
        })
        .await;
        assert_eq!(out, Err(Cancelled));
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancel_while_pending() {
        let ctx = CancellationToken::new();
        let child = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            child.cancel();
        });
        let out = run_cancellable(&ctx, std::future::pending::<()>()).await;
        assert_eq!(out, Err(Cancelled));
    }
}
