use crate::domain::UserId;
use crate::error::Result;
use std::future::Future;
use tracing::warn;

/// Runs a per-user query, degrading to `fallback` instead of failing.
///
/// Without a user the query is not run at all. Errors are logged and swallowed,
/// so widgets such as the dashboard render empty rather than erroring out.
pub async fn with_user<T, F, Fut>(user: Option<UserId>, fallback: T, op: F) -> T
where
    F: FnOnce(UserId) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let Some(user_id) = user else {
        return fallback;
    };
    match op(user_id).await {
        Ok(value) => value,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "query failed, using fallback");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_no_user_skips_query() {
        let ran = AtomicBool::new(false);
        let value = with_user(None, 7, |_| async {
            ran.store(true, Ordering::SeqCst);
            Ok(1)
        })
        .await;
        assert_eq!(value, 7);
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_error_yields_fallback() {
        let value: Vec<u8> = with_user(Some(Uuid::new_v4()), vec![], |_| async {
            Err(AppError::NotFound("nothing".to_string()))
        })
        .await;
        assert!(value.is_empty());
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let user = Uuid::new_v4();
        let value = with_user(Some(user), Uuid::nil(), |id| async move { Ok(id) }).await;
        assert_eq!(value, user);
    }
}
