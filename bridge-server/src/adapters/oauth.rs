//! OAuth2 client-credentials token 缓存
//!
//! 进程内单例缓存：持有 tokio Mutex 保证并发请求下只有一次
//! token 交换（single-flight），其余请求等待并复用结果。
//! 过期时间按 `expires_in - 60s` 提前计算，避免临界过期。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use shared::{AppError, AppResult, util::now_millis};
use tokio::sync::Mutex;

/// token 端点响应
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    /// 有效期（秒）
    pub expires_in: u64,
}

/// token 交换器
///
/// 抽出接口便于测试注入假实现
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self) -> AppResult<TokenResponse>;
}

/// 通过 HTTP 调用 token 端点的交换器
pub struct HttpTokenExchanger {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl HttpTokenExchanger {
    pub fn new(
        client: reqwest::Client,
        token_url: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            client,
            token_url,
            client_id,
            client_secret,
        }
    }
}

#[async_trait]
impl TokenExchanger for HttpTokenExchanger {
    async fn exchange(&self) -> AppResult<TokenResponse> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::token_exchange(format!("token endpoint unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(AppError::token_exchange(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AppError::token_exchange(format!("invalid token response: {e}")))
    }
}

struct CachedToken {
    access_token: String,
    /// Unix millis，已扣除安全余量
    expires_at: i64,
}

/// 进程内 token 缓存
pub struct OAuthTokenCache {
    exchanger: Arc<dyn TokenExchanger>,
    slot: Mutex<Option<CachedToken>>,
}

/// 提前过期的安全余量（秒）
const EXPIRY_MARGIN_SECS: u64 = 60;

impl OAuthTokenCache {
    pub fn new(exchanger: Arc<dyn TokenExchanger>) -> Self {
        Self {
            exchanger,
            slot: Mutex::new(None),
        }
    }

    /// 获取有效 token，缓存命中直接返回，否则交换并缓存
    ///
    /// 锁覆盖整个交换过程，并发调用只触发一次交换。
    /// 交换失败不缓存，下次调用重试。
    pub async fn token(&self) -> AppResult<String> {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref()
            && now_millis() < cached.expires_at
        {
            return Ok(cached.access_token.clone());
        }

        let response = self.exchanger.exchange().await?;
        let lifetime = response.expires_in.saturating_sub(EXPIRY_MARGIN_SECS);
        *slot = Some(CachedToken {
            access_token: response.access_token.clone(),
            expires_at: now_millis() + (lifetime as i64) * 1000,
        });

        tracing::debug!(expires_in = response.expires_in, "oauth token refreshed");
        Ok(response.access_token)
    }

    /// 丢弃当前缓存，下次调用强制刷新
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingExchanger {
        calls: AtomicU32,
        expires_in: u64,
    }

    impl CountingExchanger {
        fn new(expires_in: u64) -> Self {
            Self {
                calls: AtomicU32::new(0),
                expires_in,
            }
        }
    }

    #[async_trait]
    impl TokenExchanger for CountingExchanger {
        async fn exchange(&self) -> AppResult<TokenResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(TokenResponse {
                access_token: format!("token-{n}"),
                token_type: "Bearer".to_string(),
                expires_in: self.expires_in,
            })
        }
    }

    struct FailingExchanger;

    #[async_trait]
    impl TokenExchanger for FailingExchanger {
        async fn exchange(&self) -> AppResult<TokenResponse> {
            Err(AppError::token_exchange("boom"))
        }
    }

    #[tokio::test]
    async fn test_token_is_cached_until_expiry() {
        let exchanger = Arc::new(CountingExchanger::new(3600));
        let cache = OAuthTokenCache::new(exchanger.clone());

        assert_eq!(cache.token().await.unwrap(), "token-1");
        assert_eq!(cache.token().await.unwrap(), "token-1");
        assert_eq!(exchanger.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_short_lived_token_refreshes() {
        // expires_in == margin 时有效期归零，每次调用都刷新
        let exchanger = Arc::new(CountingExchanger::new(EXPIRY_MARGIN_SECS));
        let cache = OAuthTokenCache::new(exchanger.clone());

        assert_eq!(cache.token().await.unwrap(), "token-1");
        assert_eq!(cache.token().await.unwrap(), "token-2");
        assert_eq!(exchanger.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let exchanger = Arc::new(CountingExchanger::new(3600));
        let cache = OAuthTokenCache::new(exchanger.clone());

        assert_eq!(cache.token().await.unwrap(), "token-1");
        cache.invalidate().await;
        assert_eq!(cache.token().await.unwrap(), "token-2");
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache = OAuthTokenCache::new(Arc::new(FailingExchanger));
        assert!(cache.token().await.is_err());
        // 失败不落缓存，仍可重试
        assert!(cache.token().await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_requests_single_flight() {
        let exchanger = Arc::new(CountingExchanger::new(3600));
        let cache = Arc::new(OAuthTokenCache::new(exchanger.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.token().await.unwrap() }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), "token-1");
        }
        assert_eq!(exchanger.calls.load(Ordering::SeqCst), 1);
    }
}
