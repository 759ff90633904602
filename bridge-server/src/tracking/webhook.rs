//! Webhook 验签与事件去重
//!
//! 每个承运商配置独立的共享密钥。签名是对原始报文字节的
//! HMAC-SHA256（hex 编码）。重放防护由时效窗口和事件判重承担：
//! 旧报文过不了 `X-Timestamp` 窗口，窗口内的重投撞上已处理集合。
//!
//! 已处理事件 id 保存在进程内集合里，由调用方在事件入账后登记。

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use ring::hmac;
use shared::{AppError, AppResult, ErrorCode, util::now_millis};

/// 时间戳允许的最大偏差（秒）
const TIMESTAMP_WINDOW_SECS: i64 = 300;

pub struct WebhookAuthenticator {
    /// carrier code -> 共享密钥
    secrets: HashMap<String, String>,
    /// 已处理事件 id
    processed: Mutex<HashSet<String>>,
}

impl WebhookAuthenticator {
    pub fn new(secrets: HashMap<String, String>) -> Self {
        Self {
            secrets,
            processed: Mutex::new(HashSet::new()),
        }
    }

    fn secret(&self, carrier: &str) -> AppResult<&str> {
        self.secrets.get(carrier).map(String::as_str).ok_or_else(|| {
            AppError::with_message(
                ErrorCode::SecretMissing,
                format!("no webhook secret configured for carrier {carrier}"),
            )
        })
    }

    /// 校验签名与时间戳
    ///
    /// 时间戳必须是 RFC3339，偏差超过窗口判旧；签名用 ring 的
    /// 常数时间比较。
    pub fn verify(
        &self,
        carrier: &str,
        body: &[u8],
        signature_hex: &str,
        timestamp: &str,
    ) -> AppResult<()> {
        let secret = self.secret(carrier)?;

        let event_time = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|e| AppError::timestamp_stale(format!("invalid timestamp: {e}")))?
            .with_timezone(&Utc);
        let skew_secs = ((now_millis() - event_time.timestamp_millis()) / 1000).abs();
        if skew_secs > TIMESTAMP_WINDOW_SECS {
            return Err(AppError::timestamp_stale(format!(
                "timestamp outside {TIMESTAMP_WINDOW_SECS}s window (skew {skew_secs}s)"
            )));
        }

        let expected = hex::decode(signature_hex)
            .map_err(|_| AppError::signature_invalid(carrier))?;
        let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
        hmac::verify(&key, body, &expected)
            .map_err(|_| AppError::signature_invalid(carrier))
    }

    /// 生成签名（测试与本地联调用）
    pub fn sign(&self, carrier: &str, body: &[u8]) -> AppResult<String> {
        let secret = self.secret(carrier)?;
        let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
        let tag = hmac::sign(&key, body);
        Ok(hex::encode(tag.as_ref()))
    }

    /// 事件 id 是否已处理过
    pub fn is_processed(&self, event_id: &str) -> bool {
        self.processed
            .lock()
            .expect("processed-event set poisoned")
            .contains(event_id)
    }

    /// 登记已处理事件 id，首次登记返回 true
    pub fn mark_processed(&self, event_id: &str) -> bool {
        self.processed
            .lock()
            .expect("processed-event set poisoned")
            .insert(event_id.to_string())
    }

    /// 已登记事件数
    pub fn processed_count(&self) -> usize {
        self.processed
            .lock()
            .expect("processed-event set poisoned")
            .len()
    }
}
