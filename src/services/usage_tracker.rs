//! 用量统计服务 - 业务能力层
//!
//! 负责把每次调用的 token 用量和估算费用累加到 JSON 账本文件。
//!
//! - 一个实例对应一个账本文件，由顶层调用方创建并通过 `Arc` 注入
//! - 读-改-写-落盘整个过程持有同一把锁，同一进程内的记录互不覆盖
//! - 落盘先写临时文件再重命名
//! - 读写失败只记录警告，不影响出题
//!
//! 不提供跨进程锁，多个进程共用同一个账本文件是不安全的。

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LedgerError;
use crate::models::{Pricing, TokenUsage, UsageLedger};

pub struct UsageTracker {
    path: PathBuf,
    pricing: Pricing,
    lock: Mutex<()>,
}

impl UsageTracker {
    pub fn new(path: impl Into<PathBuf>, pricing: Pricing) -> Self {
        Self {
            path: path.into(),
            pricing,
            lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.usage_stats_file.clone(),
            Pricing {
                input_per_million: config.input_cost_per_million,
                output_per_million: config.output_cost_per_million,
            },
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 记录一次用量
    ///
    /// 成功时返回更新后的账本；失败时记录警告并返回 `None`。
    pub async fn record(
        &self,
        input_tokens: u64,
        output_tokens: u64,
        is_new_document: bool,
    ) -> Option<UsageLedger> {
        let usage = TokenUsage::new(input_tokens, output_tokens);
        match self.try_record(usage, is_new_document).await {
            Ok(ledger) => Some(ledger),
            Err(e) => {
                warn!("⚠️ 用量记录失败: {}", e);
                None
            }
        }
    }

    /// 与 [`record`](Self::record) 相同，但把失败原因交给调用方
    pub async fn try_record(
        &self,
        usage: TokenUsage,
        is_new_document: bool,
    ) -> Result<UsageLedger, LedgerError> {
        let _guard = self.lock.lock().await;

        let mut ledger = self.load().await?;
        ledger.apply(usage, is_new_document, &self.pricing);
        ledger.last_updated = Some(chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string());
        self.persist(&ledger).await?;

        debug!(
            "用量已记录: +{} 输入 / +{} 输出，累计 {} tokens，约 ${:.4}",
            usage.input_tokens, usage.output_tokens, ledger.tokens.total, ledger.costs.total_usd_est
        );
        Ok(ledger)
    }

    /// 读取当前账本（文件不存在时返回零值账本）
    pub async fn snapshot(&self) -> Result<UsageLedger, LedgerError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn load(&self) -> Result<UsageLedger, LedgerError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("账本不存在，初始化: {}", self.path.display());
                return Ok(UsageLedger::default());
            }
            Err(source) => {
                return Err(LedgerError::ReadFailed {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| LedgerError::Corrupted {
            path: self.path.display().to_string(),
            source,
        })
    }

    async fn persist(&self, ledger: &UsageLedger) -> Result<(), LedgerError> {
        let write_failed = |source| LedgerError::WriteFailed {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
        }

        let json = serde_json::to_string_pretty(ledger).map_err(|source| LedgerError::Corrupted {
            path: self.path.display().to_string(),
            source,
        })?;

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, json).await.map_err(write_failed)?;
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(write_failed)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn tracker_in(dir: &tempfile::TempDir) -> UsageTracker {
        UsageTracker::new(dir.path().join("data").join("usage_stats.json"), Pricing::default())
    }

    #[tokio::test]
    async fn test_first_record_creates_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);

        let ledger = tracker.record(100, 50, false).await.unwrap();
        assert_eq!(ledger.tokens.input, 100);
        assert_eq!(ledger.total_api_calls, 1);
        assert!(ledger.last_updated.is_some());
        assert!(tracker.path().exists());
    }

    #[tokio::test]
    async fn test_records_are_additive() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);

        tracker.record(1_000, 200, false).await.unwrap();
        tracker.record(3_000, 800, false).await.unwrap();
        let ledger = tracker.record(0, 0, true).await.unwrap();

        assert_eq!(ledger.tokens.input, 4_000);
        assert_eq!(ledger.tokens.output, 1_000);
        assert_eq!(ledger.tokens.total, 5_000);
        assert_eq!(ledger.total_api_calls, 2);
        assert_eq!(ledger.total_documents_processed, 1);

        let expected_cost = 4_000.0 / 1e6 * 2.5 + 1_000.0 / 1e6 * 10.0;
        assert!((ledger.costs.total_usd_est - expected_cost).abs() < 1e-12);
        assert!(
            (ledger.costs.avg_cost_per_doc
                - ledger.costs.total_usd_est / ledger.total_documents_processed as f64)
                .abs()
                < 1e-12
        );
    }

    #[tokio::test]
    async fn test_ledger_survives_new_tracker_instance() {
        let dir = tempfile::tempdir().unwrap();
        tracker_in(&dir).record(10, 10, true).await.unwrap();

        let reopened = tracker_in(&dir);
        let ledger = reopened.snapshot().await.unwrap();
        assert_eq!(ledger.total_documents_processed, 1);
        assert_eq!(ledger.tokens.total, 20);
    }

    #[tokio::test]
    async fn test_concurrent_records_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = Arc::new(tracker_in(&dir));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let tracker = tracker.clone();
                tokio::spawn(async move { tracker.record(10, 5, false).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }

        let ledger = tracker.snapshot().await.unwrap();
        assert_eq!(ledger.total_api_calls, 20);
        assert_eq!(ledger.tokens.input, 200);
        assert_eq!(ledger.tokens.output, 100);
    }

    #[tokio::test]
    async fn test_corrupted_ledger_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);
        std::fs::create_dir_all(tracker.path().parent().unwrap()).unwrap();
        std::fs::write(tracker.path(), "{ not json").unwrap();

        assert!(tracker.record(1, 1, false).await.is_none());
        assert!(matches!(
            tracker.snapshot().await,
            Err(LedgerError::Corrupted { .. })
        ));
    }

    #[tokio::test]
    async fn test_persisted_file_uses_ledger_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker_in(&dir);
        tracker.record(5, 5, true).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(tracker.path()).unwrap()).unwrap();
        assert_eq!(raw["total_documents_processed"], 1);
        assert_eq!(raw["tokens"]["total"], 10);
        assert!(raw["costs"]["total_usd_est"].is_number());
        assert!(raw["last_updated"].is_string());
    }
}
