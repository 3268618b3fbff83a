//! 用量账本
//!
//! 持久化到 JSON 文件的累计统计，字段名即文件格式：
//!
//! ```json
//! {
//!   "total_documents_processed": 0,
//!   "total_api_calls": 0,
//!   "tokens": { "input": 0, "output": 0, "total": 0 },
//!   "costs": { "total_usd_est": 0.0, "avg_cost_per_doc": 0.0 },
//!   "last_updated": null
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::models::usage::TokenUsage;

/// 每百万 token 的估算单价（美元）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            input_per_million: 2.50,
            output_per_million: 10.00,
        }
    }
}

impl Pricing {
    pub fn cost(&self, usage: TokenUsage) -> f64 {
        (usage.input_tokens as f64 / 1_000_000.0) * self.input_per_million
            + (usage.output_tokens as f64 / 1_000_000.0) * self.output_per_million
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTotals {
    pub input: u64,
    pub output: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostTotals {
    pub total_usd_est: f64,
    pub avg_cost_per_doc: f64,
}

/// 累计用量
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageLedger {
    pub total_documents_processed: u64,
    pub total_api_calls: u64,
    pub tokens: TokenTotals,
    pub costs: CostTotals,
    pub last_updated: Option<String>,
}

impl UsageLedger {
    /// 累加一次调用（或一次文档完成事件）
    ///
    /// 只有记录到 token 时才计为一次 API 调用；
    /// 只有 `is_new_document` 时才增加文档数。
    pub fn apply(&mut self, usage: TokenUsage, is_new_document: bool, pricing: &Pricing) {
        self.tokens.input += usage.input_tokens;
        self.tokens.output += usage.output_tokens;
        self.tokens.total += usage.total();

        if !usage.is_zero() {
            self.total_api_calls += 1;
        }
        if is_new_document {
            self.total_documents_processed += 1;
        }

        self.costs.total_usd_est += pricing.cost(usage);
        if self.total_documents_processed > 0 {
            self.costs.avg_cost_per_doc =
                self.costs.total_usd_est / self.total_documents_processed as f64;
        }
    }
}
