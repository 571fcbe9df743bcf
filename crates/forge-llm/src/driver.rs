//! LLM Driver — component F. A synchronous capability facade over any
//! `LlmProvider`: the engine calls `LlmDriver::call` and gets back text,
//! tokens, and cost; it never sees a stream. Internally the driver calls
//! the provider's streaming `complete_stream`, accumulates `StreamDelta`s
//! to a final string and usage total, then hands the accumulated result to
//! `forge-audit` before returning — a genuinely useful
//! chunk-accumulation logic stays intact underneath this facade.

use std::sync::Arc;

use futures::StreamExt;

use forge_audit::{AuditRecord, AuditTrail, BudgetAudit};
use forge_core::error::{ForgeError, Result};
use forge_core::ids::TaskId;
use forge_core::types::TokenUsage;

use crate::provider::LlmProvider;
use crate::types::{LlmMessage, LlmRequest, StreamDelta};

#[derive(Clone, Debug)]
pub struct LlmCallResult {
    pub text: String,
    pub tokens: TokenUsage,
}

pub struct LlmDriver {
    provider: Arc<dyn LlmProvider>,
    model: String,
    budget: Arc<BudgetAudit>,
    trail: Arc<AuditTrail>,
    /// USD per 1K input/output tokens; `None` disables cost accounting
    /// (e.g. for a local/free provider in tests).
    cost_rates: Option<(f64, f64)>,
}

impl LlmDriver {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        budget: Arc<BudgetAudit>,
        trail: Arc<AuditTrail>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            budget,
            trail,
            cost_rates: None,
        }
    }

    pub fn with_cost_rates(mut self, input_per_1k: f64, output_per_1k: f64) -> Self {
        self.cost_rates = Some((input_per_1k, output_per_1k));
        self
    }

    /// `call(system, user, phase) -> {text, tokens, cost_usd}`. Consults
    /// the budget before sending (fatal on exceeded) and records an audit
    /// entry plus the spent tokens before returning.
    pub async fn call(
        &self,
        task_id: &TaskId,
        system: &str,
        user: &str,
        phase: &str,
    ) -> Result<LlmCallResult> {
        if !self.budget.check(task_id).is_ok() {
            return Err(ForgeError::BudgetExceeded(format!(
                "task {task_id} over budget before phase {phase}"
            )));
        }

        let request = LlmRequest {
            model: self.model.clone(),
            messages: vec![LlmMessage::user(user)],
            system: Some(system.to_string()),
            ..Default::default()
        };

        let stream = self
            .provider
            .complete_stream(request, None)
            .await
            .map_err(|e| ForgeError::LlmFailed(e.to_string()))?;

        let (text, mut tokens) = accumulate(stream).await?;
        tokens.cost_usd = self.cost_usd(tokens.input_tokens, tokens.output_tokens);

        self.budget.record(task_id, tokens.total_tokens);
        self.trail.record(AuditRecord::new(
            task_id.clone(),
            "llm-driver",
            phase,
            user,
            &text,
            Vec::new(),
            format!("{}:{}", self.provider.name(), self.model),
        ));

        if !self.budget.check(task_id).is_ok() {
            tracing::warn!(%task_id, phase, "task crossed budget limit during this call");
        }

        Ok(LlmCallResult { text, tokens })
    }

    fn cost_usd(&self, input_tokens: u64, output_tokens: u64) -> Option<f64> {
        let (input_rate, output_rate) = self.cost_rates?;
        Some((input_tokens as f64 / 1000.0) * input_rate + (output_tokens as f64 / 1000.0) * output_rate)
    }
}

async fn accumulate(
    mut stream: crate::provider::LlmStream,
) -> Result<(String, TokenUsage)> {
    let mut text = String::new();
    let mut usage = TokenUsage::default();

    while let Some(delta) = stream.next().await {
        match delta.map_err(|e| ForgeError::LlmFailed(e.to_string()))? {
            StreamDelta::Text(chunk) => text.push_str(&chunk),
            StreamDelta::Done { usage: Some(u), .. } => {
                usage = TokenUsage::new(u.input_tokens as u64, u.output_tokens as u64);
            }
            StreamDelta::Done { usage: None, .. } => {}
            StreamDelta::Error(message) => return Err(ForgeError::LlmFailed(message)),
        }
    }

    Ok((text, usage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{LlmError, LlmResult, LlmStream};
    use crate::types::Usage;
    use tokio_util::sync::CancellationToken;

    struct StubProvider {
        reply: &'static str,
        input_tokens: u32,
        output_tokens: u32,
    }

    #[async_trait::async_trait]
    impl LlmProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn models(&self) -> &[&str] {
            &["stub-model"]
        }

        async fn complete_stream(
            &self,
            _request: LlmRequest,
            _cancel: Option<CancellationToken>,
        ) -> LlmResult<LlmStream> {
            let reply = self.reply.to_string();
            let input_tokens = self.input_tokens;
            let output_tokens = self.output_tokens;
            let stream = async_stream::stream! {
                yield Ok(StreamDelta::Text(reply));
                yield Ok(StreamDelta::Done {
                    stop_reason: Some("end_turn".to_string()),
                    usage: Some(Usage { input_tokens, output_tokens }),
                });
            };
            Ok(Box::pin(stream))
        }
    }

    fn driver(reply: &'static str, input_tokens: u32, output_tokens: u32) -> LlmDriver {
        let provider: Arc<dyn LlmProvider> = Arc::new(StubProvider {
            reply,
            input_tokens,
            output_tokens,
        });
        LlmDriver::new(
            provider,
            "stub-model",
            Arc::new(BudgetAudit::new(10_000, None)),
            Arc::new(AuditTrail::new()),
        )
        .with_cost_rates(0.003, 0.015)
    }

    #[tokio::test]
    async fn accumulates_text_and_usage_from_the_stream() {
        let driver = driver("hello world", 100, 50);
        let result = driver.call(&"t1".into(), "sys", "usr", "execution").await.unwrap();
        assert_eq!(result.text, "hello world");
        assert_eq!(result.tokens.total_tokens, 150);
    }

    #[tokio::test]
    async fn records_tokens_against_the_task_budget() {
        let driver = driver("ok", 200, 100);
        let task: TaskId = "t1".into();
        driver.call(&task, "sys", "usr", "planning").await.unwrap();
        assert_eq!(driver.budget.task_tokens_used(&task), 300);
    }

    #[tokio::test]
    async fn rejects_calls_once_budget_is_exhausted() {
        let driver = driver("ok", 1, 1);
        let task: TaskId = "t1".into();
        driver.budget.record(&task, 10_000);
        let result = driver.call(&task, "sys", "usr", "planning").await;
        assert!(matches!(result, Err(ForgeError::BudgetExceeded(_))));
    }

    #[test]
    fn cost_rates_compute_expected_usd() {
        let driver = driver("ok", 1, 1);
        let cost = driver.cost_usd(1000, 1000).unwrap();
        assert!((cost - 0.018).abs() < 1e-9);
    }
}
