//! Repair Loop.
//!
//! Generates SQL for a question, executes it, and on an execution error asks
//! the model for a corrected query, up to a fixed attempt ceiling. Execution
//! errors are data here; only generation faults can surface as `Err`.

use crate::error::{AssistantError, Result};
use crate::executor::{ExecutionOutcome, QueryExecutor, QueryRows};
use crate::llm::generator::QueryGenerator;
use crate::llm::prompts::repair_prompt;
use crate::schema::SchemaDescription;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::time::sleep;

/// How generation faults are treated inside the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    /// The first generation fault propagates as [`AssistantError::Generation`];
    /// a fault while generating a repair aborts with
    /// [`AssistantError::Suggestion`].
    #[default]
    Asymmetric,
    /// Generation faults consume an attempt and are retried after the backoff,
    /// exactly like execution errors.
    Symmetric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RepairEvent {
    Generating,
    Repairing { attempt: usize },
    GenerationFailed { attempt: usize, error: String },
    Executing { attempt: usize },
    ExecutionFailed { attempt: usize, error: String },
    Succeeded { attempt: usize, row_count: usize },
    Exhausted { attempts: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RepairOutcome {
    Success {
        rows: QueryRows,
        query: String,
        attempts: usize,
    },
    /// The attempt budget ran out without a successful execution. This is a
    /// normal terminal state, not a fault.
    Exhausted { attempts: usize, last_error: String },
}

#[derive(Debug, Clone)]
pub struct RepairLoop {
    max_attempts: usize,
    backoff: Duration,
    policy: RetryPolicy,
}

impl Default for RepairLoop {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(crate::config::DEFAULT_BACKOFF_MS),
        )
    }
}

impl RepairLoop {
    pub fn new(max_attempts: usize, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            policy: RetryPolicy::default(),
        }
    }

    pub fn from_config(config: &crate::config::RepairConfig) -> Self {
        Self::new(config.max_attempts, config.backoff()).with_policy(config.retry_policy)
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn run<G, E>(
        &self,
        generator: &G,
        executor: &E,
        question: &str,
        system_prompt: &str,
        schema: &SchemaDescription,
        progress: Option<&Sender<RepairEvent>>,
    ) -> Result<RepairOutcome>
    where
        G: QueryGenerator + ?Sized,
        E: QueryExecutor + ?Sized,
    {
        let mut prompt = system_prompt.to_string();
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            let event = if attempt == 1 {
                RepairEvent::Generating
            } else {
                RepairEvent::Repairing { attempt }
            };
            send_event(progress, event).await;

            let query = match self.generate_step(generator, question, &prompt, attempt).await {
                Ok(query) => query,
                Err(e) => match self.policy {
                    RetryPolicy::Asymmetric => return Err(e),
                    RetryPolicy::Symmetric => {
                        warn!("Attempt {} could not generate a query: {}", attempt, e);
                        last_error = e.to_string();
                        send_event(
                            progress,
                            RepairEvent::GenerationFailed {
                                attempt,
                                error: last_error.clone(),
                            },
                        )
                        .await;
                        self.pause_before(attempt).await;
                        continue;
                    }
                },
            };

            debug!("Attempt {} executing: {}", attempt, query);
            send_event(progress, RepairEvent::Executing { attempt }).await;

            match executor.execute(&query, &[]).await {
                ExecutionOutcome::Rows(rows) => {
                    info!(
                        "Query executed successfully on attempt {} ({} rows)",
                        attempt,
                        rows.len()
                    );
                    send_event(
                        progress,
                        RepairEvent::Succeeded {
                            attempt,
                            row_count: rows.len(),
                        },
                    )
                    .await;
                    return Ok(RepairOutcome::Success {
                        rows,
                        query,
                        attempts: attempt,
                    });
                }
                ExecutionOutcome::Failed { message } => {
                    warn!("Attempt {} failed: {}", attempt, message);
                    send_event(
                        progress,
                        RepairEvent::ExecutionFailed {
                            attempt,
                            error: message.clone(),
                        },
                    )
                    .await;
                    prompt = repair_prompt(question, &query, None, &message, schema);
                    last_error = message;
                    self.pause_before(attempt).await;
                }
            }
        }

        warn!(
            "All {} attempts failed. No answer could be obtained for this question.",
            self.max_attempts
        );
        send_event(
            progress,
            RepairEvent::Exhausted {
                attempts: self.max_attempts,
            },
        )
        .await;
        Ok(RepairOutcome::Exhausted {
            attempts: self.max_attempts,
            last_error,
        })
    }

    async fn generate_step<G>(
        &self,
        generator: &G,
        question: &str,
        prompt: &str,
        attempt: usize,
    ) -> Result<String>
    where
        G: QueryGenerator + ?Sized,
    {
        let generated = generator.generate(question, prompt).await;
        match (attempt, generated) {
            (1, Ok(query)) if query.trim().is_empty() => Err(AssistantError::EmptyGeneration),
            (1, result) => result,
            (_, Ok(query)) if query.trim().is_empty() => Err(AssistantError::Suggestion(
                "No suggestions received from the error resolution API.".to_string(),
            )),
            (_, Ok(query)) => {
                info!("Received a suggested query: {}", query);
                Ok(query)
            }
            (_, Err(e)) => Err(AssistantError::Suggestion(e.to_string())),
        }
    }

    // No wait after the final attempt.
    async fn pause_before(&self, attempt: usize) {
        if attempt < self.max_attempts && !self.backoff.is_zero() {
            sleep(self.backoff).await;
        }
    }
}

async fn send_event(sender: Option<&Sender<RepairEvent>>, event: RepairEvent) {
    if let Some(tx) = sender {
        let _ = tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{CellValue, QueryRows};
    use crate::schema::schema_description;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedGenerator {
        replies: Mutex<VecDeque<std::result::Result<String, String>>>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<std::result::Result<&str, &str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(String::from).map_err(String::from))
                        .collect(),
                ),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn always(query: &str) -> Self {
            Self::new(vec![Ok(query); 16])
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl QueryGenerator for ScriptedGenerator {
        async fn generate(&self, question: &str, system_prompt: &str) -> Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((question.to_string(), system_prompt.to_string()));
            let next = self.replies.lock().unwrap().pop_front();
            match next {
                Some(Ok(query)) => Ok(query),
                Some(Err(e)) => Err(AssistantError::Generation(e)),
                None => Err(AssistantError::Generation("script exhausted".to_string())),
            }
        }
    }

    struct ScriptedExecutor {
        outcomes: Mutex<VecDeque<ExecutionOutcome>>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedExecutor {
        fn new(outcomes: Vec<ExecutionOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self::new(
                (0..16)
                    .map(|i| ExecutionOutcome::failed(format!("no such column: c{}", i)))
                    .collect(),
            )
        }

        fn calls(&self) -> usize {
            self.queries.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl QueryExecutor for ScriptedExecutor {
        async fn execute(&self, query: &str, _params: &[CellValue]) -> ExecutionOutcome {
            self.queries.lock().unwrap().push(query.to_string());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| ExecutionOutcome::failed("script exhausted"))
        }
    }

    fn one_row() -> QueryRows {
        QueryRows {
            columns: vec!["total".to_string()],
            rows: vec![vec![CellValue::Integer(7)]],
        }
    }

    fn quick_loop(max_attempts: usize) -> RepairLoop {
        RepairLoop::new(max_attempts, Duration::ZERO)
    }

    async fn run(
        repair: &RepairLoop,
        generator: &ScriptedGenerator,
        executor: &ScriptedExecutor,
    ) -> Result<RepairOutcome> {
        repair
            .run(
                generator,
                executor,
                "How much did I spend?",
                "system prompt",
                schema_description(),
                None,
            )
            .await
    }

    #[tokio::test]
    async fn test_all_failures_bounded_by_ceiling() {
        for n in 1..=5 {
            let generator = ScriptedGenerator::always("SELECT broken");
            let executor = ScriptedExecutor::failing();
            let outcome = run(&quick_loop(n), &generator, &executor).await.unwrap();

            assert_eq!(executor.calls(), n, "executions for N={}", n);
            // One initial generation plus N-1 repairs.
            assert_eq!(generator.calls(), n, "generations for N={}", n);
            match outcome {
                RepairOutcome::Exhausted {
                    attempts,
                    last_error,
                } => {
                    assert_eq!(attempts, n);
                    assert_eq!(last_error, format!("no such column: c{}", n - 1));
                }
                other => panic!("expected exhaustion, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        for n in 1..=4 {
            let generator = ScriptedGenerator::always("SELECT 7 AS total");
            let executor = ScriptedExecutor::new(vec![ExecutionOutcome::Rows(one_row())]);
            let outcome = run(&quick_loop(n), &generator, &executor).await.unwrap();
            assert_eq!(generator.calls(), 1);
            assert_eq!(executor.calls(), 1);
            assert!(matches!(outcome, RepairOutcome::Success { attempts: 1, .. }));
        }
    }

    #[tokio::test]
    async fn test_kth_success() {
        let n = 5;
        for k in 1..n {
            let mut outcomes: Vec<ExecutionOutcome> = (1..k)
                .map(|i| ExecutionOutcome::failed(format!("error {}", i)))
                .collect();
            outcomes.push(ExecutionOutcome::Rows(one_row()));

            let generator = ScriptedGenerator::always("SELECT 7 AS total");
            let executor = ScriptedExecutor::new(outcomes);
            let outcome = run(&quick_loop(n), &generator, &executor).await.unwrap();

            assert_eq!(generator.calls(), k);
            assert_eq!(executor.calls(), k);
            match outcome {
                RepairOutcome::Success { rows, attempts, .. } => {
                    assert_eq!(attempts, k);
                    assert_eq!(rows, one_row());
                }
                other => panic!("expected success, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_repair_prompts_keep_original_question() {
        let generator = ScriptedGenerator::new(vec![
            Ok("SELECT a"),
            Ok("SELECT b"),
            Ok("SELECT c"),
        ]);
        let executor = ScriptedExecutor::failing();
        run(&quick_loop(3), &generator, &executor).await.unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert_eq!(prompts[0].1, "system prompt");
        for (question, prompt) in prompts.iter() {
            assert_eq!(question, "How much did I spend?");
            if prompt != "system prompt" {
                assert!(prompt.contains("QUESTION: How much did I spend?"));
            }
        }
        assert!(prompts[1].1.contains("SELECT a"));
        assert!(prompts[1].1.contains("no such column: c0"));
        assert!(prompts[2].1.contains("SELECT b"));
        assert!(prompts[2].1.contains("no such column: c1"));

        let queries = executor.queries.lock().unwrap();
        assert_eq!(*queries, vec!["SELECT a", "SELECT b", "SELECT c"]);
    }

    #[tokio::test]
    async fn test_initial_generation_fault_propagates() {
        let generator = ScriptedGenerator::new(vec![Err("service unavailable")]);
        let executor = ScriptedExecutor::failing();
        let err = run(&quick_loop(3), &generator, &executor).await.unwrap_err();
        assert!(matches!(err, AssistantError::Generation(_)));
        assert_eq!(executor.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_initial_generation() {
        let generator = ScriptedGenerator::new(vec![Ok("   ")]);
        let executor = ScriptedExecutor::failing();
        let err = run(&quick_loop(3), &generator, &executor).await.unwrap_err();
        assert!(matches!(err, AssistantError::EmptyGeneration));
        assert_eq!(executor.calls(), 0);
    }

    #[tokio::test]
    async fn test_repair_generation_fault_aborts() {
        let generator = ScriptedGenerator::new(vec![Ok("SELECT a"), Err("rate limited")]);
        let executor = ScriptedExecutor::failing();
        let err = run(&quick_loop(3), &generator, &executor).await.unwrap_err();
        match err {
            AssistantError::Suggestion(msg) => assert!(msg.contains("rate limited")),
            other => panic!("expected suggestion fault, got {:?}", other),
        }
        assert_eq!(executor.calls(), 1);
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_repair_aborts() {
        let generator = ScriptedGenerator::new(vec![Ok("SELECT a"), Ok("")]);
        let executor = ScriptedExecutor::failing();
        let err = run(&quick_loop(3), &generator, &executor).await.unwrap_err();
        assert!(matches!(err, AssistantError::Suggestion(_)));
        assert_eq!(executor.calls(), 1);
    }

    #[tokio::test]
    async fn test_symmetric_policy_retries_generation_faults() {
        let generator = ScriptedGenerator::new(vec![
            Err("timeout"),
            Ok("SELECT a"),
            Ok("SELECT 7 AS total"),
        ]);
        let executor = ScriptedExecutor::new(vec![
            ExecutionOutcome::failed("no such column: a"),
            ExecutionOutcome::Rows(one_row()),
        ]);
        let repair = quick_loop(3).with_policy(RetryPolicy::Symmetric);
        let outcome = run(&repair, &generator, &executor).await.unwrap();
        assert!(matches!(outcome, RepairOutcome::Success { attempts: 3, .. }));
        assert_eq!(executor.calls(), 2);
        // The prompt is reused after a generation fault.
        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts[0].1, prompts[1].1);
    }

    #[tokio::test]
    async fn test_symmetric_policy_exhausts_instead_of_raising() {
        let generator = ScriptedGenerator::new(vec![Err("down"), Err("down"), Err("down")]);
        let executor = ScriptedExecutor::failing();
        let repair = quick_loop(3).with_policy(RetryPolicy::Symmetric);
        let outcome = run(&repair, &generator, &executor).await.unwrap();
        match outcome {
            RepairOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("down"));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(executor.calls(), 0);
    }

    #[tokio::test]
    async fn test_progress_events() {
        let generator = ScriptedGenerator::always("SELECT 7 AS total");
        let executor = ScriptedExecutor::new(vec![
            ExecutionOutcome::failed("boom"),
            ExecutionOutcome::Rows(one_row()),
        ]);
        let (tx, mut rx) = tokio::sync::mpsc::channel(16);
        quick_loop(3)
            .run(
                &generator,
                &executor,
                "q",
                "p",
                schema_description(),
                Some(&tx),
            )
            .await
            .unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                RepairEvent::Generating,
                RepairEvent::Executing { attempt: 1 },
                RepairEvent::ExecutionFailed {
                    attempt: 1,
                    error: "boom".to_string()
                },
                RepairEvent::Repairing { attempt: 2 },
                RepairEvent::Executing { attempt: 2 },
                RepairEvent::Succeeded {
                    attempt: 2,
                    row_count: 1
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_backoff_between_attempts() {
        let generator = ScriptedGenerator::always("SELECT broken");
        let executor = ScriptedExecutor::failing();
        let repair = RepairLoop::new(3, Duration::from_secs(1));
        let started = tokio::time::Instant::now();
        run(&repair, &generator, &executor).await.unwrap();
        // Two waits: between attempts 1-2 and 2-3, none after the last.
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RepairLoop::new(0, Duration::ZERO).max_attempts(), 1);
        assert_eq!(RepairLoop::default().max_attempts(), 3);
        assert_eq!(RepairLoop::default().policy(), RetryPolicy::Asymmetric);
    }
}
