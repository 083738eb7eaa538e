//! Tests for the cost-gated executor

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::cost::{BYTES_PER_TIB, CustomerTier, TierLimits, TierTable};
use crate::error::QueryError;
use crate::recovery::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::recovery::backoff::ConstantBackoff;
use crate::recovery::{ErrorCategory, RetryConfig, RetryPolicy};
use crate::warehouse::{MockQueryService, QueryParam, QueryService, ResultSet, WarehouseError};

fn retry(max_retries: u32) -> Arc<RetryPolicy> {
    Arc::new(
        RetryPolicy::with_config(RetryConfig::default().with_max_retries(max_retries))
            .with_backoff(ConstantBackoff::new(Duration::from_millis(1))),
    )
}

fn breaker(threshold: u32) -> Arc<CircuitBreaker> {
    Arc::new(CircuitBreaker::with_config(
        "warehouse",
        CircuitBreakerConfig::default().with_failure_threshold(threshold),
    ))
}

fn executor(service: impl QueryService + 'static) -> CostGatedExecutor {
    CostGatedExecutor::new(
        Arc::new(service),
        breaker(5),
        retry(3),
        ExecutorSettings::default(),
    )
}

fn cheap_mock() -> MockQueryService {
    let mut mock = MockQueryService::new();
    mock.expect_estimate_cost().returning(|_| Ok(1024));
    mock
}

#[tokio::test]
async fn test_three_terabytes_rejected_under_standard_cap() {
    let mut mock = MockQueryService::new();
    mock.expect_estimate_cost()
        .returning(|_| Ok(3 * BYTES_PER_TIB));
    mock.expect_execute().never();

    let executor = executor(mock);
    let err = executor
        .execute(
            &QueryRequest::new("SELECT * FROM events"),
            &ExecutionOptions::for_tier(CustomerTier::Standard),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::CostLimitExceeded { .. }));
    assert!(err.to_string().contains("$15.00"));
}

#[tokio::test]
async fn test_three_terabytes_accepted_under_premium_cap() {
    let mut mock = MockQueryService::new();
    mock.expect_estimate_cost()
        .returning(|_| Ok(3 * BYTES_PER_TIB));
    mock.expect_execute()
        .times(1)
        .returning(|_, _, _| Ok(ResultSet::affected(7)));

    let executor = executor(mock);
    let outcome = executor
        .execute(
            &QueryRequest::new("SELECT * FROM events"),
            &ExecutionOptions::for_tier(CustomerTier::Premium),
        )
        .await
        .unwrap();

    assert_eq!(outcome.result_set.rows_affected, 7);
    assert_eq!(outcome.estimate.estimated_cost_usd, 15.0);
    assert_eq!(outcome.timeout, Duration::from_secs(120));
}

#[tokio::test]
async fn test_authorize_boundary_is_inclusive() {
    let mut tiers = TierTable::default();
    tiers.set(
        CustomerTier::Standard,
        TierLimits::new(Duration::from_secs(30), 15.0),
    );
    let executor = CostGatedExecutor::new(
        Arc::new(MockQueryService::new()),
        breaker(5),
        retry(0),
        ExecutorSettings::default().with_tiers(tiers),
    );

    let estimate = executor.settings().cost.estimate(3 * BYTES_PER_TIB);
    assert!(executor.authorize(&estimate, CustomerTier::Standard).is_ok());
    let estimate = executor.settings().cost.estimate(3 * BYTES_PER_TIB + 1);
    assert!(executor.authorize(&estimate, CustomerTier::Standard).is_err());
}

#[tokio::test]
async fn test_estimation_failure_surfaces_without_breaker_accounting() {
    let mut mock = MockQueryService::new();
    mock.expect_estimate_cost()
        .times(1)
        .returning(|_| Err(WarehouseError::new("connection refused")));
    mock.expect_execute().never();

    let executor = executor(mock);
    let err = executor
        .execute(&QueryRequest::new("SELECT 1"), &ExecutionOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        QueryError::Estimation {
            category: ErrorCategory::Connection,
            ..
        }
    ));
    assert_eq!(executor.breaker().metrics().total_calls, 0);
}

#[tokio::test]
async fn test_transient_failures_retried_then_succeed() {
    let mut mock = cheap_mock();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    mock.expect_execute().times(3).returning(move |_, _, _| {
        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(WarehouseError::new("Operation timeout"))
        } else {
            Ok(ResultSet::affected(10))
        }
    });

    let executor = executor(mock);
    let outcome = executor
        .execute(&QueryRequest::new("SELECT 1"), &ExecutionOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.result_set.rows_affected, 10);
    let stats = executor.retry_policy().stats();
    assert_eq!(stats.total_retries, 2);
    assert_eq!(stats.successful_retries, 1);
    // The whole retry sequence is one successful breaker call
    assert_eq!(executor.breaker().metrics().total_calls, 1);
    assert_eq!(executor.breaker().metrics().failed_calls, 0);
}

#[tokio::test]
async fn test_permanent_failure_not_retried() {
    let mut mock = cheap_mock();
    mock.expect_execute()
        .times(1)
        .returning(|_, _, _| Err(WarehouseError::new("Syntax error at [1:8] in project secret-42")));

    let executor = executor(mock);
    let err = executor
        .execute(&QueryRequest::new("SELEC 1"), &ExecutionOptions::default())
        .await
        .unwrap_err();

    match &err {
        QueryError::RemoteExecution {
            category,
            attempts,
            exhausted,
            ..
        } => {
            assert_eq!(*category, ErrorCategory::Other);
            assert_eq!(*attempts, 1);
            assert!(!exhausted);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.to_string().contains("secret-42"));
}

#[tokio::test]
async fn test_exhausted_retries_count_as_one_breaker_failure() {
    let mut mock = cheap_mock();
    mock.expect_execute()
        .times(4)
        .returning(|_, _, _| Err(WarehouseError::new("quota exceeded")));

    let executor = executor(mock);
    let err = executor
        .execute(&QueryRequest::new("SELECT 1"), &ExecutionOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        QueryError::RemoteExecution {
            attempts: 4,
            exhausted: true,
            ..
        }
    ));
    let metrics = executor.breaker().metrics();
    assert_eq!(metrics.failed_calls, 1);
    assert_eq!(metrics.quota_exceeded_count, 1);
    assert_eq!(executor.retry_policy().stats().failed_retries, 1);
}

#[tokio::test]
async fn test_open_circuit_never_calls_execute() {
    let mut mock = MockQueryService::new();
    mock.expect_estimate_cost().never();
    mock.expect_execute().never();

    let executor = executor(mock);
    executor.breaker().trip();

    let err = executor
        .execute(&QueryRequest::new("SELECT 1"), &ExecutionOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::CircuitOpen { ref service } if service == "warehouse"));
}

#[tokio::test(start_paused = true)]
async fn test_recovered_circuit_admits_estimation_and_trial_call() {
    let mut mock = MockQueryService::new();
    mock.expect_estimate_cost().times(1).returning(|_| Ok(1024));
    mock.expect_execute()
        .times(1)
        .returning(|_, _, _| Ok(ResultSet::empty()));

    let breaker = Arc::new(CircuitBreaker::with_config(
        "warehouse",
        CircuitBreakerConfig::default().with_recovery_timeout(Duration::from_secs(30)),
    ));
    let executor = CostGatedExecutor::new(
        Arc::new(mock),
        breaker.clone(),
        retry(0),
        ExecutorSettings::default(),
    );
    breaker.trip();

    tokio::time::advance(Duration::from_secs(30)).await;
    executor
        .execute(&QueryRequest::new("SELECT 1"), &ExecutionOptions::default())
        .await
        .unwrap();

    assert_eq!(breaker.state(), CircuitState::Closed);
}

struct GatedWarehouse {
    estimates: AtomicU32,
    release: tokio::sync::Notify,
}

#[async_trait]
impl QueryService for GatedWarehouse {
    async fn estimate_cost(&self, _query: &str) -> Result<u64, WarehouseError> {
        self.estimates.fetch_add(1, Ordering::SeqCst);
        Ok(1024)
    }

    async fn execute(
        &self,
        _query: &str,
        _params: &[QueryParam],
        _timeout: Duration,
    ) -> Result<ResultSet, WarehouseError> {
        self.release.notified().await;
        Ok(ResultSet::empty())
    }

    async fn ping(&self) -> Result<(), WarehouseError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_trial_call_rejects_others_before_estimation() {
    let service = Arc::new(GatedWarehouse {
        estimates: AtomicU32::new(0),
        release: tokio::sync::Notify::new(),
    });
    let breaker = Arc::new(CircuitBreaker::with_config(
        "warehouse",
        CircuitBreakerConfig::default().with_recovery_timeout(Duration::from_secs(5)),
    ));
    let executor = Arc::new(CostGatedExecutor::new(
        service.clone(),
        breaker.clone(),
        retry(0),
        ExecutorSettings::default(),
    ));
    breaker.trip();
    tokio::time::advance(Duration::from_secs(5)).await;

    let trial = {
        let executor = executor.clone();
        tokio::spawn(async move {
            executor
                .execute(&QueryRequest::new("SELECT 1"), &ExecutionOptions::default())
                .await
        })
    };
    while breaker.state() != CircuitState::HalfOpen {
        tokio::task::yield_now().await;
    }

    let err = executor
        .execute(&QueryRequest::new("SELECT 2"), &ExecutionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::CircuitOpen { .. }));
    assert_eq!(service.estimates.load(Ordering::SeqCst), 1);

    service.release.notify_one();
    trial.await.unwrap().unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_params_and_timeout_reach_the_service() {
    let mut mock = cheap_mock();
    mock.expect_execute()
        .withf(|sql, params, timeout| {
            sql == "SELECT * FROM t WHERE id = @id"
                && params.len() == 1
                && params[0].name == "id"
                && *timeout == Duration::from_secs(300)
        })
        .times(1)
        .returning(|_, _, _| Ok(ResultSet::empty()));

    let executor = executor(mock);
    let request = QueryRequest::new("SELECT * FROM t WHERE id = @id")
        .with_param(QueryParam::new("id", 7));
    let options =
        ExecutionOptions::for_tier(CustomerTier::Enterprise).with_timeout(Duration::from_secs(1));

    executor.execute(&request, &options).await.unwrap();
}

/// Never answers, so only the client-side deadline can end an attempt
struct HangingService {
    attempts: AtomicU32,
}

#[async_trait]
impl QueryService for HangingService {
    async fn estimate_cost(&self, _query: &str) -> Result<u64, WarehouseError> {
        Ok(0)
    }

    async fn execute(
        &self,
        _query: &str,
        _params: &[QueryParam],
        _timeout: Duration,
    ) -> Result<ResultSet, WarehouseError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn ping(&self) -> Result<(), WarehouseError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_deadline_expiry_is_timeout_and_retried() {
    let service = Arc::new(HangingService {
        attempts: AtomicU32::new(0),
    });
    let executor = CostGatedExecutor::new(
        service.clone(),
        breaker(1),
        retry(2),
        ExecutorSettings::default(),
    );

    let err = executor
        .execute(
            &QueryRequest::new("SELECT 1"),
            &ExecutionOptions::default().with_timeout(Duration::from_secs(2)),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        QueryError::RemoteExecution {
            category: ErrorCategory::Timeout,
            attempts: 3,
            exhausted: true,
            ..
        }
    ));
    assert_eq!(service.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(executor.breaker().state(), CircuitState::Open);
    assert_eq!(executor.breaker().metrics().timeout_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_backoff() {
    let mut mock = cheap_mock();
    mock.expect_execute()
        .returning(|_, _, _| Err(WarehouseError::new("network unreachable")));

    let executor = CostGatedExecutor::new(
        Arc::new(mock),
        breaker(5),
        Arc::new(RetryPolicy::with_config(
            RetryConfig::default()
                .with_base_delay(Duration::from_secs(30))
                .with_max_delay(Duration::from_secs(30))
                .with_jitter(false),
        )),
        ExecutorSettings::default(),
    );

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        canceller.cancel();
    });

    let err = executor
        .execute(
            &QueryRequest::new("SELECT 1"),
            &ExecutionOptions::default().with_cancel_token(token),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::Cancelled));
}
