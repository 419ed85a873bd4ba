use crate::classify::ErrorClass;
use crate::config::RetryConfig;
use crate::error::EnvelopeError;
use crate::health::ProviderHealthRegistry;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use synthesis_oracle::OracleError;
use synthesis_telemetry::{CallRecord, TelemetryBus, TelemetryKind};
use synthesis_types::CancellationFlag;
use tracing::{debug, error, info, warn};

/// Retry, timeout and provider-fallback wrapper around external calls.
pub struct ResilientEnvelope {
    config: RetryConfig,
    health: Arc<ProviderHealthRegistry>,
    telemetry: Arc<TelemetryBus>,
    cancel: CancellationFlag,
}

impl ResilientEnvelope {
    pub fn new(config: RetryConfig, telemetry: Arc<TelemetryBus>, cancel: CancellationFlag) -> Self {
        let health = Arc::new(ProviderHealthRegistry::new(config.quota_recovery_ms));
        Self {
            config,
            health,
            telemetry,
            cancel,
        }
    }

    /// Share an existing registry instead of creating a fresh one.
    pub fn with_health(mut self, health: Arc<ProviderHealthRegistry>) -> Self {
        self.health = health;
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn health(&self) -> &Arc<ProviderHealthRegistry> {
        &self.health
    }

    pub fn telemetry(&self) -> &Arc<TelemetryBus> {
        &self.telemetry
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancel
    }

    /// Run `op` against `route`, retrying retryable failures.
    pub async fn execute<T, F, Fut>(
        &self,
        route: &str,
        operation: &str,
        op: F,
    ) -> Result<T, EnvelopeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OracleError>>,
    {
        self.run(route, operation, op, false).await
    }

    /// Run `op` on `primary`; on quota exhaustion move to `secondary` once.
    ///
    /// `op` receives the route name it should call. A primary already
    /// flagged quota-exhausted is skipped without an attempt.
    pub async fn execute_with_fallback<T, F, Fut>(
        &self,
        primary: &str,
        secondary: &str,
        operation: &str,
        mut op: F,
    ) -> Result<T, EnvelopeError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, OracleError>>,
    {
        if !self.health.is_available(primary) {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(operation));
            }
            info!(route = primary, fallback = secondary, operation = operation, "primary unavailable, using fallback route");
            self.telemetry.emit(
                operation,
                TelemetryKind::Fallback(CallRecord::failure(
                    primary,
                    operation,
                    0,
                    0,
                    ErrorClass::QuotaExhausted.as_str(),
                    "route quota-exhausted, skipped",
                )),
            );
            return self
                .run(secondary, operation, || op(secondary.to_string()), false)
                .await;
        }

        let first = self
            .run(primary, operation, || op(primary.to_string()), true)
            .await;
        match first {
            Err(EnvelopeError::Fatal {
                class: ErrorClass::QuotaExhausted,
                ..
            }) => {
                info!(route = primary, fallback = secondary, operation = operation, "quota exhausted, retrying on fallback route");
                self.run(secondary, operation, || op(secondary.to_string()), false)
                    .await
            }
            other => other,
        }
    }

    async fn run<T, F, Fut>(
        &self,
        route: &str,
        operation: &str,
        mut op: F,
        fallback_available: bool,
    ) -> Result<T, EnvelopeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OracleError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            if self.cancel.is_cancelled() {
                debug!(route = route, operation = operation, attempt = attempt, "cancelled before attempt");
                return Err(self.cancelled(operation));
            }

            let started = Instant::now();
            let outcome = tokio::time::timeout(self.config.call_timeout(), op()).await;
            let latency_ms = started.elapsed().as_millis() as u64;

            let err = match outcome {
                Ok(Ok(value)) => {
                    self.health.record_success(route);
                    self.telemetry.emit(
                        operation,
                        TelemetryKind::CallSucceeded(CallRecord::success(
                            route, operation, attempt, latency_ms,
                        )),
                    );
                    debug!(route = route, operation = operation, attempt = attempt, latency_ms = latency_ms, "call succeeded");
                    return Ok(value);
                }
                Ok(Err(e)) => e,
                Err(_) => OracleError::new(format!(
                    "call timed out after {}ms",
                    self.config.call_timeout_ms
                )),
            };

            let class = ErrorClass::classify(&err);
            self.health.record_failure(route, class);
            if class == ErrorClass::QuotaExhausted {
                self.health.mark_quota_exhausted(route);
            }

            let record = CallRecord::failure(
                route,
                operation,
                attempt,
                latency_ms,
                class.as_str(),
                err.message.clone(),
            );

            if class.is_retryable() && attempt < max_attempts {
                let delay = self.config.backoff_delay(attempt);
                warn!(
                    route = route,
                    operation = operation,
                    attempt = attempt,
                    class = %class,
                    delay_ms = delay.as_millis() as u64,
                    "retrying after transient failure"
                );
                self.telemetry.emit(operation, TelemetryKind::Retry(record));
                tokio::time::sleep(delay).await;
                continue;
            }

            if class == ErrorClass::QuotaExhausted && fallback_available {
                self.telemetry.emit(operation, TelemetryKind::Fallback(record));
            } else {
                error!(route = route, operation = operation, attempt = attempt, class = %class, error = %err, "call failed");
                self.telemetry.emit(operation, TelemetryKind::CallFailed(record));
            }

            return Err(if class.is_retryable() {
                EnvelopeError::Exhausted {
                    route: route.to_string(),
                    operation: operation.to_string(),
                    attempts: attempt,
                    class,
                    last: err,
                }
            } else {
                EnvelopeError::Fatal {
                    route: route.to_string(),
                    operation: operation.to_string(),
                    class,
                    source: err,
                }
            });
        }
    }

    fn cancelled(&self, operation: &str) -> EnvelopeError {
        EnvelopeError::Cancelled {
            operation: operation.to_string(),
        }
    }
}

impl std::fmt::Debug for ResilientEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientEnvelope")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
