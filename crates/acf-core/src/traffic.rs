//! Traffic logging around handler calls
//!
//! [`TrafficLogger::invoke`] writes a start entry, awaits the handler, and
//! writes an outcome entry with the duration. A handler that panics is
//! reported as a failed outcome with [`ErrorCode::Internal`].

use crate::history::OperationKind;
use crate::logger::{LogContext, Logger};
use crate::result::{ErrorCode, ErrorInfo, OperationResult};
use crate::subscriptions::panic_message;
use acf_artifact::{Artifact, ArtifactType};
use acf_handlers::HandlerResult;
use futures::FutureExt;
use serde_json::json;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use ulid::Ulid;

/// Identifies one logged call
#[derive(Debug, Clone, Copy)]
pub struct TrafficContext<'a> {
    pub operation_id: Ulid,
    pub kind: OperationKind,
    pub artifact_type: ArtifactType,
    pub artifact_id: Option<&'a str>,
    pub dry_run: bool,
    /// Internal read of the current state ahead of an update or delete
    pub pre_read: bool,
    /// Pre-operation state, attached when state logging is on
    pub before: Option<&'a Artifact>,
}

impl<'a> TrafficContext<'a> {
    /// Context for a call on `artifact_type`
    #[must_use]
    pub fn new(operation_id: Ulid, kind: OperationKind, artifact_type: ArtifactType) -> Self {
        Self {
            operation_id,
            kind,
            artifact_type,
            artifact_id: None,
            dry_run: false,
            pre_read: false,
            before: None,
        }
    }

    /// With artifact id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, artifact_id: &'a str) -> Self {
        self.artifact_id = Some(artifact_id);
        self
    }

    /// With dry-run flag
    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Mark as the pre-read of a mutation
    ///
    /// Its failures are logged at debug level; the mutation that follows
    /// reports the real outcome.
    #[inline]
    #[must_use]
    pub fn as_pre_read(mut self) -> Self {
        self.pre_read = true;
        self
    }

    /// With pre-operation state
    #[inline]
    #[must_use]
    pub fn with_before(mut self, before: Option<&'a Artifact>) -> Self {
        self.before = before;
        self
    }

    fn log_context(&self) -> LogContext {
        let mut ctx = LogContext::new();
        ctx.insert("operationId".into(), json!(self.operation_id.to_string()));
        ctx.insert("operation".into(), json!(self.kind.as_str()));
        ctx.insert("artifactType".into(), json!(self.artifact_type.as_str()));
        if let Some(id) = self.artifact_id {
            ctx.insert("artifactId".into(), json!(id));
        }
        if self.dry_run {
            ctx.insert("dryRun".into(), json!(true));
        }
        if self.pre_read {
            ctx.insert("preRead".into(), json!(true));
        }
        ctx
    }

    fn label(&self) -> String {
        match self.artifact_id {
            Some(id) => format!("{} {} '{}'", self.kind, self.artifact_type, id),
            None => format!("{} {}", self.kind, self.artifact_type),
        }
    }
}

/// Decorator that logs handler invocations
#[derive(Debug, Clone)]
pub struct TrafficLogger {
    logger: Arc<dyn Logger>,
    include_state: bool,
}

impl TrafficLogger {
    /// Create traffic logger writing to `logger`
    #[must_use]
    pub fn new(logger: Arc<dyn Logger>, include_state: bool) -> Self {
        Self {
            logger,
            include_state,
        }
    }

    /// Underlying logger
    #[inline]
    #[must_use]
    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    /// Log a failure that happened before any handler call
    pub fn reject(&self, ctx: &TrafficContext<'_>, error: &ErrorInfo) {
        let logger = self.logger.child(ctx.log_context());
        logger.error(
            &format!("{} rejected", ctx.label()),
            &outcome_context(false, 0, Some(error)),
        );
    }

    /// Await `call`, logging start, outcome and duration
    pub async fn invoke<T, F>(&self, ctx: TrafficContext<'_>, call: F) -> OperationResult<T>
    where
        F: Future<Output = HandlerResult<T>> + Send,
    {
        let logger = self.logger.child(ctx.log_context());
        let label = ctx.label();

        let mut start = LogContext::new();
        if self.include_state && matches!(ctx.kind, OperationKind::Update | OperationKind::Delete) {
            if let Some(before) = ctx.before {
                start.insert("beforeState".into(), before.to_json());
            }
        }
        logger.debug(&format!("{label} started"), &start);

        let started = Instant::now();
        let outcome = AssertUnwindSafe(call).catch_unwind().await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (result, verdict) = match outcome {
            Ok(handled) => {
                let result = OperationResult::from_handler(handled);
                let verdict = if result.success { "succeeded" } else { "failed" };
                (result, verdict)
            }
            Err(payload) => {
                let info = ErrorInfo::new(
                    ErrorCode::Internal,
                    format!("handler panicked: {}", panic_message(payload.as_ref())),
                );
                (OperationResult::failure(info), "panicked")
            }
        };

        let message = format!("{label} {verdict}");
        let context = outcome_context(result.success, duration_ms, result.error.as_ref());
        match (result.success, verdict) {
            (true, _) => logger.info(&message, &context),
            (false, "failed") if ctx.pre_read => logger.debug(&message, &context),
            (false, _) => logger.error(&message, &context),
        }
        result
    }
}

fn outcome_context(success: bool, duration_ms: u64, error: Option<&ErrorInfo>) -> LogContext {
    let mut ctx = LogContext::new();
    ctx.insert("success".into(), json!(success));
    ctx.insert("durationMs".into(), json!(duration_ms));
    if let Some(error) = error {
        ctx.insert("error".into(), json!({"code": error.code, "message": error.message}));
    }
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::NoopLogger;
    use acf_artifact::Rule;
    use acf_handlers::{HandlerError, Stored};
    use pretty_assertions::assert_eq;

    fn traffic() -> TrafficLogger {
        TrafficLogger::new(Arc::new(NoopLogger), true)
    }

    fn ctx() -> TrafficContext<'static> {
        TrafficContext::new(Ulid::new(), OperationKind::Read, ArtifactType::Rule).with_id("style")
    }

    #[tokio::test]
    async fn success_becomes_ok_result() {
        let rule: Artifact = Rule::new("style", "x").into();
        let expected = rule.clone();
        let result = traffic()
            .invoke(ctx(), async move { Ok(Stored::at(rule, "/p/style.md")) })
            .await;
        assert!(result.success);
        assert_eq!(result.data, Some(expected));
    }

    #[tokio::test]
    async fn handler_error_becomes_failure() {
        let result: OperationResult<Artifact> = traffic()
            .invoke(ctx(), async {
                Err(HandlerError::not_found(ArtifactType::Rule, "style"))
            })
            .await;
        assert!(!result.success);
        assert_eq!(result.error_code(), Some(ErrorCode::NotFound));
    }

    #[tokio::test]
    async fn panic_becomes_internal_failure() {
        fn explode() -> HandlerResult<()> {
            panic!("disk on fire")
        }

        let result = traffic().invoke(ctx(), async { explode() }).await;
        assert_eq!(result.error_code(), Some(ErrorCode::Internal));
        assert!(result.error.unwrap().message.contains("disk on fire"));
    }

    #[test]
    fn log_context_carries_identity() {
        let op = Ulid::new();
        let context = TrafficContext::new(op, OperationKind::Update, ArtifactType::Skill)
            .with_id("core/x")
            .with_dry_run(true)
            .log_context();
        assert_eq!(context["operationId"], json!(op.to_string()));
        assert_eq!(context["operation"], json!("update"));
        assert_eq!(context["artifactType"], json!("skill"));
        assert_eq!(context["artifactId"], json!("core/x"));
        assert_eq!(context["dryRun"], json!(true));
        assert!(!context.contains_key("preRead"));

        let context = TrafficContext::new(op, OperationKind::Read, ArtifactType::Skill)
            .as_pre_read()
            .log_context();
        assert_eq!(context["preRead"], json!(true));
    }
}
