use crate::cancellation::CancelSignal;
use crate::error::AppError;
use crate::events::decode::{decode_command, parse_body};
use crate::events::{EventKind, InboundMessage, PaymentCommand};
use crate::services::{
    CancelPaymentRequest, CancelPaymentResponse, QueryPaymentStatusRequest,
    QueryPaymentStatusResponse, StartPaymentRequest, StartPaymentResponse, UseCase,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

pub type StartPaymentUseCase =
    dyn UseCase<Request = StartPaymentRequest, Response = StartPaymentResponse>;
pub type QueryPaymentUseCase =
    dyn UseCase<Request = QueryPaymentStatusRequest, Response = QueryPaymentStatusResponse>;
pub type CancelPaymentUseCase =
    dyn UseCase<Request = CancelPaymentRequest, Response = CancelPaymentResponse>;

#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    Succeeded(EventKind),
    Failed { event: EventKind, error: AppError },
    /// No `evento` attribute.
    Skipped,
    /// `evento` named something this service does not handle.
    Ignored(String),
    /// Body not decodable for its event.
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageReport {
    pub message_id: String,
    pub outcome: MessageOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub messages: Vec<MessageReport>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::Succeeded(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::Skipped | MessageOutcome::Ignored(_)))
    }

    pub fn invalid(&self) -> usize {
        self.count(|o| matches!(o, MessageOutcome::Invalid(_)))
    }

    pub fn outcome(&self, message_id: &str) -> Option<&MessageOutcome> {
        self.messages
            .iter()
            .find(|m| m.message_id == message_id)
            .map(|m| &m.outcome)
    }

    fn count(&self, pred: impl Fn(&MessageOutcome) -> bool) -> usize {
        self.messages.iter().filter(|m| pred(&m.outcome)).count()
    }
}

/// Routes queued messages to the payment use cases, one at a time and in
/// delivery order. Never fails: every problem is logged against its message.
pub struct MessageRouter {
    start: Arc<StartPaymentUseCase>,
    query: Arc<QueryPaymentUseCase>,
    cancel: Arc<CancelPaymentUseCase>,
}

impl MessageRouter {
    pub fn new(
        start: Arc<StartPaymentUseCase>,
        query: Arc<QueryPaymentUseCase>,
        cancel: Arc<CancelPaymentUseCase>,
    ) -> Self {
        Self {
            start,
            query,
            cancel,
        }
    }

    pub async fn process_batch(
        &self,
        messages: Vec<InboundMessage>,
        cancel: &CancelSignal,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        info!(count = messages.len(), "processing message batch");

        for message in messages {
            let outcome = self.process_message(&message, cancel).await;
            report.messages.push(MessageReport {
                message_id: message.message_id,
                outcome,
            });
        }

        info!(
            total = report.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            invalid = report.invalid(),
            "message batch processed"
        );
        report
    }

    pub async fn process_message(
        &self,
        message: &InboundMessage,
        cancel: &CancelSignal,
    ) -> MessageOutcome {
        let message_id = message.message_id.as_str();

        let body = match parse_body(&message.body) {
            Ok(body) => body,
            Err(e) => {
                error!(message_id = %message_id, error = %e, "failed to parse message body");
                return MessageOutcome::Invalid(e.to_string());
            }
        };

        let event = match message.event() {
            Some(event) => event,
            None => {
                error!(message_id = %message_id, "message has no 'evento' attribute, skipping");
                return MessageOutcome::Skipped;
            }
        };

        let kind = match EventKind::parse(event) {
            Some(kind) => kind,
            None => {
                warn!(message_id = %message_id, event = %event, "unknown event, ignoring message");
                return MessageOutcome::Ignored(event.to_string());
            }
        };

        let decoded = match decode_command(kind, &body, Utc::now()) {
            Ok(decoded) => decoded,
            Err(e) => {
                error!(message_id = %message_id, event = %kind.as_str(), error = %e, "invalid message");
                return MessageOutcome::Invalid(e.to_string());
            }
        };

        for warning in &decoded.warnings {
            warn!(
                message_id = %message_id,
                event = %kind.as_str(),
                field = %warning.field,
                reason = %warning.reason,
                "message field defaulted"
            );
        }

        match decoded.command {
            PaymentCommand::Start(request) => {
                run(self.start.as_ref(), request, kind, message_id, cancel).await
            }
            PaymentCommand::Query(request) => {
                run(self.query.as_ref(), request, kind, message_id, cancel).await
            }
            PaymentCommand::Cancel(request) => {
                run(self.cancel.as_ref(), request, kind, message_id, cancel).await
            }
        }
    }
}

async fn run<U>(
    use_case: &U,
    request: U::Request,
    kind: EventKind,
    message_id: &str,
    cancel: &CancelSignal,
) -> MessageOutcome
where
    U: UseCase + ?Sized,
    U::Response: Serialize,
{
    match use_case.handle(request, cancel).await {
        Ok(response) => {
            let result = serde_json::to_string(&response).unwrap_or_default();
            info!(
                message_id = %message_id,
                event = %kind.as_str(),
                result = %result,
                "message processed"
            );
            MessageOutcome::Succeeded(kind)
        }
        Err(e) => {
            error!(
                message_id = %message_id,
                event = %kind.as_str(),
                error = %e,
                error_code = ?e.error_code(),
                retryable = e.is_retryable(),
                "message processing failed"
            );
            MessageOutcome::Failed {
                event: kind,
                error: e,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        starts: Mutex<Vec<StartPaymentRequest>>,
        queries: Mutex<Vec<QueryPaymentStatusRequest>>,
        cancels: Mutex<Vec<CancelPaymentRequest>>,
    }

    struct StartStub(Arc<Recorder>);
    struct QueryStub(Arc<Recorder>);
    struct CancelStub(Arc<Recorder>);

    #[async_trait]
    impl UseCase for StartStub {
        type Request = StartPaymentRequest;
        type Response = StartPaymentResponse;

        async fn handle(
            &self,
            request: StartPaymentRequest,
            _cancel: &CancelSignal,
        ) -> AppResult<StartPaymentResponse> {
            let id = request.order_id.clone();
            self.0.starts.lock().unwrap().push(request);
            Err(AppError::not_found("Order", &id))
        }
    }

    #[async_trait]
    impl UseCase for QueryStub {
        type Request = QueryPaymentStatusRequest;
        type Response = QueryPaymentStatusResponse;

        async fn handle(
            &self,
            request: QueryPaymentStatusRequest,
            _cancel: &CancelSignal,
        ) -> AppResult<QueryPaymentStatusResponse> {
            self.0.queries.lock().unwrap().push(request.clone());
            Ok(QueryPaymentStatusResponse {
                payment_intent_id: request.payment_intent_id.clone(),
                status: "requires_capture".to_string(),
                amount: "10.00".parse().unwrap(),
                currency: "brl".to_string(),
                created_at: Utc::now(),
                confirmed_at: None,
                order_id: request.payment_intent_id,
                customer_name: String::new(),
            })
        }
    }

    #[async_trait]
    impl UseCase for CancelStub {
        type Request = CancelPaymentRequest;
        type Response = CancelPaymentResponse;

        async fn handle(
            &self,
            request: CancelPaymentRequest,
            _cancel: &CancelSignal,
        ) -> AppResult<CancelPaymentResponse> {
            self.0.cancels.lock().unwrap().push(request.clone());
            Ok(CancelPaymentResponse {
                payment_intent_id: request.payment_intent_id,
                cancelled: true,
                cancelled_at: Utc::now(),
                reason: request.reason,
            })
        }
    }

    fn router() -> (MessageRouter, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let router = MessageRouter::new(
            Arc::new(StartStub(recorder.clone())),
            Arc::new(QueryStub(recorder.clone())),
            Arc::new(CancelStub(recorder.clone())),
        );
        (router, recorder)
    }

    #[tokio::test]
    async fn batch_keeps_going_after_failures() {
        let (router, recorder) = router();
        let batch = vec![
            InboundMessage::new("m-1", "{not json").with_attribute("evento", "iniciar_pagamento"),
            InboundMessage::new("m-2", r#"{"idPedido":"P1","dataPedido":"2024-01-01"}"#)
                .with_attribute("evento", "iniciar_pagamento"),
            InboundMessage::new("m-3", r#"{"paymentIntentId":"pi_1"}"#),
            InboundMessage::new("m-4", r#"{"paymentIntentId":"pi_1"}"#)
                .with_attribute("evento", "estornar_pagamento"),
            InboundMessage::new("m-5", r#"{"paymentIntentId":"pi_1"}"#)
                .with_attribute("evento", "consultar_pagamento"),
            InboundMessage::new("m-6", r#"{"paymentIntentId":"pi_2"}"#)
                .with_attribute("evento", "cancelar_pagamento"),
        ];

        let report = router.process_batch(batch, &CancelSignal::never()).await;

        assert_eq!(report.len(), 6);
        assert!(matches!(report.outcome("m-1"), Some(MessageOutcome::Invalid(_))));
        assert!(matches!(
            report.outcome("m-2"),
            Some(MessageOutcome::Failed { event: EventKind::StartPayment, .. })
        ));
        assert_eq!(report.outcome("m-3"), Some(&MessageOutcome::Skipped));
        assert_eq!(
            report.outcome("m-4"),
            Some(&MessageOutcome::Ignored("estornar_pagamento".to_string()))
        );
        assert_eq!(
            report.outcome("m-5"),
            Some(&MessageOutcome::Succeeded(EventKind::QueryPayment))
        );
        assert_eq!(
            report.outcome("m-6"),
            Some(&MessageOutcome::Succeeded(EventKind::CancelPayment))
        );
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.invalid(), 1);

        assert_eq!(recorder.starts.lock().unwrap().len(), 1);
        assert_eq!(recorder.queries.lock().unwrap()[0].payment_intent_id, "pi_1");
        assert_eq!(recorder.cancels.lock().unwrap()[0].reason, "customer request");
    }

    #[tokio::test]
    async fn decode_errors_do_not_reach_handlers() {
        let (router, recorder) = router();
        let message = InboundMessage::new("m-1", r#"{"motivoCancelamento":"x"}"#)
            .with_attribute("evento", "cancelar_pagamento");

        let outcome = router
            .process_message(&message, &CancelSignal::never())
            .await;

        match outcome {
            MessageOutcome::Invalid(reason) => assert!(reason.contains("paymentIntentId")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(recorder.cancels.lock().unwrap().is_empty());
    }
}
