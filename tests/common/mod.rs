//! Shared fakes for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use order_payments::database::{
    DatabaseError, DatabaseErrorKind, Order, OrderRepository, PaymentRecord, PaymentRepository,
};
use order_payments::messaging::{MessagingError, MessagingResult, OutboundMessage, QueuePublisher};
use order_payments::payments::{
    CreatePaymentRequest, IntentStatus, PaymentError, PaymentGateway, PaymentResult, PaymentStatus,
};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

pub fn dec(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).expect("decimal")
}

pub fn order(date: &str, id: &str, total: &str) -> Order {
    Order {
        order_date: date.to_string(),
        id: id.to_string(),
        full_order: serde_json::json!({
            "nome": "Ana Souza",
            "email": "ana@example.com",
            "telefone": "11999990000",
            "cidade": "Campinas",
            "estado": "SP",
            "itens": [{ "nomeProduto": "Camiseta", "quantidade": 2 }],
            "formasPagamento": [{ "tipo": "cartao" }]
        })
        .to_string(),
        total_amount: dec(total),
        status: "PENDENTE".to_string(),
    }
}

// Orders

#[derive(Default)]
pub struct InMemoryOrders {
    orders: Mutex<Vec<Order>>,
    pub point_lookups: Mutex<Vec<(String, String)>>,
    pub id_lookups: Mutex<Vec<String>>,
}

impl InMemoryOrders {
    pub fn with(orders: Vec<Order>) -> Arc<Self> {
        Arc::new(Self {
            orders: Mutex::new(orders),
            ..Default::default()
        })
    }

    pub fn lookups(&self) -> usize {
        self.point_lookups.lock().unwrap().len() + self.id_lookups.lock().unwrap().len()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrders {
    async fn save_order(&self, order: &Order) -> Result<(), DatabaseError> {
        let mut orders = self.orders.lock().unwrap();
        orders.retain(|o| !(o.order_date == order.order_date && o.id == order.id));
        orders.push(order.clone());
        Ok(())
    }

    async fn get_order(
        &self,
        order_date: &str,
        order_id: &str,
    ) -> Result<Option<Order>, DatabaseError> {
        self.point_lookups
            .lock()
            .unwrap()
            .push((order_date.to_string(), order_id.to_string()));
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.order_date == order_date && o.id == order_id)
            .cloned())
    }

    async fn get_orders_by_date(&self, order_date: &str) -> Result<Vec<Order>, DatabaseError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.order_date == order_date)
            .cloned()
            .collect())
    }

    async fn find_order_by_id(&self, order_id: &str) -> Result<Option<Order>, DatabaseError> {
        self.id_lookups.lock().unwrap().push(order_id.to_string());
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == order_id)
            .cloned())
    }
}

// Payments

#[derive(Default)]
pub struct InMemoryPayments {
    records: Mutex<HashMap<(String, String), PaymentRecord>>,
    pub fail_saves: bool,
}

impl InMemoryPayments {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_saves: true,
            ..Default::default()
        })
    }

    pub fn all(&self) -> Vec<PaymentRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    pub fn insert(&self, record: PaymentRecord) {
        self.records.lock().unwrap().insert(
            (record.order_id.clone(), record.payment_intent_id.clone()),
            record,
        );
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPayments {
    async fn save_payment(&self, payment: &PaymentRecord) -> Result<(), DatabaseError> {
        if self.fail_saves {
            return Err(DatabaseError::new(
                DatabaseErrorKind::Unavailable,
                "table unavailable",
            ));
        }
        let mut record = payment.clone();
        record.updated_at = Utc::now();
        self.insert(record);
        Ok(())
    }

    async fn get_payment(
        &self,
        order_id: &str,
        payment_intent_id: &str,
    ) -> Result<Option<PaymentRecord>, DatabaseError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(order_id.to_string(), payment_intent_id.to_string()))
            .cloned())
    }

    async fn get_payments_by_order(
        &self,
        order_id: &str,
    ) -> Result<Vec<PaymentRecord>, DatabaseError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.order_id == order_id)
            .cloned()
            .collect())
    }
}

pub fn payment_record(order_id: &str, payment_intent_id: &str, status: &str) -> PaymentRecord {
    let created: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().expect("timestamp");
    PaymentRecord {
        order_id: order_id.to_string(),
        payment_intent_id: payment_intent_id.to_string(),
        status: status.to_string(),
        amount: dec("150.00"),
        currency: "brl".to_string(),
        created_at: created,
        updated_at: created,
        payment_url: format!("https://checkout.test/{}", payment_intent_id),
        gateway_metadata: "{}".to_string(),
    }
}

// Gateway

/// Gateway double: hands out `pi_test_<n>` ids and remembers every call.
#[derive(Default)]
pub struct RecordingGateway {
    pub created: Mutex<Vec<CreatePaymentRequest>>,
    pub status_calls: Mutex<Vec<String>>,
    pub cancelled: Mutex<Vec<String>>,
    pub fail_create: Option<String>,
}

impl RecordingGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rejecting(message: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_create: Some(message.to_string()),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.created.lock().unwrap().len()
            + self.status_calls.lock().unwrap().len()
            + self.cancelled.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_payment(&self, request: &CreatePaymentRequest) -> PaymentResult<String> {
        if let Some(message) = &self.fail_create {
            return Err(PaymentError::Gateway {
                message: message.clone(),
                code: Some("card_declined".to_string()),
                http_status: Some(402),
            });
        }
        let mut created = self.created.lock().unwrap();
        created.push(request.clone());
        Ok(format!("pi_test_{}", created.len()))
    }

    async fn get_payment_status(&self, payment_intent_id: &str) -> PaymentResult<PaymentStatus> {
        self.status_calls
            .lock()
            .unwrap()
            .push(payment_intent_id.to_string());

        let created = self.created.lock().unwrap();
        let request = created.last();
        let mut metadata = BTreeMap::new();
        if let Some(request) = request {
            metadata.insert("id_pedido".to_string(), request.order_id.clone());
            metadata.insert("nome_cliente".to_string(), request.customer_name.clone());
        }

        Ok(PaymentStatus {
            payment_intent_id: payment_intent_id.to_string(),
            status: IntentStatus::RequiresPaymentMethod,
            amount: request.map(|r| r.amount.clone()).unwrap_or_else(|| dec("150.00")),
            currency: request
                .map(|r| r.currency.clone())
                .unwrap_or_else(|| "brl".to_string()),
            created_at: "2024-01-01T12:00:00Z".parse().expect("timestamp"),
            confirmed_at: None,
            metadata,
        })
    }

    async fn cancel_payment(&self, payment_intent_id: &str) -> PaymentResult<bool> {
        self.cancelled
            .lock()
            .unwrap()
            .push(payment_intent_id.to_string());
        Ok(true)
    }

    async fn confirm_payment(
        &self,
        _payment_intent_id: &str,
        _payment_method_id: &str,
    ) -> PaymentResult<bool> {
        Ok(true)
    }

    async fn capture_payment(&self, _payment_intent_id: &str) -> PaymentResult<bool> {
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

// Queue

#[derive(Default)]
pub struct RecordingPublisher {
    pub sent: Mutex<Vec<(OutboundMessage, String)>>,
    pub fail: bool,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }
}

#[async_trait]
impl QueuePublisher for RecordingPublisher {
    async fn send(&self, message: &OutboundMessage, queue_url: &str) -> MessagingResult<()> {
        if self.fail {
            return Err(MessagingError::Send {
                queue_url: queue_url.to_string(),
                message: "queue unavailable".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((message.clone(), queue_url.to_string()));
        Ok(())
    }
}

// Logs

/// In-memory log sink for asserting on emitted entries.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// Installs a plain-text subscriber for the current thread; logs are
    /// captured until the returned guard drops.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    pub fn lines(&self) -> Vec<String> {
        let buffer = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buffer)
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn at_level(&self, level: &str) -> Vec<String> {
        let marker = format!(" {} ", level);
        self.lines()
            .into_iter()
            .filter(|line| line.contains(&marker))
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
