use crate::database::error::DatabaseError;
use crate::database::models::{attrs, Item, PaymentRecord};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::Utc;
use tracing::{error, info, warn};

/// Access to the payments table.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Upserts the record. `updated_at` is set to the current time.
    async fn save_payment(&self, payment: &PaymentRecord) -> Result<(), DatabaseError>;

    async fn get_payment(
        &self,
        order_id: &str,
        payment_intent_id: &str,
    ) -> Result<Option<PaymentRecord>, DatabaseError>;

    async fn get_payments_by_order(&self, order_id: &str)
        -> Result<Vec<PaymentRecord>, DatabaseError>;
}

pub struct DynamoPaymentRepository {
    client: Client,
    table_name: String,
}

impl DynamoPaymentRepository {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl PaymentRepository for DynamoPaymentRepository {
    async fn save_payment(&self, payment: &PaymentRecord) -> Result<(), DatabaseError> {
        let mut record = payment.clone();
        record.updated_at = Utc::now();

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record.to_item()))
            .send()
            .await
            .map_err(|e| {
                let err = DatabaseError::from_sdk("put_item", e);
                error!(
                    order_id = %record.order_id,
                    payment_intent_id = %record.payment_intent_id,
                    error = %err,
                    "failed to save payment"
                );
                err
            })?;

        info!(
            order_id = %record.order_id,
            payment_intent_id = %record.payment_intent_id,
            status = %record.status,
            "payment saved"
        );
        Ok(())
    }

    async fn get_payment(
        &self,
        order_id: &str,
        payment_intent_id: &str,
    ) -> Result<Option<PaymentRecord>, DatabaseError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(attrs::PAYMENT_ORDER_ID, AttributeValue::S(order_id.to_string()))
            .key(
                attrs::PAYMENT_INTENT_ID,
                AttributeValue::S(payment_intent_id.to_string()),
            )
            .send()
            .await
            .map_err(|e| {
                let err = DatabaseError::from_sdk("get_item", e);
                error!(order_id = %order_id, payment_intent_id = %payment_intent_id, error = %err, "failed to load payment");
                err
            })?;

        match result.item {
            Some(item) => Ok(Some(PaymentRecord::from_item(&item)?)),
            None => {
                warn!(order_id = %order_id, payment_intent_id = %payment_intent_id, "payment not found");
                Ok(None)
            }
        }
    }

    async fn get_payments_by_order(
        &self,
        order_id: &str,
    ) -> Result<Vec<PaymentRecord>, DatabaseError> {
        let mut payments = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let page = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#pk = :pk")
                .expression_attribute_names("#pk", attrs::PAYMENT_ORDER_ID)
                .expression_attribute_values(":pk", AttributeValue::S(order_id.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| {
                    let err = DatabaseError::from_sdk("query", e);
                    error!(order_id = %order_id, error = %err, "failed to query payments by order");
                    err
                })?;

            for item in page.items.unwrap_or_default() {
                payments.push(PaymentRecord::from_item(&item)?);
            }
            match page.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        info!(order_id = %order_id, count = payments.len(), "payments loaded for order");
        Ok(payments)
    }
}
