use crate::database::error::DatabaseError;
use crate::database::models::{attrs, Item, Order};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use tracing::{debug, error, info, warn};

/// Access to the orders table. Absent records are `Ok(None)` / empty, never errors.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn save_order(&self, order: &Order) -> Result<(), DatabaseError>;

    /// Point lookup by `(order_date, order_id)`.
    async fn get_order(&self, order_date: &str, order_id: &str)
        -> Result<Option<Order>, DatabaseError>;

    /// All orders of one date partition.
    async fn get_orders_by_date(&self, order_date: &str) -> Result<Vec<Order>, DatabaseError>;

    /// Full-table scan on `Id`; first match wins. Used only when the order
    /// date is unknown.
    async fn find_order_by_id(&self, order_id: &str) -> Result<Option<Order>, DatabaseError>;
}

pub struct DynamoOrderRepository {
    client: Client,
    table_name: String,
}

impl DynamoOrderRepository {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    fn parse_items(items: Vec<Item>) -> Result<Vec<Order>, DatabaseError> {
        items.iter().map(Order::from_item).collect()
    }
}

#[async_trait]
impl OrderRepository for DynamoOrderRepository {
    async fn save_order(&self, order: &Order) -> Result<(), DatabaseError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(order.to_item()))
            .send()
            .await
            .map_err(|e| {
                let err = DatabaseError::from_sdk("put_item", e);
                error!(order_date = %order.order_date, order_id = %order.id, error = %err, "failed to save order");
                err
            })?;

        info!(order_date = %order.order_date, order_id = %order.id, "order saved");
        Ok(())
    }

    async fn get_order(
        &self,
        order_date: &str,
        order_id: &str,
    ) -> Result<Option<Order>, DatabaseError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(attrs::ORDER_DATE, AttributeValue::S(order_date.to_string()))
            .key(attrs::ORDER_ID, AttributeValue::S(order_id.to_string()))
            .send()
            .await
            .map_err(|e| {
                let err = DatabaseError::from_sdk("get_item", e);
                error!(order_date = %order_date, order_id = %order_id, error = %err, "failed to load order");
                err
            })?;

        match result.item {
            Some(item) => Ok(Some(Order::from_item(&item)?)),
            None => {
                warn!(order_date = %order_date, order_id = %order_id, "order not found");
                Ok(None)
            }
        }
    }

    async fn get_orders_by_date(&self, order_date: &str) -> Result<Vec<Order>, DatabaseError> {
        let mut orders = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let page = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#pk = :pk")
                .expression_attribute_names("#pk", attrs::ORDER_DATE)
                .expression_attribute_values(":pk", AttributeValue::S(order_date.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| {
                    let err = DatabaseError::from_sdk("query", e);
                    error!(order_date = %order_date, error = %err, "failed to query orders by date");
                    err
                })?;

            orders.extend(Self::parse_items(page.items.unwrap_or_default())?);
            match page.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        info!(order_date = %order_date, count = orders.len(), "orders loaded for date");
        Ok(orders)
    }

    async fn find_order_by_id(&self, order_id: &str) -> Result<Option<Order>, DatabaseError> {
        let mut start_key: Option<Item> = None;
        let mut pages = 0_u32;

        loop {
            let page = self
                .client
                .scan()
                .table_name(&self.table_name)
                .filter_expression("#id = :id")
                .expression_attribute_names("#id", attrs::ORDER_ID)
                .expression_attribute_values(":id", AttributeValue::S(order_id.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| {
                    let err = DatabaseError::from_sdk("scan", e);
                    error!(order_id = %order_id, error = %err, "failed to scan orders");
                    err
                })?;
            pages += 1;

            if let Some(item) = page.items.unwrap_or_default().into_iter().next() {
                let order = Order::from_item(&item)?;
                debug!(order_id = %order_id, pages, "order found by scan");
                return Ok(Some(order));
            }
            match page.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        warn!(order_id = %order_id, pages, "order not found by scan");
        Ok(None)
    }
}
