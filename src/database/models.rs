//! Order and Payment records and their DynamoDB item layout.
//!
//! Orders table: PK `DataPedido`, SK `Id`.
//! Payments table: PK `IdPedido`, SK `PaymentIntentId`.

use crate::database::error::DatabaseError;
use aws_sdk_dynamodb::types::AttributeValue;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

pub type Item = HashMap<String, AttributeValue>;

pub const ORDER_DATE_FORMAT: &str = "%Y-%m-%d";

pub mod attrs {
    pub const ORDER_DATE: &str = "DataPedido";
    pub const ORDER_ID: &str = "Id";
    pub const FULL_ORDER: &str = "PedidoCompleto";
    pub const TOTAL_AMOUNT: &str = "ValorTotal";
    pub const STATUS: &str = "Status";

    pub const PAYMENT_ORDER_ID: &str = "IdPedido";
    pub const PAYMENT_INTENT_ID: &str = "PaymentIntentId";
    pub const AMOUNT: &str = "Valor";
    pub const CURRENCY: &str = "Moeda";
    pub const CREATED_AT: &str = "DataCriacao";
    pub const UPDATED_AT: &str = "DataAtualizacao";
    pub const PAYMENT_URL: &str = "UrlPagamento";
    pub const GATEWAY_METADATA: &str = "MetadosPagamento";
}

/// Order written by the upstream order-placement process.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    /// Partition key, stored as written upstream (usually `YYYY-MM-DD`).
    pub order_date: String,
    pub id: String,
    /// Raw JSON of the full order; see [`OrderDetails`].
    pub full_order: String,
    pub total_amount: BigDecimal,
    pub status: String,
}

impl Order {
    pub fn date_key(date: NaiveDate) -> String {
        date.format(ORDER_DATE_FORMAT).to_string()
    }

    /// Parses the embedded order payload. Never fails: an unreadable payload
    /// yields `None`.
    pub fn details(&self) -> Option<OrderDetails> {
        serde_json::from_str(&self.full_order).ok()
    }

    pub fn to_item(&self) -> Item {
        let mut item = HashMap::new();
        item.insert(
            attrs::ORDER_DATE.to_string(),
            AttributeValue::S(self.order_date.clone()),
        );
        item.insert(attrs::ORDER_ID.to_string(), AttributeValue::S(self.id.clone()));
        item.insert(
            attrs::FULL_ORDER.to_string(),
            AttributeValue::S(self.full_order.clone()),
        );
        item.insert(
            attrs::TOTAL_AMOUNT.to_string(),
            AttributeValue::N(self.total_amount.to_string()),
        );
        item.insert(attrs::STATUS.to_string(), AttributeValue::S(self.status.clone()));
        item
    }

    pub fn from_item(item: &Item) -> Result<Self, DatabaseError> {
        Ok(Order {
            order_date: required_s(item, attrs::ORDER_DATE)?,
            id: required_s(item, attrs::ORDER_ID)?,
            full_order: optional_s(item, attrs::FULL_ORDER).unwrap_or_default(),
            total_amount: optional_n(item, attrs::TOTAL_AMOUNT)?.unwrap_or_default(),
            status: optional_s(item, attrs::STATUS).unwrap_or_default(),
        })
    }
}

/// Embedded order payload (`PedidoCompleto`). Every field is optional on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderDetails {
    #[serde(rename = "nome")]
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "telefone")]
    pub phone: Option<String>,
    #[serde(rename = "logradouro")]
    pub street: Option<String>,
    #[serde(rename = "numero")]
    pub number: Option<String>,
    #[serde(rename = "complemento")]
    pub complement: Option<String>,
    #[serde(rename = "bairro")]
    pub district: Option<String>,
    #[serde(rename = "cidade")]
    pub city: Option<String>,
    #[serde(rename = "estado")]
    pub state: Option<String>,
    #[serde(rename = "cep")]
    pub postal_code: Option<String>,
    #[serde(rename = "itens")]
    pub items: Vec<OrderItem>,
    #[serde(rename = "formasPagamento")]
    pub payment_methods: Vec<OrderPaymentMethod>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderItem {
    #[serde(rename = "nomeProduto")]
    pub product_name: Option<String>,
    #[serde(rename = "valor")]
    pub price: Option<BigDecimal>,
    #[serde(rename = "quantidade")]
    pub quantity: Option<i64>,
    #[serde(rename = "idSku")]
    pub sku_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderPaymentMethod {
    #[serde(rename = "tipo")]
    pub kind: Option<String>,
    #[serde(rename = "valor")]
    pub amount: Option<BigDecimal>,
    #[serde(rename = "parcelas")]
    pub installments: Option<i64>,
    #[serde(rename = "tokenCartao")]
    pub card_token: Option<String>,
    #[serde(rename = "bandeira")]
    pub card_brand: Option<String>,
    #[serde(rename = "chavePix")]
    pub pix_key: Option<String>,
    #[serde(rename = "tipoChavePix")]
    pub pix_key_type: Option<String>,
    #[serde(rename = "comprovantePix")]
    pub pix_receipt: Option<String>,
}

/// Local record of a payment intent created for an order.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub order_id: String,
    pub payment_intent_id: String,
    pub status: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    /// Rewritten on every save.
    pub updated_at: DateTime<Utc>,
    pub payment_url: String,
    /// Serialized gateway metadata (JSON object).
    pub gateway_metadata: String,
}

impl PaymentRecord {
    pub fn metadata_json(metadata: &BTreeMap<String, String>) -> String {
        serde_json::to_string(metadata).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn to_item(&self) -> Item {
        let mut item = HashMap::new();
        item.insert(
            attrs::PAYMENT_ORDER_ID.to_string(),
            AttributeValue::S(self.order_id.clone()),
        );
        item.insert(
            attrs::PAYMENT_INTENT_ID.to_string(),
            AttributeValue::S(self.payment_intent_id.clone()),
        );
        item.insert(attrs::STATUS.to_string(), AttributeValue::S(self.status.clone()));
        item.insert(
            attrs::AMOUNT.to_string(),
            AttributeValue::N(self.amount.to_string()),
        );
        item.insert(
            attrs::CURRENCY.to_string(),
            AttributeValue::S(self.currency.clone()),
        );
        item.insert(
            attrs::CREATED_AT.to_string(),
            AttributeValue::S(self.created_at.to_rfc3339()),
        );
        item.insert(
            attrs::UPDATED_AT.to_string(),
            AttributeValue::S(self.updated_at.to_rfc3339()),
        );
        item.insert(
            attrs::PAYMENT_URL.to_string(),
            AttributeValue::S(self.payment_url.clone()),
        );
        item.insert(
            attrs::GATEWAY_METADATA.to_string(),
            AttributeValue::S(self.gateway_metadata.clone()),
        );
        item
    }

    pub fn from_item(item: &Item) -> Result<Self, DatabaseError> {
        Ok(PaymentRecord {
            order_id: required_s(item, attrs::PAYMENT_ORDER_ID)?,
            payment_intent_id: required_s(item, attrs::PAYMENT_INTENT_ID)?,
            status: optional_s(item, attrs::STATUS).unwrap_or_default(),
            amount: optional_n(item, attrs::AMOUNT)?.unwrap_or_default(),
            currency: optional_s(item, attrs::CURRENCY).unwrap_or_default(),
            created_at: optional_timestamp(item, attrs::CREATED_AT)?.unwrap_or_else(Utc::now),
            updated_at: optional_timestamp(item, attrs::UPDATED_AT)?.unwrap_or_else(Utc::now),
            payment_url: optional_s(item, attrs::PAYMENT_URL).unwrap_or_default(),
            gateway_metadata: optional_s(item, attrs::GATEWAY_METADATA)
                .unwrap_or_else(|| "{}".to_string()),
        })
    }
}

fn optional_s(item: &Item, name: &str) -> Option<String> {
    match item.get(name) {
        Some(AttributeValue::S(value)) => Some(value.clone()),
        _ => None,
    }
}

fn required_s(item: &Item, name: &str) -> Result<String, DatabaseError> {
    optional_s(item, name)
        .ok_or_else(|| DatabaseError::serialization(format!("missing string attribute {}", name)))
}

fn optional_n(item: &Item, name: &str) -> Result<Option<BigDecimal>, DatabaseError> {
    match item.get(name) {
        Some(AttributeValue::N(raw)) | Some(AttributeValue::S(raw)) => BigDecimal::from_str(raw)
            .map(Some)
            .map_err(|e| DatabaseError::serialization(format!("invalid number in {}: {}", name, e))),
        _ => Ok(None),
    }
}

fn optional_timestamp(item: &Item, name: &str) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    match optional_s(item, name) {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| {
                DatabaseError::serialization(format!("invalid timestamp in {}: {}", name, e))
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order {
            order_date: "2024-01-01".to_string(),
            id: "P1".to_string(),
            full_order: r#"{"nome":"Ana","email":"ana@example.com","itens":[{"nomeProduto":"Livro","valor":10.5,"quantidade":2,"idSku":7}],"formasPagamento":[]}"#.to_string(),
            total_amount: BigDecimal::from_str("21.00").expect("decimal"),
            status: "PENDENTE".to_string(),
        }
    }

    #[test]
    fn order_item_layout_uses_table_attribute_names() {
        let item = order().to_item();
        assert_eq!(
            item.get("DataPedido"),
            Some(&AttributeValue::S("2024-01-01".to_string()))
        );
        assert_eq!(item.get("Id"), Some(&AttributeValue::S("P1".to_string())));
        assert_eq!(
            item.get("ValorTotal"),
            Some(&AttributeValue::N("21.00".to_string()))
        );
        assert_eq!(Order::from_item(&item).expect("order"), order());
    }

    #[test]
    fn order_without_key_is_rejected() {
        let mut item = order().to_item();
        item.remove("Id");
        assert!(Order::from_item(&item).is_err());
    }

    #[test]
    fn order_details_parse_leniently() {
        let details = order().details().expect("details");
        assert_eq!(details.name.as_deref(), Some("Ana"));
        assert_eq!(details.items.len(), 1);
        assert_eq!(details.items[0].quantity, Some(2));
        assert!(details.payment_methods.is_empty());
        assert!(details.city.is_none());

        let broken = Order {
            full_order: "not json".to_string(),
            ..order()
        };
        assert!(broken.details().is_none());
    }

    #[test]
    fn date_key_is_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
        assert_eq!(Order::date_key(date), "2024-01-01");
    }

    #[test]
    fn payment_record_item_layout() {
        let now = DateTime::parse_from_rfc3339("2024-01-01T10:00:00Z")
            .expect("ts")
            .with_timezone(&Utc);
        let record = PaymentRecord {
            order_id: "P1".to_string(),
            payment_intent_id: "pi_123".to_string(),
            status: "requires_payment_method".to_string(),
            amount: BigDecimal::from_str("10.00").expect("decimal"),
            currency: "brl".to_string(),
            created_at: now,
            updated_at: now,
            payment_url: "https://checkout.stripe.com/pay/pi_123".to_string(),
            gateway_metadata: r#"{"id_pedido":"P1"}"#.to_string(),
        };

        let item = record.to_item();
        assert_eq!(item.get("IdPedido"), Some(&AttributeValue::S("P1".to_string())));
        assert_eq!(
            item.get("PaymentIntentId"),
            Some(&AttributeValue::S("pi_123".to_string()))
        );
        assert!(item.contains_key("MetadosPagamento"));
        assert_eq!(PaymentRecord::from_item(&item).expect("record"), record);
    }
}
