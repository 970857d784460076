//! Order record → gateway create request.

use crate::database::models::{Order, OrderDetails};
use crate::payments::types::CreatePaymentRequest;
use bigdecimal::BigDecimal;
use std::collections::BTreeMap;

pub fn payment_description(order_id: &str) -> String {
    format!("Pagamento do pedido {}", order_id)
}

/// Total formatted with exactly two decimals, e.g. `21.00`.
pub fn format_total(total: &BigDecimal) -> String {
    total.round(2).with_scale(2).to_string()
}

/// Metadata derived from the order. Keys match what downstream consumers
/// read back from the gateway (`id_pedido`, `nome_cliente`, ...).
pub fn base_metadata(order: &Order, details: Option<&OrderDetails>) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("id_pedido".to_string(), order.id.clone());
    metadata.insert("data_pedido".to_string(), order.order_date.clone());
    metadata.insert("status_pedido".to_string(), order.status.clone());
    metadata.insert("valor_total".to_string(), format_total(&order.total_amount));
    metadata.insert(
        "nome_cliente".to_string(),
        details.and_then(|d| d.name.clone()).unwrap_or_default(),
    );

    if let Some(details) = details {
        let fields = [
            ("email_cliente", &details.email),
            ("telefone_cliente", &details.phone),
            ("cidade_cliente", &details.city),
            ("estado_cliente", &details.state),
        ];
        for (key, value) in fields {
            metadata.insert(key.to_string(), value.clone().unwrap_or_default());
        }
        metadata.insert(
            "quantidade_itens".to_string(),
            details.items.len().to_string(),
        );
        metadata.insert(
            "quantidade_formas_pagamento".to_string(),
            details.payment_methods.len().to_string(),
        );
    }

    metadata
}

/// Builds the create request. Caller metadata is applied last and wins on
/// key collisions. An unreadable embedded payload only empties the customer
/// fields.
pub fn build_create_request(
    order: &Order,
    currency: &str,
    caller_metadata: &BTreeMap<String, String>,
) -> CreatePaymentRequest {
    let details = order.details();

    let mut metadata = base_metadata(order, details.as_ref());
    for (key, value) in caller_metadata {
        metadata.insert(key.clone(), value.clone());
    }

    CreatePaymentRequest {
        order_id: order.id.clone(),
        amount: order.total_amount.clone(),
        currency: currency.to_string(),
        description: payment_description(&order.id),
        receipt_email: details
            .as_ref()
            .and_then(|d| d.email.clone())
            .unwrap_or_default(),
        customer_name: details
            .as_ref()
            .and_then(|d| d.name.clone())
            .unwrap_or_default(),
        metadata,
    }
}
