use serde::{Deserialize, Deserializer};

/// Number-or-string identifiers arrive in both forms depending on the
/// webhook serializer version.
pub(crate) fn deserialize_id_flexible<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrInt {
        String(String),
        Int(i64),
    }

    let value = Option::<StringOrInt>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        StringOrInt::String(s) => s,
        StringOrInt::Int(i) => i.to_string(),
    }))
}

/// Order object delivered by the orders/paid webhook. Everything except `id`
/// is optional; the relay degrades field by field.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderWebhook {
    #[serde(default, deserialize_with = "deserialize_id_flexible")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub order_number: Option<i64>,
    pub financial_status: Option<String>,
    #[serde(default)]
    pub line_items: Vec<OrderLineItem>,
    pub shipping_address: Option<OrderAddress>,
    pub billing_address: Option<OrderAddress>,
    pub customer: Option<OrderCustomer>,
    pub total_price: Option<String>,
    pub subtotal_price: Option<String>,
    pub total_shipping_price: Option<String>,
    pub total_shipping_price_set: Option<PriceSet>,
    pub currency: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl OrderWebhook {
    /// Human-readable order label, e.g. `#9663`.
    pub fn label(&self, fallback: &str) -> String {
        self.name
            .clone()
            .or_else(|| self.order_number.map(|n| n.to_string()))
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Shipping total, preferring the money-set form over the flat field.
    pub fn shipping_total(&self) -> Option<String> {
        self.total_shipping_price_set
            .as_ref()
            .and_then(|set| set.shop_money.as_ref())
            .and_then(|money| money.amount.clone())
            .or_else(|| self.total_shipping_price.clone())
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct OrderLineItem {
    #[serde(default, deserialize_with = "deserialize_id_flexible")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "deserialize_id_flexible")]
    pub variant_id: Option<String>,
    pub price: Option<String>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct OrderAddress {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct OrderCustomer {
    #[serde(default, deserialize_with = "deserialize_id_flexible")]
    pub id: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceSet {
    pub shop_money: Option<Money>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Money {
    pub amount: Option<String>,
}
