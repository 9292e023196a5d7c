const ORDER_GID_PREFIX: &str = "gid://shopify/Order/";

/// Numeric order id from either a bare id or an admin-API global id.
pub fn order_id_from_gid(raw: &str) -> String {
    raw.strip_prefix(ORDER_GID_PREFIX).unwrap_or(raw).to_string()
}

/// Global id form expected by the admin GraphQL API.
pub fn order_gid(order_id: &str) -> String {
    if order_id.starts_with(ORDER_GID_PREFIX) {
        order_id.to_string()
    } else {
        format!("{}{}", ORDER_GID_PREFIX, order_id)
    }
}
