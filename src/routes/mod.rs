pub mod health;
pub mod logistics_webhook;
pub mod logs;
pub mod orders_paid;
