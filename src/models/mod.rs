pub mod audit_log;
pub mod logistic_center;
pub mod session;
