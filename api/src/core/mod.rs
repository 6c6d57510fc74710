pub mod app_state;
pub mod client_identity;
pub mod http;
pub mod rate_limiter;
