pub mod dispatcher;
pub mod health;
pub mod rate_limiter;
pub mod webhook;
