pub mod achievement;
pub mod endpoint;
pub mod event;
pub mod health;
pub mod payload;
pub mod report;
pub mod retry;
pub mod status;
pub mod template;
pub mod validation;
pub mod world;
