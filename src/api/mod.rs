pub mod admin;
pub mod wallet;
pub mod webhooks;
