pub mod error;
pub mod gateway;
pub mod plan;
pub mod shopping;
