pub mod cashback;
pub mod error;
pub mod event;
pub mod gateway;
pub mod money;
pub mod order;
pub mod refund;
pub mod webhook;
