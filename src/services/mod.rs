pub mod bulk_actions;
pub mod cache;
pub mod notify;
pub mod payment_events;
pub mod refund_flow;
pub mod webhook_ingest;
