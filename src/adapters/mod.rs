pub mod api_errors;
pub mod internal;
pub mod razorpay;
pub mod routes;
pub mod stripe;
