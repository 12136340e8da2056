//! HTTP implementation of the payments API

pub mod http;

pub use http::HttpPaymentsApi;
