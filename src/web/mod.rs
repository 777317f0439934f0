//! Outbound HTTP: named rate limiters, retry policy and the request primitive.

pub mod ratelimit;
pub mod retry;
pub mod transport;

pub use ratelimit::{RateLimiter, RateLimiterRegistry};
pub use retry::RetryPolicy;
pub use transport::{join_url, HttpClient, RequestOptions, ResponseHead, WebError};
