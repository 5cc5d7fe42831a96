pub mod retry;

#[cfg(test)]
pub(crate) mod test_server;

pub use retry::{is_http_retryable, is_transport_retryable, retry_with_backoff, RetryConfig};
