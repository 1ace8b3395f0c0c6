//! Runtime-facing components: the UNIX-socket HTTP client (B), image
//! reference helpers, and the metadata resolver (D).

pub mod http_client;
pub mod image;
pub mod resolver;

pub use http_client::{HttpOutcome, RuntimeHttpClient};
pub use resolver::{ResolveOutcome, RuntimeResolver};
