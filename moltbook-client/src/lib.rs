pub mod api;
pub mod envelope;
pub mod http;
pub mod rate_limit;
pub mod retry;
pub mod transcript;

pub use api::*;
pub use envelope::*;
pub use http::*;
pub use rate_limit::*;
pub use retry::*;
pub use transcript::*;

pub use reqwest::Method;
