// Adapters layer: concrete CRM sources (live HTTP API, recorded fixtures).

pub mod fixture;
pub mod http;

pub use fixture::{FixtureData, FixtureSource};
pub use http::PipedriveClient;
