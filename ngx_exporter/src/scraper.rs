//! Parse nginx status reports into measurements
//!
//! Two report formats are understood: the plain-text `stub_status` page and
//! the nginx plus JSON status document. Both parsers take a body and a base
//! label set and push [`crate::measurement::Measurement`]s to a caller
//! supplied output.

use serde::Deserialize;

pub mod plus;
pub mod stub_status;

#[derive(thiserror::Error, Debug)]
/// Errors produced by either scraper
pub enum Error {
    /// See [`crate::scraper::stub_status::Error`] for details.
    #[error("error scraping nginx stats: {0}")]
    StubStatus(#[from] stub_status::Error),
    /// See [`crate::scraper::plus::Error`] for details.
    #[error("error scraping nginx plus stats: {0}")]
    Plus(#[from] plus::Error),
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
/// The report format served by an endpoint
pub enum Format {
    /// `ngx_http_stub_status_module` plain-text page.
    StubStatus,
    /// nginx plus `ngx_http_status_module` JSON document.
    Plus,
}

impl Format {
    /// The content type the endpoint must declare, if any.
    #[must_use]
    pub fn expected_content_type(self) -> Option<&'static str> {
        match self {
            Format::StubStatus => None,
            Format::Plus => Some("application/json"),
        }
    }
}
