//! URL handling: domain keys, normalization, candidate filters
//!
//! Everything that decides whether a string of bytes is a crawlable URL and
//! which domain bucket it belongs to lives here.

mod domain;
mod filters;
mod normalize;

pub use domain::{add_https_protocol, domain_key, host_matches, sub_domain_key};
pub use filters::UrlFilters;
pub use normalize::normalize_url;
