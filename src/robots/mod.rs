//! Robots.txt handling: policy parsing and the per-domain cache

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::RobotsPolicy;
