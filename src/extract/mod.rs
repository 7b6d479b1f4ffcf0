//! Site-independent extraction primitives shared by every source.

pub mod bundles;
pub mod detector;
pub mod embedded;
pub mod links;
pub mod rules;
pub mod text;

pub use detector::{looks_like_event, EventDetector};
pub use bundles::{endpoints_in_bundle, script_sources};
pub use links::{extract_links, resolve_url, site_domain, LinkFilter};
pub use rules::{first_match, Rule};
