//! Configuration module

mod site;

pub use site::DraftVisibility;
pub use site::HighlightConfig;
pub use site::SiteConfig;
