//! Helper functions shared by the loader, generator and server

mod date;
mod url;

pub use date::*;
pub use url::*;
