//! Static files from `public/`, embedded at build time

mod router;

pub use router::static_handler;
