//! Watch stream support shared by the server and API layers.

mod filter;

pub use filter::NamespaceFilter;
