//! Virtual-line resolution for include-expanded files.
//!
//! The engine inlines `<cfinclude>` targets into the file it analyzes and
//! reports line numbers against that concatenated virtual file. This module
//! rebuilds the include graph so a virtual line can be mapped back to the
//! real file and line it came from.

mod mapper;
mod mapping;
mod resolver;

pub use mapper::IncludeMapper;
pub use mapping::IncludeMapping;
pub use resolver::{IncludeResolver, ResolvedLocation};
