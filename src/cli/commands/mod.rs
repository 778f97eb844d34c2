//! CLI command implementations.

mod ask;
mod config;
mod index;
mod list;
mod search;
mod serve;

pub use ask::run_ask;
pub use config::run_config;
pub use index::run_index;
pub use list::run_list;
pub use search::run_search;
pub use serve::run_serve;
