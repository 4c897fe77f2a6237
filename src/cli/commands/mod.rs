//! CLI command implementations.

mod ask;
mod collections;
mod config;
mod doctor;
mod index;
mod listen;
mod search;
mod serve;
mod templates;

pub use ask::run_ask;
pub use collections::run_collections;
pub use config::run_config;
pub use doctor::run_doctor;
pub use index::run_index;
pub use listen::run_listen;
pub use search::run_search;
pub use serve::{router, run_serve};
pub use templates::run_templates;
