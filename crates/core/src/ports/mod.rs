mod block_source;
mod handler;
mod store;

pub use block_source::*;
pub use handler::*;
pub use store::*;
