pub mod derivative_handlers;

pub use derivative_handlers::*;
