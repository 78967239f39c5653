mod derivative_errors;
mod signing_errors;
mod storage_errors;
mod validation_errors;

pub use derivative_errors::*;
pub use signing_errors::*;
pub use storage_errors::*;
pub use validation_errors::*;
