//! Prelude for common imports used throughout all qrlaunch crates

pub use crate::error::{Error, FlowError, Result, ResultExt};
pub use tracing::{debug, error, info, trace, warn};
