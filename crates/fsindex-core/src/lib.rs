pub mod cli;
pub mod error;
pub mod filter;
pub mod logging;

pub use cli::{parse_args, Args, ColorMode};
pub use error::{IndexError, IndexResult};
pub use filter::FilterConfig;
pub use logging::init_logging;
