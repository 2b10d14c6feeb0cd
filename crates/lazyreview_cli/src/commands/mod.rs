//! One module per subcommand.

pub mod fix;
pub mod import;
pub mod review;
pub mod stats;
pub mod sync;
pub mod today;
