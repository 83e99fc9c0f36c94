/// Handlers
///
/// Entry points that drive the tracker: the periodic scan scheduler and the
/// chat command dispatcher.

pub mod command_handler;
pub mod scan_handler;

pub use command_handler::{Command, CommandHandler};
pub use scan_handler::ScanScheduler;
