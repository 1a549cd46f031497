//! 交互式命令行支持
//!
//! 补全、结果打印和控制台命令，由 `greql-cli` 使用

pub mod commands;
pub mod completer;
pub mod printer;

pub use commands::{execute_console_command, is_console_command, CommandResult, ConsoleState};
pub use completer::GreqlCompleter;
pub use printer::{check_vertical_display, PrintMode, Printer, ResultGrid};
