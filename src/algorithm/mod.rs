//! 图算法模块
//!
//! 路径系统及其上的路径提取

pub mod path_system;

pub use path_system::{Hop, PathSystem};
