//! 工具模块
//!
//! 提供各种工具函数和辅助功能

pub mod json_text;
pub mod logger;
