//! CLI 命令行参数解析
//!
//! 使用 clap 定义 `cfd-intent` 的命令行接口

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cfd-intent", version, about = "Cooling-plate CFD intent normalization service")]
pub struct Cli {
    /// 配置文件路径（默认 cfd-intent.toml）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 日志级别或过滤表达式，未指定时读取 RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// 额外写入的日志文件
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// 启动 HTTP 服务
    Serve {
        /// 监听地址，覆盖 CFD_BIND
        #[arg(long)]
        bind: Option<String>,
    },

    /// 列出内置 profile
    Profiles,

    /// 校验一个 intent JSON 文件
    Validate {
        /// intent 文件路径
        file: PathBuf,
        /// profile slug；未指定时按 intent.profile 推断
        #[arg(long)]
        profile: Option<String>,
    },
}
