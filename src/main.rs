//! ics-notify CLI
//!
//! 读取 iCalendar 日历，输出事件开始/结束通知，或睡到下一个事件边界再输出。

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use ics_notify::cli::{handle_run, RunArgs};

#[derive(Parser)]
#[command(name = "icn")]
#[command(about = "ics-notify - 日历事件开始/结束通知")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化 tracing 日志系统
    // RUST_LOG 优先，否则按 -v 次数决定级别
    // 例如: RUST_LOG=debug icn --wait https://example.com/cal.ics
    let default_level = match cli.run.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ics_notify={0},icn={0}", default_level)));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    handle_run(cli.run)
}
