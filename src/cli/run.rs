// src/cli/run.rs
//! 主流程 - 拉取日历、构建时间线、输出或等待
//!
//! 模板在拉取日历之前编译，模板错误不会触发任何网络请求。

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use clap::Args;
use tracing::{debug, info};

use crate::calendar::{CalendarParser, IcalCalendarParser, Window};
use crate::config::{parse_duration, AppConfig, DEFAULT_DURATION};
use crate::error::{self, Error};
use crate::infra::{fetch_calendar, CalendarSource, DEFAULT_FETCH_TIMEOUT_SECS};
use crate::notification::{Renderer, BATCH_FORMAT, MESSAGE_FORMAT};
use crate::scheduler::{DryRunSleeper, Scheduler, Sleeper, ThreadSleeper};
use crate::timeline::{validate_date_format, TimelineBuilder, DEFAULT_DATE_FORMAT};

/// 命令行参数
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// 日历地址：http(s) URL、文件路径，或 `-` 表示 stdin（默认 stdin）
    pub source: Option<String>,

    /// 窗口起点，epoch 秒（0 表示当前时间）
    #[arg(long, default_value_t = 0)]
    pub start: i64,

    /// 窗口长度，如 24h、1h30m、90s（默认 24h）
    #[arg(long)]
    pub duration: Option<String>,

    /// 输出模板（minijinja 语法）
    #[arg(long)]
    pub output_format: Option<String>,

    /// 日期格式（strftime 语法）
    #[arg(long)]
    pub date_format: Option<String>,

    /// 不真正睡眠，只输出 `sleep: <秒数>`
    #[arg(long)]
    pub dry_run: bool,

    /// 等待下一个事件边界，只输出这一组
    #[arg(long)]
    pub wait: bool,

    /// 最长等待秒数（0 表示不限制）
    #[arg(long)]
    pub wait_max: Option<u64>,

    /// 没有事件时的轮询间隔（秒）
    #[arg(long)]
    pub wait_min: Option<u64>,

    /// HTTP 超时（秒）
    #[arg(long)]
    pub timeout: Option<u64>,

    /// 配置文件路径（默认 ~/.config/ics-notify/config.json）
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 调试输出，可重复；-vv 会打印解析出的事件
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// 合并命令行与配置文件后的最终设置
#[derive(Debug, Clone)]
pub struct Settings {
    pub source: CalendarSource,
    pub window: Window,
    pub output_format: Option<String>,
    pub date_format: String,
    pub dry_run: bool,
    pub scheduler: Scheduler,
    pub fetch_timeout: Duration,
    pub verbose: u8,
}

impl Settings {
    /// 命令行参数优先，其次配置文件，最后默认值
    pub fn resolve(args: RunArgs, config: AppConfig, now: DateTime<Utc>) -> error::Result<Self> {
        let start = if args.start == 0 {
            now
        } else {
            Utc.timestamp_opt(args.start, 0)
                .single()
                .ok_or_else(|| Error::Config(format!("invalid start time {}", args.start)))?
        };

        let duration = args
            .duration
            .or(config.duration)
            .unwrap_or_else(|| DEFAULT_DURATION.to_string());
        let duration = chrono::Duration::from_std(parse_duration(&duration)?)
            .map_err(|e| Error::Config(format!("duration out of range: {}", e)))?;
        let window = Window::starting_at(start, duration)?;

        let date_format = args
            .date_format
            .or(config.date_format)
            .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
        validate_date_format(&date_format)?;

        let scheduler = Scheduler::new(
            args.wait,
            args.wait_min.or(config.wait_min).unwrap_or(0),
            args.wait_max.or(config.wait_max).unwrap_or(0),
        );

        let fetch_timeout = Duration::from_secs(
            args.timeout
                .or(config.fetch_timeout_secs)
                .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
        );

        Ok(Self {
            source: CalendarSource::parse(args.source.as_deref()),
            window,
            output_format: args.output_format.or(config.output_format),
            date_format,
            dry_run: args.dry_run,
            scheduler,
            fetch_timeout,
            verbose: args.verbose,
        })
    }

    /// 用户模板，未指定时按模式选择默认模板
    pub fn template_source(&self) -> &str {
        match (&self.output_format, self.scheduler) {
            (Some(format), _) if !format.is_empty() => format.as_str(),
            (_, Scheduler::BatchEmit) => BATCH_FORMAT,
            (_, Scheduler::SingleWait { .. }) => MESSAGE_FORMAT,
        }
    }
}

/// 解析 → 构建时间线 → 调度输出
pub fn run_pipeline<W: Write>(
    settings: &Settings,
    renderer: &Renderer,
    parser: &dyn CalendarParser,
    reader: &mut dyn BufRead,
    sleeper: &mut dyn Sleeper,
    out: &mut W,
) -> error::Result<()> {
    let events = parser.parse(reader, &settings.window)?;
    info!(events = events.len(), window_start = %settings.window.start(), "Calendar parsed");

    if settings.verbose > 1 {
        for event in &events {
            writeln!(out, "{:?}", event)?;
        }
        out.flush()?;
    }

    let timeline = TimelineBuilder::new(settings.window)
        .with_date_format(settings.date_format.as_str())
        .build(events);

    settings.scheduler.run(&timeline, renderer, sleeper, out)
}

/// 处理命令
pub fn handle_run(args: RunArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load_default(),
    };
    let settings = Settings::resolve(args, config, Utc::now())?;
    debug!(?settings, "Resolved settings");

    let renderer = Renderer::new(settings.template_source())?;

    let mut reader = fetch_calendar(&settings.source, settings.fetch_timeout)?;

    let mut sleeper: Box<dyn Sleeper> = if settings.dry_run {
        Box::new(DryRunSleeper::new())
    } else {
        Box::new(ThreadSleeper)
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_pipeline(
        &settings,
        &renderer,
        &IcalCalendarParser::new(),
        &mut reader,
        sleeper.as_mut(),
        &mut out,
    )
    .with_context(|| format!("failed to process {}", settings.source.name()))
}
