//! 调度 - 决定输出全部通知，还是睡到下一个边界再输出一组
//!
//! 两种策略在启动时选定（[`Scheduler`]）：
//! - `BatchEmit`：按时间顺序渲染全部通知
//! - `SingleWait`：计算睡眠时长，睡醒后只输出最早的一组
//!
//! 睡眠通过 [`Sleeper`] 完成，dry-run 模式下只记录时长不阻塞。

use std::io::Write;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::Result;
use crate::notification::{Notification, Renderer};
use crate::timeline::Timeline;

/// 一次调度的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitDecision<'a> {
    /// 需要睡眠的秒数
    pub sleep_seconds: u64,
    /// 睡醒后要输出的通知组
    pub emit: Option<&'a [Notification]>,
}

/// 计算等待时长
///
/// - 时间线为空：睡 `wait_min` 秒后返回，由调用方重新拉取
/// - 最早的边界超过 `wait_max`（`wait_max > 0` 时生效）：只睡 `wait_max`，不输出
/// - 否则睡到边界（已过去的边界不睡），然后输出该组
pub fn decide(timeline: &Timeline, wait_min: u64, wait_max: u64) -> WaitDecision<'_> {
    let Some(group) = timeline.first_group() else {
        return WaitDecision {
            sleep_seconds: wait_min,
            emit: None,
        };
    };

    let seconds = u64::try_from(group[0].offset).unwrap_or(0);
    if wait_max > 0 && seconds > wait_max {
        return WaitDecision {
            sleep_seconds: wait_max,
            emit: None,
        };
    }

    WaitDecision {
        sleep_seconds: seconds,
        emit: Some(group),
    }
}

/// 睡眠能力
pub trait Sleeper {
    fn sleep(&mut self, seconds: u64, out: &mut dyn Write) -> Result<()>;
}

/// 阻塞当前线程
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, seconds: u64, _out: &mut dyn Write) -> Result<()> {
        debug!(seconds, "Sleeping");
        thread::sleep(Duration::from_secs(seconds));
        Ok(())
    }
}

/// dry-run：输出 `sleep: <n>` 并记录请求的时长
#[derive(Debug, Default, Clone)]
pub struct DryRunSleeper {
    requested: Vec<u64>,
}

impl DryRunSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> &[u64] {
        &self.requested
    }
}

impl Sleeper for DryRunSleeper {
    fn sleep(&mut self, seconds: u64, out: &mut dyn Write) -> Result<()> {
        self.requested.push(seconds);
        writeln!(out, "sleep: {}", seconds)?;
        out.flush()?;
        Ok(())
    }
}

/// 输出策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduler {
    BatchEmit,
    SingleWait { wait_min: u64, wait_max: u64 },
}

impl Scheduler {
    pub fn new(wait: bool, wait_min: u64, wait_max: u64) -> Self {
        if wait {
            Scheduler::SingleWait { wait_min, wait_max }
        } else {
            Scheduler::BatchEmit
        }
    }

    pub fn run<W: Write>(
        &self,
        timeline: &Timeline,
        renderer: &Renderer,
        sleeper: &mut dyn Sleeper,
        out: &mut W,
    ) -> Result<()> {
        match *self {
            Scheduler::BatchEmit => {
                for (_, group) in timeline.groups() {
                    renderer.render(group, out)?;
                }
                Ok(())
            }
            Scheduler::SingleWait { wait_min, wait_max } => {
                let decision = decide(timeline, wait_min, wait_max);
                info!(
                    sleep_seconds = decision.sleep_seconds,
                    emit = decision.emit.is_some(),
                    "Wait decision"
                );
                sleeper.sleep(decision.sleep_seconds, &mut *out)?;
                match decision.emit {
                    Some(group) => renderer.render(group, out),
                    None => Ok(()),
                }
            }
        }
    }
}
