//! 等待调度测试
//!
//! 用 DryRunSleeper 代替真实睡眠，验证等待时长和输出。

use chrono::{DateTime, TimeZone, Utc};
use ics_notify::{
    decide, DryRunSleeper, RawEvent, Renderer, Scheduler, Timeline, TimelineBuilder, Window,
};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn timeline(window_start: i64, events: Vec<RawEvent>) -> Timeline {
    TimelineBuilder::new(Window::new(at(window_start), at(window_start + 86_400)).unwrap())
        .with_date_format("%s")
        .build(events)
}

// ============================================================================
// decide
// ============================================================================

mod decide_tests {
    use super::*;

    #[test]
    fn test_empty_timeline_sleeps_wait_min() {
        let timeline = Timeline::default();
        let decision = decide(&timeline, 60, 0);
        assert_eq!(decision.sleep_seconds, 60);
        assert!(decision.emit.is_none());
    }

    #[test]
    fn test_sleeps_until_next_boundary() {
        let tl = timeline(1000, vec![RawEvent::new(at(1300), at(1400), "A")]);
        let decision = decide(&tl, 0, 0);
        assert_eq!(decision.sleep_seconds, 300);
        let group = decision.emit.unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group[0].epoch, 1300);
    }

    #[test]
    fn test_wait_max_caps_and_suppresses() {
        // Given: 下一个边界在 300 秒后，wait_max = 120
        let tl = timeline(1000, vec![RawEvent::new(at(1300), at(1400), "A")]);
        let decision = decide(&tl, 0, 120);

        // Then: 只睡 120 秒，不输出
        assert_eq!(decision.sleep_seconds, 120);
        assert!(decision.emit.is_none());
    }

    #[test]
    fn test_wait_max_not_exceeded() {
        let tl = timeline(1000, vec![RawEvent::new(at(1300), at(1400), "A")]);
        let decision = decide(&tl, 0, 300);
        assert_eq!(decision.sleep_seconds, 300);
        assert!(decision.emit.is_some());
    }

    #[test]
    fn test_past_boundary_does_not_sleep() {
        // 事件已经开始，唯一的边界是 -50 秒的结束（超出 wait_max 也不影响）
        let tl = timeline(1000, vec![RawEvent::new(at(500), at(950), "A")]);
        let decision = decide(&tl, 10, 5);
        assert_eq!(decision.sleep_seconds, 0);
        assert_eq!(decision.emit.unwrap()[0].offset, -50);
    }
}

// ============================================================================
// Scheduler 策略
// ============================================================================

mod strategy {
    use super::*;

    fn run(scheduler: Scheduler, tl: &Timeline, template: &str) -> (String, Vec<u64>) {
        let renderer = Renderer::new(template).unwrap();
        let mut sleeper = DryRunSleeper::new();
        let mut out = Vec::new();
        scheduler.run(tl, &renderer, &mut sleeper, &mut out).unwrap();
        (String::from_utf8(out).unwrap(), sleeper.requested().to_vec())
    }

    #[test]
    fn test_batch_emit_renders_everything_without_sleeping() {
        let tl = timeline(
            1000,
            vec![
                RawEvent::new(at(1100), at(1200), "A"),
                RawEvent::new(at(1150), at(1200), "B"),
            ],
        );
        let (out, slept) = run(Scheduler::BatchEmit, &tl, "{{ epoch }} {{ kind }} {{ summary }}\n");
        assert_eq!(out, "1100 start A\n1150 start B\n1200 end A\n1200 end B\n");
        assert!(slept.is_empty());
    }

    #[test]
    fn test_single_wait_emits_first_group_only() {
        let tl = timeline(
            1000,
            vec![
                RawEvent::new(at(1100), at(1200), "A"),
                RawEvent::new(at(1100), at(1300), "B"),
            ],
        );
        let scheduler = Scheduler::SingleWait { wait_min: 0, wait_max: 0 };
        let (out, slept) = run(scheduler, &tl, "{{ kind }} {{ summary }}\n");
        assert_eq!(out, "sleep: 100\nstart A\nstart B\n");
        assert_eq!(slept, vec![100]);
    }

    #[test]
    fn test_single_wait_capped_emits_nothing() {
        let tl = timeline(1000, vec![RawEvent::new(at(5000), at(6000), "A")]);
        let scheduler = Scheduler::SingleWait { wait_min: 0, wait_max: 600 };
        let (out, slept) = run(scheduler, &tl, "{{ summary }}\n");
        assert_eq!(out, "sleep: 600\n");
        assert_eq!(slept, vec![600]);
    }

    #[test]
    fn test_single_wait_empty_polls() {
        let scheduler = Scheduler::SingleWait { wait_min: 45, wait_max: 600 };
        let (out, slept) = run(scheduler, &Timeline::default(), "{{ summary }}\n");
        assert_eq!(out, "sleep: 45\n");
        assert_eq!(slept, vec![45]);
    }

    #[test]
    fn test_render_error_keeps_flushed_output() {
        // 第二条通知渲染失败，第一条已经输出
        let tl = timeline(
            1000,
            vec![
                RawEvent::new(at(1100), at(1200), "ok"),
                RawEvent::new(at(1150), at(1200), "bad"),
            ],
        );
        let template = "{% if summary == \"bad\" %}{{ matches(\"[\", summary) }}{% endif %}{{ summary }}\n";
        let renderer = Renderer::new(template).unwrap();
        let mut sleeper = DryRunSleeper::new();
        let mut out = Vec::new();

        let result = Scheduler::BatchEmit.run(&tl, &renderer, &mut sleeper, &mut out);
        assert!(matches!(result, Err(ics_notify::Error::Render(_))));
        assert_eq!(String::from_utf8(out).unwrap(), "ok\n");
    }
}
