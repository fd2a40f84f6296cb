//! iCalendar 解析 - 把 VEVENT 转换为 [`RawEvent`]
//!
//! 语法层交给 `ical` crate（负责折行展开和属性拆分），这里只负责：
//! - 解析 DTSTART / DTEND / DURATION（UTC、TZID、浮动时间、全天日期）
//! - 展开 RRULE（扣除 EXDATE），见 [`super::recurrence`]
//! - 按时间窗口过滤事件
//! - 还原 `\,` 和 `\;` 转义（`\n` 留给 timeline 处理）

use std::io::BufRead;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use ical::parser::ical::component::IcalEvent;
use ical::property::Property;
use regex::Regex;
use tracing::{debug, warn};

use super::event::{RawEvent, Window};
use super::recurrence::Recurrence;
use crate::error::{Error, Result};

/// 日历解析能力
pub trait CalendarParser {
    /// 解析日历流，只返回与 `window` 有交集的事件
    fn parse(&self, reader: &mut dyn BufRead, window: &Window) -> Result<Vec<RawEvent>>;
}

/// 基于 `ical` crate 的解析器
#[derive(Debug, Default, Clone, Copy)]
pub struct IcalCalendarParser;

impl IcalCalendarParser {
    pub fn new() -> Self {
        Self
    }
}

impl CalendarParser for IcalCalendarParser {
    fn parse(&self, reader: &mut dyn BufRead, window: &Window) -> Result<Vec<RawEvent>> {
        let mut events = Vec::new();

        for calendar in ical::IcalParser::new(reader) {
            let calendar = calendar.map_err(|e| Error::Parse(e.to_string()))?;

            for ical_event in &calendar.events {
                let Some((event, recurrence)) = convert_event(ical_event)? else {
                    continue;
                };
                let instances = match recurrence {
                    Some(recurrence) => recurrence.expand(&event, window),
                    None => vec![event],
                };
                for event in instances {
                    if !window.overlaps(event.start, event.end) {
                        debug!(summary = %event.summary, start = %event.start, "Event outside window, skipped");
                        continue;
                    }
                    events.push(event);
                }
            }
        }

        debug!(count = events.len(), "Parsed calendar events");
        Ok(events)
    }
}

/// 转换单个 VEVENT（第一次发生）及其重复规则；没有 DTSTART 的事件返回 `None`
fn convert_event(event: &IcalEvent) -> Result<Option<(RawEvent, Option<Recurrence>)>> {
    let mut uid = None;
    let mut summary = String::new();
    let mut description = None;
    let mut location = None;
    let mut dtstart = None;
    let mut dtend = None;
    let mut duration = None;
    let mut rrule = None;
    let mut exdates = Vec::new();

    for property in &event.properties {
        match property.name.as_str() {
            "UID" => uid = property.value.clone(),
            "SUMMARY" => summary = property.value.as_deref().map(unescape_text).unwrap_or_default(),
            "DESCRIPTION" => description = property.value.as_deref().map(unescape_text),
            "LOCATION" => location = property.value.as_deref().map(unescape_text),
            "DTSTART" => dtstart = Some(property),
            "DTEND" => dtend = Some(property),
            "DURATION" => duration = property.value.as_deref(),
            "RRULE" => rrule = property.value.as_deref(),
            "EXDATE" => exdates.push(property),
            _ => {}
        }
    }

    let Some(dtstart) = dtstart else {
        warn!(summary = %summary, "VEVENT without DTSTART, skipped");
        return Ok(None);
    };
    let (start, all_day) = parse_date_property(dtstart)?;

    let end = match (dtend, duration) {
        (Some(dtend), _) => parse_date_property(dtend)?.0,
        (None, Some(duration)) => start
            .checked_add_signed(parse_duration(duration)?)
            .ok_or_else(|| Error::Parse(format!("DURATION {:?} out of range", duration)))?,
        (None, None) if all_day => start
            .checked_add_signed(Duration::days(1))
            .ok_or_else(|| Error::Parse(format!("all-day event at {} out of range", start)))?,
        (None, None) => start,
    };

    let recurrence = match rrule {
        Some(rule) => {
            let mut excluded = Vec::new();
            for property in exdates {
                excluded.extend(parse_date_list(property)?);
            }
            Some(Recurrence::new(rrule_dtstart(dtstart, start, all_day), rule, excluded))
        }
        None => None,
    };

    let event = RawEvent {
        uid,
        start,
        end,
        summary,
        description,
        location,
    };
    Ok(Some((event, recurrence)))
}

/// 给 rrule 用的 DTSTART 行：已知 TZID 保留本地时间（跨夏令时不漂移），其余用 UTC
fn rrule_dtstart(property: &Property, start: DateTime<Utc>, all_day: bool) -> String {
    let value = property.value.as_deref().map(str::trim).unwrap_or_default();
    match param(property, "TZID") {
        Some(tzid) if !all_day && !value.ends_with('Z') && tzid.parse::<chrono_tz::Tz>().is_ok() => {
            format!("DTSTART;TZID={}:{}", tzid, value)
        }
        _ => format!("DTSTART:{}", start.format("%Y%m%dT%H%M%SZ")),
    }
}

fn param<'a>(property: &'a Property, name: &str) -> Option<&'a str> {
    property
        .params
        .as_ref()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(String::as_str)
}

fn property_value(property: &Property) -> Result<&str> {
    property
        .value
        .as_deref()
        .map(str::trim)
        .ok_or_else(|| Error::Parse(format!("{} has no value", property.name)))
}

/// 解析日期属性，返回 (UTC 时间, 是否全天)
fn parse_date_property(property: &Property) -> Result<(DateTime<Utc>, bool)> {
    parse_date_value(property, property_value(property)?)
}

/// 逗号分隔的日期列表（EXDATE）
fn parse_date_list(property: &Property) -> Result<Vec<DateTime<Utc>>> {
    property_value(property)?
        .split(',')
        .map(|value| parse_date_value(property, value.trim()).map(|(date, _)| date))
        .collect()
}

/// 按属性参数（VALUE、TZID）解析单个日期值
fn parse_date_value(property: &Property, value: &str) -> Result<(DateTime<Utc>, bool)> {
    let is_date = param(property, "VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
        || (value.len() == 8 && !value.contains('T'));

    let naive = if is_date {
        NaiveDate::parse_from_str(value, "%Y%m%d")
            .map_err(|e| Error::Parse(format!("{}: invalid date {:?}: {}", property.name, value, e)))?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| Error::Parse(format!("{}: invalid date {:?}", property.name, value)))?
    } else if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
            .map_err(|e| Error::Parse(format!("{}: invalid date-time {:?}: {}", property.name, value, e)))?;
        return Ok((Utc.from_utc_datetime(&naive), false));
    } else {
        NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
            .map_err(|e| Error::Parse(format!("{}: invalid date-time {:?}: {}", property.name, value, e)))?
    };

    let resolved = match param(property, "TZID") {
        Some(tzid) => match tzid.parse::<chrono_tz::Tz>() {
            Ok(tz) => tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            Err(_) => {
                warn!(tzid, "Unknown TZID, falling back to local time");
                Local.from_local_datetime(&naive).earliest().map(|dt| dt.with_timezone(&Utc))
            }
        },
        None => Local.from_local_datetime(&naive).earliest().map(|dt| dt.with_timezone(&Utc)),
    };

    let resolved = resolved.ok_or_else(|| {
        Error::Parse(format!("{}: {:?} does not exist in its time zone", property.name, value))
    })?;
    Ok((resolved, is_date))
}

static ISO_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-])?P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
        .expect("valid duration regex")
});

/// 解析 RFC 5545 DURATION（如 `PT1H30M`、`P1D`、`-PT15M`）
fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim();
    let caps = ISO_DURATION
        .captures(value)
        .filter(|_| value.len() > 1 && !value.ends_with('T'))
        .ok_or_else(|| Error::Parse(format!("invalid DURATION {:?}", value)))?;

    let out_of_range = || Error::Parse(format!("DURATION {:?} out of range", value));
    let field = |idx: usize| -> Result<i64> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse::<i64>().map_err(|_| out_of_range()),
            None => Ok(0),
        }
    };

    let mut seconds: i64 = 0;
    for (idx, unit) in [(2, 7 * 86_400), (3, 86_400), (4, 3_600), (5, 60), (6, 1)] {
        seconds = field(idx)?
            .checked_mul(unit)
            .and_then(|part| seconds.checked_add(part))
            .ok_or_else(out_of_range)?;
    }
    if caps.get(1).is_some_and(|m| m.as_str() == "-") {
        seconds = -seconds;
    }
    Duration::try_seconds(seconds).ok_or_else(out_of_range)
}

/// 还原 TEXT 值中的 `\,` 和 `\;`
fn unescape_text(value: &str) -> String {
    value.replace("\\,", ",").replace("\\;", ";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn window(start: i64, end: i64) -> Window {
        Window::new(
            Utc.timestamp_opt(start, 0).unwrap(),
            Utc.timestamp_opt(end, 0).unwrap(),
        )
        .unwrap()
    }

    fn parse(ics: &str, window: &Window) -> Result<Vec<RawEvent>> {
        let mut reader = Cursor::new(ics.as_bytes().to_vec());
        IcalCalendarParser::new().parse(&mut reader, window)
    }

    const ICS: &str = "BEGIN:VCALENDAR\r
VERSION:2.0\r
PRODID:-//Test//Test//EN\r
BEGIN:VEVENT\r
UID:one@example.com\r
SUMMARY:Team Meeting\\, weekly\r
DTSTART:20251208T100000Z\r
DTEND:20251208T110000Z\r
DESCRIPTION:Line one\\nLine two\r
LOCATION:Room A\\; 3rd floor\r
END:VEVENT\r
BEGIN:VEVENT\r
SUMMARY:Berlin standup\r
DTSTART;TZID=Europe/Berlin:20251208T120000\r
DURATION:PT15M\r
END:VEVENT\r
END:VCALENDAR\r
";

    #[test]
    fn test_parse_utc_and_tzid_events() {
        // 2025-12-08T00:00:00Z .. 2025-12-09T00:00:00Z
        let events = parse(ICS, &window(1_765_152_000, 1_765_238_400)).unwrap();
        assert_eq!(events.len(), 2);

        let first = &events[0];
        assert_eq!(first.uid.as_deref(), Some("one@example.com"));
        assert_eq!(first.summary, "Team Meeting, weekly");
        assert_eq!(first.start.timestamp(), 1_765_188_000);
        assert_eq!(first.end.timestamp(), 1_765_191_600);
        // \n 保留原样，交给 timeline 处理
        assert_eq!(first.description.as_deref(), Some("Line one\\nLine two"));
        assert_eq!(first.location.as_deref(), Some("Room A; 3rd floor"));

        // 12:00 Berlin (UTC+1) = 11:00 UTC
        let second = &events[1];
        assert_eq!(second.start.timestamp(), 1_765_191_600);
        assert_eq!(second.end.timestamp(), 1_765_191_600 + 900);
        assert!(second.description.is_none());
    }

    #[test]
    fn test_parse_filters_by_window() {
        // 窗口在两个事件之后
        let events = parse(ICS, &window(1_765_200_000, 1_765_300_000)).unwrap();
        assert!(events.is_empty());

        // 窗口只覆盖第一个事件的结束
        let events = parse(ICS, &window(1_765_190_000, 1_765_190_500)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Team Meeting, weekly");
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let ics = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:x\r\nDTSTART:not-a-date\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let err = parse(ics, &window(0, 10)).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_event_without_dtstart_is_skipped() {
        let ics = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:x\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        assert!(parse(ics, &window(0, 10)).unwrap().is_empty());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("PT1H30M").unwrap(), Duration::minutes(90));
        assert_eq!(parse_duration("P1D").unwrap(), Duration::days(1));
        assert_eq!(parse_duration("P2W").unwrap(), Duration::weeks(2));
        assert_eq!(parse_duration("-PT15M").unwrap(), Duration::minutes(-15));
        assert_eq!(parse_duration("P1DT1S").unwrap(), Duration::seconds(86_401));
        assert!(parse_duration("P").is_err());
        assert!(parse_duration("PT").is_err());
        assert!(parse_duration("1H").is_err());
    }

    #[test]
    fn test_parse_duration_out_of_range() {
        assert!(matches!(parse_duration("P999999999999D"), Err(Error::Parse(_))));
        assert!(matches!(parse_duration("P99999999999999999999W"), Err(Error::Parse(_))));
        assert!(matches!(parse_duration("PT9223372036854775807S"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_huge_event_duration_is_parse_error() {
        let ics = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:x\r\nDTSTART:20251208T100000Z\r\nDURATION:P999999999999D\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let err = parse(ics, &window(0, 10)).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    // 每周一 09:00 Berlin，从 2025-01-06 开始，2025-12-15 取消
    const WEEKLY_ICS: &str = "BEGIN:VCALENDAR\r
VERSION:2.0\r
BEGIN:VEVENT\r
UID:weekly@example.com\r
SUMMARY:Weekly sync\r
DTSTART;TZID=Europe/Berlin:20250106T090000\r
DTEND;TZID=Europe/Berlin:20250106T093000\r
RRULE:FREQ=WEEKLY;BYDAY=MO\r
EXDATE;TZID=Europe/Berlin:20251215T090000\r
END:VEVENT\r
END:VCALENDAR\r
";

    #[test]
    fn test_weekly_series_expanded_into_window() {
        // 2025-12-08（周一）00:00Z 起 24 小时；09:00 Berlin = 08:00Z
        let events = parse(WEEKLY_ICS, &window(1_765_152_000, 1_765_238_400)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Weekly sync");
        assert_eq!(events[0].start.timestamp(), 1_765_180_800);
        assert_eq!(events[0].end.timestamp(), 1_765_180_800 + 1_800);
    }

    #[test]
    fn test_weekly_series_honours_exdate() {
        // 2025-12-15 整天：这一次被 EXDATE 取消
        let events = parse(WEEKLY_ICS, &window(1_765_756_800, 1_765_843_200)).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_weekly_series_keeps_wall_clock_across_dst() {
        // 2025-07-07（周一）00:00Z 起 24 小时；夏令时 09:00 Berlin = 07:00Z
        let events = parse(WEEKLY_ICS, &window(1_751_846_400, 1_751_932_800)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start.timestamp(), 1_751_871_600);
    }

    #[test]
    fn test_unescape_text() {
        assert_eq!(unescape_text("a\\, b\\; c"), "a, b; c");
        assert_eq!(unescape_text("keep\\n"), "keep\\n");
    }
}
