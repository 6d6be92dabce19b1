//! 时间来源
//!
//! 所有 "今天" / "星期几" 的判断都以配置中固定的 UTC 偏移为准,
//! 不依赖运行环境的本地时区。测试中使用 [`FixedClock`] 固定当前时间。

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc, Weekday,
};
use std::sync::{Arc, Mutex};

pub type SharedClock = Arc<dyn Clock>;

pub trait Clock: Send + Sync {
    /// 当前时刻 (UTC)
    fn now(&self) -> DateTime<Utc>;

    /// 用于划分自然日的固定时区偏移
    fn offset(&self) -> FixedOffset;

    /// 基于同一时刻计算的 now / today / weekday
    fn reading(&self) -> ClockReading {
        ClockReading::new(self.now(), self.offset())
    }

    fn today(&self) -> NaiveDate {
        self.reading().today
    }

    fn today_weekday(&self) -> Weekday {
        self.reading().weekday
    }
}

/// 某一时刻的时钟读数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
    pub weekday: Weekday,
    offset: FixedOffset,
}

impl ClockReading {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let today = now.with_timezone(&offset).date_naive();
        Self {
            now,
            today,
            weekday: today.weekday(),
            offset,
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// 时间戳在固定时区下对应的自然日
    pub fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.offset).date_naive()
    }

    /// 今天在 UTC 下的半开区间 [当天零点, 次日零点)
    pub fn day_bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let local_midnight = self.today.and_time(NaiveTime::MIN);
        let utc_midnight =
            local_midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        let start = Utc.from_utc_datetime(&utc_midnight);
        (start, start + Duration::days(1))
    }
}

/// 解析 "+08:00" / "-0530" / "Z" / "UTC" 形式的时区偏移
pub fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// 系统时钟
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

/// 可手动设置的时钟, 用于可重复的测试
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Mutex::new(now),
            offset,
        }
    }

    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::new(now, Utc.fix())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("+08:00").unwrap().local_minus_utc(), 8 * 3600);
        assert_eq!(
            parse_utc_offset("-0530").unwrap().local_minus_utc(),
            -(5 * 3600 + 30 * 60)
        );
        assert_eq!(parse_utc_offset("UTC").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("08:00").is_none());
        assert!(parse_utc_offset("+25:00").is_none());
        assert!(parse_utc_offset("+8").is_none());
    }

    #[test]
    fn test_reading_uses_configured_offset() {
        // 2026-10-16 20:30 UTC 在 +08:00 已经是 10-17 (周六)
        let offset = parse_utc_offset("+08:00").unwrap();
        let clock = FixedClock::new(at("2026-10-16T20:30:00Z"), offset);
        let reading = clock.reading();

        assert_eq!(reading.today, NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
        assert_eq!(reading.weekday, Weekday::Sat);
        assert_eq!(clock.today_weekday(), Weekday::Sat);
    }

    #[test]
    fn test_day_bounds() {
        let offset = parse_utc_offset("+08:00").unwrap();
        let reading = ClockReading::new(at("2026-10-17T03:00:00Z"), offset);
        let (start, end) = reading.day_bounds();

        assert_eq!(start, at("2026-10-16T16:00:00Z"));
        assert_eq!(end, at("2026-10-17T16:00:00Z"));
    }

    #[test]
    fn test_fixed_clock_set_and_advance() {
        let clock = FixedClock::utc(at("2026-10-17T10:00:00Z"));
        clock.advance(Duration::hours(20));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());

        clock.set(at("2026-01-01T00:00:00Z"));
        assert_eq!(clock.now(), at("2026-01-01T00:00:00Z"));
    }
}
