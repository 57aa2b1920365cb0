// ==========================================
// 机加工车间排产系统 - 工作日历
// ==========================================
// 依据: 车间两班制作息 (白班 08:00-16:00, 夜班 16:00-次日08:00)
//       与每周连休两天的停工安排 (默认周五+周六)
// 职责: 工作日判定、时刻吸附、工时推进
// 红线: 非工作日不安排任何加工; 夜班跨午夜的凌晨段
//       只有次日为工作日时才可用
// ==========================================

use crate::domain::types::ShiftKind;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};

/// 白班开始小时
pub const DAY_SHIFT_START_HOUR: u32 = 8;
/// 夜班开始小时（同时是白班结束）
pub const NIGHT_SHIFT_START_HOUR: u32 = 16;

// 小时为常量，构造不会失败
pub(crate) fn at_hour(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, 0, 0).unwrap()
}

// ==========================================
// WorkCalendar - 工作日历
// ==========================================
#[derive(Debug, Clone)]
pub struct WorkCalendar {
    /// 每周连休的两天
    weekend: [Weekday; 2],
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self {
            weekend: [Weekday::Fri, Weekday::Sat],
        }
    }
}

impl WorkCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定每周停工的两天（跨地区车间的作息差异）
    pub fn with_weekend(weekend: [Weekday; 2]) -> Self {
        Self { weekend }
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday();
        weekday != self.weekend[0] && weekday != self.weekend[1]
    }

    /// 严格晚于给定日期的下一个工作日
    pub fn next_working_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date + Duration::days(1);
        while !self.is_working_day(day) {
            day += Duration::days(1);
        }
        day
    }

    /// 把任意时刻吸附到最近的可开工时刻
    ///
    /// - 非工作日: 下一个工作日 08:00
    /// - 工作日 08:00 之前: 当日 08:00
    /// - 工作日 08:00 及之后: 原样返回（深夜时刻属当日夜班）
    pub fn next_working_instant(&self, t: NaiveDateTime) -> NaiveDateTime {
        let date = t.date();
        if !self.is_working_day(date) {
            return at_hour(self.next_working_day(date), DAY_SHIFT_START_HOUR);
        }
        if t.hour() < DAY_SHIFT_START_HOUR {
            return at_hour(date, DAY_SHIFT_START_HOUR);
        }
        t
    }

    /// 开始时刻的班次归属: [08:00, 16:00) 为白班，其余为夜班
    pub fn shift_of(&self, start: NaiveDateTime) -> ShiftKind {
        let hour = start.hour();
        if (DAY_SHIFT_START_HOUR..NIGHT_SHIFT_START_HOUR).contains(&hour) {
            ShiftKind::Day
        } else {
            ShiftKind::Night
        }
    }

    /// 闭区间内的工作日天数，from 晚于 to 时为 0
    pub fn count_working_days(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        if from > to {
            return 0;
        }
        let mut count = 0;
        let mut date = from;
        while date <= to {
            if self.is_working_day(date) {
                count += 1;
            }
            date += Duration::days(1);
        }
        count
    }

    /// 从给定日期向后推进 n 个工作日
    ///
    /// n 为 0 时原样返回，不做工作日吸附。
    pub fn add_working_days(&self, from: NaiveDate, n: i64) -> NaiveDate {
        let mut date = from;
        for _ in 0..n {
            date = self.next_working_day(date);
        }
        date
    }

    /// 两时刻之间落在可排班段内的分钟数
    ///
    /// 每个工作日的可排班段为 [08:00, 24:00)，整日 960 分钟
    /// (白班 480 + 夜班晚间段 480)。夜班跨午夜的凌晨段是溢出
    /// 通道，不计入产能口径。to 不晚于 from 时为 0。
    pub fn working_minutes_between(&self, from: NaiveDateTime, to: NaiveDateTime) -> i64 {
        if to <= from {
            return 0;
        }
        let mut total = 0;
        let mut date = from.date();
        while date <= to.date() {
            if self.is_working_day(date) {
                let window_start = at_hour(date, DAY_SHIFT_START_HOUR);
                let window_end = at_hour(date + Duration::days(1), 0);
                let seg_start = window_start.max(from);
                let seg_end = window_end.min(to);
                if seg_end > seg_start {
                    total += (seg_end - seg_start).num_minutes();
                }
            }
            date += Duration::days(1);
        }
        total
    }

    /// 从开始时刻推进给定工时（分钟）后的结束时刻
    ///
    /// 开始时刻先吸附（同 next_working_instant），班次极性由吸附后
    /// 的开始时刻决定且全程保持:
    /// - 白班任务溢出当日 16:00 后，接续下一个工作日 08:00
    /// - 夜班任务跨过午夜后，次日为工作日则用到 08:00 的凌晨段，
    ///   用尽再接当日 16:00 的下一个夜班; 次日停工则整段跳到
    ///   下一个工作日 16:00
    ///
    /// 工时为 0 时结束时刻即吸附后的开始时刻。
    pub fn compute_end_time(&self, start: NaiveDateTime, duration_minutes: i64) -> NaiveDateTime {
        let snapped = self.next_working_instant(start);
        if duration_minutes <= 0 {
            return snapped;
        }

        let mut current = snapped;
        let mut remaining = duration_minutes;
        if self.shift_of(snapped) == ShiftKind::Day {
            // 白班通道: 每个工作日 [08:00, 16:00)
            loop {
                let segment_end = at_hour(current.date(), NIGHT_SHIFT_START_HOUR);
                let available = (segment_end - current).num_minutes();
                if remaining <= available {
                    return current + Duration::minutes(remaining);
                }
                remaining -= available;
                current = at_hour(self.next_working_day(current.date()), DAY_SHIFT_START_HOUR);
            }
        } else {
            // 夜班通道: [16:00, 24:00) + 条件可用的 [00:00, 08:00)
            loop {
                if current.hour() < DAY_SHIFT_START_HOUR {
                    // 凌晨段（只在次日为工作日时进入）
                    let segment_end = at_hour(current.date(), DAY_SHIFT_START_HOUR);
                    let available = (segment_end - current).num_minutes();
                    if remaining <= available {
                        return current + Duration::minutes(remaining);
                    }
                    remaining -= available;
                    // 凌晨段所在日必为工作日，晚上接下一个夜班
                    current = at_hour(current.date(), NIGHT_SHIFT_START_HOUR);
                } else {
                    // 晚间段 [16:00, 24:00)
                    let tomorrow = current.date() + Duration::days(1);
                    let midnight = at_hour(tomorrow, 0);
                    let available = (midnight - current).num_minutes();
                    if remaining <= available {
                        return current + Duration::minutes(remaining);
                    }
                    remaining -= available;
                    if self.is_working_day(tomorrow) {
                        current = at_hour(tomorrow, 0);
                    } else {
                        // 停工日整天跳过，夜班在下一个工作日 16:00 续接
                        current =
                            at_hour(self.next_working_day(current.date()), NIGHT_SHIFT_START_HOUR);
                    }
                }
            }
        }
    }
}
