// ==========================================
// 机加工车间排产系统 - 时间窗分配
// ==========================================
// 职责: 在单台机台的两条班次通道上找最早可放的时间窗
// 规则: 白班与夜班是互不干扰的预约通道，冲突只在同通道判定;
//       同一机台同一天最多开工两道工序; 推进次数封顶，
//       找不到空档就放弃而不是死循环
// ==========================================

use crate::domain::types::ShiftKind;
use crate::engine::calendar::{at_hour, WorkCalendar, DAY_SHIFT_START_HOUR};
use chrono::{NaiveDate, NaiveDateTime};

/// 时间窗推进次数上限，超过视为无可用空档
pub const MAX_PLACEMENT_ITERATIONS: usize = 100;
/// 同一机台单日开工道数上限（两条通道合计）
pub const MAX_DAILY_STARTS_PER_MACHINE: usize = 2;

// ==========================================
// 预约与放置
// ==========================================
/// 机台通道上已占用的一段时间
#[derive(Debug, Clone)]
pub struct BookedSlot {
    pub operation_id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// 一次成功的放置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPlacement {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub shift: ShiftKind,
}

// ==========================================
// MachineTimetable - 单机台预约表
// ==========================================
#[derive(Debug, Default)]
pub struct MachineTimetable {
    day: Vec<BookedSlot>,
    night: Vec<BookedSlot>,
}

impl MachineTimetable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按放置的班次归入对应通道
    pub fn book(&mut self, operation_id: &str, placement: &SlotPlacement) {
        let slot = BookedSlot {
            operation_id: operation_id.to_string(),
            start: placement.start,
            end: placement.end,
        };
        match placement.shift {
            ShiftKind::Day => self.day.push(slot),
            ShiftKind::Night => self.night.push(slot),
        }
    }

    /// 指定日期的开工道数（两条通道合计，按开始时刻归日）
    pub fn starts_on(&self, date: NaiveDate) -> usize {
        self.day
            .iter()
            .chain(self.night.iter())
            .filter(|slot| slot.start.date() == date)
            .count()
    }

    /// 指定通道的预约清单
    pub fn lane(&self, shift: ShiftKind) -> &[BookedSlot] {
        match shift {
            ShiftKind::Day => &self.day,
            ShiftKind::Night => &self.night,
        }
    }
}

// 区间重叠判定，区间为 [start, end)
fn overlaps(start: NaiveDateTime, end: NaiveDateTime, booked: &BookedSlot) -> bool {
    (start >= booked.start && start < booked.end)
        || (end > booked.start && end <= booked.end)
        || (start <= booked.start && end >= booked.end)
}

// ==========================================
// SlotAllocator - 时间窗分配器
// ==========================================
pub struct SlotAllocator {
    calendar: WorkCalendar,
}

impl SlotAllocator {
    pub fn new(calendar: WorkCalendar) -> Self {
        Self { calendar }
    }

    pub fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    /// 从最早可开工时刻起，找第一个能放下给定工时的时间窗
    ///
    /// 推进规则:
    /// - 当日开工道数已满 → 跳到下一个工作日 08:00
    /// - 同通道冲突 → 跳到冲突预约中最晚的结束时刻（再吸附）
    /// - 推进超过上限 → None，由调用方告警
    pub fn find_slot(
        &self,
        timetable: &MachineTimetable,
        earliest: NaiveDateTime,
        duration_minutes: i64,
    ) -> Option<SlotPlacement> {
        let mut candidate = self.calendar.next_working_instant(earliest);

        for _ in 0..MAX_PLACEMENT_ITERATIONS {
            // 单日开工上限
            if timetable.starts_on(candidate.date()) >= MAX_DAILY_STARTS_PER_MACHINE {
                let next_day = self.calendar.next_working_day(candidate.date());
                candidate = at_hour(next_day, DAY_SHIFT_START_HOUR);
                continue;
            }

            let end = self.calendar.compute_end_time(candidate, duration_minutes);
            let shift = self.calendar.shift_of(candidate);

            // 同通道冲突检查，取最晚的冲突结束时刻推进
            let latest_conflict_end = timetable
                .lane(shift)
                .iter()
                .filter(|slot| overlaps(candidate, end, slot))
                .map(|slot| slot.end)
                .max();

            match latest_conflict_end {
                None => {
                    return Some(SlotPlacement {
                        start: candidate,
                        end,
                        shift,
                    })
                }
                Some(conflict_end) => {
                    candidate = self.calendar.next_working_instant(conflict_end);
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03: 03-04 周一, 03-07 周四, 03-08/09 周五周六休, 03-10 周日班
    fn t(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn allocator() -> SlotAllocator {
        SlotAllocator::new(WorkCalendar::new())
    }

    fn place(
        allocator: &SlotAllocator,
        timetable: &mut MachineTimetable,
        operation_id: &str,
        earliest: NaiveDateTime,
        minutes: i64,
    ) -> SlotPlacement {
        let placement = allocator
            .find_slot(timetable, earliest, minutes)
            .expect("应当找到空档");
        timetable.book(operation_id, &placement);
        placement
    }

    #[test]
    fn test_empty_timetable_places_at_snapped_earliest() {
        let alloc = allocator();
        let timetable = MachineTimetable::new();
        let placement = alloc.find_slot(&timetable, t(4, 6, 0), 240).unwrap();
        assert_eq!(placement.start, t(4, 8, 0));
        assert_eq!(placement.end, t(4, 12, 0));
        assert_eq!(placement.shift, ShiftKind::Day);
    }

    #[test]
    fn test_conflict_advances_to_conflict_end() {
        let alloc = allocator();
        let mut timetable = MachineTimetable::new();
        place(&alloc, &mut timetable, "OP-1", t(4, 8, 0), 240); // 08:00-12:00

        let placement = alloc.find_slot(&timetable, t(4, 8, 0), 120).unwrap();
        assert_eq!(placement.start, t(4, 12, 0));
        assert_eq!(placement.end, t(4, 14, 0));
    }

    #[test]
    fn test_multiple_conflicts_use_latest_end() {
        let alloc = allocator();
        let mut timetable = MachineTimetable::new();
        // 两段重叠预约（人为构造），候选应一次跳过最晚结束
        timetable.book(
            "OP-1",
            &SlotPlacement {
                start: t(4, 8, 0),
                end: t(4, 10, 0),
                shift: ShiftKind::Day,
            },
        );
        timetable.book(
            "OP-2",
            &SlotPlacement {
                start: t(4, 9, 0),
                end: t(4, 13, 0),
                shift: ShiftKind::Day,
            },
        );

        let placement = alloc.find_slot(&timetable, t(4, 8, 0), 60).unwrap();
        assert_eq!(placement.start, t(4, 13, 0));
    }

    #[test]
    fn test_night_lane_ignores_day_lane_clock_overlap() {
        let alloc = allocator();
        let mut timetable = MachineTimetable::new();
        // 夜班长任务: 周一 22:00 跨午夜到周二 18:00（含凌晨段与次夜续接）
        let night = place(&alloc, &mut timetable, "OP-N", t(4, 22, 0), 720);
        assert_eq!(night.shift, ShiftKind::Night);
        assert_eq!(night.end, t(5, 18, 0));

        // 周二白班候选与上面的夜班窗在钟面上重叠，但通道不同，照常放置
        let day = alloc.find_slot(&timetable, t(5, 8, 0), 240).unwrap();
        assert_eq!(day.start, t(5, 8, 0));
        assert_eq!(day.shift, ShiftKind::Day);
    }

    #[test]
    fn test_daily_start_cap_pushes_to_next_day() {
        let alloc = allocator();
        let mut timetable = MachineTimetable::new();
        place(&alloc, &mut timetable, "OP-1", t(4, 8, 0), 120); // 周一第1道
        place(&alloc, &mut timetable, "OP-2", t(4, 16, 0), 120); // 周一第2道(夜班)

        // 周一已满两道，白班还有空也不再开工
        let placement = alloc.find_slot(&timetable, t(4, 10, 0), 60).unwrap();
        assert_eq!(placement.start, t(5, 8, 0));
    }

    #[test]
    fn test_daily_cap_push_skips_weekend() {
        let alloc = allocator();
        let mut timetable = MachineTimetable::new();
        place(&alloc, &mut timetable, "OP-1", t(7, 8, 0), 120); // 周四第1道
        place(&alloc, &mut timetable, "OP-2", t(7, 10, 0), 120); // 周四第2道

        // 周四满员，周五/周六停工，落到周日 08:00
        let placement = alloc.find_slot(&timetable, t(7, 12, 0), 60).unwrap();
        assert_eq!(placement.start, t(10, 8, 0));
    }

    #[test]
    fn test_conflict_end_at_shift_boundary_flips_lane() {
        let alloc = allocator();
        let mut timetable = MachineTimetable::new();
        place(&alloc, &mut timetable, "OP-1", t(4, 8, 0), 480); // 整个白班 08:00-16:00

        let placement = alloc.find_slot(&timetable, t(4, 9, 0), 120).unwrap();
        // 推进到 16:00，开始时刻落入夜班通道
        assert_eq!(placement.start, t(4, 16, 0));
        assert_eq!(placement.shift, ShiftKind::Night);
    }

    #[test]
    fn test_exhausted_iterations_returns_none() {
        let alloc = allocator();
        let mut timetable = MachineTimetable::new();
        // 连续塞满远超推进上限的工作日，每天两道
        let mut day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        for i in 0..(MAX_PLACEMENT_ITERATIONS + 20) {
            let start = day.and_hms_opt(8, 0, 0).unwrap();
            timetable.book(
                &format!("OP-A{}", i),
                &SlotPlacement {
                    start,
                    end: start + chrono::Duration::minutes(60),
                    shift: ShiftKind::Day,
                },
            );
            let night_start = day.and_hms_opt(16, 0, 0).unwrap();
            timetable.book(
                &format!("OP-B{}", i),
                &SlotPlacement {
                    start: night_start,
                    end: night_start + chrono::Duration::minutes(60),
                    shift: ShiftKind::Night,
                },
            );
            day = alloc.calendar().next_working_day(day);
        }

        assert!(alloc.find_slot(&timetable, t(4, 8, 0), 60).is_none());
    }
}
