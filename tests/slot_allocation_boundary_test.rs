// ==========================================
// 时间窗分配边界测试
// ==========================================
// 测试目标: 大批量混合工时连续放置后的通道不变量
//           (同通道不重叠、单日开工上限、班次极性、日历吸附)，
//           以及长任务跨日与通道翻转的组合边界
// 运行: cargo test --test slot_allocation_boundary_test -- --nocapture
// ==========================================

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use machine_shop_aps::domain::types::ShiftKind;
use machine_shop_aps::engine::calendar::{DAY_SHIFT_START_HOUR, NIGHT_SHIFT_START_HOUR};
use machine_shop_aps::engine::{
    MachineTimetable, SlotAllocator, SlotPlacement, WorkCalendar, MAX_DAILY_STARTS_PER_MACHINE,
};
use std::collections::HashMap;

// 2024-03-04 周一; 03-08 周五 / 03-09 周六 停工
fn base_monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

fn t(day: u32, hour: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(hour, min, 0)
        .unwrap()
}

// ==========================================
// 批量放置不变量
// ==========================================
#[test]
fn test_bulk_placements_respect_lane_invariants() {
    let calendar = WorkCalendar::new();
    let allocator = SlotAllocator::new(calendar.clone());
    let mut timetable = MachineTimetable::new();

    // 混合工时批量放置: 最早时刻散在首周、小时横跨两班
    let durations = [30, 45, 60, 90, 120, 240, 480, 600];
    let mut placements: Vec<(SlotPlacement, i64)> = Vec::new();
    for i in 0..80usize {
        let earliest_date = base_monday() + chrono::Duration::days((i % 5) as i64);
        let hour = 8 + (i * 3) as u32 % 12;
        let minute = ((i % 4) * 15) as u32;
        let earliest = earliest_date.and_hms_opt(hour, minute, 0).unwrap();
        let minutes = durations[i % durations.len()];

        let placement = allocator
            .find_slot(&timetable, earliest, minutes)
            .unwrap_or_else(|| panic!("placement {} should find a slot", i));
        timetable.book(&format!("OP-{:03}", i), &placement);
        placements.push((placement, minutes));
    }
    assert_eq!(placements.len(), 80);

    let mut day_lane: Vec<&SlotPlacement> = Vec::new();
    let mut night_lane: Vec<&SlotPlacement> = Vec::new();
    let mut starts_per_date: HashMap<NaiveDate, usize> = HashMap::new();

    for (placement, minutes) in &placements {
        // 开始时刻总是落在工作日的开班时段内
        assert!(
            calendar.is_working_day(placement.start.date()),
            "start {} must be a working day",
            placement.start
        );
        assert!(placement.start.hour() >= DAY_SHIFT_START_HOUR);

        // 班次极性由开始小时决定
        let expected_shift = if (DAY_SHIFT_START_HOUR..NIGHT_SHIFT_START_HOUR)
            .contains(&placement.start.hour())
        {
            ShiftKind::Day
        } else {
            ShiftKind::Night
        };
        assert_eq!(placement.shift, expected_shift);

        // 结束时刻与日历推进一致
        assert!(placement.end > placement.start);
        assert_eq!(
            placement.end,
            calendar.compute_end_time(placement.start, *minutes)
        );

        *starts_per_date.entry(placement.start.date()).or_insert(0) += 1;
        match placement.shift {
            ShiftKind::Day => day_lane.push(placement),
            ShiftKind::Night => night_lane.push(placement),
        }
    }

    // 单日开工上限
    for (date, count) in &starts_per_date {
        assert!(
            *count <= MAX_DAILY_STARTS_PER_MACHINE,
            "{} has {} starts, exceeding the daily cap",
            date,
            count
        );
    }

    // 同通道按开始时刻排序后相邻不重叠
    for lane in [&mut day_lane, &mut night_lane] {
        lane.sort_by_key(|p| p.start);
        for pair in lane.windows(2) {
            assert!(
                pair[0].end <= pair[1].start,
                "lane overlap: {}..{} vs {}..{}",
                pair[0].start,
                pair[0].end,
                pair[1].start,
                pair[1].end
            );
        }
    }
}

// ==========================================
// 长任务跨日与通道翻转的组合
// ==========================================
#[test]
fn test_long_spill_cap_and_lane_flip_combination() {
    let allocator = SlotAllocator::new(WorkCalendar::new());
    let mut timetable = MachineTimetable::new();

    // 600分钟白班长任务: 周一 08:00 起，溢出到周二 10:00
    let long = allocator.find_slot(&timetable, t(4, 8, 0), 600).unwrap();
    timetable.book("OP-LONG", &long);
    assert_eq!(long.start, t(4, 8, 0));
    assert_eq!(long.end, t(5, 10, 0));
    assert_eq!(long.shift, ShiftKind::Day);

    // 白班跟单: 周一白班通道被长任务整段占住，直接落到周二 10:00
    let day_follower = allocator.find_slot(&timetable, t(4, 8, 0), 60).unwrap();
    timetable.book("OP-DAY2", &day_follower);
    assert_eq!(day_follower.start, t(5, 10, 0));
    assert_eq!(day_follower.end, t(5, 11, 0));

    // 夜班任务不受白班长任务影响，周一当晚开工（当日第2道）
    let night = allocator.find_slot(&timetable, t(4, 16, 30), 90).unwrap();
    timetable.book("OP-NIGHT", &night);
    assert_eq!(night.start, t(4, 16, 30));
    assert_eq!(night.shift, ShiftKind::Night);

    // 周一已满两道: 候选推到周二 08:00 翻回白班极性，
    // 再被长任务尾段与白班跟单依次顶开
    let pushed = allocator.find_slot(&timetable, t(4, 17, 0), 60).unwrap();
    timetable.book("OP-PUSHED", &pushed);
    assert_eq!(pushed.start, t(5, 11, 0));
    assert_eq!(pushed.shift, ShiftKind::Day);
}

// ==========================================
// 日历推进边界
// ==========================================
#[test]
fn test_zero_duration_matches_snap_on_hourly_grid() {
    let calendar = WorkCalendar::new();
    // 两周逐小时扫描: 零工时推进与吸附一致，吸附幂等
    for day_offset in 0..14i64 {
        let date = base_monday() + chrono::Duration::days(day_offset);
        for hour in 0..24u32 {
            let sample = date.and_hms_opt(hour, 0, 0).unwrap();
            let snapped = calendar.next_working_instant(sample);
            assert_eq!(calendar.compute_end_time(sample, 0), snapped);
            assert_eq!(calendar.next_working_instant(snapped), snapped);
            assert!(calendar.is_working_day(snapped.date()));
        }
    }
}

#[test]
fn test_duration_monotonicity_from_mixed_starts() {
    let calendar = WorkCalendar::new();
    // 白班、夜班、凌晨、停工日四类起点
    let starts = [t(4, 9, 0), t(4, 20, 0), t(5, 3, 0), t(9, 12, 0)];
    for start in starts {
        let snapped = calendar.next_working_instant(start);
        let mut previous_end = snapped;
        for step in 1..=16i64 {
            let end = calendar.compute_end_time(start, step * 60);
            assert!(end > snapped, "positive duration must move past the start");
            assert!(
                end >= previous_end,
                "longer duration may not finish earlier: {} vs {}",
                end,
                previous_end
            );
            previous_end = end;
        }
    }
}

#[test]
fn test_shift_boundary_minutes() {
    let calendar = WorkCalendar::new();
    // 整班填满止于 16:00，多1分钟落到下个工作日 08:01
    assert_eq!(calendar.compute_end_time(t(4, 8, 0), 480), t(4, 16, 0));
    assert_eq!(calendar.compute_end_time(t(4, 8, 0), 481), t(5, 8, 1));

    // 周四深夜起步: 午夜前只剩60分，周五停工，余量接周日夜班
    assert_eq!(calendar.compute_end_time(t(7, 23, 0), 120), t(10, 17, 0));

    // 周日白班收尾溢出到下周一早班
    assert_eq!(calendar.compute_end_time(t(10, 15, 0), 120), t(11, 9, 0));
}
