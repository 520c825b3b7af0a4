//! iCalendar export.
//!
//! Renders the placed tasks of a [`WeekSchedule`] as an RFC 5545 calendar:
//! one VEVENT per placed task, anchored to a caller-supplied week-start
//! datetime. Priority and the dependency/deadline/estimate metadata go
//! into the event description. Unplaced tasks are skipped — the report in
//! the schedule covers them.

use chrono::NaiveDateTime;

use crate::models::{Task, WeekSchedule};
use crate::timeutil;

const DT_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Renders a schedule as iCalendar text.
pub fn to_ics(schedule: &WeekSchedule, week_start: NaiveDateTime) -> String {
    let mut out = String::new();
    push_line(&mut out, "BEGIN:VCALENDAR");
    push_line(&mut out, "VERSION:2.0");
    push_line(&mut out, "PRODID:-//weekplan//weekplan//EN");

    for task in schedule.in_week_order() {
        let Some(window) = task.assigned else {
            continue;
        };
        let begin = timeutil::datetime_at(week_start, window.start);
        let end = timeutil::datetime_at(week_start, window.end);

        push_line(&mut out, "BEGIN:VEVENT");
        push_line(
            &mut out,
            &format!("UID:{}-{}@weekplan", escape_text(&task.id), window.start),
        );
        push_line(&mut out, &format!("DTSTART:{}", begin.format(DT_FORMAT)));
        push_line(&mut out, &format!("DTEND:{}", end.format(DT_FORMAT)));
        push_line(&mut out, &format!("SUMMARY:{}", escape_text(&task.id)));
        push_line(
            &mut out,
            &format!("PRIORITY:{}", task.priority.clamp(0, 9)),
        );
        let description = description_for(task, week_start);
        if !description.is_empty() {
            push_line(
                &mut out,
                &format!("DESCRIPTION:{}", escape_text(&description)),
            );
        }
        push_line(&mut out, "END:VEVENT");
    }

    push_line(&mut out, "END:VCALENDAR");
    out
}

/// Dependency, deadline, and estimate metadata as description text.
fn description_for(task: &Task, week_start: NaiveDateTime) -> String {
    let mut lines = Vec::new();
    if !task.dependencies.is_empty() {
        lines.push(format!("Dependencies: {}", task.dependencies.join(", ")));
    }
    if let Some(deadline) = task.deadline {
        let dt = timeutil::datetime_at(week_start, deadline);
        lines.push(format!("Deadline: {}", dt.format("%Y-%m-%d %H:%M")));
    }
    if let Some(estimate) = task.estimate {
        lines.push(format!("Estimated time to complete: {estimate} minutes"));
    }
    if task.rescheduled {
        lines.push("Rescheduled from its original window".to_string());
    }
    lines.join("\n")
}

/// RFC 5545 text escaping: backslash, comma, semicolon, newline.
fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push_str("\r\n");
}
