//! Schedule-notation domain library: parses a small plain-text event
//! notation into normalized, grouped event records and derives deep-link
//! URLs that open those records in external calendar / task applications.
//! The core is pure and total: malformed lines are skipped, never fatal.

pub mod core {
    use indexmap::IndexMap;
    use serde::{Deserialize, Serialize};

    /// Group name used when no header line precedes an event.
    pub const UNGROUPED_LABEL: &str = "グループ未設定";

    /* ------------------------------ Value types ------------------------------ */

    /// A single normalized schedule entry.
    ///
    /// `start` and `end` are canonical `YYYY-MM-DDTHH:MM` strings: naive
    /// local time, no zone offset. `start <= end` is not guaranteed — a
    /// default-duration event starting at 23:30 ends at 00:30 with the same
    /// date string, so plain string comparison is not chronological across
    /// the midnight wrap.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Event {
        pub title: String,
        pub start: String,
        pub end: String,
        /// Free text; literal `\n` in the source expands to a real newline.
        #[serde(default)]
        pub details: String,
        /// Free text; absorbs every comma-separated field after the third.
        #[serde(default)]
        pub location: String,
        /// True when the source line carried no time component.
        pub is_all_day: bool,
    }

    /// Ordered mapping from group name to events. Group names keep
    /// first-seen insertion order; events keep append order.
    pub type Schedule = IndexMap<String, Vec<Event>>;

    /* ----------------------- Utility: display labels ----------------------- */

    impl Event {
        /// Human-readable time label for list views, e.g.
        /// `2024-03-10 09:00-10:00`. All-day events show the date alone;
        /// a zero-length range renders as `HH:MM-`.
        pub fn time_label(&self) -> String {
            let (date, start_time) = self
                .start
                .split_once('T')
                .unwrap_or((self.start.as_str(), ""));
            if self.is_all_day {
                return date.to_string();
            }
            let end_time = self.end.split_once('T').map(|(_, t)| t).unwrap_or("");
            if start_time == end_time {
                format!("{date} {start_time}-")
            } else {
                format!("{date} {start_time}-{end_time}")
            }
        }
    }
}

pub mod parser {
    //! Line-oriented schedule parser.
    //!
    //! The notation is deliberately small:
    //! - `-NAME` lines select (and reset) the current group;
    //! - other non-blank lines are `datetime,title,details,location...`;
    //! - `datetime` is `date` or `date"T"time`, where `time` is `start` or
    //!   `start"-"end` with 1–4 digit tokens.
    //!
    //! The date grammar is built with `nom` combinators; everything else is
    //! plain field splitting. The parser never fails: lines missing a date
    //! or title are dropped and unrecognized date forms pass through.

    use crate::core::{Event, Schedule, UNGROUPED_LABEL};
    use chrono::{Datelike, Local, NaiveDate};
    use nom::{
        IResult,
        branch::alt,
        bytes::complete::take_while,
        character::complete::char,
        combinator::map,
        error::{VerboseError, VerboseErrorKind},
        sequence::tuple,
    };

    /* ------------------------ Public entry points ------------------------ */

    /// Parse the full input text into an ordered group → events mapping.
    ///
    /// `today` anchors the bare `MMDD` date form (current calendar year)
    /// and is a parameter so parses are reproducible; no state is shared
    /// between calls.
    pub fn parse_schedule(text: &str, today: NaiveDate) -> Schedule {
        let mut groups = Schedule::default();
        let mut current = UNGROUPED_LABEL.to_string();

        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix('-') {
                let name = rest.trim();
                current = if name.is_empty() {
                    UNGROUPED_LABEL.to_string()
                } else {
                    name.to_string()
                };
                // A repeated header resets the group's events; IndexMap
                // keeps the first-seen position on re-insert.
                groups.insert(current.clone(), Vec::new());
                continue;
            }

            let mut fields = line.split(',');
            let datetime = fields.next().unwrap_or_default();
            let title = fields.next().unwrap_or_default().trim();
            let details = fields.next().unwrap_or_default();
            let location = fields.collect::<Vec<_>>().join(",");

            let (raw_date, raw_time, is_all_day) = match datetime.split_once('T') {
                Some((date, time)) => (date, time, false),
                None => (datetime, "", true),
            };
            if raw_date.is_empty() || title.is_empty() {
                continue;
            }

            let date = normalize_date(raw_date, today);
            let (start, end) = resolve_time_range(&date, raw_time, is_all_day);

            groups.entry(current.clone()).or_default().push(Event {
                title: title.to_string(),
                start,
                end,
                details: details.replace("\\n", "\n").trim().to_string(),
                location: location.trim().to_string(),
                is_all_day,
            });
        }

        groups
    }

    /// Convenience wrapper anchored at the local calendar date.
    pub fn parse_schedule_str(text: &str) -> Schedule {
        parse_schedule(text, Local::now().date_naive())
    }

    /* --------------------------- Date normalizer --------------------------- */

    type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

    /// Normalize a date token to `YYYY-MM-DD`. Five shorthand forms are
    /// tried in fixed priority order; an unrecognized token is returned
    /// unmodified so downstream consumers can apply their own fallbacks.
    /// Only syntax is normalized — `2024-02-30` is accepted as-is.
    pub fn normalize_date(raw: &str, today: NaiveDate) -> String {
        let result = alt((
            date_canonical,
            date_compact,
            date_dashed_tail,
            date_dashed_head,
            date_month_day(today.year()),
        ))(raw);
        match result {
            // The form must consume the whole token.
            Ok(("", date)) => date,
            _ => raw.to_string(),
        }
    }

    /// `YYYY-MM-DD` — already canonical.
    fn date_canonical(i: &str) -> PResult<'_, String> {
        map(
            tuple((digits(4), char('-'), digits(2), char('-'), digits(2))),
            |(y, _, m, _, d)| format!("{y}-{m}-{d}"),
        )(i)
    }

    /// `YYYYMMDD` — dashes inserted at positions 4 and 6.
    fn date_compact(i: &str) -> PResult<'_, String> {
        map(digits(8), |s: &str| {
            format!("{}-{}-{}", &s[..4], &s[4..6], &s[6..])
        })(i)
    }

    /// `YYYY-MMDD` — dash re-inserted between month and day.
    fn date_dashed_tail(i: &str) -> PResult<'_, String> {
        map(
            tuple((digits(4), char('-'), digits(4))),
            |(y, _, md): (&str, _, &str)| format!("{}-{}-{}", y, &md[..2], &md[2..]),
        )(i)
    }

    /// `YYYYMM-DD` — dash re-inserted between year and month.
    fn date_dashed_head(i: &str) -> PResult<'_, String> {
        map(
            tuple((digits(6), char('-'), digits(2))),
            |(ym, _, d): (&str, _, &str)| format!("{}-{}-{}", &ym[..4], &ym[4..], d),
        )(i)
    }

    /// `MMDD` — prefixed with the given calendar year. Anchoring on "this
    /// year" makes the output change across year boundaries; that is the
    /// documented behavior of the notation, not a defect to fix here.
    fn date_month_day(year: i32) -> impl Fn(&str) -> PResult<'_, String> {
        move |i: &str| {
            map(digits(4), |md: &str| {
                format!("{year}-{}-{}", &md[..2], &md[2..])
            })(i)
        }
    }

    /// Exactly `n` ASCII digits. Greedy: a longer digit run fails rather
    /// than matching a prefix, mirroring anchored-pattern semantics.
    fn digits(n: usize) -> impl Fn(&str) -> PResult<'_, &str> {
        move |i: &str| {
            let (rest, out) = take_while(|c: char| c.is_ascii_digit())(i)?;
            if out.len() == n {
                Ok((rest, out))
            } else {
                Err(nom::Err::Error(VerboseError {
                    errors: vec![(i, VerboseErrorKind::Context("digits"))],
                }))
            }
        }
    }

    /* -------------------------- Time range resolver -------------------------- */

    /// Resolve a raw time token against a canonical date into
    /// `(start, end)` timestamps.
    ///
    /// Numeric tokens are left-padded to four digits, so `"9"` reads as
    /// `00:09` (minute-heavy), not `09:00`. Existing schedule files rely on
    /// this. When the end token is absent the end hour is the start hour
    /// plus one modulo 24, same minute; the date string never advances even
    /// when the hour wraps past midnight.
    pub fn resolve_time_range(date: &str, raw_time: &str, is_all_day: bool) -> (String, String) {
        if is_all_day {
            return (format!("{date}T00:00"), format!("{date}T23:59"));
        }

        let (start_tok, end_tok) = match raw_time.split_once('-') {
            Some((start, end)) => (start, Some(end)),
            None => (raw_time, None),
        };

        let start_padded = pad4(start_tok);
        let start = format_time(date, &start_padded);
        let end = match end_tok {
            Some(end) => format_time(date, &pad4(end)),
            None => {
                let (hour_str, minute) = split_at_char(&start_padded, 2);
                let hour: u32 = hour_str.parse().unwrap_or(0);
                format!("{date}T{:02}:{minute}", (hour + 1) % 24)
            }
        };
        (start, end)
    }

    fn pad4(token: &str) -> String {
        format!("{token:0>4}")
    }

    fn format_time(date: &str, padded: &str) -> String {
        let (hour, minute) = split_at_char(padded, 2);
        format!("{date}T{hour}:{minute}")
    }

    // Char-boundary-safe split; tokens are usually digits but the notation
    // does not promise that.
    fn split_at_char(s: &str, n: usize) -> (&str, &str) {
        match s.char_indices().nth(n) {
            Some((idx, _)) => s.split_at(idx),
            None => (s, ""),
        }
    }

}

pub mod links {
    //! Deep-link builders for the two external targets: Google Calendar
    //! template links and Todoist quick-add links (mobile scheme + web).
    //! Builders are pure `Event` → `String`; the Todoist pair additionally
    //! takes `today` so the natural-language date argument is reproducible.

    use crate::core::Event;
    use chrono::NaiveDate;
    use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

    /// Component encoding equivalent to JavaScript's `encodeURIComponent`:
    /// alphanumerics and `- _ . ! ~ * ' ( )` stay bare, everything else
    /// (including non-ASCII bytes) is percent-encoded.
    const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
        .remove(b'-')
        .remove(b'_')
        .remove(b'.')
        .remove(b'!')
        .remove(b'~')
        .remove(b'*')
        .remove(b'\'')
        .remove(b'(')
        .remove(b')');

    fn encode(component: &str) -> String {
        utf8_percent_encode(component, COMPONENT).to_string()
    }

    fn date_part(ts: &str) -> &str {
        ts.split('T').next().unwrap_or(ts)
    }

    fn time_part(ts: &str) -> &str {
        ts.split_once('T').map(|(_, t)| t).unwrap_or("")
    }

    /* ---------------------------- Google Calendar ---------------------------- */

    /// `YYYY-MM-DDTHH:MM` → `YYYYMMDDTHHMM00`: literal seconds, no zone.
    fn google_time(ts: &str) -> String {
        let mut compact = ts.replace('-', "").replace(':', "");
        compact.push_str("00");
        compact
    }

    /// Google Calendar "render?action=TEMPLATE" link. All-day events use a
    /// date-only range whose end date is exclusive (start plus one calendar
    /// day); timed events use the compact local timestamps of the record.
    pub fn google_calendar_link(event: &Event) -> String {
        let dates = if event.is_all_day {
            let start = date_part(&event.start);
            // A start that is not a real calendar date cannot be advanced;
            // the end date then equals the start date.
            let end = NaiveDate::parse_from_str(start, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.succ_opt())
                .map(|d| d.format("%Y%m%d").to_string())
                .unwrap_or_else(|| start.replace('-', ""));
            format!("{}/{}", start.replace('-', ""), end)
        } else {
            format!("{}/{}", google_time(&event.start), google_time(&event.end))
        };
        format!(
            "https://calendar.google.com/calendar/render?action=TEMPLATE&text={}&dates={}&details={}&location={}",
            encode(&event.title),
            dates,
            encode(&event.details),
            encode(&event.location),
        )
    }

    /* -------------------------------- Todoist -------------------------------- */

    /// Todoist quick-add deep link for the mobile app scheme.
    pub fn todoist_mobile_link(event: &Event, today: NaiveDate) -> String {
        format!(
            "todoist://addtask?content={}&date={}",
            encode(&todoist_content(event)),
            encode(&todoist_date(&event.start, today)),
        )
    }

    /// Todoist quick-add link for the web endpoint. Same content and date
    /// computation as the mobile variant; only scheme and host differ.
    pub fn todoist_web_link(event: &Event, today: NaiveDate) -> String {
        format!(
            "https://todoist.com/add?content={}&date={}",
            encode(&todoist_content(event)),
            encode(&todoist_date(&event.start, today)),
        )
    }

    /// Content blocks, blank-line separated, in the order the quick-add box
    /// expects: title; `終了時間/HH:MM` when a timed event's end differs
    /// from its start; details; `@location`; and for timed events the start
    /// `HH:MM` as a trailing natural-language hint (the date argument alone
    /// cannot carry a time).
    fn todoist_content(event: &Event) -> String {
        let mut blocks = vec![event.title.clone()];

        if !event.is_all_day {
            let start_time = time_part(&event.start);
            let end_time = time_part(&event.end);
            if start_time != end_time {
                blocks.push(format!("終了時間/{end_time}"));
            }
        }

        let details = event.details.trim();
        if !details.is_empty() {
            blocks.push(details.to_string());
        }

        if !event.location.is_empty() {
            blocks.push(format!("@{}", event.location));
        }

        if !event.is_all_day {
            blocks.push(time_part(&event.start).to_string());
        }

        blocks.join("\n\n")
    }

    /// Natural-language date argument: `today`, `tomorrow`, or the literal
    /// canonical date; anything that is not a real `YYYY-MM-DD` date falls
    /// back to `today`.
    fn todoist_date(start: &str, today: NaiveDate) -> String {
        let date = date_part(start);
        if !is_canonical_date(date) {
            return "today".to_string();
        }
        let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
            return "today".to_string();
        };
        if parsed == today {
            "today".to_string()
        } else if Some(parsed) == today.succ_opt() {
            "tomorrow".to_string()
        } else {
            date.to_string()
        }
    }

    fn is_canonical_date(s: &str) -> bool {
        let b = s.as_bytes();
        b.len() == 10
            && b[..4].iter().all(u8::is_ascii_digit)
            && b[4] == b'-'
            && b[5..7].iter().all(u8::is_ascii_digit)
            && b[7] == b'-'
            && b[8..].iter().all(u8::is_ascii_digit)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::core::Event;

        fn timed_event() -> Event {
            Event {
                title: "会議".to_string(),
                start: "2024-03-10T09:00".to_string(),
                end: "2024-03-10T10:30".to_string(),
                details: "持ち物あり".to_string(),
                location: "大阪".to_string(),
                is_all_day: false,
            }
        }

        fn all_day_event() -> Event {
            Event {
                title: "休み".to_string(),
                start: "2024-03-10T00:00".to_string(),
                end: "2024-03-10T23:59".to_string(),
                details: String::new(),
                location: String::new(),
                is_all_day: true,
            }
        }

        fn today() -> NaiveDate {
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
        }

        #[test]
        fn google_all_day_range_has_exclusive_end_date() {
            let link = google_calendar_link(&all_day_event());
            assert!(link.contains("&dates=20240310/20240311&"));
            assert!(link.contains("text=%E4%BC%91%E3%81%BF"));
        }

        #[test]
        fn google_timed_range_uses_compact_timestamps_with_seconds() {
            let link = google_calendar_link(&timed_event());
            assert!(link.contains("&dates=20240310T090000/20240310T103000&"));
        }

        #[test]
        fn google_link_encodes_each_component() {
            let mut event = timed_event();
            event.title = "Team Sync".to_string();
            event.details = "line1\nline2".to_string();
            let link = google_calendar_link(&event);
            assert!(link.contains("text=Team%20Sync"));
            assert!(link.contains("details=line1%0Aline2"));
            assert!(link.contains("location=%E5%A4%A7%E9%98%AA"));
        }

        #[test]
        fn google_all_day_keeps_end_equal_to_start_for_unreal_dates() {
            let mut event = all_day_event();
            event.start = "2024-02-30T00:00".to_string();
            let link = google_calendar_link(&event);
            assert!(link.contains("&dates=20240230/20240230&"));
        }

        #[test]
        fn todoist_content_blocks_follow_the_fixed_order() {
            assert_eq!(
                todoist_content(&timed_event()),
                "会議\n\n終了時間/10:30\n\n持ち物あり\n\n@大阪\n\n09:00"
            );
        }

        #[test]
        fn todoist_content_omits_empty_blocks() {
            assert_eq!(todoist_content(&all_day_event()), "休み");
        }

        #[test]
        fn todoist_content_skips_end_marker_when_times_match() {
            let mut event = timed_event();
            event.end = event.start.clone();
            event.details = String::new();
            event.location = String::new();
            assert_eq!(todoist_content(&event), "会議\n\n09:00");
        }

        #[test]
        fn todoist_date_resolves_today_tomorrow_and_literal() {
            assert_eq!(todoist_date("2024-03-10T09:00", today()), "today");
            assert_eq!(todoist_date("2024-03-11T09:00", today()), "tomorrow");
            assert_eq!(todoist_date("2024-04-01T09:00", today()), "2024-04-01");
        }

        #[test]
        fn todoist_date_falls_back_to_today_when_unparsable() {
            assert_eq!(todoist_date("hogeT09:00", today()), "today");
            assert_eq!(todoist_date("2024-02-30T09:00", today()), "today");
        }

        #[test]
        fn todoist_variants_share_content_and_differ_in_scheme() {
            let event = timed_event();
            let mobile = todoist_mobile_link(&event, today());
            let web = todoist_web_link(&event, today());
            assert!(mobile.starts_with("todoist://addtask?content="));
            assert!(web.starts_with("https://todoist.com/add?content="));
            let mobile_query = mobile.split_once('?').map(|(_, q)| q);
            let web_query = web.split_once('?').map(|(_, q)| q);
            assert_eq!(mobile_query, web_query);
            assert!(mobile.ends_with("&date=today"));
        }
    }
}

pub use links::{google_calendar_link, todoist_mobile_link, todoist_web_link};
pub use parser::{normalize_date, parse_schedule, parse_schedule_str, resolve_time_range};
