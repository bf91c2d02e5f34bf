use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use std::borrow::Cow;

use crate::table::Table;

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}

/// Rows of `table` whose time value falls inside the date range
///
/// Bounds are dates, compared as midnight timestamps, and both ends are
/// inclusive, so a value later in the day than `end` falls outside. Rows with
/// no time value are dropped once a range applies.
///
/// The table is returned untouched (borrowed) when `bounds` does not hold
/// exactly two dates or `time_column` is not a date/time column.
pub fn filter_by_date_range<'a>(
    table: &'a Table,
    time_column: &str,
    bounds: &[NaiveDate],
) -> Cow<'a, Table> {
    let &[start, end] = bounds else {
        return Cow::Borrowed(table);
    };
    let Some(times) = table.column(time_column).and_then(|c| c.as_temporal()) else {
        return Cow::Borrowed(table);
    };

    let (start, end) = (midnight(start), midnight(end));
    let rows: Vec<usize> = times
        .iter()
        .enumerate()
        .filter(|(_, t)| matches!(t, Some(t) if *t >= start && *t <= end))
        .map(|(i, _)| i)
        .collect();

    debug!(
        "date filter {} ..= {} kept {} of {} rows",
        start,
        end,
        rows.len(),
        table.row_count()
    );
    Cow::Owned(table.take_rows(&rows))
}
