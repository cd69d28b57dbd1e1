use std::fmt::{Display, Formatter};

use jiff::Zoned;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::trace;

use crate::AppResult;

/// Same layout `git log --date=iso` prints, e.g. `2024-01-01 09:00:00 +0900`.
const GIT_DATE_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute]"
);

/// Timezone the report range is expressed in, keeping the name the user gave.
#[derive(Debug, Clone)]
pub struct ReportTimezone {
    name: String,
    tz: TimeZone,
}

impl ReportTimezone {
    /// Resolve an IANA identifier. There is no whitelist: the lookup is the check.
    #[tracing::instrument(level = "trace")]
    pub fn named(name: &str) -> AppResult<Self> {
        let tz = TimeZone::get(name)?;
        Ok(Self {
            name: name.to_string(),
            tz,
        })
    }

    /// The host's local timezone.
    pub fn system() -> Self {
        let tz = TimeZone::system();
        let name = tz.iana_name().unwrap_or("local").to_string();
        trace!("Using system timezone {}", name);
        Self { name, tz }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for ReportTimezone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Inclusive `[from 00:00:00.000, to 23:59:59.999]` window in one timezone.
#[derive(Debug, Clone)]
pub struct ResolvedRange {
    start: Zoned,
    end: Zoned,
}

impl ResolvedRange {
    #[tracing::instrument(level = "debug", skip(timezone), fields(timezone = %timezone))]
    pub fn resolve(from: Date, to: Date, timezone: &ReportTimezone) -> AppResult<Self> {
        let start = from.at(0, 0, 0, 0).to_zoned(timezone.tz.clone())?;
        let end = to.at(23, 59, 59, 999_000_000).to_zoned(timezone.tz.clone())?;
        Ok(Self { start, end })
    }

    pub fn start_iso(&self) -> String {
        to_iso_millis(&self.start)
    }

    pub fn end_iso(&self) -> String {
        to_iso_millis(&self.end)
    }

    /// Whether a unix timestamp (whole seconds) falls inside the window.
    pub fn contains(&self, unix_seconds: i64) -> bool {
        unix_seconds >= self.start.timestamp().as_second()
            && unix_seconds <= self.end.timestamp().as_second()
    }
}

/// `YYYY-MM-DDTHH:MM:SS.mmm+HH:MM`
fn to_iso_millis(zoned: &Zoned) -> String {
    let millis = zoned.subsec_nanosecond() / 1_000_000;
    format!(
        "{}.{:03}{}",
        zoned.strftime("%Y-%m-%dT%H:%M:%S"),
        millis,
        zoned.strftime("%:z")
    )
}

/// Render a git signature time in its own offset, the way `git log --date=iso` does.
#[tracing::instrument(level = "trace", skip(when), fields(seconds = when.seconds()))]
pub fn format_git_time(when: git2::Time) -> AppResult<String> {
    let offset = UtcOffset::from_whole_seconds(when.offset_minutes() * 60)?;
    let dt = OffsetDateTime::from_unix_timestamp(when.seconds())?.to_offset(offset);
    Ok(dt.format(GIT_DATE_FORMAT)?)
}
