use chrono::{DateTime, Duration, Utc};

pub const NO_NOTIFICATIONS: &str = "No notifications posted yet";
pub const UNAVAILABLE: &str = "Unable to get notification history";

/// What the history row shows under its title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    Empty,
    Unavailable,
    LastPosted(DateTime<Utc>),
}

impl Summary {
    pub fn render(&self, now: DateTime<Utc>) -> String {
        match self {
            Summary::Empty => NO_NOTIFICATIONS.to_owned(),
            Summary::Unavailable => UNAVAILABLE.to_owned(),
            Summary::LastPosted(posted) => {
                format!("Last notification posted {}", relative(*posted, now))
            }
        }
    }
}

const UNITS: [(&str, i64); 7] = [
    ("year", 365 * 24 * 60 * 60),
    ("month", 30 * 24 * 60 * 60),
    ("week", 7 * 24 * 60 * 60),
    ("day", 24 * 60 * 60),
    ("hour", 60 * 60),
    ("minute", 60),
    ("second", 1),
];

/// Full-style relative description of `at` as seen from `now`, e.g.
/// "3 minutes ago" or "in 1 hour".
pub fn relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = at - now;
    // sub-second offsets keep their direction
    let magnitude = delta.num_seconds().abs();
    let (unit, count) = UNITS
        .iter()
        .map(|(unit, secs)| (*unit, magnitude / secs))
        .find(|(_, count)| *count > 0)
        .unwrap_or(("second", 0));
    let plural = if count == 1 { "" } else { "s" };
    if delta < Duration::zero() {
        format!("{} {}{} ago", count, unit, plural)
    } else {
        format!("in {} {}{}", count, unit, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn picks_the_largest_whole_unit() {
        let now = now();
        assert_eq!(relative(now - Duration::seconds(1), now), "1 second ago");
        assert_eq!(
            relative(now - Duration::seconds(59), now),
            "59 seconds ago"
        );
        assert_eq!(
            relative(now - Duration::seconds(61), now),
            "1 minute ago"
        );
        assert_eq!(relative(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(relative(now - Duration::days(1), now), "1 day ago");
        assert_eq!(relative(now - Duration::days(14), now), "2 weeks ago");
        assert_eq!(relative(now - Duration::days(65), now), "2 months ago");
        assert_eq!(
            relative(now - Duration::days(800), now),
            "2 years ago"
        );
    }

    #[test]
    fn under_a_second_keeps_its_direction() {
        let now = now();
        let ms = Duration::milliseconds(600);
        assert_eq!(relative(now - ms, now), "0 seconds ago");
        assert_eq!(relative(now + ms, now), "in 0 seconds");
        assert_eq!(
            Summary::LastPosted(now - ms).render(now),
            "Last notification posted 0 seconds ago"
        );
    }

    #[test]
    fn future_and_present() {
        let now = now();
        assert_eq!(relative(now, now), "in 0 seconds");
        assert_eq!(
            relative(now + Duration::minutes(3), now),
            "in 3 minutes"
        );
    }

    #[test]
    fn renders_fallbacks() {
        assert_eq!(
            Summary::Empty.render(now()),
            "No notifications posted yet"
        );
        assert_eq!(
            Summary::Unavailable.render(now()),
            "Unable to get notification history"
        );
        assert_eq!(
            Summary::LastPosted(now() - Duration::minutes(2)).render(now()),
            "Last notification posted 2 minutes ago"
        );
    }
}
