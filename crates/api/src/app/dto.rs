use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use jobwatch_infra::HistoryFilter;

// -------------------------
// Request DTOs
// -------------------------

/// Query string of `GET /jobs`.
///
/// Every field is read as a raw string: malformed values are ignored rather
/// than rejected, and empty values count as absent. Built from the raw
/// key/value pairs so a repeated key never rejects the request; the last
/// occurrence wins.
#[derive(Debug, Default)]
pub struct ListJobsQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub queue: Option<String>,
    pub job_type: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub per_page: Option<String>,
    pub page: Option<String>,
}

impl ListJobsQuery {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "search" => &mut query.search,
                "status" => &mut query.status,
                "queue" => &mut query.queue,
                "job_type" => &mut query.job_type,
                "date_from" => &mut query.date_from,
                "date_to" => &mut query.date_to,
                "per_page" => &mut query.per_page,
                "page" => &mut query.page,
                _ => continue,
            };
            *slot = Some(value.into());
        }
        query
    }

    pub fn filter(&self) -> HistoryFilter {
        HistoryFilter {
            search: filled(&self.search).map(str::to_string),
            status: filled(&self.status).and_then(|s| s.parse().ok()),
            queue: filled(&self.queue).map(str::to_string),
            job_type: filled(&self.job_type).map(str::to_string),
            created_from: filled(&self.date_from).and_then(|s| parse_bound(s, Bound::Start)),
            created_to: filled(&self.date_to).and_then(|s| parse_bound(s, Bound::End)),
        }
    }

    pub fn page(&self) -> Option<u32> {
        filled(&self.page).and_then(|s| s.parse().ok())
    }

    pub fn per_page(&self) -> Option<u32> {
        filled(&self.per_page).and_then(|s| s.parse().ok())
    }
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Start,
    End,
}

/// RFC 3339 timestamps are taken as-is; a bare `YYYY-MM-DD` covers the
/// whole day (start of day for a lower bound, end of day for an upper one).
fn parse_bound(value: &str, bound: Bound) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let time = match bound {
        Bound::Start => NaiveTime::MIN,
        Bound::End => NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)?,
    };
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobwatch_core::JobStatus;

    fn query(pairs: &[(&str, &str)]) -> ListJobsQuery {
        ListJobsQuery::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn repeated_keys_keep_the_last_value() {
        let q = query(&[
            ("status", "failed"),
            ("status", "completed"),
            ("per_page", "10"),
            ("per_page", "20"),
            ("unknown", "x"),
        ]);
        assert_eq!(q.filter().status, Some(JobStatus::Completed));
        assert_eq!(q.per_page(), Some(20));
    }

    #[test]
    fn malformed_values_are_ignored() {
        let q = query(&[
            ("status", "exploded"),
            ("date_from", "yesterday"),
            ("per_page", "lots"),
            ("page", "-1"),
            ("search", "  "),
        ]);
        assert_eq!(q.filter(), HistoryFilter::default());
        assert_eq!(q.per_page(), None);
        assert_eq!(q.page(), None);
    }

    #[test]
    fn well_formed_values_are_used() {
        let q = query(&[
            ("status", "failed"),
            ("queue", "mail"),
            ("job_type", "Invoice"),
            ("date_from", "2024-03-01"),
            ("date_to", "2024-03-01"),
            ("per_page", "10"),
            ("page", "2"),
        ]);
        let f = q.filter();
        assert_eq!(f.status, Some(JobStatus::Failed));
        assert_eq!(f.queue.as_deref(), Some("mail"));
        assert_eq!(f.job_type.as_deref(), Some("Invoice"));
        assert_eq!(f.created_from.unwrap().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(
            f.created_to.unwrap().to_rfc3339(),
            "2024-03-01T23:59:59.999999999+00:00"
        );
        assert_eq!(q.per_page(), Some(10));
        assert_eq!(q.page(), Some(2));
    }

    #[test]
    fn rfc3339_bounds_keep_their_instant() {
        let q = query(&[("date_from", "2024-03-01T10:00:00+02:00")]);
        assert_eq!(
            q.filter().created_from.unwrap().to_rfc3339(),
            "2024-03-01T08:00:00+00:00"
        );
    }
}
