//! DTOs for per-link statistics and the fleet summary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

use super::link::TotalsDto;
use crate::domain::repositories::{DailyCount, EventCounts};

/// Query for `GET /urls/{id}/stats`.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    /// Number of days to bucket, ending today (default 30, max 365).
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub days: Option<u32>,
}

/// Event counts with their sum.
#[derive(Debug, Serialize)]
pub struct CountsDto {
    pub total: i64,
    #[serde(flatten)]
    pub by_type: EventCounts,
}

impl From<EventCounts> for CountsDto {
    fn from(counts: EventCounts) -> Self {
        Self {
            total: counts.total(),
            by_type: counts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DailyDto {
    pub day: NaiveDate,
    #[serde(flatten)]
    pub counts: CountsDto,
}

impl From<DailyCount> for DailyDto {
    fn from(daily: DailyCount) -> Self {
        Self {
            day: daily.day,
            counts: daily.counts.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LinkStatsResponse {
    pub id: i64,
    pub code: String,
    pub short_url: String,
    pub totals: TotalsDto,
    pub days: usize,
    pub daily: Vec<DailyDto>,
}

/// Response of `GET /urls/stats/summary`.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub links_total: i64,
    pub today: CountsDto,
    pub week: CountsDto,
    pub month: CountsDto,
    pub all_time: CountsDto,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::EventType;

    #[test]
    fn test_daily_dto_shape() {
        let mut counts = EventCounts::default();
        counts.add(EventType::AdView, 2);

        let json = serde_json::to_value(DailyDto::from(DailyCount {
            day: "2026-03-10".parse().unwrap(),
            counts,
        }))
        .unwrap();

        assert_eq!(json["day"], "2026-03-10");
        assert_eq!(json["total"], 2);
        assert_eq!(json["ad_view"], 2);
        assert_eq!(json["link_click"], 0);
    }

    #[test]
    fn test_days_query_parses_from_string() {
        let q: StatsQuery = serde_json::from_str(r#"{"days":"7"}"#).unwrap();
        assert_eq!(q.days, Some(7));
    }
}
