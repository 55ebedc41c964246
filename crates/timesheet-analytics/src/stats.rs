use crate::daily::DailyBreakdown;

/// Summary statistics for one activity over a window (§4.3.2). Computed
/// over the per-day *totals*, considering only days with a non-zero total
/// for that activity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    pub total: f64,
    pub count: u32,
}

impl ActivityStats {
    fn from_totals(totals: &[f64]) -> Self {
        let active: Vec<f64> = totals.iter().copied().filter(|&v| v > 0.0).collect();
        let total: f64 = totals.iter().sum();
        if active.is_empty() {
            return Self {
                avg: 0.0,
                min: 0.0,
                max: 0.0,
                std_dev: 0.0,
                total,
                count: 0,
            };
        }

        let count = active.len();
        let avg = active.iter().sum::<f64>() / count as f64;
        let variance = active.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / count as f64;

        Self {
            avg,
            min: active.iter().copied().fold(f64::INFINITY, f64::min),
            max: active.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            std_dev: variance.sqrt(),
            total,
            #[allow(clippy::cast_possible_truncation)]
            count: count as u32,
        }
    }
}

/// Aggregate statistics for the four tracked activities over a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateStatistics {
    pub work: ActivityStats,
    pub commute_to_work: ActivityStats,
    pub commute_to_home: ActivityStats,
    pub lunch: ActivityStats,
}

/// Compute [`AggregateStatistics`] from a window's [`DailyBreakdown`] rows.
#[must_use]
pub fn aggregate_statistics(days: &[DailyBreakdown]) -> AggregateStatistics {
    AggregateStatistics {
        work: ActivityStats::from_totals(&days.iter().map(|d| d.work_hours).collect::<Vec<_>>()),
        commute_to_work: ActivityStats::from_totals(
            &days.iter().map(|d| d.commute_to_work_hours).collect::<Vec<_>>(),
        ),
        commute_to_home: ActivityStats::from_totals(
            &days.iter().map(|d| d.commute_to_home_hours).collect::<Vec<_>>(),
        ),
        lunch: ActivityStats::from_totals(&days.iter().map(|d| d.lunch_hours).collect::<Vec<_>>()),
    }
}
