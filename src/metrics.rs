//! Coarse workload figures derived from bucket populations.

use chrono::NaiveDate;

use crate::stop::{Stop, ViewMode};

/// Hours of work assumed per stop.
pub const HOURS_PER_STOP: f64 = 0.4;

/// Rounded-up hours for `count` stops, `None` when there is nothing to do.
pub fn hours_for(count: usize) -> Option<u32> {
    (count > 0).then(|| (count as f64 * HOURS_PER_STOP).ceil() as u32)
}

/// One estimate per route bucket `0..route_count`, counting only routable
/// stops assigned to that bucket.
pub fn estimate_hours(stops: &[Stop], route_count: usize, view: ViewMode) -> Vec<Option<u32>> {
    let mut counts = vec![0usize; route_count];
    for stop in stops.iter().filter(|stop| view.is_routable(stop)) {
        if let Some(count) = counts.get_mut(stop.cluster_index) {
            *count += 1;
        }
    }
    counts.into_iter().map(hours_for).collect()
}

/// Headline figures for the whole session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    pub orders: usize,
    pub due_today: usize,
    pub past_due: usize,
    /// Route length in the display unit: the furthest cumulative distance
    /// label among the summarized stops. Labels are already running totals,
    /// so they are not summed the way the earlier web client did.
    pub total_distance: f64,
    pub hours: u32,
}

/// Summarizes active, not yet completed stops.
pub fn summarize(stops: &[Stop], view: ViewMode, today: NaiveDate) -> Summary {
    let mut summary = Summary::default();

    for stop in stops
        .iter()
        .filter(|stop| view.is_active(stop) && !stop.is_completed())
    {
        summary.orders += 1;
        let distance = stop
            .distance_label
            .as_deref()
            .and_then(leading_number)
            .unwrap_or(0.0);
        summary.total_distance = summary.total_distance.max(distance);
        match stop.due_date {
            Some(due) if due < today => summary.past_due += 1,
            Some(due) if due == today => summary.due_today += 1,
            _ => {}
        }
    }

    summary.hours = hours_for(summary.orders).unwrap_or(0);
    summary
}

/// Numeric prefix of a label such as `"12.3 mi"`.
fn leading_number(label: &str) -> Option<f64> {
    label.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hours_round_up() {
        assert_eq!(hours_for(0), None);
        assert_eq!(hours_for(1), Some(1));
        assert_eq!(hours_for(5), Some(2));
        assert_eq!(hours_for(6), Some(3));
    }

    #[test]
    fn test_estimate_counts_routable_only() {
        let mut stops = vec![
            Stop::new("a").at(1.0, 1.0).with_status("routed"),
            Stop::new("b").at(1.0, 1.0).with_status("routed"),
            Stop::new("c").with_status("routed"),
            Stop::new("d").at(1.0, 1.0).with_status("cancelled"),
        ];
        stops[1].cluster_index = 1;

        let hours = estimate_hours(&stops, 3, ViewMode::Routing);
        assert_eq!(hours, vec![Some(1), Some(1), None]);
    }

    #[test]
    fn test_summary_counts_due_dates() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let mut done = Stop::new("d").due(today);
        done.status = "completed".into();
        let mut far = Stop::new("c").due(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        far.distance_label = Some("3.5 mi".to_string());
        let mut near = Stop::new("a").due(today);
        near.distance_label = Some("1.2 mi".to_string());

        let stops = vec![
            near,
            Stop::new("b").due(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
            far,
            done,
        ];

        let summary = summarize(&stops, ViewMode::Driver, today);
        assert_eq!(summary.orders, 3);
        assert_eq!(summary.due_today, 1);
        assert_eq!(summary.past_due, 1);
        assert_eq!(summary.hours, 2);
        assert!((summary.total_distance - 3.5).abs() < 1e-9);
    }
}
