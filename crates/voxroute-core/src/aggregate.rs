//! Record → statistics reduction

use crate::types::{AggregateStats, ConversationRecord, DailyCount, UNKNOWN_KEY};
use chrono::NaiveDate;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Reduce conversation records into summary statistics
///
/// Pure: the result depends only on `records`. Empty input yields
/// zero-valued stats. `calls_by_day` comes out ascending by date (the
/// `unknown` bucket, if any, sorts last) and `conversations` descending by
/// start time, records without a start time last, ties in arrival order.
pub fn aggregate(records: Vec<ConversationRecord>) -> AggregateStats {
    if records.is_empty() {
        return AggregateStats::default();
    }

    let mut total_duration_secs: u64 = 0;
    let mut calls_by_agent: BTreeMap<String, u64> = BTreeMap::new();
    // (missing, day) orders by calendar date with the unknown bucket last
    let mut calls_by_day: BTreeMap<(bool, Option<NaiveDate>), u64> = BTreeMap::new();

    for record in &records {
        total_duration_secs = total_duration_secs.saturating_add(record.duration_secs());
        *calls_by_agent
            .entry(record.agent_key().to_string())
            .or_default() += 1;
        let day = record.start_date();
        *calls_by_day.entry((day.is_none(), day)).or_default() += 1;
    }

    let total_calls = records.len() as u64;
    let average_duration_secs = total_duration_secs as f64 / total_calls as f64;

    let mut conversations = records;
    conversations.sort_by_key(|record| Reverse(record.start_time_unix_secs));

    AggregateStats {
        total_calls,
        total_duration_secs,
        average_duration_secs,
        calls_by_agent,
        calls_by_day: calls_by_day
            .into_iter()
            .map(|((_, day), count)| DailyCount {
                date: day
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| UNKNOWN_KEY.to_string()),
                count,
            })
            .collect(),
        conversations,
    }
}
