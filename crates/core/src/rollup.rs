//! Daily rollup of staged telemetry into mart rows.
//!
//! This is the in-process form of the store-side rollup statement. Both
//! inner-join telemetry to clients on `client_id` and group by client, day
//! and the full client attribute tuple.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveDateTime};

use crate::records::{ClientRecord, DailySummaryRow, TelemetryEvent};
use crate::stats::{mean, p95};

/// Grouping key: client, day, then every denormalized client attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey<'a> {
    client_id: u64,
    report_date: NaiveDate,
    full_name: &'a str,
    email: &'a str,
    country: &'a str,
    city: &'a str,
    prosthesis_id: u64,
    activation_date: NaiveDate,
}

impl<'a> GroupKey<'a> {
    fn new(client: &'a ClientRecord, report_date: NaiveDate) -> Self {
        Self {
            client_id: client.client_id,
            report_date,
            full_name: &client.full_name,
            email: &client.email,
            country: &client.country,
            city: &client.city,
            prosthesis_id: client.prosthesis_id,
            activation_date: client.activation_date,
        }
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    reactions: Vec<f64>,
    battery_sum: f64,
    errors: u32,
    last_event_ts: Option<NaiveDateTime>,
}

impl Accumulator {
    fn push(&mut self, event: &TelemetryEvent) {
        self.reactions.push(f64::from(event.reaction_time_ms));
        self.battery_sum += f64::from(event.battery_level);
        if event.has_error() {
            self.errors += 1;
        }
        self.last_event_ts = Some(match self.last_event_ts {
            Some(ts) => ts.max(event.event_ts),
            None => event.event_ts,
        });
    }
}

/// Computes the full mart contents from the two staging snapshots.
///
/// Telemetry for unknown clients is dropped. Rows come out ordered by
/// `(client_id, report_date)`.
pub fn build_daily_rollup(
    clients: &[ClientRecord],
    events: &[TelemetryEvent],
) -> Vec<DailySummaryRow> {
    let mut by_id: HashMap<u64, Vec<&ClientRecord>> = HashMap::new();
    for client in clients {
        by_id.entry(client.client_id).or_default().push(client);
    }

    let mut groups: BTreeMap<GroupKey<'_>, Accumulator> = BTreeMap::new();
    for event in events {
        let Some(matches) = by_id.get(&event.client_id) else {
            continue;
        };
        for client in matches {
            groups
                .entry(GroupKey::new(client, event.report_date()))
                .or_default()
                .push(event);
        }
    }

    groups
        .into_iter()
        .filter_map(|(key, acc)| {
            let last_event_ts = acc.last_event_ts?;
            let total = acc.reactions.len();
            Some(DailySummaryRow {
                client_id: key.client_id,
                report_date: key.report_date,
                full_name: key.full_name.to_string(),
                email: key.email.to_string(),
                country: key.country.to_string(),
                city: key.city.to_string(),
                prosthesis_id: key.prosthesis_id,
                activation_date: key.activation_date,
                total_events: total as u32,
                avg_reaction_ms: mean(acc.reactions.iter().copied()),
                p95_reaction_ms: p95(&acc.reactions),
                avg_battery_level: acc.battery_sum / total as f64,
                errors_count: acc.errors,
                last_event_ts,
            })
        })
        .collect()
}
