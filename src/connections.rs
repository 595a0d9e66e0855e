//! Connection table builder and the process-wide cache: `spec.md` §4.C and
//! §5.
//!
//! Grounded on the teacher's
//! `csa/transport_network.rs::TransportNetwork::from_adapter` (sort
//! connections by departure, expose a binary-search entry point into the
//! sorted list) for the table shape, and on
//! `examples/original_source/mobilidade/transporte/algorithms/calcular_raio_csa.py`'s
//! `carregar_conexoes`/`_add_trip`/`_gen_headway` for the per-trip offset
//! bookkeeping frequency expansion needs, which the teacher's CIF adapter
//! never required (CIF schedules have no frequency rules). Per-trip
//! grouping uses `itertools::Itertools::chunk_by`, the same crate the
//! teacher reaches for grouping elsewhere (`into_group_map_by` in its CIF
//! adapters).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use chrono::Weekday;
use itertools::Itertools;

use crate::config::HORIZON_BUCKET_MINUTES;
use crate::model::{Connection, StopId};
use crate::provider::{ScheduleProvider, StopTimeRow};

/// A time-sorted connection list plus the per-departure-stop index:
/// `spec.md` §3 "Connection table".
#[derive(Debug, Default)]
pub struct ConnectionTable {
    connections: Vec<Connection>,
    index_by_dep_stop: HashMap<StopId, Vec<u32>>,
}

impl ConnectionTable {
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Connections departing `stop`, in ascending `dep_minute` order
    /// (`index_by_dep_stop` stores positions into the globally-sorted
    /// list, so the subsequence is already sorted).
    pub fn departures_from(&self, stop: StopId) -> impl Iterator<Item = &Connection> {
        let positions: &[u32] = self
            .index_by_dep_stop
            .get(&stop)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        positions.iter().map(move |&idx| &self.connections[idx as usize])
    }
}

/// Per-trip bookkeeping used only while building the table: the ordered
/// stop chain and its cumulative-minute offsets from the trip's first
/// departure (`spec.md` §4.C step 2, and SPEC_FULL.md §3), plus the
/// trip's own literal (unexpanded) connections, emitted only if the trip
/// turns out to have no frequency rule attached.
struct TripTemplate {
    stops: Vec<StopId>,
    offsets: Vec<i64>,
    literal_connections: Vec<Connection>,
}

/// Builds a connection table for one service-day and horizon, per
/// `spec.md` §4.C.
///
/// `stop_ids` resolves a provider's opaque `stop_id` string to the dense
/// [`StopId`] the engine uses; stops the index doesn't know about (no
/// finite position) are silently dropped from the resulting connections.
pub fn build_connection_table<P: ScheduleProvider>(
    provider: &P,
    weekday: Weekday,
    horizon_minutes: i64,
    stop_ids: &HashMap<String, StopId>,
) -> Result<ConnectionTable, P::Error> {
    let active_services = provider.active_services(weekday)?;
    let stop_times = provider.stop_times_for_services(&active_services)?;

    let mut connections = Vec::new();
    let mut templates: HashMap<String, TripTemplate> = HashMap::new();

    for rows in group_by_trip(&stop_times) {
        let valid: Vec<&StopTimeRow> = rows
            .iter()
            .filter(|r| r.arrival_min.is_some() || r.departure_min.is_some())
            .copied()
            .collect();

        if valid.len() < 2 {
            continue; // "Trips with fewer than two valid stop-times produce no connections."
        }

        let trip_id = valid[0].trip_id.clone();
        let mut template_stops = Vec::with_capacity(valid.len());
        let mut template_offsets = Vec::with_capacity(valid.len());
        let mut template_connections = Vec::with_capacity(valid.len() - 1);

        let Some(&first_id) = stop_ids.get(&valid[0].stop_id) else {
            continue;
        };
        template_stops.push(first_id);
        template_offsets.push(0);

        let mut complete = true;
        for pair in valid.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let (Some(from_id), Some(to_id)) =
                (stop_ids.get(&from.stop_id), stop_ids.get(&to.stop_id))
            else {
                complete = false;
                break;
            };

            // s1 needs a departure, s2 needs an arrival; fall back to the
            // other field when one is absent so a row with only one time
            // recorded (permitted by spec.md §3) doesn't break the chain.
            let dep = match from.departure_min.or(from.arrival_min) {
                Some(v) => v,
                None => {
                    complete = false;
                    break;
                }
            };
            let arr = match to.arrival_min.or(to.departure_min) {
                Some(v) => v,
                None => {
                    complete = false;
                    break;
                }
            };
            if arr < dep {
                complete = false;
                break;
            }

            template_connections.push(Connection {
                dep_stop: *from_id,
                arr_stop: *to_id,
                dep_minute: dep,
                arr_minute: arr,
            });

            let last_offset = *template_offsets.last().unwrap();
            template_offsets.push(last_offset + (arr - dep));
            template_stops.push(*to_id);
        }

        if complete && template_stops.len() == valid.len() {
            templates.insert(
                trip_id,
                TripTemplate {
                    stops: template_stops,
                    offsets: template_offsets,
                    literal_connections: template_connections,
                },
            );
        }
    }

    let trip_ids: std::collections::HashSet<String> = templates.keys().cloned().collect();
    let frequencies = provider.frequencies_for_trips(&trip_ids)?;
    let trips_with_frequency: std::collections::HashSet<&str> =
        frequencies.iter().map(|r| r.trip_id.as_str()).collect();

    // A trip with a frequency rule contributes only its headway-expanded
    // connections, per spec.md §3 ("the trip's stop-time pattern is
    // replayed..."); its literal stop-time connection is not also a
    // separate trip instance. Trips with no frequency rule run exactly
    // once, at their literal stop-times.
    for (trip_id, template) in &templates {
        if !trips_with_frequency.contains(trip_id.as_str()) {
            connections.extend(template.literal_connections.iter().copied());
        }
    }

    for rule in &frequencies {
        if rule.headway_min <= 0 {
            continue; // "Frequency rules with headway_minutes <= 0 are ignored."
        }
        let Some(template) = templates.get(&rule.trip_id) else {
            continue; // "Only trips that have an explicit stop-time template are eligible."
        };

        let last_base = rule.end_min.min(horizon_minutes);
        let mut base = rule.start_min;
        while base <= last_base {
            for i in 0..template.stops.len() - 1 {
                connections.push(Connection {
                    dep_stop: template.stops[i],
                    arr_stop: template.stops[i + 1],
                    dep_minute: base + template.offsets[i],
                    arr_minute: base + template.offsets[i + 1],
                });
            }
            base += rule.headway_min;
        }
    }

    connections.sort_unstable_by_key(|c| c.dep_minute);

    let mut index_by_dep_stop: HashMap<StopId, Vec<u32>> = HashMap::new();
    for (i, c) in connections.iter().enumerate() {
        index_by_dep_stop.entry(c.dep_stop).or_default().push(i as u32);
    }

    Ok(ConnectionTable {
        connections,
        index_by_dep_stop,
    })
}

/// Groups stop-times into per-trip runs, relying on the provider's
/// contract that rows arrive ordered by `(trip_id, stop_sequence)`.
fn group_by_trip(rows: &[StopTimeRow]) -> impl Iterator<Item = Vec<&StopTimeRow>> {
    rows.iter()
        .chunk_by(|row| row.trip_id.clone())
        .into_iter()
        .map(|(_, group)| group.collect())
        .collect::<Vec<_>>()
        .into_iter()
}

/// Cache key: `(weekday, horizon_bucket)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    weekday: u8,
    horizon_bucket: i64,
}

fn bucket(horizon_minutes: i64) -> i64 {
    horizon_minutes.div_euclid(HORIZON_BUCKET_MINUTES) + 1
}

/// Process-wide, reference-counted cache of connection tables, coalescing
/// concurrent construction for the same key: a lookup holds
/// the table-wide mutex only long enough to fetch-or-insert a per-key
/// `OnceLock`, then blocks on that lock alone, so unrelated keys never
/// contend and at most one builder runs per key.
#[derive(Default)]
pub struct ConnectionTableCache {
    entries: Mutex<HashMap<CacheKey, Arc<OnceLock<Result<Arc<ConnectionTable>, String>>>>>,
}

impl ConnectionTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached table for `(weekday, horizon)`, building it if
    /// absent. Provider errors are stringified so the cache entry (and the
    /// `OnceLock` coalescing concurrent builders onto it) doesn't need to
    /// be generic over `P::Error`; callers turn this into
    /// [`crate::error::Error::ScheduleUnavailable`]. A failed build is not
    /// memoized: spec.md §7 surfaces `ScheduleUnavailable` but doesn't ask
    /// for it to be remembered, so a transient provider failure can be
    /// retried by a later call instead of poisoning the key forever.
    pub fn get_or_build<P: ScheduleProvider>(
        &self,
        provider: &P,
        weekday: Weekday,
        horizon_minutes: i64,
        stop_ids: &HashMap<String, StopId>,
    ) -> Result<Arc<ConnectionTable>, String> {
        let key = CacheKey {
            weekday: weekday.num_days_from_monday() as u8,
            horizon_bucket: bucket(horizon_minutes),
        };
        let bucketed_horizon = key.horizon_bucket * HORIZON_BUCKET_MINUTES;

        let slot = {
            let mut entries = self.entries.lock().expect("connection table cache poisoned");
            entries.entry(key).or_default().clone()
        };

        // `OnceLock::get_or_init` runs its closure at most once even under
        // concurrent access; later callers for the same key block on the
        // first caller's build instead of racing it, satisfying spec.md
        // §5's "at-most-one builder runs per key" requirement.
        let result = slot
            .get_or_init(|| {
                build_connection_table(provider, weekday, bucketed_horizon, stop_ids)
                    .map(Arc::new)
                    .map_err(|e| e.to_string())
            })
            .clone();

        // A `OnceLock` can't be reset once initialised, so a failed build
        // is evicted from the map instead: as long as nobody has already
        // replaced this slot, the next caller gets a brand new `OnceLock`
        // and retries the build from scratch.
        if result.is_err() {
            let mut entries = self.entries.lock().expect("connection table cache poisoned");
            if let Some(current) = entries.get(&key) {
                if Arc::ptr_eq(current, &slot) {
                    entries.remove(&key);
                }
            }
        }

        result
    }

    /// Drops one cached table, forcing the next matching query to rebuild
    /// it. Used when the schedule backing the provider changes.
    pub fn invalidate(&self, weekday: Weekday, horizon_minutes: i64) {
        let key = CacheKey {
            weekday: weekday.num_days_from_monday() as u8,
            horizon_bucket: bucket(horizon_minutes),
        };
        self.entries.lock().expect("connection table cache poisoned").remove(&key);
    }

    pub fn invalidate_all(&self) {
        self.entries.lock().expect("connection table cache poisoned").clear();
    }
}
