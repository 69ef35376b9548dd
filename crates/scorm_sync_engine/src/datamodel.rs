//! The data model store: current value of every key.
//!
//! The store is seeded from two sources, the host-supplied initial values and
//! the batches recovered from the durable store, merged key by key with the
//! later timestamp winning. On a timestamp tie the recovered value wins,
//! since durable storage is what the learner last saw before the restart.
//!
//! Keys with numeric path segments belong to lists: `cmi.interactions.2.id`
//! is item 2 of `cmi.interactions`, and `cmi.interactions.2.objectives.0.id`
//! is also item 0 of `cmi.interactions.2.objectives`. Every accepted write
//! keeps the synthetic `<list>._count` key at one past the greatest index
//! seen.

use scorm_sync_protocol::Batch;
use std::collections::{BTreeMap, HashMap};

/// Data model key holding the presentation mode.
pub const MODE_KEY: &str = "cmi.mode";
/// Data model key holding the completion status.
pub const COMPLETION_KEY: &str = "cmi.completion_status";
/// The only mode in which writes are allowed.
pub const MODE_NORMAL: &str = "normal";
/// Mode forced on activities already completed.
pub const MODE_REVIEW: &str = "review";
/// Completion status that makes the session read-only.
pub const STATUS_COMPLETED: &str = "completed";
/// Suffix of synthetic list count keys.
pub const COUNT_SUFFIX: &str = "._count";

/// A stored value and the time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct DataValue {
    /// Current value.
    pub value: String,
    /// Seconds since the Unix epoch of the write that produced it.
    pub time: f64,
}

impl DataValue {
    /// Creates a value.
    pub fn new(value: impl Into<String>, time: f64) -> Self {
        Self {
            value: value.into(),
            time,
        }
    }
}

/// Host-supplied initial state of the data model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialData {
    values: BTreeMap<String, DataValue>,
}

impl InitialData {
    /// Creates empty initial data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>, time: f64) -> Self {
        self.insert(key, value, time);
        self
    }

    /// Adds or replaces a key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>, time: f64) {
        self.values.insert(key.into(), DataValue::new(value, time));
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no keys were supplied.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, DataValue)> for InitialData {
    fn from_iter<I: IntoIterator<Item = (String, DataValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Result of a write to the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The value changed; an element must be recorded.
    Accepted,
    /// The value equals the current one; nothing was recorded.
    Unchanged,
    /// The store is read-only; nothing changed.
    Rejected,
}

impl WriteOutcome {
    /// Returns true if the write changed the store.
    pub fn is_accepted(&self) -> bool {
        matches!(self, WriteOutcome::Accepted)
    }

    /// Returns true if the write was refused.
    pub fn is_rejected(&self) -> bool {
        matches!(self, WriteOutcome::Rejected)
    }
}

/// The authoritative current value of every key.
#[derive(Debug, Clone)]
pub struct DataModel {
    values: HashMap<String, DataValue>,
    counts: HashMap<String, usize>,
    mode: String,
    read_only: bool,
}

impl DataModel {
    /// Builds the store from host-supplied values and recovered batches.
    ///
    /// Recovered elements are applied in batch id order, then element order,
    /// each replacing the current value unless the current one is strictly
    /// newer. List counts are derived for every resulting key.
    pub fn from_sources(initial: InitialData, recovered: &[Batch]) -> Self {
        let mut values: HashMap<String, DataValue> = initial.values.into_iter().collect();

        let mut ordered: Vec<&Batch> = recovered.iter().collect();
        ordered.sort_by_key(|b| b.id);
        for element in ordered.iter().flat_map(|b| b.elements.iter()) {
            let replace = values
                .get(&element.key)
                .map_or(true, |current| current.time <= element.time);
            if replace {
                values.insert(
                    element.key.clone(),
                    DataValue::new(element.value.clone(), element.time),
                );
            }
        }

        let mut model = Self {
            values,
            counts: HashMap::new(),
            mode: String::new(),
            read_only: false,
        };

        let mut keys: Vec<(String, f64)> = model
            .values
            .iter()
            .filter(|(k, _)| !k.ends_with(COUNT_SUFFIX))
            .map(|(k, v)| (k.clone(), v.time))
            .collect();
        keys.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, time) in keys {
            model.derive_counts(&key, time);
        }

        model.mode = model.read(MODE_KEY).to_string();
        let completed = model.read(COMPLETION_KEY) == STATUS_COMPLETED;
        model.read_only = model.mode != MODE_NORMAL || completed;
        if completed {
            // An activity completed in a prior run is only ever reviewed.
            let time = model.values.get(MODE_KEY).map_or(0.0, |v| v.time);
            model
                .values
                .insert(MODE_KEY.to_string(), DataValue::new(MODE_REVIEW, time));
            model.mode = MODE_REVIEW.to_string();
        }

        model
    }

    /// Returns the current value of `key`, or the empty string.
    pub fn read(&self, key: &str) -> &str {
        self.values.get(key).map_or("", |v| v.value.as_str())
    }

    /// Returns the stored value and write time of `key`.
    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.values.get(key)
    }

    /// Writes `value` to `key` at `time`.
    ///
    /// List counts are derived, so writes to a `._count` key are rejected.
    pub fn write(&mut self, key: &str, value: &str, time: f64) -> WriteOutcome {
        if self.read_only || key.ends_with(COUNT_SUFFIX) {
            return WriteOutcome::Rejected;
        }
        if self.values.get(key).is_some_and(|v| v.value == value) {
            return WriteOutcome::Unchanged;
        }
        self.values
            .insert(key.to_string(), DataValue::new(value, time));
        self.derive_counts(key, time);
        WriteOutcome::Accepted
    }

    /// Returns the count of the list rooted at `list`, e.g. `cmi.interactions`.
    pub fn count(&self, list: &str) -> usize {
        self.counts.get(list).copied().unwrap_or(0)
    }

    /// Returns the session mode as derived at construction.
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Returns true if writes are refused.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Refuses all further writes.
    pub fn seal(&mut self) {
        self.read_only = true;
    }

    /// Returns the number of stored keys, synthetic counts included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns every key and value, ordered by key.
    pub fn values(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect()
    }

    fn derive_counts(&mut self, key: &str, time: f64) {
        for (list, index) in list_memberships(key) {
            let Some(next) = index.checked_add(1) else {
                continue;
            };
            let count = self.counts.entry(list.to_string()).or_insert(0);
            if next > *count {
                *count = next;
            }
            let count = *count;
            self.values.insert(
                format!("{list}{COUNT_SUFFIX}"),
                DataValue::new(count.to_string(), time),
            );
        }
    }
}

/// Returns every `(list, index)` pair a key belongs to.
///
/// A path segment made only of ASCII digits is an index into the list named
/// by everything before it. The first segment is never an index.
pub fn list_memberships(key: &str) -> Vec<(&str, usize)> {
    let mut memberships = Vec::new();
    let mut offset = 0;
    for (position, segment) in key.split('.').enumerate() {
        let is_index = !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit());
        if position > 0 && is_index {
            if let Ok(index) = segment.parse::<usize>() {
                memberships.push((&key[..offset - 1], index));
            }
        }
        offset += segment.len() + 1;
    }
    memberships
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use scorm_sync_protocol::Element;

    fn normal() -> InitialData {
        InitialData::new().with(MODE_KEY, MODE_NORMAL, 0.0)
    }

    #[test]
    fn memberships() {
        assert!(list_memberships("cmi.score.raw").is_empty());
        assert_eq!(
            list_memberships("cmi.interactions.2.id"),
            vec![("cmi.interactions", 2)]
        );
        assert_eq!(
            list_memberships("cmi.interactions.2.objectives.10.id"),
            vec![("cmi.interactions", 2), ("cmi.interactions.2.objectives", 10)]
        );
        assert!(list_memberships("7.a").is_empty());
        assert!(list_memberships("cmi.objectives.+1.id").is_empty());
        assert!(list_memberships("cmi.objectives..id").is_empty());
    }

    #[test]
    fn read_missing_is_empty() {
        let model = DataModel::from_sources(normal(), &[]);
        assert_eq!(model.read("cmi.location"), "");
        assert!(model.get("cmi.location").is_none());
    }

    #[test]
    fn write_then_read() {
        let mut model = DataModel::from_sources(normal(), &[]);
        assert_eq!(model.write("cmi.location", "page-3", 1.0), WriteOutcome::Accepted);
        assert_eq!(model.read("cmi.location"), "page-3");
        assert_eq!(model.get("cmi.location").unwrap().time, 1.0);
    }

    #[test]
    fn identical_write_is_unchanged() {
        let mut model = DataModel::from_sources(normal(), &[]);
        model.write("cmi.location", "page-3", 1.0);
        assert_eq!(model.write("cmi.location", "page-3", 2.0), WriteOutcome::Unchanged);
        assert_eq!(model.get("cmi.location").unwrap().time, 1.0);
    }

    #[test]
    fn interaction_count_scenario() {
        let mut model = DataModel::from_sources(normal(), &[]);
        model.write("cmi.interactions.2.id", "q1", 1.0);
        model.write("cmi.interactions.0.id", "q0", 2.0);
        assert_eq!(model.read("cmi.interactions._count"), "3");
        assert_eq!(model.count("cmi.interactions"), 3);
    }

    #[test]
    fn count_keys_are_not_writable() {
        let mut model = DataModel::from_sources(normal(), &[]);
        model.write("cmi.interactions.4.id", "q4", 1.0);
        assert_eq!(
            model.write("cmi.interactions._count", "0", 2.0),
            WriteOutcome::Rejected
        );
        assert_eq!(model.read("cmi.interactions._count"), "5");
        assert!(model.write("cmi.objectives._count", "3", 2.0).is_rejected());
        assert_eq!(model.read("cmi.objectives._count"), "");
    }

    #[test]
    fn nested_list_count() {
        let mut model = DataModel::from_sources(normal(), &[]);
        model.write("cmi.interactions.1.objectives.4.id", "obj", 1.0);
        model.write("cmi.interactions.1.correct_responses.0.pattern", "a", 1.0);
        assert_eq!(model.read("cmi.interactions._count"), "2");
        assert_eq!(model.read("cmi.interactions.1.objectives._count"), "5");
        assert_eq!(model.read("cmi.interactions.1.correct_responses._count"), "1");
        assert_eq!(model.read("cmi.interactions.0.objectives._count"), "");
    }

    #[test]
    fn counts_derived_from_initial_data() {
        let initial = normal()
            .with("cmi.objectives.0.id", "o0", 1.0)
            .with("cmi.objectives.3.id", "o3", 1.0)
            .with("cmi.comments_from_learner.1.comment", "hi", 1.0);
        let model = DataModel::from_sources(initial, &[]);
        assert_eq!(model.read("cmi.objectives._count"), "4");
        assert_eq!(model.read("cmi.comments_from_learner._count"), "2");
    }

    #[test]
    fn read_only_in_review_mode() {
        let initial = InitialData::new()
            .with(MODE_KEY, MODE_REVIEW, 0.0)
            .with("cmi.score.raw", "40", 0.0);
        let mut model = DataModel::from_sources(initial, &[]);
        assert!(model.is_read_only());
        assert_eq!(model.write("cmi.score.raw", "100", 1.0), WriteOutcome::Rejected);
        assert_eq!(model.read("cmi.score.raw"), "40");
    }

    #[test]
    fn completed_activity_forces_review() {
        let initial = normal().with(COMPLETION_KEY, STATUS_COMPLETED, 0.0);
        let mut model = DataModel::from_sources(initial, &[]);
        assert!(model.is_read_only());
        assert_eq!(model.mode(), MODE_REVIEW);
        assert_eq!(model.read(MODE_KEY), MODE_REVIEW);
        assert!(model.write("cmi.location", "x", 1.0).is_rejected());
    }

    #[test]
    fn recovered_completion_forces_review() {
        let recovered = vec![Batch::new(
            1,
            vec![Element::new(COMPLETION_KEY, STATUS_COMPLETED, 5.0, 0)],
        )];
        let model = DataModel::from_sources(normal(), &recovered);
        assert!(model.is_read_only());
        assert_eq!(model.read(MODE_KEY), MODE_REVIEW);
    }

    #[test]
    fn seal_refuses_writes() {
        let mut model = DataModel::from_sources(normal(), &[]);
        model.seal();
        assert!(model.write("cmi.location", "x", 1.0).is_rejected());
    }

    #[test]
    fn merge_later_timestamp_wins() {
        let initial = normal()
            .with("cmi.location", "server-old", 10.0)
            .with("cmi.suspend_data", "server-new", 30.0);
        let recovered = vec![Batch::new(
            5,
            vec![
                Element::new("cmi.location", "local-new", 20.0, 0),
                Element::new("cmi.suspend_data", "local-old", 20.0, 1),
                Element::new("cmi.exit", "suspend", 20.0, 2),
            ],
        )];
        let model = DataModel::from_sources(initial, &recovered);
        assert_eq!(model.read("cmi.location"), "local-new");
        assert_eq!(model.read("cmi.suspend_data"), "server-new");
        assert_eq!(model.read("cmi.exit"), "suspend");
    }

    #[test]
    fn merge_tie_prefers_recovered() {
        let initial = normal().with("cmi.location", "server", 10.0);
        let recovered = vec![Batch::new(
            1,
            vec![Element::new("cmi.location", "recovered", 10.0, 0)],
        )];
        let model = DataModel::from_sources(initial, &recovered);
        assert_eq!(model.read("cmi.location"), "recovered");
    }

    #[test]
    fn merge_applies_batches_in_id_order() {
        let recovered = vec![
            Batch::new(9, vec![Element::new("cmi.location", "later", 10.0, 1)]),
            Batch::new(3, vec![Element::new("cmi.location", "earlier", 10.0, 0)]),
        ];
        let model = DataModel::from_sources(normal(), &recovered);
        assert_eq!(model.read("cmi.location"), "later");
    }

    #[test]
    fn merge_derives_counts_from_recovered_keys() {
        let initial = normal().with("cmi.interactions.0.id", "q0", 1.0);
        let recovered = vec![Batch::new(
            1,
            vec![Element::new("cmi.interactions.4.id", "q4", 2.0, 0)],
        )];
        let model = DataModel::from_sources(initial, &recovered);
        assert_eq!(model.read("cmi.interactions._count"), "5");
    }

    proptest! {
        #[test]
        fn last_accepted_write_wins(values in prop::collection::vec("[a-c]{0,2}", 1..30)) {
            let mut model = DataModel::from_sources(normal(), &[]);
            let mut last_accepted = None;
            for (i, value) in values.iter().enumerate() {
                if model.write("cmi.location", value, i as f64).is_accepted() {
                    last_accepted = Some(value.clone());
                }
            }
            let expected = values.last().cloned().unwrap_or_default();
            prop_assert_eq!(model.read("cmi.location"), expected.as_str());
            if let Some(last) = last_accepted {
                prop_assert_eq!(model.read("cmi.location"), last.as_str());
            }
        }

        #[test]
        fn count_tracks_max_index(indices in prop::collection::vec(0usize..50, 1..40)) {
            let mut model = DataModel::from_sources(normal(), &[]);
            let mut previous = 0;
            for (i, index) in indices.iter().enumerate() {
                model.write(&format!("cmi.interactions.{index}.id"), &format!("q{i}"), i as f64);
                let count = model.count("cmi.interactions");
                prop_assert!(count >= previous);
                previous = count;
            }
            let max = indices.iter().copied().max().unwrap_or(0);
            let expected = (max + 1).to_string();
            prop_assert_eq!(model.read("cmi.interactions._count"), expected.as_str());
        }
    }
}
