//! Differ - Compare desired records with current state to generate a Plan
//!
//! Compares declared desired-state records with the state observed in the
//! target environment and produces the Effects needed to reconcile them.
//! Data sources (read-only records) never produce mutations.

use std::collections::HashMap;

use crate::effect::Effect;
use crate::plan::Plan;
use crate::record::{Record, RecordId, RemoteState, Value};

/// Result of a diff operation
#[derive(Debug, Clone)]
pub enum Diff {
    /// Record does not exist -> needs creation
    Create(Record),
    /// Record exists with differences -> needs update
    Update {
        id: RecordId,
        from: RemoteState,
        to: Record,
        changed_attributes: Vec<String>,
    },
    /// Record exists with no differences -> no action needed
    NoChange(RecordId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare one desired record with its current state
pub fn diff(desired: &Record, current: &RemoteState) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes);

    if changed.is_empty() {
        Diff::NoChange(desired.id.clone())
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        match current.get(key) {
            Some(current_value) if current_value == desired_value => {}
            _ => changed.push(key.clone()),
        }
    }

    changed.sort();
    changed
}

/// Diff every managed record and collect the resulting Plan.
///
/// `current_states` is keyed by record id; a missing entry means not found.
pub fn create_plan(desired: &[Record], current_states: &HashMap<RecordId, RemoteState>) -> Plan {
    let mut plan = Plan::new();

    for record in desired {
        if record.is_data_source() {
            continue;
        }

        let current = current_states
            .get(&record.id)
            .cloned()
            .unwrap_or_else(|| RemoteState::not_found(record.id.clone()));

        match diff(record, &current) {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update { id, from, to, .. } => plan.add(Effect::Update { id, from, to }),
            Diff::NoChange(_) => {}
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_create_when_not_exists() {
        let desired = Record::new("vpc", "net", "vpc");
        let current = RemoteState::not_found(RecordId::new("vpc", "net"));

        assert!(matches!(diff(&desired, &current), Diff::Create(_)));
    }

    #[test]
    fn diff_no_change_when_same() {
        let desired =
            Record::new("vpc", "net", "vpc").with_attribute("cidr_block", Value::string("10.0.0.0/16"));

        let mut attrs = HashMap::new();
        attrs.insert("cidr_block".to_string(), Value::string("10.0.0.0/16"));
        let current = RemoteState::existing(RecordId::new("vpc", "net"), attrs);

        assert!(matches!(diff(&desired, &current), Diff::NoChange(_)));
    }

    #[test]
    fn diff_update_when_different() {
        let desired =
            Record::new("vpc", "net", "vpc").with_attribute("cidr_block", Value::string("10.1.0.0/16"));

        let mut attrs = HashMap::new();
        attrs.insert("cidr_block".to_string(), Value::string("10.0.0.0/16"));
        let current = RemoteState::existing(RecordId::new("vpc", "net"), attrs);

        match diff(&desired, &current) {
            Diff::Update {
                changed_attributes, ..
            } => assert_eq!(changed_attributes, vec!["cidr_block".to_string()]),
            _ => panic!("Expected Update"),
        }
    }

    #[test]
    fn data_sources_never_planned() {
        let records = vec![
            Record::new("ami", "al2023", "ami").with_read_only(true),
            Record::new("vpc", "net", "vpc"),
        ];

        let plan = create_plan(&records, &HashMap::new());

        assert_eq!(plan.effects().len(), 1);
        assert!(matches!(plan.effects()[0], Effect::Create(ref r) if r.id.kind == "vpc"));
    }

    #[test]
    fn unchanged_topology_yields_empty_plan() {
        let desired = vec![
            Record::new("vpc", "net", "vpc")
                .with_attribute("cidr_block", Value::string("10.0.0.0/16")),
        ];

        let mut attrs = HashMap::new();
        attrs.insert("cidr_block".to_string(), Value::string("10.0.0.0/16"));
        let mut current = HashMap::new();
        current.insert(
            RecordId::new("vpc", "net"),
            RemoteState::existing(RecordId::new("vpc", "net"), attrs).with_identifier("vpc-123"),
        );

        let plan = create_plan(&desired, &current);
        assert!(plan.is_empty());
    }
}
