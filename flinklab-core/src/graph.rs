//! Graph - Reference edges between records and their ordering
//!
//! The topology's reference structure is what the external provisioning
//! engine uses to order and parallelize operations; this module verifies it
//! is well-formed (no cycles, no forward references) and derives creation
//! and destruction order.

use std::collections::{HashMap, HashSet};

use crate::record::{Record, Value};

/// A reference edge from one record to another
#[derive(Debug, Clone)]
pub struct ReferenceEdge {
    /// Target record binding name
    pub target: String,
    /// Referenced attribute (e.g., "vpc_id")
    pub attribute: String,
    /// Attribute of the source record the reference appears in
    pub used_in: String,
}

/// Error raised when the reference structure is ill-formed
#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphError {
    #[error("{record} references unknown binding '{target}' in attribute '{used_in}'")]
    UnknownBinding {
        record: String,
        target: String,
        used_in: String,
    },

    #[error(
        "{record} references '{target}' before it is declared (forward references are not allowed)"
    )]
    ForwardReference { record: String, target: String },

    #[error("reference cycle detected involving '{binding}'")]
    Cycle { binding: String },
}

/// Reference graph over a set of records
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    /// Binding name -> outgoing reference edges
    pub edges: HashMap<String, Vec<ReferenceEdge>>,
    /// Reverse edges: target binding -> bindings that reference it
    pub reverse_edges: HashMap<String, Vec<String>>,
}

impl ReferenceGraph {
    /// Build the graph from a topology by walking every attribute value
    pub fn from_records(records: &[Record]) -> Self {
        let mut graph = Self::default();
        for record in records {
            for (attr, value) in &record.attributes {
                for (target, attribute) in collect_refs(value) {
                    graph.add_edge(
                        record.binding.clone(),
                        ReferenceEdge {
                            target,
                            attribute,
                            used_in: attr.clone(),
                        },
                    );
                }
            }
        }
        graph
    }

    pub fn add_edge(&mut self, from: String, edge: ReferenceEdge) {
        let target = edge.target.clone();
        self.edges.entry(from.clone()).or_default().push(edge);
        self.reverse_edges.entry(target).or_default().push(from);
    }

    /// Direct references of a binding
    pub fn references_of(&self, binding: &str) -> &[ReferenceEdge] {
        self.edges.get(binding).map_or(&[], |v| v.as_slice())
    }

    /// Bindings that reference this binding
    pub fn referenced_by(&self, binding: &str) -> &[String] {
        self.reverse_edges
            .get(binding)
            .map_or(&[], |v| v.as_slice())
    }

    /// Check if the graph has any cycles
    pub fn has_cycle(&self) -> bool {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for node in self.edges.keys() {
            if self.has_cycle_util(node, &mut visited, &mut rec_stack) {
                return true;
            }
        }
        false
    }

    fn has_cycle_util(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        rec_stack: &mut HashSet<String>,
    ) -> bool {
        if rec_stack.contains(node) {
            return true;
        }
        if visited.contains(node) {
            return false;
        }

        visited.insert(node.to_string());
        rec_stack.insert(node.to_string());

        if let Some(edges) = self.edges.get(node) {
            for edge in edges {
                if self.has_cycle_util(&edge.target, visited, rec_stack) {
                    return true;
                }
            }
        }

        rec_stack.remove(node);
        false
    }
}

/// Collect (binding, attribute) pairs from every `Ref` nested in a value
pub fn collect_refs(value: &Value) -> Vec<(String, String)> {
    let mut refs = Vec::new();
    walk_refs(value, &mut refs);
    refs
}

fn walk_refs(value: &Value, refs: &mut Vec<(String, String)>) {
    match value {
        Value::Ref(binding, attribute) => {
            refs.push((binding.clone(), attribute.clone()));
        }
        Value::List(items) => {
            for item in items {
                walk_refs(item, refs);
            }
        }
        Value::Map(map) => {
            for v in map.values() {
                walk_refs(v, refs);
            }
        }
        _ => {}
    }
}

/// Verify that every reference targets a record declared earlier in the
/// topology. Declaration order itself is therefore a valid creation order.
pub fn verify_declaration_order(records: &[Record]) -> Result<(), GraphError> {
    let mut declared: HashSet<&str> = HashSet::new();
    let known: HashSet<&str> = records.iter().map(|r| r.binding.as_str()).collect();

    for record in records {
        for (attr, value) in &record.attributes {
            for (target, _) in collect_refs(value) {
                if !known.contains(target.as_str()) {
                    return Err(GraphError::UnknownBinding {
                        record: record.id.to_string(),
                        target,
                        used_in: attr.clone(),
                    });
                }
                if !declared.contains(target.as_str()) {
                    return Err(GraphError::ForwardReference {
                        record: record.id.to_string(),
                        target,
                    });
                }
            }
        }
        declared.insert(record.binding.as_str());
    }

    Ok(())
}

/// Sort records topologically so that every record follows its references.
///
/// Records with no edges between them keep their relative declaration order.
pub fn creation_order(records: &[Record]) -> Result<Vec<Record>, GraphError> {
    let graph = ReferenceGraph::from_records(records);
    if graph.has_cycle() {
        let binding = graph.edges.keys().next().cloned().unwrap_or_default();
        return Err(GraphError::Cycle { binding });
    }

    let by_binding: HashMap<&str, &Record> =
        records.iter().map(|r| (r.binding.as_str(), r)).collect();

    let mut sorted = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();

    fn visit(
        record: &Record,
        by_binding: &HashMap<&str, &Record>,
        graph: &ReferenceGraph,
        visited: &mut HashSet<String>,
        sorted: &mut Vec<Record>,
    ) {
        if visited.contains(&record.binding) {
            return;
        }
        visited.insert(record.binding.clone());

        for edge in graph.references_of(&record.binding) {
            if let Some(target) = by_binding.get(edge.target.as_str()) {
                visit(target, by_binding, graph, visited, sorted);
            }
        }

        sorted.push(record.clone());
    }

    for record in records {
        visit(record, &by_binding, &graph, &mut visited, &mut sorted);
    }

    Ok(sorted)
}

/// Destruction order: dependents first, then their targets
pub fn destroy_order(records: &[Record]) -> Result<Vec<Record>, GraphError> {
    let mut order = creation_order(records)?;
    order.reverse();
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vpc() -> Record {
        Record::new("vpc", "net", "vpc")
    }

    fn subnet() -> Record {
        Record::new("subnet", "public", "subnet")
            .with_attribute("vpc_id", Value::reference("vpc", "vpc_id"))
    }

    #[test]
    fn graph_from_records() {
        let records = vec![vpc(), subnet()];
        let graph = ReferenceGraph::from_records(&records);

        assert_eq!(graph.references_of("subnet").len(), 1);
        assert_eq!(graph.references_of("subnet")[0].target, "vpc");
        assert_eq!(graph.referenced_by("vpc"), &["subnet".to_string()]);
        assert!(!graph.has_cycle());
    }

    #[test]
    fn refs_collected_from_nested_values() {
        let value = Value::List(vec![Value::Map(
            [(
                "gateway_id".to_string(),
                Value::reference("igw", "internet_gateway_id"),
            )]
            .into(),
        )]);

        let refs = collect_refs(&value);
        assert_eq!(refs, vec![("igw".to_string(), "internet_gateway_id".to_string())]);
    }

    #[test]
    fn declaration_order_accepts_backward_refs() {
        let records = vec![vpc(), subnet()];
        assert!(verify_declaration_order(&records).is_ok());
    }

    #[test]
    fn declaration_order_rejects_forward_refs() {
        let records = vec![subnet(), vpc()];
        let err = verify_declaration_order(&records).unwrap_err();
        assert!(matches!(err, GraphError::ForwardReference { .. }));
    }

    #[test]
    fn declaration_order_rejects_unknown_binding() {
        let records = vec![
            Record::new("subnet", "public", "subnet")
                .with_attribute("vpc_id", Value::reference("missing", "vpc_id")),
        ];
        let err = verify_declaration_order(&records).unwrap_err();
        assert!(matches!(err, GraphError::UnknownBinding { .. }));
    }

    #[test]
    fn creation_order_places_targets_first() {
        // Declared out of order on purpose; the sort must fix it
        let records = vec![subnet(), vpc()];
        let sorted = creation_order(&records).unwrap();
        assert_eq!(sorted[0].binding, "vpc");
        assert_eq!(sorted[1].binding, "subnet");
    }

    #[test]
    fn destroy_order_is_reversed() {
        let records = vec![vpc(), subnet()];
        let order = destroy_order(&records).unwrap();
        assert_eq!(order[0].binding, "subnet");
        assert_eq!(order[1].binding, "vpc");
    }

    #[test]
    fn cycle_detected() {
        let a = Record::new("vpc", "a", "a").with_attribute("x", Value::reference("b", "id"));
        let b = Record::new("vpc", "b", "b").with_attribute("x", Value::reference("a", "id"));
        let graph = ReferenceGraph::from_records(&[a.clone(), b.clone()]);
        assert!(graph.has_cycle());
        assert!(creation_order(&[a, b]).is_err());
    }
}
