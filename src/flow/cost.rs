//! Spark pricing per node type.

use std::{collections::HashMap, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::{
    ForgeError, Result,
    flow::{FlowDefinition, NodeType},
};

/// Price of one execution of each node type, in sparks.
///
/// The reference prices are policy, not derived from anything; hosts override
/// single entries with [`CostTable::with_cost`] or the `[costs]` config table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HashMap<String, u64>", into = "HashMap<String, u64>")]
pub struct CostTable {
    costs: HashMap<NodeType, u64>,
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            costs: NodeType::iter().map(|t| (t, reference_cost(t))).collect(),
        }
    }
}

impl CostTable {
    pub fn with_cost(
        mut self,
        node_type: NodeType,
        sparks: u64,
    ) -> Self {
        self.costs.insert(node_type, sparks);
        self
    }

    pub fn cost(
        &self,
        node_type: NodeType,
    ) -> u64 {
        self.costs.get(&node_type).copied().unwrap_or_else(|| reference_cost(node_type))
    }

    /// Sum of the price of every node in `def`.
    pub fn total_cost(
        &self,
        def: &FlowDefinition,
    ) -> u64 {
        def.nodes.iter().map(|n| self.cost(n.node_type())).fold(0, u64::saturating_add)
    }
}

impl TryFrom<HashMap<String, u64>> for CostTable {
    type Error = ForgeError;

    /// Entries override the reference prices; missing types keep them.
    fn try_from(overrides: HashMap<String, u64>) -> Result<Self> {
        let mut table = CostTable::default();
        for (name, sparks) in overrides {
            let node_type = NodeType::from_str(&name).map_err(|_| ForgeError::Config(format!("unknown node type '{}' in cost table", name)))?;
            table = table.with_cost(node_type, sparks);
        }
        Ok(table)
    }
}

impl From<CostTable> for HashMap<String, u64> {
    fn from(table: CostTable) -> Self {
        table.costs.into_iter().map(|(t, c)| (t.to_string(), c)).collect()
    }
}

fn reference_cost(node_type: NodeType) -> u64 {
    match node_type {
        NodeType::Trigger => 0,
        NodeType::Condition => 0,
        NodeType::Http => 1,
        NodeType::Notification => 1,
        NodeType::BrandGuard => 3,
        NodeType::Llm => 5,
        NodeType::Image => 10,
        NodeType::Video => 50,
    }
}

/// Reference price of one node type.
pub fn cost(node_type: NodeType) -> u64 {
    reference_cost(node_type)
}

/// Reference price of a whole flow.
pub fn estimate_cost(def: &FlowDefinition) -> u64 {
    CostTable::default().total_cost(def)
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use crate::flow::{FlowDefinition, FlowEdge, FlowNode, NodeKind, NodeType};

    use super::*;

    fn flow(types: &[(&str, NodeType)]) -> FlowDefinition {
        FlowDefinition::new(types.iter().map(|(id, t)| FlowNode::new(*id, NodeKind::empty(*t))).collect(), vec![])
    }

    #[test]
    fn test_reference_costs() {
        assert_eq!(cost(NodeType::Trigger), 0);
        assert_eq!(cost(NodeType::Condition), 0);
        assert_eq!(cost(NodeType::Http), 1);
        assert_eq!(cost(NodeType::Notification), 1);
        assert_eq!(cost(NodeType::BrandGuard), 3);
        assert_eq!(cost(NodeType::Llm), 5);
        assert_eq!(cost(NodeType::Image), 10);
        assert_eq!(cost(NodeType::Video), 50);
    }

    #[test]
    fn test_linear_flow_estimate() {
        let mut def = flow(&[("trigger", NodeType::Trigger), ("llm", NodeType::Llm), ("image", NodeType::Image)]);
        def.edges = vec![FlowEdge::new("e1", "trigger", "llm"), FlowEdge::new("e2", "llm", "image")];
        assert_eq!(estimate_cost(&def), 15);
    }

    #[test]
    fn test_estimate_ignores_node_order() {
        let nodes = [("a", NodeType::Video), ("b", NodeType::Llm), ("c", NodeType::Http), ("d", NodeType::BrandGuard)];
        let forward = flow(&nodes);
        let mut reversed = nodes;
        reversed.reverse();
        let backward = flow(&reversed);

        assert_eq!(estimate_cost(&forward), 59);
        assert_eq!(estimate_cost(&forward), estimate_cost(&backward));
    }

    #[test]
    fn test_overrides() {
        let table = CostTable::default().with_cost(NodeType::Llm, 7);
        assert_eq!(table.cost(NodeType::Llm), 7);
        assert_eq!(table.cost(NodeType::Image), 10);
        assert_eq!(table.total_cost(&flow(&[("a", NodeType::Llm), ("b", NodeType::Llm)])), 14);
    }

    #[test]
    fn test_total_saturates() {
        let table = CostTable::default().with_cost(NodeType::Video, u64::MAX / 2 + 1);
        let def = flow(&[("a", NodeType::Video), ("b", NodeType::Video), ("c", NodeType::Llm)]);

        assert_eq!(table.total_cost(&def), u64::MAX);
    }

    #[test]
    fn test_partial_map_merges_over_reference() {
        let table = CostTable::try_from(HashMap::from([("video".to_string(), 40)])).unwrap();
        assert_eq!(table.cost(NodeType::Video), 40);
        assert_eq!(table.cost(NodeType::Llm), 5);

        let err = CostTable::try_from(HashMap::from([("fax".to_string(), 1)])).unwrap_err();
        assert!(err.to_string().contains("unknown node type 'fax'"));
    }
}
