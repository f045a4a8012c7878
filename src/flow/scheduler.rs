//! Topological scheduling of a flow.

use tracing::debug;

use crate::{
    ForgeError, Result,
    flow::{FlowDefinition, FlowGraph, NodeId},
};

/// One valid execution order for `def`.
///
/// For every edge `s -> t`, `s` comes before `t`. Siblings that become ready
/// together keep no particular order. Fails with [`ForgeError::Cycle`]
/// carrying the nodes that could not be ordered.
pub fn topological_order(def: &FlowDefinition) -> Result<Vec<NodeId>> {
    order_graph(&FlowGraph::new(def))
}

pub(crate) fn order_graph(graph: &FlowGraph) -> Result<Vec<NodeId>> {
    let outcome = graph.kahn();
    if !outcome.blocked.is_empty() {
        return Err(ForgeError::Cycle(outcome.blocked));
    }
    debug!("execution order: {:?}", outcome.order);
    Ok(outcome.order)
}

#[cfg(test)]
mod test {
    use crate::{
        ForgeError,
        flow::{FlowDefinition, FlowEdge, FlowNode, NodeKind, NodeType, build_adjacency},
    };

    use super::topological_order;

    fn node(
        id: &str,
        node_type: NodeType,
    ) -> FlowNode {
        FlowNode::new(id, NodeKind::empty(node_type))
    }

    fn position(
        order: &[String],
        id: &str,
    ) -> usize {
        order.iter().position(|n| n == id).unwrap()
    }

    fn assert_respects_edges(
        def: &FlowDefinition,
        order: &[String],
    ) {
        assert_eq!(order.len(), def.nodes.len());
        for edge in def.edges.iter() {
            assert!(position(order, &edge.source) < position(order, &edge.target), "{} must precede {}", edge.source, edge.target);
        }
    }

    #[test]
    fn test_linear_flow() {
        let def = FlowDefinition::new(
            vec![node("image", NodeType::Image), node("llm", NodeType::Llm), node("trigger", NodeType::Trigger)],
            vec![FlowEdge::new("e1", "trigger", "llm"), FlowEdge::new("e2", "llm", "image")],
        );

        let order = topological_order(&def).unwrap();
        assert_eq!(order, vec!["trigger".to_string(), "llm".to_string(), "image".to_string()]);
    }

    #[test]
    fn test_branching_flow() {
        let def = FlowDefinition::new(
            vec![node("trigger", NodeType::Trigger), node("branch1", NodeType::Llm), node("branch2", NodeType::Image)],
            vec![FlowEdge::new("e1", "trigger", "branch1"), FlowEdge::new("e2", "trigger", "branch2")],
        );

        let order = topological_order(&def).unwrap();
        assert_respects_edges(&def, &order);
        assert_eq!(order[0], "trigger");
    }

    #[test]
    fn test_converging_flow() {
        let def = FlowDefinition::new(
            vec![node("trigger", NodeType::Trigger), node("llm1", NodeType::Llm), node("llm2", NodeType::Llm), node("merge", NodeType::Notification)],
            vec![
                FlowEdge::new("e1", "trigger", "llm1"),
                FlowEdge::new("e2", "trigger", "llm2"),
                FlowEdge::new("e3", "llm1", "merge"),
                FlowEdge::new("e4", "llm2", "merge"),
            ],
        );

        let order = topological_order(&def).unwrap();
        assert_respects_edges(&def, &order);
        assert_eq!(order.last().map(String::as_str), Some("merge"));
    }

    #[test]
    fn test_isolated_nodes_are_scheduled() {
        let def = FlowDefinition::new(vec![node("trigger", NodeType::Trigger), node("lonely", NodeType::Http)], vec![]);

        let order = topological_order(&def).unwrap();
        assert_eq!(order.len(), 2);
        assert_eq!(build_adjacency(&def)["lonely"].len(), 0);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let def = FlowDefinition::new(
            vec![node("trigger", NodeType::Trigger), node("a", NodeType::Llm), node("b", NodeType::Llm)],
            vec![FlowEdge::new("e1", "trigger", "a"), FlowEdge::new("e2", "a", "b"), FlowEdge::new("e3", "b", "a")],
        );

        match topological_order(&def) {
            Err(ForgeError::Cycle(blocked)) => {
                assert!(blocked.contains(&"a".to_string()));
                assert!(blocked.contains(&"b".to_string()));
                assert!(!blocked.contains(&"trigger".to_string()));
            }
            other => panic!("expected a cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let def = FlowDefinition::new(vec![node("a", NodeType::Llm)], vec![FlowEdge::new("e1", "a", "a")]);
        assert!(matches!(topological_order(&def), Err(ForgeError::Cycle(_))));
    }
}
