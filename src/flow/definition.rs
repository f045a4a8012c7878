use std::collections::HashMap;

use crate::{
    ForgeError, Result,
    flow::{FlowEdge, FlowNode, NodeId},
    model::{EdgeModel, FlowModel, NodeModel},
};

/// A typed flow: nodes plus "target depends on source" edges.
///
/// Construction never rejects structural problems (duplicate ids, dangling
/// edges, cycles); those are reported by [`crate::validate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowDefinition {
    pub id: String,
    pub name: String,
    pub desc: String,
    /// variables available to templates as `{{$NAME$}}`
    pub env: HashMap<String, String>,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

impl FlowDefinition {
    pub fn new(
        nodes: Vec<FlowNode>,
        edges: Vec<FlowEdge>,
    ) -> Self {
        Self {
            nodes,
            edges,
            ..Default::default()
        }
    }

    pub fn with_id(
        mut self,
        id: impl Into<String>,
    ) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_env(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn from_json(s: &str) -> Result<Self> {
        FlowDefinition::try_from(&FlowModel::from_json(s)?)
    }

    pub fn to_json(&self) -> Result<String> {
        FlowModel::try_from(self)?.to_json()
    }

    /// First node carrying `id`.
    pub fn node(
        &self,
        id: &str,
    ) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }
}

impl TryFrom<&FlowModel> for FlowDefinition {
    type Error = ForgeError;

    fn try_from(model: &FlowModel) -> Result<Self> {
        let nodes = model.nodes.iter().map(FlowNode::try_from).collect::<Result<Vec<_>>>()?;
        let edges = model.edges.iter().map(FlowEdge::from).collect();

        Ok(Self {
            id: model.id.clone(),
            name: model.name.clone(),
            desc: model.desc.clone(),
            env: model.env.clone(),
            nodes,
            edges,
        })
    }
}

impl TryFrom<&FlowDefinition> for FlowModel {
    type Error = ForgeError;

    fn try_from(def: &FlowDefinition) -> Result<Self> {
        let nodes = def.nodes.iter().map(NodeModel::try_from).collect::<Result<Vec<_>>>()?;
        let edges = def.edges.iter().map(EdgeModel::from).collect();

        Ok(Self {
            id: def.id.clone(),
            name: def.name.clone(),
            desc: def.desc.clone(),
            env: def.env.clone(),
            nodes,
            edges,
        })
    }
}

#[cfg(test)]
mod test {
    use crate::flow::{NodeKind, NodeType, SourceHandle};

    use super::FlowDefinition;

    #[test]
    fn test_from_json() {
        let def = FlowDefinition::from_json(
            r#"{
                "id": "launch",
                "name": "Product launch",
                "env": { "BRAND": "Acme" },
                "nodes": [
                    { "id": "t", "type": "trigger", "label": "Start", "config": {}, "position": { "x": 0, "y": 0 } },
                    { "id": "gate", "type": "condition", "config": {
                        "logical_operator": "and",
                        "conditions": [{ "variable_selector": "{{#t.tier#}}", "comparison_operator": "is", "value": "pro" }]
                    } },
                    { "id": "copy", "type": "llm", "config": { "prompt": "Write for {{$BRAND$}}" } }
                ],
                "edges": [
                    { "id": "e1", "source": "t", "target": "gate" },
                    { "id": "e2", "source": "gate", "target": "copy", "source_handle": "true" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(def.id, "launch");
        assert_eq!(def.nodes.len(), 3);
        assert_eq!(def.node("gate").map(|n| n.node_type()), Some(NodeType::Condition));
        assert_eq!(def.edges[1].source_handle, SourceHandle::True);
        assert!(matches!(&def.node("copy").unwrap().kind, NodeKind::Llm(c) if c.prompt.contains("{{$BRAND$}}")));

        let again = FlowDefinition::from_json(&def.to_json().unwrap()).unwrap();
        assert_eq!(again, def);
    }

    #[test]
    fn test_unknown_node_type_is_a_parse_error() {
        let err = FlowDefinition::from_json(r#"{ "nodes": [{ "id": "x", "type": "fax" }] }"#).unwrap_err();
        assert!(err.to_string().contains("invalid flow document"));
    }
}
