//! Structural and per-type checks over a flow definition.
//!
//! [`validate`] never fails: every problem, including malformed input such as
//! a node without an id, becomes a [`ValidationIssue`]. A flow is executable
//! when no issue is an error ([`has_errors`]).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::flow::{FlowDefinition, FlowGraph, FlowNode, NodeId, NodeKind, NodeType};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IssueType {
    Error,
    Warning,
}

/// Which half of the error taxonomy an issue belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    /// malformed graph
    Structural,
    /// type-specific config problem
    Semantic,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueCode {
    EmptyFlow,
    MissingNodeId,
    DuplicateNodeId,
    MissingTrigger,
    MultipleTriggers,
    DanglingEdge,
    DuplicateEdgeId,
    MisplacedBranchHandle,
    Cycle,
    Unreachable,
    MissingField,
    MissingGuidelines,
}

impl IssueCode {
    pub fn category(&self) -> IssueCategory {
        match self {
            IssueCode::MissingField | IssueCode::MissingGuidelines => IssueCategory::Semantic,
            _ => IssueCategory::Structural,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub code: IssueCode,
    pub message: String,
    #[serde(rename = "nodeId", default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
}

impl ValidationIssue {
    pub fn error(
        code: IssueCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            issue_type: IssueType::Error,
            code,
            message: message.into(),
            node_id: None,
        }
    }

    pub fn warning(
        code: IssueCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            issue_type: IssueType::Warning,
            code,
            message: message.into(),
            node_id: None,
        }
    }

    pub fn at(
        mut self,
        node_id: impl Into<NodeId>,
    ) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.issue_type == IssueType::Error
    }

    pub fn category(&self) -> IssueCategory {
        self.code.category()
    }
}

/// Whether any issue blocks execution.
pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(ValidationIssue::is_error)
}

/// Check `def` and collect every issue found.
///
/// Rules run in a fixed order and accumulate, so the same definition always
/// yields the same list. The only short circuit is an empty flow, which is
/// reported alone.
pub fn validate(def: &FlowDefinition) -> Vec<ValidationIssue> {
    if def.nodes.is_empty() {
        return vec![ValidationIssue::error(IssueCode::EmptyFlow, "Flow must contain at least one node")];
    }

    let mut issues = Vec::new();
    let graph = FlowGraph::new(def);

    check_node_ids(def, &mut issues);
    let triggers = check_triggers(def, &mut issues);
    check_edges(def, &graph, &mut issues);
    check_cycle(&graph, &mut issues);
    for node in def.nodes.iter() {
        check_node_config(node, &mut issues);
    }
    if !triggers.is_empty() {
        check_reachability(def, &graph, &triggers, &mut issues);
    }

    debug!("validated flow '{}': {} issue(s)", def.id, issues.len());
    issues
}

fn check_node_ids(
    def: &FlowDefinition,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut seen = HashSet::new();
    for (position, node) in def.nodes.iter().enumerate() {
        if node.id.trim().is_empty() {
            issues.push(ValidationIssue::error(IssueCode::MissingNodeId, format!("Node at position {} is missing an id", position)));
            continue;
        }
        if !seen.insert(node.id.as_str()) {
            issues.push(ValidationIssue::error(IssueCode::DuplicateNodeId, format!("Duplicate node ID '{}'", node.id)).at(&node.id));
        }
    }
}

fn check_triggers(
    def: &FlowDefinition,
    issues: &mut Vec<ValidationIssue>,
) -> Vec<NodeId> {
    let triggers: Vec<NodeId> = def.nodes.iter().filter(|n| n.node_type() == NodeType::Trigger).map(|n| n.id.clone()).collect();

    match triggers.len() {
        0 => issues.push(ValidationIssue::error(IssueCode::MissingTrigger, "Flow must contain a trigger node")),
        1 => {}
        _ => issues.push(ValidationIssue::warning(IssueCode::MultipleTriggers, format!("Flow defines multiple trigger(s): {}", triggers.join(", ")))),
    }

    triggers
}

fn check_edges(
    def: &FlowDefinition,
    graph: &FlowGraph,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut seen = HashSet::new();
    for edge in def.edges.iter() {
        if !edge.id.is_empty() && !seen.insert(edge.id.as_str()) {
            issues.push(ValidationIssue::warning(IssueCode::DuplicateEdgeId, format!("Duplicate edge ID '{}'", edge.id)));
        }

        let mut dangling = false;
        for (end, id) in [("source", &edge.source), ("target", &edge.target)] {
            if !graph.contains(id) {
                dangling = true;
                issues.push(ValidationIssue::error(IssueCode::DanglingEdge, format!("Edge '{}' references unknown {} node '{}'", edge.id, end, id)));
            }
        }
        if dangling || !edge.source_handle.is_branch() {
            continue;
        }

        let from_condition = def.node(&edge.source).is_some_and(|n| n.node_type() == NodeType::Condition);
        if !from_condition {
            issues.push(
                ValidationIssue::warning(
                    IssueCode::MisplacedBranchHandle,
                    format!("Edge '{}' uses the '{}' handle but its source is not a condition node", edge.id, edge.source_handle.as_ref()),
                )
                .at(&edge.source),
            );
        }
    }
}

fn check_cycle(
    graph: &FlowGraph,
    issues: &mut Vec<ValidationIssue>,
) {
    let blocked = graph.kahn().blocked;
    if let Some(first) = blocked.first() {
        issues.push(
            ValidationIssue::error(IssueCode::Cycle, format!("Flow contains a cycle; node(s) cannot be ordered: {}", blocked.join(", "))).at(first),
        );
    }
}

fn check_node_config(
    node: &FlowNode,
    issues: &mut Vec<ValidationIssue>,
) {
    let name = node.display_name();
    let missing = |message: String| ValidationIssue::error(IssueCode::MissingField, message).at(&node.id);

    match &node.kind {
        NodeKind::Trigger(_) => {}
        NodeKind::Llm(c) => {
            if c.prompt.trim().is_empty() {
                issues.push(missing(format!("LLM node '{}' requires a prompt", name)));
            }
        }
        NodeKind::Image(c) => {
            if c.prompt.trim().is_empty() {
                issues.push(missing(format!("Image node '{}' requires a prompt", name)));
            }
        }
        NodeKind::Video(c) => {
            if c.prompt.trim().is_empty() {
                issues.push(missing(format!("Video node '{}' requires a prompt", name)));
            }
        }
        NodeKind::BrandGuard(c) => {
            if c.guidelines.iter().all(|g| g.trim().is_empty()) {
                issues.push(
                    ValidationIssue::warning(IssueCode::MissingGuidelines, format!("Brand guard node '{}' has no guidelines to check against", name))
                        .at(&node.id),
                );
            }
        }
        NodeKind::Condition(c) => {
            if c.conditions.is_empty() {
                issues.push(missing(format!("Condition node '{}' requires at least one condition", name)));
            }
        }
        NodeKind::Http(c) => {
            if c.url.trim().is_empty() {
                issues.push(missing(format!("HTTP node '{}' requires a URL", name)));
            }
        }
        NodeKind::Notification(c) => {
            if c.message.trim().is_empty() {
                issues.push(missing(format!("Notification node '{}' requires a message", name)));
            }
        }
    }
}

fn check_reachability(
    def: &FlowDefinition,
    graph: &FlowGraph,
    triggers: &[NodeId],
    issues: &mut Vec<ValidationIssue>,
) {
    let reachable = graph.reachable_from(triggers.iter().map(String::as_str));
    let mut reported = HashSet::new();
    for node in def.nodes.iter() {
        if node.id.is_empty() || reachable.contains(&node.id) || !reported.insert(node.id.as_str()) {
            continue;
        }
        issues.push(
            ValidationIssue::warning(IssueCode::Unreachable, format!("Node '{}' is not reachable from any trigger", node.display_name())).at(&node.id),
        );
    }
}

#[cfg(test)]
mod test {
    use crate::flow::{
        FlowDefinition, FlowEdge, FlowNode, NodeKind, NodeType, SourceHandle,
        config::{Condition, ComparisonOperator, ConditionConfig, HttpConfig, LlmConfig},
    };

    use super::*;

    fn trigger(id: &str) -> FlowNode {
        FlowNode::new(id, NodeKind::empty(NodeType::Trigger))
    }

    fn llm(
        id: &str,
        prompt: &str,
    ) -> FlowNode {
        FlowNode::new(
            id,
            NodeKind::Llm(LlmConfig {
                prompt: prompt.to_string(),
                ..Default::default()
            }),
        )
    }

    fn http(
        id: &str,
        url: &str,
    ) -> FlowNode {
        FlowNode::new(
            id,
            NodeKind::Http(HttpConfig {
                url: url.to_string(),
                ..Default::default()
            }),
        )
    }

    fn errors(issues: &[ValidationIssue]) -> Vec<&ValidationIssue> {
        issues.iter().filter(|i| i.is_error()).collect()
    }

    #[test]
    fn test_valid_flow_has_no_issues() {
        let def = FlowDefinition::new(vec![trigger("t"), llm("copy", "Write a tagline")], vec![FlowEdge::new("e1", "t", "copy")]);
        assert!(validate(&def).is_empty());
    }

    #[test]
    fn test_empty_flow_reports_exactly_one_error() {
        let def = FlowDefinition::new(vec![], vec![FlowEdge::new("e1", "a", "b")]);
        let issues = validate(&def);

        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
        assert!(issues[0].message.contains("at least one node"));
        assert_eq!(issues[0].code, IssueCode::EmptyFlow);
    }

    #[test]
    fn test_duplicate_node_ids() {
        let def = FlowDefinition::new(vec![trigger("t"), llm("same_id", "a"), llm("same_id", "b"), llm("same_id", "c")], vec![]);
        let issues = validate(&def);
        let duplicates: Vec<_> = issues.iter().filter(|i| i.message.contains("Duplicate node ID")).collect();

        assert_eq!(duplicates.len(), 2);
        assert!(duplicates.iter().all(|i| i.is_error() && i.node_id.as_deref() == Some("same_id")));
        assert_eq!(duplicates[0].category(), IssueCategory::Structural);
    }

    #[test]
    fn test_missing_and_multiple_triggers() {
        let issues = validate(&FlowDefinition::new(vec![llm("copy", "hi")], vec![]));
        assert!(errors(&issues).iter().any(|i| i.message.contains("trigger node")));

        let issues = validate(&FlowDefinition::new(vec![trigger("t1"), trigger("t2")], vec![]));
        assert!(!has_errors(&issues));
        assert!(issues.iter().any(|i| i.issue_type == IssueType::Warning && i.message.contains("multiple trigger(s)")));
    }

    #[test]
    fn test_dangling_edge() {
        let def = FlowDefinition::new(vec![trigger("t")], vec![FlowEdge::new("e1", "t", "ghost")]);
        let issues = validate(&def);

        let errs = errors(&issues);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, IssueCode::DanglingEdge);
        assert!(errs[0].message.contains("ghost"));
    }

    #[test]
    fn test_cycle_is_reported() {
        let def = FlowDefinition::new(
            vec![trigger("t"), llm("a", "x"), llm("b", "y")],
            vec![FlowEdge::new("e1", "t", "a"), FlowEdge::new("e2", "a", "b"), FlowEdge::new("e3", "b", "a")],
        );
        let issues = validate(&def);
        let cycle = issues.iter().find(|i| i.code == IssueCode::Cycle).unwrap();

        assert!(cycle.is_error());
        assert!(cycle.message.contains("cycle"));
        assert!(matches!(cycle.node_id.as_deref(), Some("a") | Some("b")));
    }

    #[test]
    fn test_missing_required_fields() {
        let def = FlowDefinition::new(
            vec![trigger("t"), FlowNode::new("copy", NodeKind::empty(NodeType::Llm)), http("call", " ")],
            vec![FlowEdge::new("e1", "t", "copy"), FlowEdge::new("e2", "t", "call")],
        );
        let issues = validate(&def);

        let prompt = issues.iter().find(|i| i.node_id.as_deref() == Some("copy")).unwrap();
        assert!(prompt.is_error());
        assert!(prompt.message.contains("prompt"));
        assert_eq!(prompt.category(), IssueCategory::Semantic);

        let url = issues.iter().find(|i| i.node_id.as_deref() == Some("call")).unwrap();
        assert!(url.message.contains("URL"));
    }

    #[test]
    fn test_other_type_rules() {
        let def = FlowDefinition::new(
            vec![
                trigger("t"),
                FlowNode::new("img", NodeKind::empty(NodeType::Image)),
                FlowNode::new("vid", NodeKind::empty(NodeType::Video)),
                FlowNode::new("notify", NodeKind::empty(NodeType::Notification)),
                FlowNode::new("gate", NodeKind::empty(NodeType::Condition)),
                FlowNode::new("guard", NodeKind::empty(NodeType::BrandGuard)),
            ],
            ["img", "vid", "notify", "gate", "guard"].iter().enumerate().map(|(i, n)| FlowEdge::new(format!("e{}", i), "t", *n)).collect(),
        );
        let issues = validate(&def);

        for id in ["img", "vid", "notify", "gate"] {
            assert!(issues.iter().any(|i| i.is_error() && i.node_id.as_deref() == Some(id)), "{} should be an error", id);
        }
        let guard = issues.iter().find(|i| i.node_id.as_deref() == Some("guard")).unwrap();
        assert_eq!(guard.issue_type, IssueType::Warning);
    }

    #[test]
    fn test_missing_node_id() {
        let def = FlowDefinition::new(vec![trigger("t"), llm("", "x")], vec![]);
        let issues = validate(&def);
        assert!(issues.iter().any(|i| i.code == IssueCode::MissingNodeId && i.message.contains("position 1")));
    }

    #[test]
    fn test_warnings_do_not_block() {
        let gate = FlowNode::new(
            "gate",
            NodeKind::Condition(ConditionConfig {
                conditions: vec![Condition {
                    variable_selector: "{{#t.ok#}}".to_string(),
                    comparison_operator: ComparisonOperator::NotNull,
                    value: None,
                }],
                ..Default::default()
            }),
        );
        let def = FlowDefinition::new(
            vec![trigger("t"), gate, llm("a", "x"), llm("b", "y"), llm("island", "z")],
            vec![
                FlowEdge::new("e1", "t", "gate"),
                FlowEdge::new("e2", "gate", "a").with_handle(SourceHandle::True),
                FlowEdge::new("e2", "t", "b").with_handle(SourceHandle::False),
            ],
        );
        let issues = validate(&def);

        assert!(!has_errors(&issues));
        let codes: Vec<IssueCode> = issues.iter().map(|i| i.code).collect();
        assert!(codes.contains(&IssueCode::DuplicateEdgeId));
        assert!(codes.contains(&IssueCode::MisplacedBranchHandle));
        assert!(codes.contains(&IssueCode::Unreachable));
        assert_eq!(issues.iter().filter(|i| i.code == IssueCode::Unreachable).count(), 1);
    }

    #[test]
    fn test_validate_is_idempotent() {
        let def = FlowDefinition::new(
            vec![llm("x", ""), llm("x", ""), http("h", "")],
            vec![FlowEdge::new("e1", "x", "h"), FlowEdge::new("e2", "h", "x"), FlowEdge::new("e3", "h", "nowhere")],
        );
        assert_eq!(validate(&def), validate(&def));
    }

    #[test]
    fn test_issue_serialization() {
        let issue = ValidationIssue::error(IssueCode::MissingField, "LLM node 'copy' requires a prompt").at("copy");
        let json = serde_json::to_value(&issue).unwrap();

        assert_eq!(json["type"], "error");
        assert_eq!(json["nodeId"], "copy");
        assert_eq!(json["code"], "missing_field");
    }
}
