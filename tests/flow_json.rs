use forgeflow::{
    FlowDefinition, ForgeError, IssueCategory, IssueCode, NodeType, build_adjacency, build_in_degree, estimate_cost, has_errors, model::FlowModel, topological_order, validate,
};
use serde_json::{Value, json};

fn parse(doc: Value) -> FlowDefinition {
    FlowDefinition::from_json(&doc.to_string()).unwrap()
}

fn node(
    id: &str,
    node_type: &str,
    config: Value,
) -> Value {
    json!({ "id": id, "type": node_type, "label": id, "config": config, "position": { "x": 0.0, "y": 0.0 } })
}

fn edge(
    source: &str,
    target: &str,
) -> Value {
    json!({ "id": format!("{}-{}", source, target), "source": source, "target": target })
}

fn position(
    order: &[String],
    id: &str,
) -> usize {
    order.iter().position(|n| n == id).unwrap()
}

#[test]
fn test_linear_document() {
    let def = parse(json!({
        "id": "launch",
        "name": "Launch copy",
        "nodes": [
            node("image", "image", json!({ "prompt": "hero {{#llm.text#}}" })),
            node("trigger", "trigger", json!({})),
            node("llm", "llm", json!({ "prompt": "tagline" })),
        ],
        "edges": [edge("trigger", "llm"), edge("llm", "image")],
    }));

    assert!(validate(&def).is_empty());
    assert_eq!(topological_order(&def).unwrap(), vec!["trigger", "llm", "image"]);
    assert_eq!(estimate_cost(&def), 15);
    assert_eq!(build_in_degree(&def)["image"], 1);
    assert_eq!(build_adjacency(&def)["trigger"], vec!["llm".to_string()]);
}

#[test]
fn test_branching_and_converging_documents() {
    let def = parse(json!({
        "nodes": [
            node("trigger", "trigger", json!({})),
            node("llm1", "llm", json!({ "prompt": "a" })),
            node("llm2", "llm", json!({ "prompt": "b" })),
            node("merge", "llm", json!({ "prompt": "{{#llm1.text#}} {{#llm2.text#}}" })),
        ],
        "edges": [edge("trigger", "llm1"), edge("trigger", "llm2"), edge("llm1", "merge"), edge("llm2", "merge")],
    }));

    let order = topological_order(&def).unwrap();
    assert_eq!(order.len(), 4);
    assert!(position(&order, "trigger") < position(&order, "llm1"));
    assert!(position(&order, "trigger") < position(&order, "llm2"));
    assert!(position(&order, "llm1") < position(&order, "merge"));
    assert!(position(&order, "llm2") < position(&order, "merge"));
}

#[test]
fn test_duplicate_node_ids_are_reported() {
    let def = parse(json!({
        "nodes": [node("same_id", "trigger", json!({})), node("same_id", "llm", json!({ "prompt": "x" }))],
        "edges": [],
    }));

    let issues = validate(&def);
    let dup = issues.iter().find(|i| i.code == IssueCode::DuplicateNodeId).unwrap();
    assert!(dup.is_error());
    assert!(dup.message.contains("Duplicate node ID"));
    assert_eq!(dup.category(), IssueCategory::Structural);
}

#[test]
fn test_empty_configs_report_required_fields() {
    let def = parse(json!({
        "nodes": [node("trigger", "trigger", json!({})), node("copy", "llm", json!({})), node("fetch", "http", json!({}))],
        "edges": [edge("trigger", "copy"), edge("trigger", "fetch")],
    }));

    let issues = validate(&def);
    assert!(has_errors(&issues));

    let copy = issues.iter().find(|i| i.node_id.as_deref() == Some("copy")).unwrap();
    assert!(copy.is_error());
    assert!(copy.message.contains("prompt"));
    assert_eq!(copy.category(), IssueCategory::Semantic);

    let fetch = issues.iter().find(|i| i.node_id.as_deref() == Some("fetch")).unwrap();
    assert!(fetch.message.contains("URL"));
}

#[test]
fn test_missing_config_parses_with_defaults() {
    let def = parse(json!({
        "nodes": [{ "id": "trigger", "type": "trigger" }],
    }));

    assert_eq!(def.nodes[0].node_type(), NodeType::Trigger);
    assert!(validate(&def).is_empty());
}

#[test]
fn test_cyclic_document() {
    let def = parse(json!({
        "nodes": [node("trigger", "trigger", json!({})), node("a", "llm", json!({ "prompt": "a" })), node("b", "llm", json!({ "prompt": "b" }))],
        "edges": [edge("trigger", "a"), edge("a", "b"), edge("b", "a")],
    }));

    assert!(validate(&def).iter().any(|i| i.code == IssueCode::Cycle && i.is_error()));
    match topological_order(&def) {
        Err(ForgeError::Cycle(mut blocked)) => {
            blocked.sort();
            assert_eq!(blocked, vec!["a", "b"]);
        },
        other => panic!("expected a cycle, got {:?}", other),
    }
}

#[test]
fn test_validation_is_deterministic() {
    let def = parse(json!({
        "nodes": [node("copy", "llm", json!({})), node("x", "image", json!({})), node("x", "notification", json!({}))],
        "edges": [edge("copy", "ghost")],
    }));

    let first = validate(&def);
    assert!(!first.is_empty());
    assert_eq!(first, validate(&def));
}

#[test]
fn test_malformed_documents_are_refused() {
    assert!(matches!(FlowDefinition::from_json("{ not json"), Err(ForgeError::Flow(_))));

    let unknown_type = json!({ "nodes": [node("x", "spreadsheet", json!({}))] });
    assert!(FlowDefinition::from_json(&unknown_type.to_string()).is_err());

    let wrong_shape = json!({ "nodes": [node("x", "llm", json!({ "prompt": 42 }))] });
    assert!(FlowDefinition::from_json(&wrong_shape.to_string()).is_err());
}

#[test]
fn test_definition_converts_back_to_the_wire_model() {
    let doc = json!({
        "id": "welcome",
        "env": { "BRAND": "Acme" },
        "nodes": [node("trigger", "trigger", json!({ "payload": { "email": "a@b.c" } })), node("mail", "notification", json!({ "message": "hi" }))],
        "edges": [edge("trigger", "mail")],
    });
    let def = parse(doc);

    let model = FlowModel::try_from(&def).unwrap();
    assert_eq!(model.id, "welcome");
    assert_eq!(model.env["BRAND"], "Acme");
    assert_eq!(model.nodes.len(), 2);
    assert_eq!(FlowDefinition::try_from(&model).unwrap(), def);
}
