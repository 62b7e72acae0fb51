use canvasflow::node::NodeData;
use canvasflow::store::{GraphStore, InMemoryGraphStore};

/// Every running marker must be cleared once a run returns, success or not.
#[allow(dead_code)]
pub async fn assert_no_running_markers(store: &InMemoryGraphStore) {
    let nodes = store.get_nodes().await.expect("store readable");
    let still_running: Vec<&str> = nodes
        .iter()
        .filter(|node| node.running)
        .map(|node| node.id.as_str())
        .collect();
    assert!(
        still_running.is_empty(),
        "expected no running markers after the run, found: {still_running:?}"
    );
}

#[allow(dead_code)]
pub async fn assert_text_payload(store: &InMemoryGraphStore, node_id: &str, expected: &str) {
    let node = store.get_node(node_id).await.expect("node exists");
    match &node.data {
        NodeData::Text(data) => assert_eq!(
            data.text, expected,
            "unexpected text payload on node '{node_id}'"
        ),
        other => panic!("expected node '{node_id}' to be a text node, got: {other:?}"),
    }
}
