use std::cell::Cell;
use std::rc::Rc;

use serde_json::json;
use worker_driver::driver::{
    channel_pair, markup, Child, InboundMessage, NodeToken, OutboundMessage, ReplayError,
    SessionError,
};
use worker_driver::{DriverConfig, DriverSession, HostCapabilities};

fn mutation_batch(mutations: serde_json::Value) -> InboundMessage {
    serde_json::from_value(json!({ "type": "MutationRecord", "mutations": mutations }))
        .expect("valid batch")
}

#[tokio::test]
async fn body_child_list_builds_rendered_tree() {
    let (mut host, worker) = channel_pair();
    let mut session = DriverSession::new(
        &DriverConfig::default(),
        host.channel.clone(),
        HostCapabilities::default(),
    );
    let renders = Rc::new(Cell::new(0));
    let counter = Rc::clone(&renders);
    session.on_render(move |_| counter.set(counter.get() + 1));

    worker
        .sender
        .send(mutation_batch(json!([{
            "type": "childList",
            "target": { "nodeName": "BODY", "$$id": "body" },
            "addedNodes": [{
                "nodeType": 1,
                "nodeName": "VIEW",
                "$$id": "n1",
                "childNodes": [{ "nodeType": 3, "data": "hi" }]
            }]
        }])))
        .expect("send batch");
    drop(worker);

    session.run(&mut host.inbound).await.expect("run session");

    assert_eq!(renders.get(), 1);
    let tree = session.tree();
    let root = tree.root_node();
    assert_eq!(root.children.len(), 1);
    let Child::Node(view_key) = root.children[0] else {
        panic!("expected element child");
    };
    let view = tree.get(view_key).expect("view node");
    assert_eq!(view.component, "div");
    assert_eq!(view.token, Some(NodeToken::from("n1")));
    let Child::Node(text_key) = view.children[0] else {
        panic!("expected text container");
    };
    assert_eq!(tree.get(text_key).and_then(|node| node.text()), Some("hi"));
    assert_eq!(
        markup::render(tree),
        "<div data-target-id=\"body\"><div data-target-id=\"n1\"><span>hi</span></div></div>"
    );
}

#[tokio::test]
async fn batches_apply_in_delivery_order() {
    let (mut host, worker) = channel_pair();
    let mut session = DriverSession::new(
        &DriverConfig::default(),
        host.channel.clone(),
        HostCapabilities::default(),
    );

    let batches = [
        json!([{
            "type": "childList",
            "target": { "nodeName": "BODY", "$$id": 1 },
            "addedNodes": [{ "nodeType": 3, "$$id": 2, "data": "first" }]
        }]),
        json!([{ "type": "characterData", "target": { "$$id": 2 }, "newValue": "second" }]),
        json!([{ "type": "characterData", "target": { "$$id": 2 }, "newValue": "third" }]),
    ];
    for batch in batches {
        worker.sender.send(mutation_batch(batch)).expect("send batch");
    }
    drop(worker);
    session.run(&mut host.inbound).await.expect("run session");

    let text = session
        .registry()
        .lookup_token(&NodeToken::from("2"))
        .and_then(|key| session.tree().get(key))
        .and_then(|node| node.text());
    assert_eq!(text, Some("third"));
}

#[tokio::test]
async fn protocol_drift_stops_the_session() {
    let (mut host, worker) = channel_pair();
    let mut session = DriverSession::new(
        &DriverConfig::default(),
        host.channel.clone(),
        HostCapabilities::default(),
    );

    worker
        .sender
        .send(mutation_batch(json!([{ "type": "replaceWith", "target": { "$$id": 1 } }])))
        .expect("send batch");

    let result = session.run(&mut host.inbound).await;
    assert!(matches!(
        result,
        Err(SessionError::Replay(ReplayError::UnsupportedRecord { index: 0, .. }))
    ));
}

#[tokio::test]
async fn registry_tracks_add_and_remove_history() {
    let (host, _worker) = channel_pair();
    let mut session = DriverSession::new(
        &DriverConfig::default(),
        host.channel,
        HostCapabilities::default(),
    );
    let body = json!({ "nodeName": "BODY", "$$id": "body" });

    session
        .handle_message(mutation_batch(json!([
            {
                "type": "childList",
                "target": body,
                "addedNodes": [
                    { "nodeType": 1, "nodeName": "VIEW", "$$id": "a" },
                    { "nodeType": 1, "nodeName": "VIEW", "$$id": "b" }
                ]
            },
            { "type": "childList", "target": body, "removedNodes": [{ "$$id": "a" }] },
            {
                "type": "childList",
                "target": body,
                "addedNodes": [{ "nodeType": 1, "nodeName": "CHECKBOX", "$$id": "a" }]
            }
        ])))
        .expect("apply batch");

    let registry = session.registry();
    assert!(registry.contains(&NodeToken::from("a")));
    assert!(registry.contains(&NodeToken::from("b")));
    let a = registry.lookup_token(&NodeToken::from("a")).expect("a");
    assert_eq!(session.tree().get(a).map(|node| node.component.as_str()), Some("Checkbox"));
    assert_eq!(
        markup::render(session.tree()),
        "<div data-target-id=\"body\"><div data-target-id=\"b\"></div><Checkbox data-target-id=\"a\"></Checkbox></div>"
    );
}

#[tokio::test]
async fn init_then_events_flow_to_worker() {
    let (host, mut worker) = channel_pair();
    let mut session = DriverSession::new(
        &DriverConfig::default(),
        host.channel,
        HostCapabilities {
            passive_listeners: true,
        },
    );
    session
        .start(url::Url::parse("https://app.example/").expect("url"), 390)
        .expect("start");

    let init = worker.outbound.recv().await.expect("init message");
    assert_eq!(
        serde_json::to_value(&init).expect("serialize"),
        json!({ "type": "init", "url": "https://app.example/", "viewportWidth": 390 })
    );

    let event: worker_driver::driver::NativeEvent = serde_json::from_value(json!({
        "type": "click",
        "currentTarget": "n1",
        "detail": 1,
        "properties": { "clientX": 3, "clientY": 4, "NONE": 0, "view": {} }
    }))
    .expect("native event");
    session.dispatch_native_event(&event);

    let message = worker.outbound.recv().await.expect("event message");
    assert!(matches!(message, OutboundMessage::Event { .. }));
    assert_eq!(
        serde_json::to_value(&message).expect("serialize"),
        json!({
            "type": "event",
            "event": { "type": "click", "target": "n1", "detail": 1, "clientX": 3, "clientY": 4 }
        })
    );
}

#[tokio::test]
async fn config_file_overrides_components_and_identity_attribute() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "identity_attribute: data-node\ntext_component: Text\ncomponents:\n  SWITCH: Switch"
    )
    .expect("write config");
    let config = DriverConfig::load(Some(file.path().to_path_buf())).expect("load config");

    let (host, _worker) = channel_pair();
    let mut session = DriverSession::new(&config, host.channel, HostCapabilities::default());
    session
        .handle_json(
            r#"{"type":"MutationRecord","mutations":[{"type":"childList","target":{"nodeName":"BODY","$$id":0},"addedNodes":[{"nodeType":1,"nodeName":"SWITCH","$$id":5,"childNodes":[{"nodeType":3,"data":7}]}]}]}"#,
        )
        .expect("apply batch");

    assert_eq!(
        markup::render(session.tree()),
        "<div data-node=\"0\"><Switch data-node=\"5\"><Text>7</Text></Switch></div>"
    );
}
