mod common;

use common::{action, app, empty_app, engine_with, session, RecordingHost};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use tessera_core::{ActionError, EngineConfig, ErrorKind};
use tessera_runtime::Event;

#[tokio::test]
async fn wait_for_resolves_once_with_the_first_payload() {
    let (session, _) = session(empty_app());
    let bus = Arc::downgrade(session.bus());
    session.bus().on("load", move |event: &Event| {
        let bus = bus.upgrade().ok_or_else(|| anyhow::anyhow!("bus gone"))?;
        bus.emit("ready", Event::new(json!({ "n": 1, "for": event.data.clone() })));
        bus.emit("ready", Event::new(json!({ "n": 2 })));
        Ok(())
    });

    let result = session
        .dispatch(
            &action(json!({ "type": "event", "event": "load", "waitFor": "ready" })),
            json!("page"),
        )
        .await
        .unwrap();

    assert_eq!(result, json!({ "n": 1, "for": "page" }));
    assert_eq!(session.bus().listener_count("ready"), 0);
}

#[tokio::test]
async fn event_without_wait_for_returns_its_input() {
    let (session, _) = session(empty_app());
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = seen.clone();
    session.bus().on("saved", move |event: &Event| {
        sink.lock().push(event.data.clone());
        Ok(())
    });

    let result = session
        .dispatch(&action(json!({ "type": "event", "event": "saved" })), json!({ "id": 7 }))
        .await
        .unwrap();

    assert_eq!(result, json!({ "id": 7 }));
    assert_eq!(*seen.lock(), [json!({ "id": 7 })]);
}

#[tokio::test]
async fn failed_reply_rejects_the_wait() {
    let (session, _) = session(empty_app());
    let bus = Arc::downgrade(session.bus());
    session.bus().on("save", move |_: &Event| {
        if let Some(bus) = bus.upgrade() {
            bus.emit("saved", Event::failed(Value::Null, json!("disk full")));
        }
        Ok(())
    });

    let err = session
        .dispatch(
            &action(json!({ "type": "event", "event": "save", "waitFor": "saved" })),
            json!({}),
        )
        .await
        .unwrap_err();
    assert_eq!(err, ActionError::Rejected(json!("disk full")));
}

#[tokio::test]
async fn wait_times_out_when_configured() {
    let config = EngineConfig {
        wait_timeout_ms: Some(20),
        ..EngineConfig::default()
    };
    let session = engine_with(config).session(app(empty_app()), Arc::new(RecordingHost::default()));

    let err = session
        .dispatch(
            &action(json!({ "type": "event", "event": "ping", "waitFor": "pong" })),
            json!({}),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(session.bus().listener_count("pong"), 0);
}

#[tokio::test]
async fn cancellation_is_not_handed_to_on_error() {
    let (session, host) = session(empty_app());
    let waiting = action(json!({
        "type": "event",
        "event": "ping",
        "waitFor": "pong",
        "onError": { "type": "link", "to": "error" }
    }));

    let (result, ()) = tokio::join!(session.dispatch(&waiting, json!({})), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.close();
    });

    assert!(result.unwrap_err().is_cancellation());
    assert!(host.links.lock().is_empty());
}

#[tokio::test]
async fn unmounting_a_page_cancels_its_pending_waits() {
    let (session, _) = session(json!({
        "pages": [{
            "name": "home",
            "blocks": [{
                "type": "button",
                "actions": { "onClick": { "type": "event", "event": "ping", "waitFor": "pong" } }
            }]
        }]
    }));
    let page = session.mount_page("home", Map::new(), Value::Null).unwrap();
    let ctx = page.blocks()[0].context().clone();
    let on_click = page.blocks()[0].actions().get("onClick").unwrap().clone();

    let (result, ()) = tokio::join!(session.dispatch_with(&on_click, json!({}), &ctx), async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        page.unmount();
    });

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Cancelled);
    assert_eq!(session.bus().listener_count("pong"), 0);
}

#[tokio::test]
async fn blocks_only_see_declared_events() {
    let (session, _) = session(json!({
        "pages": [{
            "name": "home",
            "blocks": [
                { "type": "form", "events": { "emit": { "submitted": "form.submitted" } } },
                { "type": "list", "events": { "listen": { "refresh": "form.submitted" } } }
            ]
        }]
    }));
    let page = session.mount_page("home", Map::new(), Value::Null).unwrap();
    let [form, list] = page.blocks() else {
        panic!("expected two blocks");
    };

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = seen.clone();
    list.events()
        .on("refresh", move |event: &Event| {
            sink.lock().push(event.data.clone());
            Ok(())
        })
        .unwrap();

    assert!(form.events().emit("submitted", json!({ "id": 1 }), None));
    assert!(!form.events().emit("deleted", json!({ "id": 1 }), None));
    assert!(list.events().on("other", |_: &Event| Ok(())).is_none());
    assert_eq!(*seen.lock(), [json!({ "id": 1 })]);

    drop(page);
    assert_eq!(session.bus().listener_count("form.submitted"), 0);
}

#[tokio::test]
async fn blocks_cannot_remove_each_others_listeners() {
    let (session, _) = session(json!({
        "pages": [{
            "name": "home",
            "blocks": [
                { "type": "list", "events": { "listen": { "refresh": "items.changed" } } },
                { "type": "badge", "events": { "listen": { "refresh": "items.changed" } } }
            ]
        }]
    }));
    let page = session.mount_page("home", Map::new(), Value::Null).unwrap();
    let [list, badge] = page.blocks() else {
        panic!("expected two blocks");
    };

    let list_id = list.events().on("refresh", |_: &Event| Ok(())).unwrap();
    badge.events().on("refresh", |_: &Event| Ok(())).unwrap();

    assert!(!badge.events().off("refresh", list_id));
    assert_eq!(session.bus().listener_count("items.changed"), 2);

    assert!(list.events().off("refresh", list_id));
    assert_eq!(session.bus().listener_count("items.changed"), 1);
}
