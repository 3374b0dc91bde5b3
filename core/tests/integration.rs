//! Resource operations against the live mock server.
//!
//! # Design
//! Each test starts its own mock server on a random port in a background
//! tokio runtime, then drives it through `Client` and the default ureq
//! transport, so URL building, headers, payload encoding and response
//! decoding are exercised over real HTTP.

use std::net::SocketAddr;
use std::sync::mpsc;

use resty::{Args, Client, ClientOptions, Error, HttpMethod, MethodDef, Operation, Scheme, TransportError};
use serde_json::{json, Value};

fn spawn_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn client(addr: SocketAddr, version: Option<&str>) -> Client {
    let options = ClientOptions {
        scheme: Scheme::Http,
        port: Some(addr.port()),
        version: version.map(str::to_string),
        timeout_ms: Some(5_000),
        ..ClientOptions::default()
    };
    let mut client = Client::new(&addr.ip().to_string(), options).unwrap();
    client.register("people", Operation::ALL);
    client
        .register_method(
            "people",
            MethodDef {
                name: "address".to_string(),
                method: "{id}/formatted_address".to_string(),
                http_method: HttpMethod::Get,
            },
        )
        .unwrap();
    client
}

fn id_of(value: &Value) -> u64 {
    value["id"].as_u64().unwrap()
}

#[test]
fn crud_lifecycle() {
    let addr = spawn_server();
    let client = client(addr, None);
    let people = client.resource("people").unwrap();

    // Step 1: list — should be empty.
    let listed = people.list().unwrap();
    assert_eq!(listed.as_json(), Some(&json!([])));

    // Step 2: create.
    let created = people
        .create(json!({"name": "Ada", "address": "12 st james square"}))
        .unwrap();
    assert_eq!(created.status, 201);
    let created = created.as_json().unwrap().clone();
    assert_eq!(created["name"], "Ada");
    let id = id_of(&created);

    // Step 3: get.
    let fetched = people.get(id).unwrap();
    assert_eq!(fetched.as_json(), Some(&created));

    // Step 4: update.
    let updated = people.update(id, json!({"name": "Ada Lovelace"})).unwrap();
    assert_eq!(updated.as_json().unwrap()["name"], "Ada Lovelace");

    // Step 5: custom operation with a text body.
    let address = people.invoke("address", Args::id(id)).unwrap();
    assert_eq!(address.as_text(), Some("12 ST JAMES SQUARE"));

    // Step 6: delete.
    let deleted = people.delete(id).unwrap();
    assert_eq!(deleted.status, 204);

    // Step 7: get after delete — not found.
    let err = people.get(id).unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

#[test]
fn versioned_client_uses_prefixed_paths() {
    let addr = spawn_server();
    let client = client(addr, Some("2"));
    let people = client.resource("people").unwrap();

    let created = people.create(json!({"name": "Grace"})).unwrap();
    let id = id_of(created.as_json().unwrap());
    let fetched = people.get(id).unwrap();
    assert_eq!(fetched.as_json().unwrap()["name"], "Grace");

    let unknown = client.resource("people").unwrap().get(999).unwrap_err();
    assert!(unknown.is_not_found());
}

#[test]
fn concurrent_callbacks_receive_their_own_person() {
    let addr = spawn_server();
    let client = client(addr, None);
    let people = client.resource("people").unwrap();

    let first = id_of(people.create(json!({"name": "first"})).unwrap().as_json().unwrap());
    let second = id_of(people.create(json!({"name": "second"})).unwrap().as_json().unwrap());

    let (tx, rx) = mpsc::channel();
    let mut handles = Vec::new();
    for (id, name) in [(first, "first"), (second, "second")] {
        let tx = tx.clone();
        let handle = people
            .dispatch("get", Args::id(id), move |result| {
                tx.send((name, result)).unwrap();
            })
            .unwrap();
        handles.push(handle);
    }
    drop(tx);

    let mut received = 0;
    for (expected, result) in rx {
        let response = result.unwrap();
        assert_eq!(response.as_json().unwrap()["name"], expected);
        received += 1;
    }
    assert_eq!(received, 2);
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn dispatched_failures_reach_the_callback() {
    let addr = spawn_server();
    let client = client(addr, None);
    let people = client.resource("people").unwrap();

    let (tx, rx) = mpsc::channel();
    people
        .dispatch("delete", Args::id(404), move |result| tx.send(result).unwrap())
        .unwrap()
        .join()
        .unwrap();
    assert!(rx.recv().unwrap().unwrap_err().is_not_found());
}

#[test]
fn overridden_content_type_reaches_the_server() {
    let addr = spawn_server();
    let client = client(addr, None);
    client.add_header("Content-Type", "application/xml");

    let err = client
        .resource("people")
        .unwrap()
        .create(json!("<person><name>Ada</name></person>"))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::Status { status: 415, .. })
    ));
}

#[test]
fn unreachable_server_is_a_transport_failure() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client = client(addr, None);
    let err = client.resource("people").unwrap().list().unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::Io(_) | TransportError::Timeout)
    ));
}

#[test]
fn slash_in_id_cannot_reach_another_route() {
    let addr = spawn_server();
    let client = client(addr, None);
    let people = client.resource("people").unwrap();
    let id = id_of(people.create(json!({"name": "Ada", "address": "x"})).unwrap().as_json().unwrap());

    // Unencoded, this id would resolve to the formatted_address route.
    let err = people.get(format!("{id}/formatted_address")).unwrap_err();
    assert!(
        matches!(err, Error::Transport(TransportError::Status { status: 400, .. })),
        "{err}"
    );
}
