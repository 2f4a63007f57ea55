use std::time::Duration;

use crossbeam_channel::Receiver;
use tokio::io::DuplexStream;
use voxelcraft_engine::protocol::messages::RequestBody;
use voxelcraft_engine::protocol::{
    read_message, write_message, ClientMessage, ProtocolError, ServerMessage, PROTOCOL_VERSION,
};
use voxelcraft_server::event_queue::ClientEvent;
use voxelcraft_server::net::{connection, listener};

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

async fn next_event(rx: &Receiver<ClientEvent>) -> ClientEvent {
    let rx = rx.clone();
    tokio::task::spawn_blocking(move || rx.recv_timeout(Duration::from_secs(5)))
        .await
        .unwrap()
        .expect("no event within 5s")
}

fn start(session: u64) -> (DuplexStream, Receiver<ClientEvent>, tokio::task::JoinHandle<anyhow::Result<()>>) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (tx, rx) = crossbeam_channel::unbounded();
    let task = tokio::spawn(connection::handle(server, session, tx, JOIN_TIMEOUT));
    (client, rx, task)
}

fn join(name: &str) -> ClientMessage {
    ClientMessage::Join {
        protocol_version: PROTOCOL_VERSION,
        name: name.to_string(),
    }
}

#[tokio::test]
async fn wrong_protocol_version_is_rejected() {
    let (mut client, events, task) = start(1);
    write_message(
        &mut client,
        &ClientMessage::Join {
            protocol_version: PROTOCOL_VERSION + 1,
            name: "steve".into(),
        },
    )
    .await
    .unwrap();

    match read_message::<_, ServerMessage>(&mut client).await.unwrap() {
        ServerMessage::JoinRejected { reason } => assert!(reason.contains("not supported"), "{reason}"),
        other => panic!("expected JoinRejected, got {other:?}"),
    }
    assert!(matches!(
        read_message::<_, ServerMessage>(&mut client).await,
        Err(ProtocolError::ConnectionClosed)
    ));
    task.await.unwrap().unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn first_message_must_be_join() {
    let (mut client, events, task) = start(1);
    write_message(&mut client, &ClientMessage::Leave).await.unwrap();
    match read_message::<_, ServerMessage>(&mut client).await.unwrap() {
        ServerMessage::JoinRejected { reason } => assert!(reason.contains("expected Join")),
        other => panic!("expected JoinRejected, got {other:?}"),
    }
    task.await.unwrap().unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn server_disconnect_ends_the_session() {
    let (mut client, events, task) = start(7);
    write_message(&mut client, &join("steve")).await.unwrap();

    let outbound = match next_event(&events).await {
        ClientEvent::Connected { session, name, outbound } => {
            assert_eq!(session, 7);
            assert_eq!(name, "steve");
            outbound
        }
        other => panic!("expected Connected, got {other:?}"),
    };

    outbound.send(ServerMessage::Disconnect { reason: "test".into() }).unwrap();
    assert_eq!(
        read_message::<_, ServerMessage>(&mut client).await.unwrap(),
        ServerMessage::Disconnect { reason: "test".into() }
    );

    task.await.unwrap().unwrap();
    match next_event(&events).await {
        ClientEvent::Disconnected { session, reason } => {
            assert_eq!(session, 7);
            assert_eq!(reason, "closed by server");
        }
        other => panic!("expected Disconnected, got {other:?}"),
    }
}

#[tokio::test]
async fn client_messages_arrive_in_order_then_leave_ends_the_session() {
    let (mut client, events, task) = start(3);
    write_message(&mut client, &join("alex")).await.unwrap();
    assert!(matches!(next_event(&events).await, ClientEvent::Connected { .. }));

    for id in 0..3 {
        write_message(&mut client, &ClientMessage::Request { id, body: RequestBody::Ping })
            .await
            .unwrap();
    }
    write_message(&mut client, &ClientMessage::Leave).await.unwrap();

    for expected in 0..3 {
        match next_event(&events).await {
            ClientEvent::Message {
                session: 3,
                message: ClientMessage::Request { id, .. },
            } => assert_eq!(id, expected),
            other => panic!("unexpected {other:?}"),
        }
    }
    assert!(matches!(
        next_event(&events).await,
        ClientEvent::Message { message: ClientMessage::Leave, .. }
    ));
    task.await.unwrap().unwrap();
    match next_event(&events).await {
        ClientEvent::Disconnected { reason, .. } => assert_eq!(reason, "left the game"),
        other => panic!("expected Disconnected, got {other:?}"),
    }
}

#[tokio::test]
async fn silent_client_times_out() {
    let (client, server) = tokio::io::duplex(1024);
    let (tx, events) = crossbeam_channel::unbounded();
    let result = connection::handle(server, 1, tx, Duration::from_millis(50)).await;
    assert!(result.is_err());
    assert!(events.is_empty());
    drop(client);
}

#[tokio::test]
async fn listener_assigns_increasing_session_ids() {
    let tcp = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let (tx, events) = crossbeam_channel::unbounded();
    tokio::spawn(listener::run(tcp, tx, JOIN_TIMEOUT));

    let mut sessions = Vec::new();
    let mut streams = Vec::new();
    for name in ["first", "second"] {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        write_message(&mut stream, &join(name)).await.unwrap();
        match next_event(&events).await {
            ClientEvent::Connected { session, name: joined, .. } => {
                assert_eq!(joined, name);
                sessions.push(session);
            }
            other => panic!("expected Connected, got {other:?}"),
        }
        streams.push(stream);
    }
    assert_eq!(sessions, vec![1, 2]);
}
