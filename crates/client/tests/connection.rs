use std::time::Duration;

use glam::DVec3;
use tokio::io::DuplexStream;
use uuid::Uuid;
use voxelcraft_client::{ClientError, Connection};
use voxelcraft_engine::protocol::messages::{RequestBody, ResponseBody};
use voxelcraft_engine::protocol::{read_message, write_message, ClientMessage, ServerMessage, PROTOCOL_VERSION};
use voxelcraft_engine::world::position::ChunkPos;
use voxelcraft_engine::world::position::ChunkDims;

const TIMEOUT: Duration = Duration::from_secs(5);

fn accepted() -> ServerMessage {
    ServerMessage::JoinAccepted {
        player_id: Uuid::new_v4(),
        spawn: DVec3::new(8.5, 65.0, 8.5),
        palette: vec!["voxelcraft:air".into(), "voxelcraft:stone".into()],
        chunk_dims: ChunkDims::new(16, 128),
        ticks_per_second: 20,
        render_distance: 4,
    }
}

/// Read the client's Join and answer with `reply`.
async fn answer_join(server: &mut DuplexStream, reply: ServerMessage) -> String {
    let name = match read_message::<_, ClientMessage>(server).await.unwrap() {
        ClientMessage::Join { protocol_version, name } => {
            assert_eq!(protocol_version, PROTOCOL_VERSION);
            name
        }
        other => panic!("expected Join, got {other:?}"),
    };
    write_message(server, &reply).await.unwrap();
    name
}

#[tokio::test]
async fn join_returns_the_server_info() {
    let (client, mut server) = tokio::io::duplex(64 * 1024);
    let reply = accepted();
    let fake = tokio::spawn(async move {
        let name = answer_join(&mut server, reply).await;
        (name, server)
    });

    let (connection, info) = Connection::join(client, "steve", TIMEOUT).await.unwrap();
    let (name, _server) = fake.await.unwrap();
    assert_eq!(name, "steve");
    assert_eq!(info.spawn, DVec3::new(8.5, 65.0, 8.5));
    assert_eq!(info.palette.len(), 2);
    assert_eq!(info.render_distance, 4);
    assert!(!connection.is_closed());
}

#[tokio::test]
async fn rejection_reason_reaches_the_caller() {
    let (client, mut server) = tokio::io::duplex(64 * 1024);
    tokio::spawn(async move {
        answer_join(
            &mut server,
            ServerMessage::JoinRejected {
                reason: "server is full".into(),
            },
        )
        .await;
    });

    match Connection::join(client, "late", TIMEOUT).await {
        Err(ClientError::Rejected(reason)) => assert_eq!(reason, "server is full"),
        other => panic!("expected a rejection, got {:?}", other.map(|(_, info)| info)),
    }
}

#[tokio::test]
async fn silent_server_times_out_the_join() {
    let (client, _server) = tokio::io::duplex(64 * 1024);
    let result = Connection::join(client, "steve", Duration::from_millis(50)).await;
    assert!(matches!(result, Err(ClientError::Timeout(_))));
}

#[tokio::test]
async fn server_that_never_reads_times_out_the_join() {
    // The Join frame is larger than the pipe, so the write cannot finish.
    let (client, _server) = tokio::io::duplex(8);
    let result = Connection::join(client, &"x".repeat(64), Duration::from_millis(50)).await;
    assert!(matches!(result, Err(ClientError::Timeout("join request"))));
}

#[tokio::test]
async fn responses_are_routed_by_id_and_other_messages_queued() {
    let (client, mut server) = tokio::io::duplex(64 * 1024);
    let fake = tokio::spawn(async move {
        answer_join(&mut server, accepted()).await;
        // Answer two requests out of order, with a world message between.
        let mut ids = Vec::new();
        for _ in 0..2 {
            match read_message::<_, ClientMessage>(&mut server).await.unwrap() {
                ClientMessage::Request { id, .. } => ids.push(id),
                other => panic!("expected Request, got {other:?}"),
            }
        }
        write_message(&mut server, &ServerMessage::Response { id: ids[1], body: ResponseBody::Error("second".into()) })
            .await
            .unwrap();
        write_message(&mut server, &ServerMessage::UnloadChunk { pos: ChunkPos::new(3, 4) })
            .await
            .unwrap();
        write_message(&mut server, &ServerMessage::Response { id: ids[0], body: ResponseBody::Pong })
            .await
            .unwrap();
        server
    });

    let (mut connection, _) = Connection::join(client, "steve", TIMEOUT).await.unwrap();
    let (first, second) = tokio::join!(
        connection.request(RequestBody::Ping),
        connection.request(RequestBody::WorldInfo)
    );
    assert_eq!(first.unwrap(), ResponseBody::Pong);
    assert_eq!(second.unwrap(), ResponseBody::Error("second".into()));
    assert_eq!(
        connection.recv().await,
        Some(ServerMessage::UnloadChunk { pos: ChunkPos::new(3, 4) })
    );
    let _server = fake.await.unwrap();
}

#[tokio::test]
async fn unanswered_request_closes_the_connection() {
    let (client, mut server) = tokio::io::duplex(64 * 1024);
    let fake = tokio::spawn(async move {
        answer_join(&mut server, accepted()).await;
        server
    });
    let (connection, _) = Connection::join(client, "steve", TIMEOUT).await.unwrap();
    let _server = fake.await.unwrap();
    let connection = connection.with_request_timeout(Duration::from_millis(50));

    let result = connection.request(RequestBody::Ping).await;
    assert!(matches!(result, Err(ClientError::Timeout(_))));
    assert!(connection.is_closed());
    assert!(matches!(connection.send(ClientMessage::Leave), Err(ClientError::Closed)));
}

#[tokio::test]
async fn server_hangup_fails_pending_requests() {
    let (client, mut server) = tokio::io::duplex(64 * 1024);
    let fake = tokio::spawn(async move {
        answer_join(&mut server, accepted()).await;
        let _ = read_message::<_, ClientMessage>(&mut server).await;
        drop(server);
    });
    let (mut connection, _) = Connection::join(client, "steve", TIMEOUT).await.unwrap();

    let result = connection.request(RequestBody::Ping).await;
    assert!(matches!(result, Err(ClientError::Closed)));
    fake.await.unwrap();
    assert_eq!(connection.recv().await, None);
    assert!(connection.is_closed());
}

#[tokio::test]
async fn leave_is_the_last_thing_sent() {
    let (client, mut server) = tokio::io::duplex(64 * 1024);
    let fake = tokio::spawn(async move {
        answer_join(&mut server, accepted()).await;
        let mut seen = Vec::new();
        while let Ok(message) = read_message::<_, ClientMessage>(&mut server).await {
            seen.push(message);
        }
        seen
    });
    let (connection, _) = Connection::join(client, "steve", TIMEOUT).await.unwrap();
    connection.send(ClientMessage::SelectHotbar { slot: 2 }).unwrap();
    connection.leave().await;

    let seen = fake.await.unwrap();
    assert_eq!(seen, vec![ClientMessage::SelectHotbar { slot: 2 }, ClientMessage::Leave]);
}
