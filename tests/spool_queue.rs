use std::time::Duration;

use nodetrack::agent::{command_channel, Command, CommandSource, OutputSink, Spool};
use nodetrack::network::message::NodeAddress;
use nodetrack::shutdown::Shutdown;

fn spool(dir: &tempfile::TempDir) -> Spool {
    Spool::new(dir.path().join("_nodes"), &NodeAddress::new("127.0.0.1", 8000))
}

#[tokio::test]
async fn file_names_follow_node_address() {
    let tmp = tempfile::tempdir().unwrap();
    let spool = spool(&tmp);
    assert!(spool.in_path().ends_with("127.0.0.1:8000.in"));
    assert!(spool.out_path().ends_with("127.0.0.1:8000.out"));

    spool.ensure().await.unwrap();
    assert!(spool.in_path().exists());
    assert!(spool.out_path().exists());
}

#[tokio::test]
async fn drain_takes_each_line_once() {
    let tmp = tempfile::tempdir().unwrap();
    let spool = spool(&tmp);
    spool.push_command("submit_info").await.unwrap();
    spool
        .push_command(r#"chat:{"peer":"127.0.0.1:8001","message":"hi"}"#)
        .await
        .unwrap();

    let lines = spool.drain_commands().await.unwrap();
    assert_eq!(
        lines,
        vec![
            "submit_info".to_string(),
            r#"chat:{"peer":"127.0.0.1:8001","message":"hi"}"#.to_string()
        ]
    );
    assert!(spool.drain_commands().await.unwrap().is_empty());
}

#[tokio::test]
async fn output_is_read_and_cleared() {
    let tmp = tempfile::tempdir().unwrap();
    let spool = spool(&tmp);
    let sink = spool.output_sink();
    sink.write_line("Node agent started with address 127.0.0.1:8000").await;
    sink.write_line("Connected to peer 127.0.0.1:8001").await;

    let output = spool.take_output().await.unwrap();
    assert_eq!(
        output,
        "Node agent started with address 127.0.0.1:8000\nConnected to peer 127.0.0.1:8001\n"
    );
    assert_eq!(spool.take_output().await.unwrap(), "");
}

#[tokio::test]
async fn reader_feeds_command_channel() {
    let tmp = tempfile::tempdir().unwrap();
    let spool = spool(&tmp);
    let (queue, mut source) = command_channel(8);
    let shutdown = Shutdown::new();
    let reader = spool.spawn_reader(queue, Duration::from_millis(10), shutdown.clone());

    spool.push_command("get_list").await.unwrap();
    spool.push_command("peer_connect:127.0.0.1:8001").await.unwrap();

    let mut received = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while received.len() < 2 && tokio::time::Instant::now() < deadline {
        match source.try_next() {
            Some(item) => received.push(item.unwrap()),
            None => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    }
    assert_eq!(
        received,
        vec![
            Command::GetList,
            Command::PeerConnect(NodeAddress::new("127.0.0.1", 8001))
        ]
    );

    shutdown.trigger();
    reader.await.unwrap();
}
