use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use nodetrack::agent::{start_agent, AgentHandle, Command, MemoryOutputSink};
use nodetrack::config::Config;
use nodetrack::error::TransportError;
use nodetrack::network::{TcpTransport, Transport};
use nodetrack::shutdown::Shutdown;
use nodetrack::tracker::start_tracker;

fn tracker_config() -> Config {
    Config::from_toml(
        r#"
        [tracker]
        bind = "127.0.0.1:0"
        [network]
        max_line_bytes = 512
        "#,
    )
    .unwrap()
}

fn agent_config(tracker: &str) -> Config {
    Config::from_toml(&format!(
        r#"
        [agent]
        address = "127.0.0.1:0"
        tracker = "{}"
        poll_interval_ms = 10
        submit_on_start = false
        [network]
        request_timeout_ms = 2000
        "#,
        tracker
    ))
    .unwrap()
}

async fn wait_for(output: &MemoryOutputSink, line: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !output.contains(line) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {:?}; got {:?}",
            line,
            output.lines()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn spawn_agent(tracker: &str) -> (AgentHandle, MemoryOutputSink) {
    let output = MemoryOutputSink::new();
    let handle = start_agent(&agent_config(tracker), Arc::new(output.clone()), Shutdown::new())
        .await
        .unwrap();
    (handle, output)
}

async fn raw_request(addr: &str, line: &str) -> String {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read, mut write) = stream.into_split();
    write.write_all(format!("{}\n", line).as_bytes()).await.unwrap();
    let mut reply = String::new();
    BufReader::new(read).read_line(&mut reply).await.unwrap();
    reply.trim_end().to_string()
}

#[tokio::test]
async fn two_agents_discover_connect_and_chat() {
    let tracker = start_tracker(&tracker_config(), Shutdown::new()).await.unwrap();
    let tracker_addr = tracker.local_addr.to_string();

    let (a, a_out) = spawn_agent(&tracker_addr).await;
    let (b, b_out) = spawn_agent(&tracker_addr).await;
    let a_addr = a.address().to_string();
    let b_addr = b.address().to_string();
    assert_eq!(a.address().port, a.local_addr.port());
    wait_for(&a_out, &format!("Node agent started with address {}", a_addr)).await;

    a.queue.push(Command::SubmitInfo).await;
    wait_for(&a_out, "Tracker update: 1 nodes online").await;
    b.queue.push(Command::SubmitInfo).await;
    wait_for(&b_out, "Tracker update: 2 nodes online").await;

    a.queue.push_line(&format!("peer_connect:{}", b_addr)).await;
    wait_for(&a_out, &format!("Connected to peer {}", b_addr)).await;
    wait_for(&b_out, &format!("Peer {} connected", a_addr)).await;

    a.queue
        .push_line(&format!(r#"chat:{{"peer":"{}","message":"hi"}}"#, b_addr))
        .await;
    wait_for(&b_out, &format!("CHAT:{}:hi", a_addr)).await;
    wait_for(&a_out, &format!("Message sent to {}", b_addr)).await;

    // Forged token over the wire never reaches the sink.
    let forged = format!(
        r#"chat_message:{{"token":"wrong","message":"forged","from":"{}"}}"#,
        a_addr
    );
    let reply = raw_request(&b_addr, &forged).await;
    assert_eq!(reply, r#"result:{"status":"ERROR","message":"Unauthorized"}"#);
    assert!(!b_out.contains(&format!("CHAT:{}:forged", a_addr)));

    let listed = raw_request(&tracker_addr, "get_list").await;
    let value: serde_json::Value = serde_json::from_str(&listed).unwrap();
    assert!(value.get(&a_addr).is_some());
    assert!(value.get(&b_addr).is_some());

    a.queue.push(Command::Exit).await;
    tokio::time::timeout(Duration::from_secs(5), a.wait())
        .await
        .expect("agent a stops after exit")
        .unwrap();
    b.shutdown().trigger();
    b.wait().await.unwrap();
    tracker.shutdown().trigger();
    tracker.wait().await.unwrap();
}

#[tokio::test]
async fn oversized_request_gets_error_reply() {
    let tracker = start_tracker(&tracker_config(), Shutdown::new()).await.unwrap();
    let addr = tracker.local_addr.to_string();
    let huge = format!("submit_info:{}", "x".repeat(4096));
    let reply = raw_request(&addr, &huge).await;
    assert_eq!(reply, r#"{"error":"Invalid request: line exceeds 512 bytes"}"#);

    let reply = raw_request(&addr, "get_ip").await;
    assert_eq!(reply, r#"{"ip":"127.0.0.1"}"#);

    tracker.shutdown().trigger();
    tracker.wait().await.unwrap();
}

#[tokio::test]
async fn stalled_peer_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let _holder = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let transport = TcpTransport::new(Duration::from_millis(200), 1024);
    let started = tokio::time::Instant::now();
    let err = transport.request(&addr, "get_ip").await.unwrap_err();
    assert!(matches!(err, TransportError::Timeout { .. }), "{:?}", err);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn refused_connection_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let transport = TcpTransport::new(Duration::from_secs(2), 1024);
    let err = transport.request(&addr, "get_ip").await.unwrap_err();
    assert!(matches!(err, TransportError::Connect { .. }), "{:?}", err);
}

#[tokio::test]
async fn request_in_flight_at_shutdown_is_answered() {
    let tracker = start_tracker(&tracker_config(), Shutdown::new()).await.unwrap();
    let addr = tracker.local_addr.to_string();

    let stream = TcpStream::connect(&addr).await.unwrap();
    let (read, mut write) = stream.into_split();
    write.write_all(b"get_").await.unwrap();
    // Give the accept loop time to pick the connection up.
    tokio::time::sleep(Duration::from_millis(100)).await;

    tracker.shutdown().trigger();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(TcpStream::connect(&addr).await.is_err(), "listener closed after shutdown");

    write.write_all(b"ip\n").await.unwrap();
    let mut reply = String::new();
    BufReader::new(read).read_line(&mut reply).await.unwrap();
    assert_eq!(reply.trim_end(), r#"{"ip":"127.0.0.1"}"#);

    tokio::time::timeout(Duration::from_secs(5), tracker.wait())
        .await
        .expect("tracker drains and stops")
        .unwrap();
}

#[tokio::test]
async fn command_taken_before_shutdown_runs_to_completion() {
    // Tracker that answers only after a delay, so shutdown lands mid-command.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let tracker_addr = listener.local_addr().unwrap().to_string();
    let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut line = String::new();
        BufReader::new(read).read_line(&mut line).await.unwrap();
        let _ = seen_tx.send(line);
        tokio::time::sleep(Duration::from_millis(300)).await;
        write.write_all(b"{}\n").await.unwrap();
    });

    let (agent, output) = spawn_agent(&tracker_addr).await;
    agent.queue.push(Command::SubmitInfo).await;
    let request = tokio::time::timeout(Duration::from_secs(5), seen_rx)
        .await
        .expect("tracker receives submit_info")
        .unwrap();
    assert!(request.starts_with("submit_info:"));

    agent.shutdown().trigger();
    tokio::time::timeout(Duration::from_secs(5), agent.wait())
        .await
        .expect("agent stops after the running command")
        .unwrap();
    assert!(output.contains("Tracker update: 0 nodes online"));
}
