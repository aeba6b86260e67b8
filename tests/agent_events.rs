use std::sync::Arc;
use std::time::Duration;

use nodetrack::agent::{command_channel, Command, FileOutputSink, MemoryOutputSink, NodeAgent, OutputSink, SessionTable};
use nodetrack::events::{dispatcher, model::LogEvent, sink::MemorySink};
use nodetrack::network::message::NodeAddress;
use nodetrack::network::LoopbackNetwork;
use nodetrack::shutdown::Shutdown;

// One test per binary: the global dispatcher is bound to the runtime that
// initialised it.
#[tokio::test]
async fn agent_failures_are_emitted_as_events() {
    let mem = Arc::new(MemorySink::new());
    dispatcher::init_events(vec![mem.clone()], 64).await;

    // Output file whose parent is a regular file cannot be created.
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();
    let sink = FileOutputSink::new(blocker.join("node.out"));
    sink.write_line("lost").await;

    // Commands still queued when the loop stops.
    let net = LoopbackNetwork::new();
    let output = MemoryOutputSink::new();
    let agent = NodeAgent::new(
        NodeAddress::new("127.0.0.1", 9501),
        "127.0.0.1:7999",
        SessionTable::new(4),
        Arc::new(net.transport("127.0.0.1:45501".parse().unwrap())),
        Arc::new(output.clone()),
    );
    let (queue, source) = command_channel(4);
    queue.push(Command::GetList).await;
    let shutdown = Shutdown::new();
    shutdown.trigger();
    agent.run_commands(source, Duration::from_millis(5), shutdown).await;

    tokio::time::sleep(Duration::from_millis(50)).await;

    let events = mem.events();
    assert!(events.iter().any(|e| matches!(
        e,
        LogEvent::System(s) if s.action == "output_write_failed"
            && s.detail.as_deref().is_some_and(|d| d.contains("node.out"))
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        LogEvent::Command(c) if c.command == "get_list" && c.outcome == "dropped"
    )));
    assert_eq!(output.lines(), vec!["Dropped get_list: agent shutting down".to_string()]);
}
