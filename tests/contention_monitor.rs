use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;
use lockwatch::MonitorConfig;
use lockwatch::cli::replay;
use lockwatch::monitor::{ContentionMonitor, EventOutcome, SamplingController};
use lockwatch::replay::{
    FrameFailure, FrameSpec, ObjectRef, ObjectSpec, Scenario, ScriptedHost, ThreadRef, ThreadSpec,
};
use lockwatch::sink::ChannelSink;
use serde_json::Value;

fn frames(n: usize) -> Vec<FrameSpec> {
    (0..n)
        .map(|i| FrameSpec::new(format!("Lcom/example/Frame{i};"), format!("call{i}"), "()V"))
        .collect()
}

fn build(scenario: Scenario) -> (ContentionMonitor<ScriptedHost, ChannelSink>, Receiver<String>) {
    let (sink, receiver) = ChannelSink::unbounded();
    let host = ScriptedHost::new(scenario).expect("valid scenario");
    (ContentionMonitor::new(host, sink, SamplingController::new()), receiver)
}

fn payloads(receiver: &Receiver<String>) -> Vec<Value> {
    receiver
        .try_iter()
        .map(|p| serde_json::from_str(&p).expect("payload is JSON"))
        .collect()
}

fn stack_len(record: &Value) -> usize {
    record["stackTrace"].as_array().map_or(0, Vec::len)
}

#[test]
fn three_contentions_on_one_type() {
    let scenario = Scenario::default()
        .with_object(ObjectSpec::new("com.example.Foo"))
        .with_thread(ThreadSpec::new("main").with_os_thread_id(31337));
    let (monitor, receiver) = build(scenario);

    for _ in 0..3 {
        monitor.on_contended_entered(&ThreadRef(0), &ObjectRef(0));
    }

    let records = payloads(&receiver);
    let counts: Vec<_> = records
        .iter()
        .map(|r| r["numTypeContentions"].as_u64().unwrap())
        .collect();
    assert_eq!(counts, vec![1, 2, 3]);
    assert!(records.iter().all(|r| r["Class"] == "com.example.Foo"));
    assert!(records.iter().all(|r| r["threadID"] == 31337));
}

#[test]
fn failure_on_second_frame_keeps_first() {
    let mut spec = frames(5);
    spec[1].fail = Some(FrameFailure::ClassSignature);
    let scenario = Scenario::default()
        .with_object(ObjectSpec::new("com.example.Foo"))
        .with_thread(ThreadSpec::new("main").with_frames(spec));
    let (monitor, receiver) = build(scenario);
    monitor.sampling().set_stack_trace_depth(2);

    monitor.on_contended_entered(&ThreadRef(0), &ObjectRef(0));

    let record = &payloads(&receiver)[0];
    let stack = record["stackTrace"].as_array().unwrap();
    assert_eq!(stack.len(), 1);
    assert_eq!(stack[0]["class"], "Lcom/example/Frame0;");
    assert_eq!(stack[0]["method"], "call0");
    assert_eq!(monitor.metrics().stacks_captured, 1);
    assert_eq!(monitor.host().outstanding_buffers(), 0);
}

#[test]
fn concurrent_threads_share_the_tally() {
    const THREADS: usize = 8;
    const EVENTS: usize = 500;

    let mut scenario = Scenario::default()
        .with_object(ObjectSpec::new("java.util.HashMap"))
        .with_object(ObjectSpec::new("java.lang.Object"));
    for i in 0..THREADS {
        scenario = scenario.with_thread(
            ThreadSpec::new(format!("worker-{i}"))
                .with_os_thread_id(1000 + i as i64)
                .with_frames(frames(3)),
        );
    }
    let (monitor, receiver) = build(scenario);
    monitor.sampling().set_stack_trace_depth(3);
    let monitor = Arc::new(monitor);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let monitor = Arc::clone(&monitor);
            thread::spawn(move || {
                for i in 0..EVENTS {
                    let outcome = monitor.on_contended_entered(&ThreadRef(t), &ObjectRef(i % 2));
                    assert!(matches!(outcome, EventOutcome::Emitted { .. }));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let per_type = (THREADS * EVENTS / 2) as u64;
    assert_eq!(monitor.tally().get("java.util.HashMap"), per_type);
    assert_eq!(monitor.tally().get("java.lang.Object"), per_type);

    let records = payloads(&receiver);
    assert_eq!(records.len(), THREADS * EVENTS);
    let mut hashmap_counts: Vec<u64> = records
        .iter()
        .filter(|r| r["Class"] == "java.util.HashMap")
        .map(|r| r["numTypeContentions"].as_u64().unwrap())
        .collect();
    hashmap_counts.sort_unstable();
    assert_eq!(hashmap_counts, (1..=per_type).collect::<Vec<_>>());
    assert!(records.iter().all(|r| stack_len(r) == 3));
    assert_eq!(monitor.host().outstanding_buffers(), 0);
}

#[test]
fn replay_applies_config_and_sampling() {
    let mut scenario = Scenario::default()
        .with_object(ObjectSpec::new("a.Lock"))
        .with_thread(ThreadSpec::new("t0").with_frames(frames(4)))
        .with_thread(ThreadSpec::new("t1").with_frames(frames(4)));
    for i in 0..40 {
        scenario = scenario.with_event(i % 2, 0);
    }
    let (monitor, receiver) = build(scenario);
    MonitorConfig::parse_options("monitorSampleRate=4,monitorStackTraceDepth=200")
        .unwrap()
        .apply(monitor.sampling());

    replay(&monitor, 4).unwrap();

    let records = payloads(&receiver);
    assert_eq!(records.len(), 10);
    assert_eq!(monitor.tally().get("a.Lock"), 10);
    assert!(records.iter().all(|r| stack_len(r) == 4));

    let metrics = monitor.metrics();
    assert_eq!(metrics.events_seen, 40);
    assert_eq!(metrics.events_sampled, 10);
}

#[test]
fn disabled_by_options_emits_nothing() {
    let scenario = Scenario::default()
        .with_object(ObjectSpec::new("a.Lock"))
        .with_thread(ThreadSpec::new("t0"))
        .with_event(0, 0)
        .with_event(0, 0);
    let (monitor, receiver) = build(scenario);
    MonitorConfig::parse_options("monitorSampleRate=-5")
        .unwrap()
        .apply(monitor.sampling());

    replay(&monitor, 1).unwrap();

    assert!(payloads(&receiver).is_empty());
    assert!(monitor.tally().is_empty());
    assert_eq!(monitor.host().calls(), 0);
}
