use std::time::Duration;
use tokio::net::TcpListener;
use verdant_server::config::Config;
use verdant_server::{AgentServer, ServerError};
use verdant_voice::PipelineConfig;

#[test]
fn unusable_pipeline_fails_at_init() {
    let config = Config {
        pipeline: PipelineConfig {
            stt: Some("not a reference".to_string()),
            ..PipelineConfig::default()
        },
        ..Config::default()
    };

    assert!(matches!(AgentServer::new(config), Err(ServerError::Voice(_))));
}

#[tokio::test]
async fn dispatch_requires_registered_handler() {
    let server = AgentServer::new(Config::default()).unwrap();
    assert!(!server.dispatcher().dispatch("room-a"));
    assert_eq!(server.dispatcher().in_flight(), 0);
}

#[tokio::test]
async fn registered_handler_spawns_one_bootstrap_per_room() {
    // Unreachable LiveKit: the spawned bootstrap fails at connect and exits.
    let mut config = Config::default();
    config.livekit.url = "http://127.0.0.1:9".to_string();
    let mut server = AgentServer::new(config).unwrap();
    let runner = server.session_runner_from_config();
    server.register_session_handler(runner);

    let dispatcher = server.dispatcher();
    assert!(dispatcher.dispatch("room-b"));
    assert_eq!(dispatcher.in_flight(), 1);
}

#[tokio::test]
async fn run_stops_on_shutdown_signal() {
    let server = AgentServer::new(Config::default()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(server.run(listener, async move {
        let _ = rx.await;
    }));

    tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server should stop")
        .expect("task should not panic");
    assert!(result.is_ok());
}
