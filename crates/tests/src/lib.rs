//! # Integration Tests
//!
//! End-to-end tests over the public API.
//!
//! Covers:
//! - delivery scenarios with in-memory collaborators
//! - the full stack over local sockets (UDP series, RESP queue)
//! - config file -> client -> both sinks

#[cfg(test)]
mod scenario_tests {
    use chrono::Utc;
    use contracts::{ClientConfig, Event, FieldValue, RESERVED_FIELDS};
    use events_client::mock::{RecordingQueue, RecordingTimeSeries};
    use events_client::EventsClient;
    use serde_json::Value;

    type TestClient = EventsClient<RecordingTimeSeries, RecordingQueue>;

    fn client(config: ClientConfig) -> TestClient {
        EventsClient::new(config, RecordingTimeSeries::new(), RecordingQueue::new()).unwrap()
    }

    fn records(client: &TestClient) -> Vec<Value> {
        client
            .queue()
            .appends()
            .into_iter()
            .flat_map(|(_, records)| records)
            .map(|r| serde_json::from_str(&r).unwrap())
            .collect()
    }

    /// host_name="h1", environment="prod", send("login", {"user": "a"})
    #[tokio::test]
    async fn test_login_scenario() {
        let client = client(ClientConfig::new("h1", "prod"));
        let before_ms = Utc::now().timestamp_millis();
        client.send("login", Event::new().with("user", "a")).await;
        let after_ms = Utc::now().timestamp_millis();

        let writes = client.time_series().writes();
        assert_eq!(writes.len(), 1);
        let series = &writes[0];
        assert_eq!(series.name, "login");
        assert_eq!(series.columns, vec!["user", "environment", "host", "time"]);
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0][0], FieldValue::from("a"));
        assert_eq!(series.points[0][1], FieldValue::from("prod"));
        assert_eq!(series.points[0][2], FieldValue::from("h1"));
        assert!(
            matches!(series.points[0][3], FieldValue::Integer(ms) if (before_ms..=after_ms).contains(&ms)),
            "time {:?} outside [{before_ms}, {after_ms}]",
            series.points[0][3]
        );

        let appends = client.queue().appends();
        assert_eq!(appends.len(), 1);
        assert_eq!(appends[0].0, "logstash");

        let record = &records(&client)[0];
        assert_eq!(record["user"], "a");
        assert_eq!(record["environment"], "prod");
        assert_eq!(record["host"], "h1");
        assert_eq!(record["eventName"], "login");
        let ts = record["@timestamp"].as_str().unwrap();
        assert_eq!(ts.len(), "2024-01-01T00:00:00.000Z".len());
        assert!(ts.ends_with('Z'));
    }

    /// send("login", [{"user":"a"},{"user":"b","extra":1}])
    #[tokio::test]
    async fn test_mismatched_batch_scenario() {
        let client = client(ClientConfig::new("h1", "prod"));
        client
            .send(
                "login",
                vec![
                    Event::new().with("user", "a"),
                    Event::new().with("user", "b").with("extra", 1),
                ],
            )
            .await;

        assert!(client.time_series().writes().is_empty());
        let records = records(&client);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["user"], "a");
        assert_eq!(records[1]["user"], "b");
        assert_eq!(records[1]["extra"], 1);
    }

    #[tokio::test]
    async fn test_both_sinks_see_identical_enrichment() {
        let config = ClientConfig::new("h1", "prod")
            .with_namespace("billing_")
            .with_static_fields(Event::new().with("service", "api").with("user", "static"))
            .with_event_name_format("app.{}");
        let client = client(config);

        client
            .send(
                "charge",
                vec![
                    Event::new().with("user", "a").with("amount", 12.5),
                    Event::new().with("billing_user", "b").with("amount", 3.0),
                ],
            )
            .await;

        let series = &client.time_series().writes()[0];
        assert_eq!(series.name, "app.charge");
        let mut series_keys: Vec<&str> = series
            .columns
            .iter()
            .map(String::as_str)
            .filter(|c| *c != "time")
            .collect();

        for record in records(&client) {
            assert_eq!(record["eventName"], "app.charge");
            let object = record.as_object().unwrap();
            let mut record_keys: Vec<&str> = object
                .keys()
                .map(String::as_str)
                .filter(|k| *k != "@timestamp" && *k != "eventName")
                .collect();
            record_keys.sort_unstable();
            series_keys.sort_unstable();
            assert_eq!(record_keys, series_keys);

            for key in record_keys {
                assert!(RESERVED_FIELDS.contains(&key) || key.starts_with("billing_"));
            }
            assert_ne!(record["billing_user"], "static");
        }
    }

    #[tokio::test]
    async fn test_caller_environment_is_overridden_everywhere() {
        let client = client(ClientConfig::new("h1", "prod"));
        client
            .send(
                "login",
                Event::new().with("environment", "dev").with("host", "laptop"),
            )
            .await;

        let series = &client.time_series().writes()[0];
        assert_eq!(series.column("environment").unwrap(), vec![&FieldValue::from("prod")]);
        assert_eq!(series.column("host").unwrap(), vec![&FieldValue::from("h1")]);

        let record = &records(&client)[0];
        assert_eq!(record["environment"], "prod");
        assert_eq!(record["host"], "h1");
    }

    #[tokio::test]
    async fn test_repeated_sends_accumulate_metrics() {
        let client = client(ClientConfig::new("h1", "prod"));
        for user in ["a", "b", "c"] {
            client.send("login", Event::new().with("user", user)).await;
        }

        for (_, snapshot) in client.metrics() {
            assert_eq!(snapshot.delivered_count, 3);
            assert_eq!(snapshot.event_count, 3);
            assert_eq!(snapshot.failure_count, 0);
        }
    }
}

#[cfg(test)]
mod socket_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use events_client::{DefaultEventsClient, Event, SeriesBatch};
    use serde_json::Value;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, UdpSocket};
    use tokio::task::JoinHandle;

    /// Minimal Redis stand-in: reads one command, answers with its arg count
    async fn fake_redis() -> (u16, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);

            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            let argc: usize = line.trim_end().trim_start_matches('*').parse().unwrap();

            let mut args = Vec::with_capacity(argc);
            for _ in 0..argc {
                line.clear();
                reader.read_line(&mut line).await.unwrap();
                let len: usize = line.trim_end().trim_start_matches('$').parse().unwrap();
                let mut data = vec![0u8; len + 2];
                reader.read_exact(&mut data).await.unwrap();
                data.truncate(len);
                args.push(String::from_utf8(data).unwrap());
            }

            let reply = format!(":{}\r\n", argc.saturating_sub(2));
            reader.get_mut().write_all(reply.as_bytes()).await.unwrap();
            args
        });
        (port, handle)
    }

    fn config_toml(udp_port: u16, redis_port: u16) -> String {
        format!(
            r#"
host_name = "web-1"
environment = "prod"
namespace = "app_"

[static_fields]
service = "billing"

[time_series]
host = "127.0.0.1"
transport = {{ mode = "udp", port = {udp_port} }}

[queue]
host = "127.0.0.1"
port = {redis_port}
key = "events"
timeout_ms = 1000
"#
        )
    }

    #[tokio::test]
    async fn test_full_stack_over_sockets() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let udp_port = receiver.local_addr().unwrap().port();
        let (redis_port, redis) = fake_redis().await;

        let config =
            ConfigLoader::load_from_str(&config_toml(udp_port, redis_port), ConfigFormat::Toml)
                .unwrap();
        let client = DefaultEventsClient::connect(config).await.unwrap();

        client
            .send(
                "login",
                vec![Event::new().with("user", "a"), Event::new().with("user", "b")],
            )
            .await;

        let mut buf = vec![0u8; 4096];
        let len = tokio::time::timeout(Duration::from_secs(2), receiver.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let series: Vec<SeriesBatch> = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].name, "login");
        assert_eq!(
            series[0].columns,
            vec!["app_user", "app_service", "environment", "host", "time"]
        );
        assert_eq!(series[0].points.len(), 2);

        let args = tokio::time::timeout(Duration::from_secs(2), redis)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(args[0], "RPUSH");
        assert_eq!(args[1], "events");
        assert_eq!(args.len(), 4);
        let first: Value = serde_json::from_str(&args[2]).unwrap();
        assert_eq!(first["app_user"], "a");
        assert_eq!(first["eventName"], "login");

        for (_, snapshot) in client.metrics() {
            assert_eq!(snapshot.delivered_count, 1);
            assert_eq!(snapshot.event_count, 2);
        }
    }

    #[tokio::test]
    async fn test_queue_down_does_not_block_series() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let udp_port = receiver.local_addr().unwrap().port();

        let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let redis_port = closed.local_addr().unwrap().port();
        drop(closed);

        let config =
            ConfigLoader::load_from_str(&config_toml(udp_port, redis_port), ConfigFormat::Toml)
                .unwrap();
        let client = DefaultEventsClient::connect(config).await.unwrap();

        client.send("login", Event::new().with("user", "a")).await;

        let mut buf = vec![0u8; 4096];
        let len = tokio::time::timeout(Duration::from_secs(2), receiver.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert!(len > 0);

        let queue = client
            .metrics()
            .into_iter()
            .find(|(name, _)| *name == "queue")
            .map(|(_, s)| s)
            .unwrap();
        assert_eq!(queue.failure_count, 1);
        assert_eq!(queue.delivered_count, 0);
    }

    #[tokio::test]
    async fn test_malformed_queue_reply_is_contained() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let udp_port = receiver.local_addr().unwrap().port();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let redis_port = listener.local_addr().unwrap().port();
        let redis = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(b"$9223372036854775000\r\n")
                .await
                .unwrap();
        });

        let config =
            ConfigLoader::load_from_str(&config_toml(udp_port, redis_port), ConfigFormat::Toml)
                .unwrap();
        let client = DefaultEventsClient::connect(config).await.unwrap();

        tokio::time::timeout(
            Duration::from_secs(2),
            client.send("login", Event::new().with("user", "a")),
        )
        .await
        .unwrap();
        redis.await.unwrap();

        let queue = client
            .metrics()
            .into_iter()
            .find(|(name, _)| *name == "queue")
            .map(|(_, s)| s)
            .unwrap();
        assert_eq!(queue.failure_count, 1);
        assert_eq!(queue.delivered_count, 0);
    }
}
