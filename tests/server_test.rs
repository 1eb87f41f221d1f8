//! Integration tests for the CosmicLink HTTP server

#[cfg(feature = "server")]
mod server_tests {
    use cosmiclink::config::Config;
    use cosmiclink::server::{run, ServerConfig};
    use serde_json::json;
    use std::net::SocketAddr;
    use std::time::Duration;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.detection.baseline_delay = Duration::from_millis(200);
        config.detection.check_interval = Duration::from_millis(50);
        // Keep the remote interpreter off regardless of the host environment.
        config.interpreter.api_key_env =
            format!("COSMICLINK_TEST_UNSET_{}", uuid::Uuid::new_v4().simple());
        config
    }

    async fn start() -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
        let (addr, shutdown_tx) = run(ServerConfig::new(0, test_config()))
            .await
            .expect("Failed to start server");
        tokio::time::sleep(Duration::from_millis(100)).await;
        (addr, shutdown_tx)
    }

    fn magnetometer(x: f64) -> serde_json::Value {
        json!({ "kind": "magnetometer", "x": x, "y": 0.0, "z": 0.0 })
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (addr, shutdown_tx) = start().await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());

        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["status"], "ok");
        assert!(body["version"].as_str().is_some());

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_scan_start_stop() {
        let (addr, shutdown_tx) = start().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("http://{}/scan/stop", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["code"], "NOT_SCANNING");

        let response = client
            .post(format!("http://{}/scan/start", addr))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());

        let response = client
            .post(format!("http://{}/scan/start", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);

        let status: serde_json::Value = client
            .get(format!("http://{}/status", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["scanning"], true);

        let response = client
            .post(format!("http://{}/scan/stop", addr))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["scanning"], false);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_readings_flag_em_anomaly_and_interpret() {
        let (addr, shutdown_tx) = start().await;
        let client = reqwest::Client::new();

        // Nothing is running yet, so the reading is dropped.
        let body: serde_json::Value = client
            .post(format!("http://{}/readings", addr))
            .json(&json!({ "readings": [magnetometer(30.0)] }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["ignored"], 1);

        client
            .post(format!("http://{}/scan/start", addr))
            .send()
            .await
            .unwrap();

        // Camera is disabled by default.
        let frame = json!({ "kind": "frame", "width": 1, "height": 1, "rgba": [0, 0, 0, 255] });
        let body: serde_json::Value = client
            .post(format!("http://{}/readings", addr))
            .json(&json!({ "readings": [magnetometer(30.0), frame] }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["accepted"], 1);
        assert_eq!(body["rejected"], 1);

        // Let the baseline settle on 30 μT, then jump well past the threshold.
        tokio::time::sleep(Duration::from_millis(400)).await;
        client
            .post(format!("http://{}/readings", addr))
            .json(&json!({ "readings": [magnetometer(50.0)] }))
            .send()
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        let anomalies: serde_json::Value = client
            .get(format!("http://{}/anomalies", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let list = anomalies.as_array().expect("anomaly list");
        assert_eq!(list.len(), 1, "{anomalies}");
        assert_eq!(list[0]["kind"], "EM");
        assert_eq!(list[0]["analyzed"], false);
        let signal_id = list[0]["signal_id"].as_str().unwrap().to_string();

        let response = client
            .post(format!("http://{}/anomalies/{}/interpret", addr, signal_id))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        let interpretation: serde_json::Value = response.json().await.unwrap();
        assert_eq!(interpretation["source"], "local");
        assert_eq!(interpretation["heading"], "SIGNAL ANALYSIS");

        let anomalies: serde_json::Value = client
            .get(format!("http://{}/anomalies", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(anomalies[0]["analyzed"], true);
        assert!(anomalies[0]["interpretation"]["text"].as_str().is_some());

        let signals: serde_json::Value = client
            .get(format!("http://{}/log?kind=signal", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let signals = signals.as_array().unwrap();
        assert_eq!(signals.len(), 1);
        assert!(signals[0]["message"]
            .as_str()
            .unwrap()
            .starts_with("Anomaly detected: EM signal deviation at"));

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_interpret_unknown_anomaly() {
        let (addr, shutdown_tx) = start().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("http://{}/anomalies/SIG-000099/interpret", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        let response = client
            .post(format!("http://{}/anomalies/nonsense/interpret", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_transmit_endpoint() {
        let (addr, shutdown_tx) = start().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("http://{}/transmit", addr))
            .json(&json!({ "message": "   " }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["code"], "EMPTY_MESSAGE");

        let response = client
            .post(format!("http://{}/transmit", addr))
            .json(&json!({ "message": "SOS", "encoding": "morse" }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["encoding"], "morse");
        assert_eq!(body["symbols"], "... --- ...");
        assert_eq!(body["tones"], 9);

        let log: serde_json::Value = client
            .get(format!("http://{}/log?kind=transmit", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(!log.as_array().unwrap().is_empty());

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_log_filter_and_clear() {
        let (addr, shutdown_tx) = start().await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!("http://{}/log?kind=bogus", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let system: serde_json::Value = client
            .get(format!("http://{}/log?kind=system", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(system.as_array().unwrap().len(), 2);

        let cleared: serde_json::Value = client
            .delete(format!("http://{}/log", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let cleared = cleared.as_array().unwrap();
        assert_eq!(cleared.len(), 1);
        assert_eq!(cleared[0]["message"], "Log cleared");

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let (addr, shutdown_tx) = start().await;

        let client = reqwest::Client::new();
        let response = client
            .request(reqwest::Method::OPTIONS, format!("http://{}/readings", addr))
            .header("Origin", "http://localhost")
            .header("Access-Control-Request-Method", "POST")
            .send()
            .await
            .expect("Failed to send request");

        assert!(
            response.status().is_success() || response.status() == reqwest::StatusCode::NO_CONTENT,
            "CORS preflight failed: {}",
            response.status()
        );

        let _ = shutdown_tx.send(());
    }
}
