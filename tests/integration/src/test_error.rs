//! Routing, limits and common header integration tests.

#[cfg(test)]
mod tests {
    use bucketgate_http::service::GatewayHttpConfig;

    use crate::{spawn_server, spawn_server_with, test_bucket_name};

    #[tokio::test]
    async fn test_should_report_health_with_common_headers() {
        let server = spawn_server().await;

        let resp = server
            .client
            .get(server.url("/health"))
            .send()
            .await
            .expect("health");
        assert_eq!(resp.status(), 200);
        assert!(resp.headers().contains_key("x-request-id"));
        assert_eq!(
            resp.headers().get("server").and_then(|v| v.to_str().ok()),
            Some("bucketgate")
        );
        let json: serde_json::Value = resp.json().await.expect("health JSON");
        assert_eq!(json["status"], "running");
    }

    #[tokio::test]
    async fn test_should_return_json_errors_for_unknown_routes() {
        let server = spawn_server().await;

        let resp = server
            .client
            .get(server.url("/nowhere"))
            .send()
            .await
            .expect("unknown route");
        assert_eq!(resp.status(), 404);
        let request_id = resp
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        let json: serde_json::Value = resp.json().await.expect("error JSON");
        assert_eq!(json["error"], "NoSuchRoute");
        assert_eq!(json["requestId"].as_str(), request_id.as_deref());

        let resp = server
            .client
            .patch(server.url("/buckets"))
            .send()
            .await
            .expect("wrong method");
        assert_eq!(resp.status(), 405);
    }

    #[tokio::test]
    async fn test_should_reject_oversized_body() {
        let server = spawn_server_with(GatewayHttpConfig {
            max_body_bytes: 16,
            ..GatewayHttpConfig::default()
        })
        .await;
        let bucket = test_bucket_name("big");
        server.create_bucket(&bucket).await;

        let resp = server
            .client
            .put(server.url(&format!("/buckets/{bucket}/objects/big.bin")))
            .body(vec![0_u8; 1024])
            .send()
            .await
            .expect("oversized put");
        assert_eq!(resp.status(), 413);
        assert!(server.list_keys(&bucket).await.is_empty());
    }
}
