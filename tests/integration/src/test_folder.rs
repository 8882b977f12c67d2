//! Folder upload and download integration tests.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{spawn_server, test_bucket_name};

    #[tokio::test]
    async fn test_should_upload_folder_and_download_it_back() {
        let server = spawn_server().await;
        let bucket = test_bucket_name("folder");
        server.create_bucket(&bucket).await;

        let source = tempfile::tempdir().expect("source dir");
        std::fs::write(source.path().join("b.csv"), "1,2").expect("write b");
        std::fs::write(source.path().join("a.csv"), "3,4").expect("write a");
        std::fs::create_dir(source.path().join("nested")).expect("nested dir");

        let resp = server
            .client
            .post(server.url(&format!("/buckets/{bucket}/folder-uploads")))
            .json(&json!({ "path": source.path(), "prefix": "reports" }))
            .send()
            .await
            .expect("folder upload");
        assert_eq!(resp.status(), 201);
        let report: serde_json::Value = resp.json().await.expect("report JSON");
        assert_eq!(report["total"], 2);
        assert_eq!(report["outcomes"][0]["key"], "reports/a.csv");
        assert_eq!(report["outcomes"][1]["key"], "reports/b.csv");

        let dest = tempfile::tempdir().expect("dest dir");
        let resp = server
            .client
            .post(server.url(&format!("/buckets/{bucket}/folder-downloads")))
            .json(&json!({ "path": dest.path(), "prefix": "reports/" }))
            .send()
            .await
            .expect("folder download");
        assert_eq!(resp.status(), 200);
        let report: serde_json::Value = resp.json().await.expect("report JSON");
        assert_eq!(report["succeeded"], 2);

        let content = std::fs::read_to_string(dest.path().join("reports").join("a.csv"))
            .expect("downloaded file");
        assert_eq!(content, "3,4");
    }

    #[tokio::test]
    async fn test_should_reject_missing_folder() {
        let server = spawn_server().await;
        let bucket = test_bucket_name("nofolder");
        server.create_bucket(&bucket).await;

        let resp = server
            .client
            .post(server.url(&format!("/buckets/{bucket}/folder-uploads")))
            .json(&json!({ "path": "/definitely/not/here" }))
            .send()
            .await
            .expect("folder upload");
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn test_should_reject_download_of_empty_prefix() {
        let server = spawn_server().await;
        let bucket = test_bucket_name("nodl");
        server.create_bucket(&bucket).await;
        let dest = tempfile::tempdir().expect("dest dir");

        let resp = server
            .client
            .post(server.url(&format!("/buckets/{bucket}/folder-downloads")))
            .json(&json!({ "path": dest.path(), "prefix": "missing/" }))
            .send()
            .await
            .expect("folder download");
        assert_eq!(resp.status(), 400);
        let json: serde_json::Value = resp.json().await.expect("error JSON");
        assert_eq!(json["error"], "BadRequest");
    }
}
