//! Bucket lifecycle integration tests.

#[cfg(test)]
mod tests {
    use crate::{spawn_server, test_bucket_name};

    #[tokio::test]
    async fn test_should_create_list_and_delete_bucket() {
        let server = spawn_server().await;
        let bucket = test_bucket_name("lifecycle");

        server.create_bucket(&bucket).await;

        let json: serde_json::Value = server
            .client
            .get(server.url("/buckets"))
            .send()
            .await
            .expect("list buckets")
            .json()
            .await
            .expect("list buckets JSON");
        let names: Vec<&str> = json["buckets"]
            .as_array()
            .expect("buckets array")
            .iter()
            .filter_map(|b| b["name"].as_str())
            .collect();
        assert_eq!(names, vec![bucket.as_str()]);

        let resp = server
            .client
            .delete(server.url(&format!("/buckets/{bucket}")))
            .send()
            .await
            .expect("delete bucket");
        assert_eq!(resp.status(), 204);

        let resp = server
            .client
            .get(server.url(&format!("/buckets/{bucket}/objects")))
            .send()
            .await
            .expect("list objects");
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_should_reject_duplicate_and_invalid_buckets() {
        let server = spawn_server().await;
        let bucket = test_bucket_name("dup");
        server.create_bucket(&bucket).await;

        let resp = server
            .client
            .put(server.url(&format!("/buckets/{bucket}")))
            .send()
            .await
            .expect("create duplicate");
        assert_eq!(resp.status(), 409);
        let json: serde_json::Value = resp.json().await.expect("error JSON");
        assert_eq!(json["error"], "BucketAlreadyExists");

        let resp = server
            .client
            .put(server.url("/buckets/Not_Valid"))
            .send()
            .await
            .expect("create invalid");
        assert_eq!(resp.status(), 400);
        let json: serde_json::Value = resp.json().await.expect("error JSON");
        assert_eq!(json["error"], "InvalidBucketName");
    }

    #[tokio::test]
    async fn test_should_refuse_to_delete_non_empty_bucket() {
        let server = spawn_server().await;
        let bucket = test_bucket_name("full");
        server.create_bucket(&bucket).await;
        server.put_object(&bucket, "keep.txt", b"keep").await;

        let resp = server
            .client
            .delete(server.url(&format!("/buckets/{bucket}")))
            .send()
            .await
            .expect("delete bucket");
        assert_eq!(resp.status(), 409);
        let json: serde_json::Value = resp.json().await.expect("error JSON");
        assert_eq!(json["error"], "BucketNotEmpty");
    }
}
