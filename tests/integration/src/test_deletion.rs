//! Bulk deletion integration tests.

#[cfg(test)]
mod tests {
    use crate::{spawn_server, test_bucket_name};

    #[tokio::test]
    async fn test_should_delete_by_extension_case_insensitively() {
        let server = spawn_server().await;
        let bucket = test_bucket_name("ext");
        server.create_bucket(&bucket).await;
        for key in ["a.log", "b.LOG", "c.txt", "logs/d.log"] {
            server.put_object(&bucket, key, b"x").await;
        }

        let resp = server
            .client
            .delete(server.url(&format!("/buckets/{bucket}/objects?extension=.log")))
            .send()
            .await
            .expect("delete by extension");
        assert_eq!(resp.status(), 204);
        assert_eq!(server.list_keys(&bucket).await, vec!["c.txt".to_owned()]);

        let resp = server
            .client
            .delete(server.url(&format!("/buckets/{bucket}/objects?extension=.log")))
            .send()
            .await
            .expect("repeat delete");
        assert_eq!(resp.status(), 400);
        let json: serde_json::Value = resp.json().await.expect("error JSON");
        assert_eq!(json["error"], "NothingToDelete");
    }

    #[tokio::test]
    async fn test_should_delete_all_under_prefix() {
        let server = spawn_server().await;
        let bucket = test_bucket_name("all");
        server.create_bucket(&bucket).await;
        for key in ["tmp/1.bin", "tmp/2.bin", "tmp/3.bin", "keep.bin"] {
            server.put_object(&bucket, key, b"x").await;
        }

        let resp = server
            .client
            .delete(server.url(&format!("/buckets/{bucket}/objects?all=true&prefix=tmp/")))
            .send()
            .await
            .expect("delete all");
        assert_eq!(resp.status(), 204);
        assert_eq!(server.list_keys(&bucket).await, vec!["keep.bin".to_owned()]);
    }

    #[tokio::test]
    async fn test_should_require_a_selector() {
        let server = spawn_server().await;
        let bucket = test_bucket_name("noop");
        server.create_bucket(&bucket).await;
        server.put_object(&bucket, "a.txt", b"x").await;

        let resp = server
            .client
            .delete(server.url(&format!("/buckets/{bucket}/objects")))
            .send()
            .await
            .expect("delete without selector");
        assert_eq!(resp.status(), 400);
        assert_eq!(server.list_keys(&bucket).await, vec!["a.txt".to_owned()]);
    }
}
