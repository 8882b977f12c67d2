//! Object upload, listing and presigned access integration tests.

#[cfg(test)]
mod tests {
    use reqwest::multipart::{Form, Part};

    use crate::{spawn_server, test_bucket_name};

    fn file(name: &str, body: &'static [u8], mime: &str) -> Part {
        Part::bytes(body)
            .file_name(name.to_owned())
            .mime_str(mime)
            .expect("valid mime")
    }

    #[tokio::test]
    async fn test_should_bulk_upload_and_list_with_presigned_urls() {
        let server = spawn_server().await;
        let bucket = test_bucket_name("bulk");
        server.create_bucket(&bucket).await;

        let form = Form::new()
            .part("files", file("a.png", b"png-a", "image/png"))
            .part("files", file("b.png", b"png-b", "image/png"))
            .part("files", file("notes.txt", b"hello", "text/plain"))
            .text("comment", "ignored");
        let resp = server
            .client
            .post(server.url(&format!("/buckets/{bucket}/objects?prefix=2024/trip")))
            .multipart(form)
            .send()
            .await
            .expect("bulk upload");
        assert_eq!(resp.status(), 201);
        let report: serde_json::Value = resp.json().await.expect("report JSON");
        assert_eq!(report["total"], 3);
        assert_eq!(report["succeeded"], 3);
        assert_eq!(report["outcomes"][0]["key"], "2024/trip/a.png");
        assert_eq!(report["outcomes"][2]["key"], "2024/trip/notes.txt");

        // The store pages by two, so this listing spans two pages.
        let listing: serde_json::Value = server
            .client
            .get(server.url(&format!("/buckets/{bucket}/objects?prefix=2024/")))
            .send()
            .await
            .expect("list objects")
            .json()
            .await
            .expect("listing JSON");
        assert_eq!(listing["count"], 3);
        let objects = listing["objects"].as_array().expect("objects array");
        let first = &objects[0];
        assert_eq!(first["key"], "2024/trip/a.png");
        assert!(first["expiresAt"].is_string());

        let url = first["url"].as_str().expect("presigned url");
        assert!(url.contains("X-Amz-Signature="));
        let resp = server.client.get(url).send().await.expect("presigned get");
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("image/png")
        );
        assert_eq!(resp.bytes().await.expect("body").as_ref(), b"png-a");
    }

    #[tokio::test]
    async fn test_should_reject_tampered_presigned_url() {
        let server = spawn_server().await;
        let bucket = test_bucket_name("tamper");
        server.create_bucket(&bucket).await;
        server.put_object(&bucket, "secret.txt", b"classified").await;

        let listing: serde_json::Value = server
            .client
            .get(server.url(&format!("/buckets/{bucket}/objects")))
            .send()
            .await
            .expect("list objects")
            .json()
            .await
            .expect("listing JSON");
        let url = listing["objects"][0]["url"].as_str().expect("url");
        let tampered = url.replace("secret.txt", "other.txt");

        let resp = server.client.get(tampered).send().await.expect("get");
        assert_eq!(resp.status(), 403);
        let json: serde_json::Value = resp.json().await.expect("error JSON");
        assert_eq!(json["error"], "AccessDenied");
    }

    #[tokio::test]
    async fn test_should_round_trip_single_object() {
        let server = spawn_server().await;
        let bucket = test_bucket_name("single");
        server.create_bucket(&bucket).await;

        let resp = server
            .client
            .put(server.url(&format!("/buckets/{bucket}/objects/docs/readme.txt")))
            .body("read me")
            .send()
            .await
            .expect("put object");
        assert_eq!(resp.status(), 201);
        let json: serde_json::Value = resp.json().await.expect("created JSON");
        assert_eq!(json["key"], "docs/readme.txt");

        let resp = server
            .client
            .get(server.url(&format!("/buckets/{bucket}/objects/docs/readme.txt")))
            .send()
            .await
            .expect("get object");
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.expect("body"), "read me");

        let resp = server
            .client
            .delete(server.url(&format!("/buckets/{bucket}/objects/docs/readme.txt")))
            .send()
            .await
            .expect("delete object");
        assert_eq!(resp.status(), 204);

        let resp = server
            .client
            .get(server.url(&format!("/buckets/{bucket}/objects/docs/readme.txt")))
            .send()
            .await
            .expect("get deleted object");
        assert_eq!(resp.status(), 404);
        let json: serde_json::Value = resp.json().await.expect("error JSON");
        assert_eq!(json["error"], "NoSuchKey");
    }

    #[tokio::test]
    async fn test_should_reject_upload_without_files() {
        let server = spawn_server().await;
        let bucket = test_bucket_name("empty");
        server.create_bucket(&bucket).await;

        let form = Form::new().text("comment", "no files here");
        let resp = server
            .client
            .post(server.url(&format!("/buckets/{bucket}/objects")))
            .multipart(form)
            .send()
            .await
            .expect("bulk upload");
        assert_eq!(resp.status(), 400);
        assert!(server.list_keys(&bucket).await.is_empty());
    }
}
