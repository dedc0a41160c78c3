//! Segment integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;

    use crate::{ApiClient, cleanup_segment, create_segment};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_create_update_and_delete_segment() {
        let client = ApiClient::new();
        let segment = create_segment(&client, "crud").await;
        let path = format!("/v1/segments/{segment}");

        let reply = client
            .put(&path, json!({"segment": {"recovery_method": "reserved_host"}}))
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["segment"]["recovery_method"], "reserved_host");

        let reply = client.delete(&path).await;
        assert_eq!(reply.status, StatusCode::NO_CONTENT);

        let reply = client.get(&path).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_toggle_segment_from_1_2() {
        let client = ApiClient::new().with_version("1.2");
        let segment = create_segment(&client, "toggle").await;
        let action = format!("/v1/segments/{segment}/action");

        let reply = client.post(&action, json!({"disable": null})).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["segment"]["enabled"], false);

        let reply = ApiClient::new()
            .with_version("1.0")
            .post(&action, json!({"enable": null}))
            .await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);

        cleanup_segment(&client, &segment).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_invalid_segment_body() {
        let client = ApiClient::new();
        let reply = client
            .post("/v1/segments", json!({"segment": {"name": "x", "recovery_method": "auto"}}))
            .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            reply.body["badRequest"]["message"],
            "'service_type' is a required property"
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_forbid_non_admin() {
        let reply = ApiClient::new().with_roles("member").get("/v1/segments").await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN);
    }
}
