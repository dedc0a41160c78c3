//! Host integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;

    use crate::{ApiClient, cleanup_segment, create_host, create_segment};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_manage_hosts_of_segment() {
        let client = ApiClient::new();
        let segment = create_segment(&client, "hosts").await;
        let (host, name) = create_host(&client, &segment, "compute").await;
        let path = format!("/v1/segments/{segment}/hosts/{host}");

        let reply = client.get(&path).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["host"]["name"], name.as_str());
        assert_eq!(reply.body["host"]["failover_segment_id"], segment.as_str());

        let reply = client.put(&path, json!({"host": {"reserved": "true"}})).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["host"]["reserved"], true);

        let reply = client
            .get(&format!("/v1/segments/{segment}/hosts?reserved=1"))
            .await;
        assert_eq!(reply.body["hosts"].as_array().unwrap().len(), 1);

        let reply = client.delete(&path).await;
        assert_eq!(reply.status, StatusCode::NO_CONTENT);

        cleanup_segment(&client, &segment).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_segment_state_on_hosts_from_1_2() {
        let client = ApiClient::new().with_version("1.2");
        let segment = create_segment(&client, "state").await;
        let (host, _) = create_host(&client, &segment, "compute").await;

        let reply = client
            .get(&format!("/v1/segments/{segment}/hosts/{host}"))
            .await;
        assert_eq!(reply.body["host"]["failover_segment"]["enabled"], true);

        cleanup_segment(&client, &segment).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_host_in_unknown_segment() {
        let reply = ApiClient::new()
            .post(
                "/v1/segments/00000000-0000-0000-0000-000000000000/hosts",
                json!({"host": {"name": "h", "type": "COMPUTE", "control_attributes": "SSH"}}),
            )
            .await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
    }
}
