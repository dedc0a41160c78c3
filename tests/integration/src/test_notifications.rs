//! Notification integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::{Value, json};

    use crate::{ApiClient, cleanup_segment, create_host, create_segment};

    fn report(hostname: &str) -> Value {
        json!({"notification": {
            "type": "VM",
            "hostname": hostname,
            "generated_time": chrono::Utc::now().to_rfc3339(),
            "payload": {"event": "LIFECYCLE", "instance_uuid": uuid::Uuid::new_v4().to_string()}
        }})
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_accept_and_show_notification() {
        let client = ApiClient::new();
        let segment = create_segment(&client, "notify").await;
        let (_, hostname) = create_host(&client, &segment, "compute").await;

        let report = report(&hostname);
        let reply = client.post("/v1/notifications", report.clone()).await;
        assert_eq!(reply.status, StatusCode::ACCEPTED, "{}", reply.body);
        assert_eq!(reply.body["notification"]["status"], "new");
        let uuid = reply.body["notification"]["notification_uuid"]
            .as_str()
            .unwrap()
            .to_owned();

        let reply = client.post("/v1/notifications", report).await;
        assert_eq!(reply.status, StatusCode::CONFLICT);

        let reply = ApiClient::new()
            .with_version("1.1")
            .get(&format!("/v1/notifications/{uuid}"))
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body["notification"]["recovery_workflow_details"].is_array());

        cleanup_segment(&client, &segment).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_notification_for_unknown_host() {
        let reply = ApiClient::new()
            .post("/v1/notifications", report(&crate::unique_name("ghost")))
            .await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
    }
}
