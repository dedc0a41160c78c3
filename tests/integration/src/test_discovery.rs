//! Health, version and extension discovery integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use crate::{ApiClient, VERSION_HEADER};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_healthy() {
        let reply = ApiClient::new().get("/health").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["status"], "running");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_list_versions_without_version_header() {
        let reply = ApiClient::new().with_version("1.1").get("/").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.headers.get(VERSION_HEADER).is_none());
        assert_eq!(reply.body["versions"][0]["id"], "v1.0");
        assert_eq!(reply.body["versions"][0]["status"], "CURRENT");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_negotiate_latest_version() {
        let reply = ApiClient::new().with_version("latest").get("/v1/segments").await;
        assert_eq!(reply.status, StatusCode::OK);
        let stamped = reply.headers[VERSION_HEADER].to_str().unwrap();
        assert!(stamped.starts_with("instance-ha "));

        let reply = ApiClient::new().with_version("9.0").get("/v1/segments").await;
        assert_eq!(reply.status, StatusCode::NOT_ACCEPTABLE);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_list_extensions() {
        let reply = ApiClient::new().get("/v1/extensions").await;
        assert_eq!(reply.status, StatusCode::OK);
        let aliases: Vec<_> = reply.body["extensions"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["alias"].as_str())
            .collect();
        assert!(aliases.contains(&"segments"));

        let reply = ApiClient::new().get("/v1/extensions/no-such-extension").await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert!(reply.body["itemNotFound"]["message"].is_string());
    }
}
