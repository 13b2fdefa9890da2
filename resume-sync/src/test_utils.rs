//! Test helpers: a configuration pointing every platform at one wiremock server.

use axum_test::TestServer;
use std::time::Duration;
use wiremock::MockServer;

use crate::config::Config;

pub const TEST_API_KEY: &str = "test-api-key";

pub fn create_test_config(mock_server: &MockServer) -> Config {
    let mut config = Config {
        api_key: Some(TEST_API_KEY.to_string()),
        ..Default::default()
    };

    config.hubspot.api_base_url = mock_server.uri().parse().expect("mock server uri");
    config.hubspot.access_token = Some("pat-test".to_string());

    config.bullhorn.auth_url = mock_server.uri().parse().expect("mock server uri");
    config.bullhorn.rest_base_url = mock_server.uri().parse().expect("mock server uri");
    config.bullhorn.client_id = Some("client".to_string());
    config.bullhorn.client_secret = Some("secret".to_string());
    config.bullhorn.refresh_token = Some("refresh".to_string());
    config.bullhorn.redirect_hop_delay = Duration::from_millis(1);

    config
}

pub fn create_test_app(config: Config) -> TestServer {
    crate::Application::new(config)
        .expect("Failed to create application")
        .into_test_server()
}
