/// End-to-end test: scrape a mock server and check the rendered Prometheus
/// exposition. Lives in its own binary because it installs the global
/// metrics recorder.
use httpmock::prelude::*;
use std::time::Duration;

use nextcloud_exporter::{client::InfoClient, collector::Collector, metrics, serverinfo};

const INFO_PATH: &str = "/ocs/v2.php/apps/serverinfo/api/v1/info";

fn collector_for(server: &MockServer) -> Collector {
    let client = InfoClient::new(
        serverinfo::info_url(&server.base_url(), false, false),
        "exporter".to_string(),
        "secret".to_string(),
        None,
        Duration::from_secs(5),
        "nextcloud-exporter/test",
        false,
    )
    .unwrap();
    Collector::new(client)
}

#[tokio::test]
async fn test_scrape_renders_gauges() {
    let handle = metrics::init_metrics();

    // First scrape: healthy server.
    let healthy = MockServer::start();
    healthy.mock(|when, then| {
        when.method(GET).path(INFO_PATH);
        then.status(200).json_body(serde_json::json!({
            "ocs": {
                "meta": {"status": "ok", "statuscode": 200, "message": "OK"},
                "data": {
                    "nextcloud": {
                        "system": {
                            "version": "29.0.1.1",
                            "freespace": 1073741824_i64,
                            "apps": {"num_installed": 41, "num_updates_available": 2}
                        },
                        "storage": {"num_users": 42, "num_files": 1024},
                        "shares": {
                            "num_shares_user": 7,
                            "num_shares_link": 5,
                            "num_shares_link_no_password": 4
                        }
                    },
                    "server": {
                        "php": {"version": "8.2.18", "memory_limit": 536870912_i64},
                        "database": {"type": "mysql", "version": "10.11.6", "size": 5428795}
                    },
                    "activeUsers": {"last5minutes": 3, "last1hour": 10, "last24hours": 21}
                }
            }
        }));
    });

    collector_for(&healthy).scrape().await;
    let rendered = handle.render();

    assert!(rendered.contains("nextcloud_up 1"), "{rendered}");
    assert!(rendered.contains("nextcloud_users_total 42"), "{rendered}");
    assert!(rendered.contains("nextcloud_files_total 1024"), "{rendered}");
    assert!(
        rendered.contains("nextcloud_free_space_bytes 1073741824"),
        "{rendered}"
    );
    assert!(
        rendered.contains("nextcloud_apps_installed_total 41"),
        "{rendered}"
    );
    assert!(
        rendered.contains("nextcloud_database_size_bytes 5428795"),
        "{rendered}"
    );
    assert!(
        rendered.contains("nextcloud_system_info{version=\"29.0.1.1\"} 1"),
        "{rendered}"
    );
    assert!(
        rendered.contains("nextcloud_shares_total{type=\"authlink\"} 1"),
        "{rendered}"
    );
    assert!(
        rendered.contains("nextcloud_active_users_daily_total 21"),
        "{rendered}"
    );

    // Second scrape: credentials rejected. The exporter reports down and
    // counts the auth error, then recovers on the next healthy scrape.
    let unauthorized = MockServer::start();
    unauthorized.mock(|when, then| {
        when.method(GET).path(INFO_PATH);
        then.status(401);
    });

    collector_for(&unauthorized).scrape().await;
    let rendered = handle.render();

    assert!(rendered.contains("nextcloud_up 0"), "{rendered}");
    assert!(
        rendered.contains("nextcloud_scrape_errors_total{cause=\"auth\"} 1"),
        "{rendered}"
    );

    collector_for(&healthy).scrape().await;
    let rendered = handle.render();
    assert!(rendered.contains("nextcloud_up 1"), "{rendered}");
}
