use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return its render handle.
///
/// The handle is passed explicitly to the scrape handler as axum state; the
/// recorder itself is the only process-wide piece the metrics facade needs.
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();

    let handle = builder
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    init_metric_descriptions();

    handle
}

fn init_metric_descriptions() {
    describe_gauge!(
        "nextcloud_up",
        "Indicates if the metrics could be scraped by the exporter."
    );
    describe_counter!(
        "nextcloud_scrape_errors_total",
        "Counts the number of scrape errors by this collector."
    );
    describe_gauge!(
        "nextcloud_exporter_info",
        "Information about the nextcloud-exporter."
    );
    describe_gauge!(
        "nextcloud_system_info",
        "Contains meta information about Nextcloud as labels. Value is always 1."
    );
    describe_gauge!(
        "nextcloud_apps_installed_total",
        "Number of currently installed apps."
    );
    describe_gauge!(
        "nextcloud_apps_updates_available_total",
        "Number of apps that have available updates."
    );
    describe_gauge!("nextcloud_users_total", "Number of users of the instance.");
    describe_gauge!(
        "nextcloud_files_total",
        "Number of files served by the instance."
    );
    describe_gauge!(
        "nextcloud_storages_total",
        "Number of storages of the instance."
    );
    describe_gauge!(
        "nextcloud_storages_local_total",
        "Number of local storages of the instance."
    );
    describe_gauge!(
        "nextcloud_storages_home_total",
        "Number of home storages of the instance."
    );
    describe_gauge!(
        "nextcloud_storages_other_total",
        "Number of other storages of the instance."
    );
    describe_gauge!(
        "nextcloud_free_space_bytes",
        "Free disk space in data directory in bytes."
    );
    describe_gauge!("nextcloud_shares_total", "Number of shares by type.");
    describe_gauge!(
        "nextcloud_shares_federated_total",
        "Number of federated shares by direction."
    );
    describe_gauge!(
        "nextcloud_active_users_total",
        "Number of active users for the last five minutes."
    );
    describe_gauge!(
        "nextcloud_active_users_hourly_total",
        "Number of active users for the last hour."
    );
    describe_gauge!(
        "nextcloud_active_users_daily_total",
        "Number of active users for the last day."
    );
    describe_gauge!(
        "nextcloud_php_info",
        "Contains meta information about PHP as labels. Value is always 1."
    );
    describe_gauge!(
        "nextcloud_php_memory_limit_bytes",
        "Configured PHP memory limit in bytes."
    );
    describe_gauge!(
        "nextcloud_php_max_execution_time_seconds",
        "Configured PHP maximum execution time in seconds."
    );
    describe_gauge!(
        "nextcloud_php_upload_max_size_bytes",
        "Configured maximum upload size in bytes."
    );
    describe_gauge!(
        "nextcloud_database_info",
        "Contains meta information about the database as labels. Value is always 1."
    );
    describe_gauge!(
        "nextcloud_database_size_bytes",
        "Size of database in bytes as reported from engine."
    );

    gauge!("nextcloud_exporter_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_descriptions() {
        // Describing without an installed recorder is a no-op; this only
        // verifies the calls do not panic.
        init_metric_descriptions();
    }
}
