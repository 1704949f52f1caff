use metrics::{counter, gauge};
use tracing::warn;

use crate::client::InfoClient;
use crate::serverinfo::{ServerInfo, Shares};

/// Maps one scrape onto the `nextcloud_` metric namespace.
///
/// Owns the [`InfoClient`] and is invoked by the `/metrics` handler once per
/// pull. A failed scrape sets `nextcloud_up` to 0 and counts the error by
/// cause; it never aborts the exporter or the metrics response.
pub struct Collector {
    client: InfoClient,
}

impl Collector {
    pub fn new(client: InfoClient) -> Self {
        Self { client }
    }

    /// Runs one fetch-decode-emit cycle. Stateless apart from the gauges it
    /// writes; concurrent invocations are safe.
    pub async fn scrape(&self) {
        match self.client.fetch_info().await {
            Ok(info) => {
                record_info(&info);
                gauge!("nextcloud_up").set(1.0);
            }
            Err(err) => {
                warn!("Error during scrape: {err}");
                counter!("nextcloud_scrape_errors_total", "cause" => err.cause_label())
                    .increment(1);
                gauge!("nextcloud_up").set(0.0);
            }
        }
    }
}

/// Writes all gauges derived from a decoded server info document.
fn record_info(info: &ServerInfo) {
    let system = &info.data.nextcloud.system;
    let storage = &info.data.nextcloud.storage;
    let shares = &info.data.nextcloud.shares;
    let server = &info.data.server;
    let active = &info.data.active_users;

    gauge!("nextcloud_system_info", "version" => system.version.clone()).set(1.0);
    gauge!("nextcloud_apps_installed_total").set(system.apps.installed as f64);
    gauge!("nextcloud_apps_updates_available_total").set(system.apps.available_updates as f64);
    gauge!("nextcloud_free_space_bytes").set(system.free_space as f64);

    gauge!("nextcloud_users_total").set(storage.users as f64);
    gauge!("nextcloud_files_total").set(storage.files as f64);
    gauge!("nextcloud_storages_total").set(storage.storages as f64);
    gauge!("nextcloud_storages_local_total").set(storage.storages_local as f64);
    gauge!("nextcloud_storages_home_total").set(storage.storages_home as f64);
    gauge!("nextcloud_storages_other_total").set(storage.storages_other as f64);

    record_shares(shares);

    gauge!("nextcloud_active_users_total").set(active.last_5_minutes as f64);
    gauge!("nextcloud_active_users_hourly_total").set(active.last_hour as f64);
    gauge!("nextcloud_active_users_daily_total").set(active.last_day as f64);

    gauge!("nextcloud_php_info", "version" => server.php.version.clone()).set(1.0);
    gauge!("nextcloud_php_memory_limit_bytes").set(server.php.memory_limit as f64);
    gauge!("nextcloud_php_max_execution_time_seconds").set(server.php.max_execution_time as f64);
    gauge!("nextcloud_php_upload_max_size_bytes").set(server.php.upload_max_filesize as f64);

    gauge!(
        "nextcloud_database_info",
        "type" => server.database.db_type.clone(),
        "version" => server.database.version.clone(),
    )
    .set(1.0);
    gauge!("nextcloud_database_size_bytes").set(server.database.size as f64);
}

fn record_shares(shares: &Shares) {
    // "authlink" counts password-protected links only.
    let authlink = shares.link.saturating_sub(shares.link_no_password);

    let by_type = [
        ("user", shares.user),
        ("group", shares.group),
        ("link", shares.link),
        ("authlink", authlink),
        ("mail", shares.mail),
        ("room", shares.room),
    ];
    for (share_type, value) in by_type {
        gauge!("nextcloud_shares_total", "type" => share_type).set(value as f64);
    }

    gauge!("nextcloud_shares_federated_total", "direction" => "sent")
        .set(shares.federated_sent as f64);
    gauge!("nextcloud_shares_federated_total", "direction" => "received")
        .set(shares.federated_received as f64);
}
