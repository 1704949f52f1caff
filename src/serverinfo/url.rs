const INFO_PATH: &str = "/ocs/v2.php/apps/serverinfo/api/v1/info";

/// Builds the URL of the serverinfo endpoint from the server base URL.
///
/// The query parameter order is fixed so that generated URLs stay
/// byte-identical across versions.
pub fn info_url(server_url: &str, skip_apps: bool, skip_update: bool) -> String {
    format!(
        "{}{}?format=json&skipApps={}&skipUpdate={}",
        server_url.trim_end_matches('/'),
        INFO_PATH,
        skip_apps,
        skip_update
    )
}
