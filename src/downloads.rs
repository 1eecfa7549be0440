//! Static catalog of client download links.

use std::collections::BTreeMap;

use crate::config::DownloadConfig;

const IOS_APP_URL: &str = "https://apps.apple.com/app/mysql-client";

/// Builds the platform → URL map served by the downloads endpoint.
pub fn catalog(config: &DownloadConfig) -> BTreeMap<&'static str, String> {
    let base = config.base_url.trim_end_matches('/');
    let version = &config.version;

    BTreeMap::from([
        ("web", format!("{base}/web/app")),
        (
            "windows",
            format!("{base}/desktop/windows/mysql-client-{version}.exe"),
        ),
        (
            "macos",
            format!("{base}/desktop/macos/mysql-client-{version}.dmg"),
        ),
        (
            "linux",
            format!("{base}/desktop/linux/mysql-client-{version}.AppImage"),
        ),
        (
            "android",
            format!("{base}/mobile/android/mysql-client-{version}.apk"),
        ),
        ("ios", IOS_APP_URL.to_string()),
    ])
}
