//! # Official → BMCLAPI URL mapping.
//!
//! [`mirror_urls`] turns one official download URL into the ordered list of
//! URLs to try. Hosts the mirror does not cover yield just the original URL.
//! Asset objects are always tried official-first: there are thousands of them
//! per version and the mirror is rate-limited.

use crate::fetch::mirror::SourceOrder;

/// BMCLAPI root.
pub const BMCLAPI_ROOT: &str = "https://bmclapi2.bangbang93.com";
/// BMCLAPI maven repository.
pub const BMCLAPI_MAVEN: &str = "https://bmclapi2.bangbang93.com/maven";
/// BMCLAPI asset objects.
pub const BMCLAPI_ASSETS: &str = "https://bmclapi2.bangbang93.com/assets";
/// BMCLAPI libraries.
pub const BMCLAPI_LIBRARIES: &str = "https://bmclapi2.bangbang93.com/libraries";

/// Official prefix → mirror prefix. First match wins, so longer prefixes of
/// the same host come first.
const REPLACEMENTS: &[(&str, &str)] = &[
    (BMCLAPI_ROOT, BMCLAPI_ROOT),
    ("https://launchermeta.mojang.com", BMCLAPI_ROOT),
    ("https://piston-meta.mojang.com", BMCLAPI_ROOT),
    ("https://piston-data.mojang.com", BMCLAPI_ROOT),
    ("https://launcher.mojang.com", BMCLAPI_ROOT),
    ("https://libraries.minecraft.net", BMCLAPI_LIBRARIES),
    ("https://resources.download.minecraft.net", BMCLAPI_ASSETS),
    ("http://files.minecraftforge.net/maven", BMCLAPI_MAVEN),
    ("https://files.minecraftforge.net/maven", BMCLAPI_MAVEN),
    ("https://maven.minecraftforge.net", BMCLAPI_MAVEN),
    (
        "https://maven.neoforged.net/releases/net/neoforged/forge",
        "https://bmclapi2.bangbang93.com/maven/net/neoforged/forge",
    ),
    (
        "https://maven.neoforged.net/releases/net/neoforged/neoforge",
        "https://bmclapi2.bangbang93.com/maven/net/neoforged/neoforge",
    ),
    (
        "http://dl.liteloader.com/versions/versions.json",
        "https://bmclapi2.bangbang93.com/maven/com/mumfrey/liteloader/versions.json",
    ),
    ("http://dl.liteloader.com/versions", BMCLAPI_MAVEN),
    ("https://meta.fabricmc.net", "https://bmclapi2.bangbang93.com/fabric-meta"),
    ("https://maven.fabricmc.net", BMCLAPI_MAVEN),
    (
        "https://authlib-injector.yushi.moe",
        "https://bmclapi2.bangbang93.com/mirrors/authlib-injector",
    ),
    (
        "https://repo1.maven.org/maven2",
        "https://mirrors.cloud.tencent.com/nexus/repository/maven-public",
    ),
];

/// Returns the mirror equivalent of `url`, if any host prefix matches.
///
/// A prefix only matches at a path boundary, so look-alike hosts such as
/// `libraries.minecraft.net.example.com` are left alone.
pub fn to_mirror(url: &str) -> Option<String> {
    REPLACEMENTS.iter().find_map(|(origin, mirror)| {
        url.strip_prefix(origin)
            .filter(|rest| rest.is_empty() || rest.starts_with(['/', '?']))
            .map(|rest| format!("{mirror}{rest}"))
    })
}

/// Ordered candidate URLs for `url` under the given preference.
///
/// # Example
/// ```
/// use launchvisor::fetch::{SourceOrder, mirror_urls};
///
/// let urls = mirror_urls(
///     "https://libraries.minecraft.net/com/mojang/brigadier/1.0.18/brigadier-1.0.18.jar",
///     SourceOrder::MirrorFirst,
/// );
/// assert_eq!(urls[0], "https://bmclapi2.bangbang93.com/libraries/com/mojang/brigadier/1.0.18/brigadier-1.0.18.jar");
/// assert_eq!(urls.len(), 2);
/// ```
pub fn mirror_urls(url: &str, order: SourceOrder) -> Vec<String> {
    let mirror = match to_mirror(url) {
        Some(m) if m != url => m,
        _ => return vec![url.to_string()],
    };

    let order = if mirror.starts_with(BMCLAPI_ASSETS) {
        SourceOrder::OfficialFirst
    } else {
        order
    };

    match order {
        SourceOrder::OfficialFirst => vec![url.to_string(), mirror],
        SourceOrder::MirrorFirst => vec![mirror, url.to_string()],
    }
}
