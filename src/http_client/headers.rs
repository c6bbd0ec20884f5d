//! Header sets for stats API requests.

use std::collections::BTreeMap;

use rand::seq::IndexedRandom;

/// Fixed browser user agent used on direct connections.
pub const DIRECT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

pub const REFERER: &str = "https://www.nba.com/";
pub const ORIGIN: &str = "https://www.nba.com";

/// Real browser user agents rotated on proxied requests.
pub const IMPERSONATE_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    // Chrome on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Firefox
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    // Safari
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    // Edge
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

/// Pick one impersonation user agent at random.
pub fn random_user_agent() -> &'static str {
    IMPERSONATE_USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(DIRECT_USER_AGENT)
}

/// Headers for direct connections: just enough for the API to answer.
pub fn minimal_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("User-Agent".to_string(), DIRECT_USER_AGENT.to_string());
    headers.insert(
        "Accept".to_string(),
        "application/json, text/plain, */*".to_string(),
    );
    headers.insert("Referer".to_string(), REFERER.to_string());
    headers.insert("Origin".to_string(), ORIGIN.to_string());
    headers
}

/// Full browser-like header set for proxied requests.
///
/// Accept-Encoding is left to the HTTP client so decompression stays automatic.
pub fn browser_headers() -> BTreeMap<String, String> {
    let mut headers = minimal_headers();
    headers.insert("User-Agent".to_string(), random_user_agent().to_string());
    headers.insert("Accept-Language".to_string(), "en-US,en;q=0.9".to_string());
    headers.insert("Connection".to_string(), "keep-alive".to_string());
    headers.insert("Cache-Control".to_string(), "no-cache".to_string());
    headers.insert("Pragma".to_string(), "no-cache".to_string());
    headers.insert("Sec-Fetch-Dest".to_string(), "empty".to_string());
    headers.insert("Sec-Fetch-Mode".to_string(), "cors".to_string());
    headers.insert("Sec-Fetch-Site".to_string(), "same-site".to_string());
    headers.insert("DNT".to_string(), "1".to_string());
    headers
}
