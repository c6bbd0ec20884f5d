//! Routing mode and runtime environment detection.

use std::env;

use tracing::{debug, warn};

/// How outbound requests are routed, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProxyMode {
    /// Decide from the runtime context (cloud => proxy, local => direct).
    #[default]
    Auto,
    /// Always connect directly.
    ForceLocal,
    /// Always route through the proxy pool.
    ForceProxy,
}

impl ProxyMode {
    /// Resolve the two tri-state override flags into a single mode.
    ///
    /// When both flags are asserted, `ForceProxy` wins.
    pub fn from_flags(force_local: Option<bool>, force_proxy: Option<bool>) -> Self {
        let local = force_local.unwrap_or(false);
        let proxy = force_proxy.unwrap_or(false);

        match (local, proxy) {
            (true, true) => {
                warn!("Both FORCE_LOCAL and FORCE_PROXY are set; FORCE_PROXY takes precedence");
                ProxyMode::ForceProxy
            }
            (_, true) => ProxyMode::ForceProxy,
            (true, false) => ProxyMode::ForceLocal,
            (false, false) => ProxyMode::Auto,
        }
    }

    pub fn force_local(&self) -> bool {
        matches!(self, ProxyMode::ForceLocal)
    }

    pub fn force_proxy(&self) -> bool {
        matches!(self, ProxyMode::ForceProxy)
    }
}

impl std::fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyMode::Auto => write!(f, "auto"),
            ProxyMode::ForceLocal => write!(f, "force-local"),
            ProxyMode::ForceProxy => write!(f, "force-proxy"),
        }
    }
}

impl std::str::FromStr for ProxyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "auto" => Ok(ProxyMode::Auto),
            "forcelocal" | "local" | "direct" => Ok(ProxyMode::ForceLocal),
            "forceproxy" | "proxy" => Ok(ProxyMode::ForceProxy),
            _ => Err(format!(
                "Invalid proxy mode '{}'. Valid options: auto, force-local, force-proxy",
                s
            )),
        }
    }
}

/// Facts about the process environment, captured once and passed around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeContext {
    pub is_cloud: bool,
}

impl RuntimeContext {
    pub fn local() -> Self {
        Self { is_cloud: false }
    }

    pub fn cloud() -> Self {
        Self { is_cloud: true }
    }

    /// Inspect ambient signals to decide whether we run in the cloud.
    ///
    /// Order: `HOOPSYNC_CLOUD` override, AWS execution variables, host name.
    pub fn detect() -> Self {
        if let Some(explicit) = parse_flag(env::var("HOOPSYNC_CLOUD").ok().as_deref()) {
            debug!("HOOPSYNC_CLOUD override: is_cloud={}", explicit);
            return Self { is_cloud: explicit };
        }

        if env::var_os("AWS_EXECUTION_ENV").is_some()
            || env::var_os("AWS_LAMBDA_FUNCTION_NAME").is_some()
        {
            debug!("AWS execution environment detected");
            return Self::cloud();
        }

        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_default();
        Self {
            is_cloud: hostname_looks_like_cloud(&host),
        }
    }
}

/// Pure query over an already-detected context.
pub fn is_cloud_environment(context: &RuntimeContext) -> bool {
    context.is_cloud
}

fn hostname_looks_like_cloud(host: &str) -> bool {
    let host = host.to_lowercase();
    host.contains("aws") || host.contains("ec2")
}

/// Parse a tri-state boolean flag (`1/true/yes/on`, `0/false/no/off`).
pub fn parse_flag(value: Option<&str>) -> Option<bool> {
    let value = value?.trim();
    if value == "1"
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value.eq_ignore_ascii_case("on")
    {
        Some(true)
    } else if value == "0"
        || value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("no")
        || value.eq_ignore_ascii_case("off")
    {
        Some(false)
    } else {
        None
    }
}
