use std::net::IpAddr;

/// Resolves the name of `ip`, falling back to its literal form.
pub fn reverse_lookup(ip: IpAddr) -> String {
    match hostname::lookup_addr(&ip) {
        Ok(name) => name,
        Err(err) => {
            debug!(
                message = "Reverse lookup failed, using the address instead",
                %ip,
                %err
            );

            ip.to_string()
        }
    }
}

/// The same as [`reverse_lookup`], without blocking the runtime.
pub async fn reverse_lookup_async(ip: IpAddr) -> String {
    match tokio::task::spawn_blocking(move || reverse_lookup(ip)).await {
        Ok(name) => name,
        Err(err) => {
            warn!(
                message = "Reverse lookup task failed",
                %ip,
                %err
            );

            ip.to_string()
        }
    }
}
