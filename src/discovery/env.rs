//! Seams the resolver talks to: DNS and the process environment.

use std::collections::HashMap;
use std::io;
use std::net::ToSocketAddrs;

/// Forward DNS lookup.
pub trait HostLookup: Send + Sync {
    /// Succeeds when `host` resolves to at least one address.
    fn lookup(&self, host: &str) -> io::Result<()>;
}

/// Blocking lookup through the system resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLookup;

impl HostLookup for SystemLookup {
    fn lookup(&self, host: &str) -> io::Result<()> {
        let mut addrs = (host, 0u16).to_socket_addrs()?;
        match addrs.next() {
            Some(_) => Ok(()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses for {host}"),
            )),
        }
    }
}

/// Read-only view of environment variables.
pub trait ServiceEnv: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ServiceEnv for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl ServiceEnv for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}
