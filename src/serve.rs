// src/serve.rs

use anyhow::{anyhow, Context, Result};
use std::{
    net::{SocketAddr, ToSocketAddrs},
    path::{Path, PathBuf},
};
use tracing::info;
use warp::{reject::Rejection, Filter};

/// Parse a listen address. A bare `:port` means every interface.
pub fn parse_listen(listen: &str) -> Result<SocketAddr> {
    let listen = listen.trim();
    let candidate = if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else {
        listen.to_string()
    };
    candidate
        .to_socket_addrs()
        .with_context(|| format!("invalid listen address {:?}", listen))?
        .next()
        .ok_or_else(|| anyhow!("listen address {:?} resolved to nothing", listen))
}

/// Static file resolution beneath `dir`.
pub fn routes(dir: PathBuf) -> impl Filter<Extract = (warp::fs::File,), Error = Rejection> + Clone {
    warp::fs::dir(dir)
}

/// Serve `dir` on `addr` until the process ends.
pub async fn run(addr: SocketAddr, dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }
    let dir = dir
        .canonicalize()
        .with_context(|| format!("resolving {}", dir.display()))?;

    let (bound, server) = warp::serve(routes(dir.clone()).with(warp::trace::request()))
        .try_bind_ephemeral(addr)
        .with_context(|| format!("binding {}", addr))?;

    info!(addr = %bound, dir = %dir.display(), "listening");
    server.await;
    Ok(())
}
