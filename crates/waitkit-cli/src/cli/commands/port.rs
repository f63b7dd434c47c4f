//! `waitkit port <addr>` – wait until a TCP listener accepts a connection.

use anyhow::Result;
use std::io::ErrorKind;
use tokio::net::TcpStream;
use waitkit_core::wait;

use crate::cli::Limits;

async fn probe(addr: String) -> Result<bool> {
    match TcpStream::connect(&addr).await {
        Ok(_) => Ok(true),
        Err(e) if matches!(e.kind(), ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset) => {
            tracing::trace!(%addr, "not accepting yet");
            Ok(false)
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("connect to {addr}"))),
    }
}

pub async fn run_port(addr: &str, limits: &Limits) -> Result<()> {
    let mut waiting = limits
        .apply(wait::wait().until_async(|_| probe(addr.to_string())))
        .with_tag("addr", addr)
        .abandon_at_deadline()
        .throw_on_failure_with(format!("{addr} is not accepting connections"));
    let result = waiting.start_async().await?;

    println!(
        "{addr} is accepting connections after {} attempt(s), {:.2}s",
        result.attempts(),
        result.elapsed().as_secs_f64()
    );
    Ok(())
}
