//! Shutdown requests from the operating system.

use std::fmt;
use std::io;
use tokio::signal;

/// Why the console is asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Interrupt,
    Terminate,
}

impl fmt::Display for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shutdown::Interrupt => write!(f, "interrupt"),
            Shutdown::Terminate => write!(f, "terminate request"),
        }
    }
}

/// Resolves with the first shutdown request. Terminate is only watched on Unix.
pub async fn wait_for_shutdown() -> io::Result<Shutdown> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => result.map(|_| Shutdown::Interrupt),
            _ = terminate.recv() => Ok(Shutdown::Terminate),
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        Ok(Shutdown::Interrupt)
    }
}
