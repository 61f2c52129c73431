//! Platform-specific local endpoint implementation.
//!
//! - Unix: Unix Domain Socket
//! - Windows: Named Pipe
//!
//! The host listens; the injected probe connects. Endpoint names mix the
//! current time with a small random component so concurrent debug sessions on
//! one machine never collide.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

/// Generate a unique endpoint name.
///
/// Format: `"<prefix>_<unix_time + millis + small_random>"`, where the random
/// component stays below 100.
pub fn generate_endpoint_name(prefix: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let tag = now.as_secs() + u64::from(now.subsec_millis()) + small_random();
    format!("{prefix}_{tag}")
}

/// Platform path for an endpoint name.
///
/// - Unix: `/tmp/<name>.sock`
/// - Windows: `\\.\pipe\<name>`
pub fn endpoint_path(name: &str) -> String {
    #[cfg(unix)]
    {
        format!("/tmp/{name}.sock")
    }

    #[cfg(windows)]
    {
        format!(r"\\.\pipe\{name}")
    }
}

/// Small random value (< 100) from system-time bit mixing.
fn small_random() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let pid = u64::from(std::process::id());
    (nanos.wrapping_mul(0x517c_c1b7_2722_0a95) ^ pid) % 100
}

// ============================================================================
// Unix Implementation
// ============================================================================

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use std::path::Path;
    use tokio::net::{UnixListener, UnixStream};

    /// Unix Domain Socket listener.
    pub struct PipeListener {
        listener: UnixListener,
        path: String,
    }

    /// Unix Domain Socket stream (connected, either side).
    pub struct PipeStream {
        stream: UnixStream,
    }

    impl PipeListener {
        /// Bind to a Unix socket path.
        ///
        /// Removes any existing socket file at the path before binding.
        pub async fn bind(path: &str) -> Result<Self> {
            if Path::new(path).exists() {
                std::fs::remove_file(path)?;
            }

            let listener = UnixListener::bind(path)?;

            Ok(Self {
                listener,
                path: path.to_string(),
            })
        }

        /// Accept a single connection.
        pub async fn accept(&self) -> Result<PipeStream> {
            let (stream, _addr) = self.listener.accept().await?;
            Ok(PipeStream { stream })
        }

        /// Get the socket path.
        pub fn path(&self) -> &str {
            &self.path
        }
    }

    impl Drop for PipeListener {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    /// Connect to a listening endpoint (probe side).
    pub async fn connect(path: &str) -> Result<PipeStream> {
        let stream = UnixStream::connect(path).await?;
        Ok(PipeStream { stream })
    }

    impl PipeStream {
        /// Split into read and write halves.
        pub fn into_split(
            self,
        ) -> (
            impl AsyncRead + Send + Unpin + 'static,
            impl AsyncWrite + Send + Unpin + 'static,
        ) {
            self.stream.into_split()
        }
    }

    impl AsyncRead for PipeStream {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::pin::Pin::new(&mut self.stream).poll_read(cx, buf)
        }
    }

    impl AsyncWrite for PipeStream {
        fn poll_write(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::pin::Pin::new(&mut self.stream).poll_write(cx, buf)
        }

        fn poll_flush(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::pin::Pin::new(&mut self.stream).poll_flush(cx)
        }

        fn poll_shutdown(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::pin::Pin::new(&mut self.stream).poll_shutdown(cx)
        }
    }
}

// ============================================================================
// Windows Implementation
// ============================================================================

#[cfg(windows)]
mod windows_impl {
    use super::*;
    use tokio::net::windows::named_pipe::{
        ClientOptions, NamedPipeClient, NamedPipeServer, ServerOptions,
    };

    /// Windows Named Pipe listener.
    pub struct PipeListener {
        path: String,
        first: std::sync::Mutex<Option<NamedPipeServer>>,
    }

    /// Windows Named Pipe stream (server- or client-side).
    pub struct PipeStream {
        inner: Inner,
    }

    enum Inner {
        Server(NamedPipeServer),
        Client(NamedPipeClient),
    }

    impl PipeListener {
        /// Create a Named Pipe server instance for the path.
        pub async fn bind(path: &str) -> Result<Self> {
            let first = ServerOptions::new().first_pipe_instance(true).create(path)?;
            Ok(Self {
                path: path.to_string(),
                first: std::sync::Mutex::new(Some(first)),
            })
        }

        /// Accept a single connection.
        pub async fn accept(&self) -> Result<PipeStream> {
            let pending = self
                .first
                .lock()
                .expect("pipe listener mutex poisoned")
                .take();
            let server = match pending {
                Some(s) => s,
                None => ServerOptions::new().create(&self.path)?,
            };
            server.connect().await?;
            Ok(PipeStream {
                inner: Inner::Server(server),
            })
        }

        /// Get the pipe path.
        pub fn path(&self) -> &str {
            &self.path
        }
    }

    /// Connect to a listening endpoint (probe side).
    pub async fn connect(path: &str) -> Result<PipeStream> {
        let client = ClientOptions::new().open(path)?;
        Ok(PipeStream {
            inner: Inner::Client(client),
        })
    }

    impl PipeStream {
        /// Split into read and write halves.
        pub fn into_split(
            self,
        ) -> (
            impl AsyncRead + Send + Unpin + 'static,
            impl AsyncWrite + Send + Unpin + 'static,
        ) {
            tokio::io::split(self)
        }
    }

    impl AsyncRead for PipeStream {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            match &mut self.inner {
                Inner::Server(s) => std::pin::Pin::new(s).poll_read(cx, buf),
                Inner::Client(c) => std::pin::Pin::new(c).poll_read(cx, buf),
            }
        }
    }

    impl AsyncWrite for PipeStream {
        fn poll_write(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            match &mut self.inner {
                Inner::Server(s) => std::pin::Pin::new(s).poll_write(cx, buf),
                Inner::Client(c) => std::pin::Pin::new(c).poll_write(cx, buf),
            }
        }

        fn poll_flush(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            match &mut self.inner {
                Inner::Server(s) => std::pin::Pin::new(s).poll_flush(cx),
                Inner::Client(c) => std::pin::Pin::new(c).poll_flush(cx),
            }
        }

        fn poll_shutdown(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            match &mut self.inner {
                Inner::Server(s) => std::pin::Pin::new(s).poll_shutdown(cx),
                Inner::Client(c) => std::pin::Pin::new(c).poll_shutdown(cx),
            }
        }
    }
}

// ============================================================================
// Platform-independent re-exports
// ============================================================================

#[cfg(unix)]
pub use unix_impl::{connect, PipeListener, PipeStream};

#[cfg(windows)]
pub use windows_impl::{connect, PipeListener, PipeStream};
