use crate::modules::error::code::ErrorCode;
use crate::modules::error::MailHeraldResult;
use crate::modules::imap::session::SessionStream;
use crate::raise_error;
use async_imap::Client as ImapClient;
use async_imap::Session as ImapSession;
use rustls::RootCertStore;
use std::net::SocketAddr;
use std::net::ToSocketAddrs;
use std::ops::Deref;
use std::ops::DerefMut;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufWriter;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_io_timeout::TimeoutStream;
use tracing::debug;

pub(crate) const TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub(crate) struct Client {
    inner: ImapClient<Box<dyn SessionStream>>,
}

impl Deref for Client {
    type Target = ImapClient<Box<dyn SessionStream>>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for Client {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

fn alpn(port: u16) -> &'static [&'static str] {
    if port == 993 {
        &[]
    } else {
        &["imap"]
    }
}

impl Client {
    fn new(stream: Box<dyn SessionStream>) -> Self {
        Self {
            inner: ImapClient::new(stream),
        }
    }

    /// Establishes a TLS session and reads the server greeting. Plain and
    /// STARTTLS connections are not supported; every configured endpoint is
    /// implicit-TLS.
    pub(crate) async fn connect(host: &str, port: u16) -> MailHeraldResult<Self> {
        let resolved_addr = resolve_to_socket_addr(host, port)?;
        debug!("Attempting IMAP connection to {host} ({resolved_addr}).");

        let tcp_stream = establish_tcp_connection_with_timeout(resolved_addr).await?;
        let tls_stream = establish_tls_stream(host, alpn(port), tcp_stream).await?;
        // Wrap the TLS stream in a buffered writer for efficient IO
        let buffered_stream = BufWriter::new(tls_stream);
        let session_stream: Box<dyn SessionStream> = Box::new(buffered_stream);
        let mut client = Client::new(session_stream);

        // Read and validate the greeting response
        let _greeting = client
            .read_response()
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::ImapConnectFailed))?
            .ok_or_else(|| {
                raise_error!(
                    "failed to read greeting".into(),
                    ErrorCode::ImapConnectFailed
                )
            })?;

        Ok(client)
    }

    pub(crate) async fn login(
        self,
        username: &str,
        password: &str,
    ) -> MailHeraldResult<ImapSession<Box<dyn SessionStream>>> {
        let Client { inner } = self;
        let session = inner.login(username, password).await.map_err(|(e, _)| {
            raise_error!(format!("{:#?}", e), ErrorCode::ImapAuthenticationFailed)
        })?;
        Ok(session)
    }
}

fn resolve_to_socket_addr(host: &str, port: u16) -> MailHeraldResult<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| {
            raise_error!(
                format!("failed to resolve {}: {}", host, e),
                ErrorCode::ImapConnectFailed
            )
        })?
        .next()
        .ok_or_else(|| {
            raise_error!(
                format!("no address resolved for {}", host),
                ErrorCode::ImapConnectFailed
            )
        })
}

async fn establish_tcp_connection_with_timeout(
    address: SocketAddr,
) -> MailHeraldResult<Pin<Box<TimeoutStream<TcpStream>>>> {
    let tcp_stream = timeout(TIMEOUT, TcpStream::connect(address))
        .await
        .map_err(|_| {
            raise_error!(
                format!(
                    "connection to {} timed out after {}s",
                    address,
                    TIMEOUT.as_secs()
                ),
                ErrorCode::ImapConnectFailed
            )
        })?
        .map_err(|e| raise_error!(e.to_string(), ErrorCode::ImapConnectFailed))?;

    // Disable Nagle's algorithm for more efficient network communication
    tcp_stream
        .set_nodelay(true)
        .map_err(|e| raise_error!(e.to_string(), ErrorCode::NetworkError))?;

    // Wrap the TCP stream in a TimeoutStream for timeout management
    let mut timeout_stream = TimeoutStream::new(tcp_stream);
    timeout_stream.set_write_timeout(Some(TIMEOUT));
    timeout_stream.set_read_timeout(Some(TIMEOUT));

    Ok(Box::pin(timeout_stream))
}

async fn establish_tls_stream(
    server_hostname: &str,
    alpn_protocols: &[&str],
    stream: impl SessionStream + 'static,
) -> MailHeraldResult<Box<dyn SessionStream>> {
    // Create a root certificate store and add default trusted roots
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.into(),
    };

    let mut config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    config.alpn_protocols = alpn_protocols
        .iter()
        .map(|s| s.as_bytes().to_vec())
        .collect();

    let tls_connector = tokio_rustls::TlsConnector::from(Arc::new(config));

    let server_name = rustls_pki_types::ServerName::try_from(server_hostname)
        .map_err(|_| raise_error!("Invalid DNS name".into(), ErrorCode::NetworkError))?
        .to_owned();

    let tls_stream = tls_connector
        .connect(server_name, stream)
        .await
        .map_err(|e| raise_error!(e.to_string(), ErrorCode::NetworkError))?;

    Ok(Box::new(tls_stream))
}
