//! Native `svn://` (ra_svn, protocol version 2) client.
//!
//! One [`RaSvnSession`] owns one TCP connection to `svnserve`. Commands are
//! strictly request/response, so the connection sits behind a mutex and
//! every command holds it for its whole exchange, content stream included.
//!
//! When a command fails at the transport or framing level the connection is
//! dropped; the next command dials again and redoes the handshake. Failed
//! commands themselves are never replayed.

use std::io::{self, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::Mutex;
use std::time::SystemTime;

use svnfs_config::{log_ra_debug, log_ra_info, log_ra_warn};

use crate::item::{self, Item};
use crate::url::RepositoryUrl;
use crate::{
    canonical_path, DirEntry, NodeKind, RaError, RepositorySession, Result, Revnum, Stat,
    NOT_FOUND_CODES,
};

/// Protocol version spoken by this client.
const PROTOCOL_VERSION: u64 = 2;

/// Capabilities announced in the client greeting.
const CLIENT_CAPABILITIES: [&str; 6] = [
    "edit-pipeline",
    "svndiff1",
    "absent-entries",
    "depth",
    "mergeinfo",
    "log-revprops",
];

const CLIENT_NAME: &str = concat!("svnfs/", env!("CARGO_PKG_VERSION"));

/// Dirent fields requested from `get-dir`.
const DIRENT_FIELDS: [&str; 6] = [
    "kind",
    "size",
    "has-props",
    "created-rev",
    "time",
    "last-author",
];

/// Opens byte streams to a repository server.
pub trait Connect: Send + Sync {
    type Stream: Read + Write + Send;

    fn connect(&self, url: &RepositoryUrl) -> io::Result<Self::Stream>;
}

/// Plain TCP to `host:port`
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connect for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self, url: &RepositoryUrl) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((url.host(), url.port()))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// What the server told us about the repository during the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryInfo {
    pub uuid: String,
    pub root_url: String,
    pub capabilities: Vec<String>,
}

fn malformed(msg: impl Into<String>) -> RaError {
    RaError::Malformed(msg.into())
}

/// Build an error from a `failure` parameter list.
///
/// Each entry is `( apr-err message file line )`; the chain is reported as
/// one error. A not-found code anywhere in the chain wins so callers can
/// classify it.
fn server_error(errors: &[Item]) -> RaError {
    let chain: Vec<(u64, String)> = errors
        .iter()
        .filter_map(Item::as_list)
        .map(|fields| {
            let code = fields.first().and_then(Item::as_number).unwrap_or(0);
            let message = fields.get(1).and_then(Item::as_text).unwrap_or_default();
            (code, message)
        })
        .collect();

    let Some(&(first_code, _)) = chain.first() else {
        return malformed("failure response without error details");
    };
    let code = chain
        .iter()
        .map(|(c, _)| *c)
        .find(|c| NOT_FOUND_CODES.contains(c))
        .unwrap_or(first_code);
    let message = chain
        .iter()
        .map(|(_, m)| m.as_str())
        .filter(|m| !m.is_empty())
        .collect::<Vec<_>>()
        .join(": ");

    RaError::Server { code, message }
}

fn parse_date(text: &str) -> Option<SystemTime> {
    chrono::DateTime::parse_from_rfc3339(text)
        .ok()
        .map(SystemTime::from)
}

/// Parse `kind size has-props created-rev ( date ) ( author )`.
fn parse_stat(fields: &[Item]) -> Result<Stat> {
    let kind = fields
        .first()
        .and_then(Item::as_word)
        .ok_or_else(|| malformed("dirent without node kind"))?;
    let last_changed = fields
        .get(4)
        .and_then(Item::as_list)
        .and_then(|date| date.first())
        .and_then(Item::as_text)
        .and_then(|text| parse_date(&text));

    Ok(Stat {
        kind: NodeKind::from_word(kind),
        size: fields.get(1).and_then(Item::as_number).unwrap_or(0),
        created_rev: fields.get(3).and_then(Item::as_number),
        last_changed,
    })
}

/// Path relative to the session URL, as the server expects it.
fn relative_path(path: &str) -> String {
    canonical_path(path).trim_start_matches('/').to_string()
}

fn revision_param(revision: Revnum) -> Item {
    Item::List(vec![Item::Number(revision)])
}

struct Connection<S> {
    stream: BufReader<S>,
}

impl<S: Read + Write> Connection<S> {
    fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    fn send(&mut self, item: &Item) -> Result<()> {
        let mut buf = Vec::with_capacity(128);
        item.encode(&mut buf);
        let writer = self.stream.get_mut();
        writer.write_all(&buf)?;
        writer.flush()?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Item> {
        item::read_item(&mut self.stream)
    }

    /// Read `( success ( params ) )`, turning `failure` into an error.
    fn read_response(&mut self) -> Result<Vec<Item>> {
        let Item::List(mut parts) = self.receive()? else {
            return Err(malformed("response is not a list"));
        };
        if parts.len() != 2 {
            return Err(malformed(format!("response has {} elements", parts.len())));
        }
        let Some(Item::List(params)) = parts.pop() else {
            return Err(malformed("response parameters are not a list"));
        };
        match parts[0].as_word() {
            Some("success") => Ok(params),
            Some("failure") => Err(server_error(&params)),
            _ => Err(malformed("response status is neither success nor failure")),
        }
    }

    /// Answer an auth request. Only anonymous access is supported.
    fn handle_auth_request(&mut self) -> Result<()> {
        let params = self.read_response()?;
        let mechs = params
            .first()
            .and_then(Item::as_list)
            .ok_or_else(|| malformed("auth request without mechanism list"))?;
        if mechs.is_empty() {
            return Ok(());
        }
        if !mechs.iter().any(|m| m.as_word() == Some("ANONYMOUS")) {
            let offered: Vec<&str> = mechs.iter().filter_map(Item::as_word).collect();
            return Err(RaError::Auth(format!(
                "server offers [{}], only ANONYMOUS is supported",
                offered.join(" ")
            )));
        }

        self.send(&Item::List(vec![
            Item::word("ANONYMOUS"),
            Item::List(vec![Item::string("")]),
        ]))?;

        let reply = self.receive()?;
        let parts = reply
            .as_list()
            .ok_or_else(|| malformed("auth reply is not a list"))?;
        match parts.first().and_then(Item::as_word) {
            Some("success") => Ok(()),
            Some("failure") => {
                let reason = parts
                    .get(1)
                    .and_then(Item::as_list)
                    .and_then(|p| p.first())
                    .and_then(Item::as_text)
                    .unwrap_or_else(|| "anonymous access denied".to_string());
                Err(RaError::Auth(reason))
            }
            _ => Err(malformed("unexpected auth reply")),
        }
    }

    fn handshake(&mut self, url: &RepositoryUrl) -> Result<RepositoryInfo> {
        let greeting = self.read_response()?;
        let min = greeting.first().and_then(Item::as_number);
        let max = greeting.get(1).and_then(Item::as_number);
        let (Some(min), Some(max)) = (min, max) else {
            return Err(malformed("greeting without version range"));
        };
        if !(min..=max).contains(&PROTOCOL_VERSION) {
            return Err(RaError::Version { min, max });
        }

        self.send(&Item::List(vec![
            Item::Number(PROTOCOL_VERSION),
            Item::List(CLIENT_CAPABILITIES.iter().map(|c| Item::word(c)).collect()),
            Item::string(url.to_string()),
            Item::string(CLIENT_NAME),
            Item::List(Vec::new()),
        ]))?;

        self.handle_auth_request()?;

        let info = self.read_response()?;
        let uuid = info
            .first()
            .and_then(Item::as_text)
            .ok_or_else(|| malformed("repository info without uuid"))?;
        let root_url = info.get(1).and_then(Item::as_text).unwrap_or_default();
        let capabilities = info
            .get(2)
            .and_then(Item::as_list)
            .map(|caps| {
                caps.iter()
                    .filter_map(Item::as_word)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(RepositoryInfo {
            uuid,
            root_url,
            capabilities,
        })
    }

    /// Send `( name ( params ) )`, answer the auth request, read the reply.
    fn command(&mut self, name: &str, params: Vec<Item>) -> Result<Vec<Item>> {
        self.send(&Item::List(vec![Item::word(name), Item::List(params)]))?;
        self.handle_auth_request()?;
        self.read_response()
    }
}

/// Repository session over the `svn://` protocol
pub struct RaSvnSession<C: Connect = TcpConnector> {
    url: RepositoryUrl,
    connector: C,
    info: RepositoryInfo,
    conn: Mutex<Option<Connection<C::Stream>>>,
}

impl RaSvnSession<TcpConnector> {
    /// Dial `url` (`svn://host[:port]/path`) and complete the handshake.
    pub fn connect(url: &str) -> Result<Self> {
        Self::with_connector(RepositoryUrl::parse(url)?, TcpConnector)
    }
}

impl<C: Connect> RaSvnSession<C> {
    pub fn with_connector(url: RepositoryUrl, connector: C) -> Result<Self> {
        let (conn, info) = Self::open(&connector, &url)?;
        let url_display = url.to_string();
        log_ra_info!(
            "Connected to repository",
            url = url_display.as_str(),
            uuid = info.uuid.as_str()
        );
        Ok(Self {
            url,
            connector,
            info,
            conn: Mutex::new(Some(conn)),
        })
    }

    fn open(connector: &C, url: &RepositoryUrl) -> Result<(Connection<C::Stream>, RepositoryInfo)> {
        let mut conn = Connection::new(connector.connect(url)?);
        let info = conn.handshake(url)?;
        Ok((conn, info))
    }

    pub fn url(&self) -> &RepositoryUrl {
        &self.url
    }

    pub fn info(&self) -> &RepositoryInfo {
        &self.info
    }

    fn reconnect(&self) -> Result<Connection<C::Stream>> {
        let url_display = self.url.to_string();
        log_ra_info!("Reconnecting to repository", url = url_display.as_str());
        let (conn, info) = Self::open(&self.connector, &self.url)?;
        if info.uuid != self.info.uuid {
            return Err(malformed(format!(
                "repository UUID changed from {} to {}",
                self.info.uuid, info.uuid
            )));
        }
        Ok(conn)
    }

    /// Run one command exchange on the connection, dialing first if the
    /// previous exchange broke it.
    fn with_connection<T>(
        &self,
        command: &str,
        f: impl FnOnce(&mut Connection<C::Stream>) -> Result<T>,
    ) -> Result<T> {
        let mut slot = self.conn.lock().unwrap_or_else(|poisoned| {
            let mut slot = poisoned.into_inner();
            *slot = None;
            slot
        });
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.reconnect()?,
        };

        let result = f(&mut conn);
        match &result {
            Err(e) if e.is_connection_fatal() => {
                let error = e.to_string();
                log_ra_warn!(
                    "Dropping connection",
                    command = command,
                    error = error.as_str()
                );
            }
            _ => *slot = Some(conn),
        }
        result
    }
}

impl<C: Connect> RepositorySession for RaSvnSession<C> {
    fn latest_revision(&self) -> Result<Revnum> {
        self.with_connection("get-latest-rev", |conn| {
            let params = conn.command("get-latest-rev", Vec::new())?;
            params
                .first()
                .and_then(Item::as_number)
                .ok_or_else(|| malformed("get-latest-rev reply without revision"))
        })
    }

    fn stat(&self, path: &str, revision: Revnum) -> Result<Stat> {
        log_ra_debug!("stat", path = path, revision = revision);
        self.with_connection("stat", |conn| {
            let params = conn
                .command(
                    "stat",
                    vec![Item::string(relative_path(path)), revision_param(revision)],
                )
                .map_err(|e| e.at(path, revision))?;
            let entry = params
                .first()
                .and_then(Item::as_list)
                .ok_or_else(|| malformed("stat reply without dirent list"))?;
            match entry.first() {
                // Empty optional tuple: nothing at that path
                None => Err(RaError::NotFound {
                    path: path.to_string(),
                    revision,
                }),
                Some(dirent) => {
                    parse_stat(dirent.as_list().ok_or_else(|| malformed("dirent is not a list"))?)
                }
            }
        })
    }

    fn list_directory(&self, path: &str, revision: Revnum) -> Result<Vec<DirEntry>> {
        log_ra_debug!("get-dir", path = path, revision = revision);
        self.with_connection("get-dir", |conn| {
            let params = conn
                .command(
                    "get-dir",
                    vec![
                        Item::string(relative_path(path)),
                        revision_param(revision),
                        Item::word("false"),
                        Item::word("true"),
                        Item::List(DIRENT_FIELDS.iter().map(|f| Item::word(f)).collect()),
                    ],
                )
                .map_err(|e| e.at(path, revision))?;
            let dirents = params
                .get(2)
                .and_then(Item::as_list)
                .ok_or_else(|| malformed("get-dir reply without entry list"))?;

            dirents
                .iter()
                .map(|dirent| {
                    let fields = dirent
                        .as_list()
                        .ok_or_else(|| malformed("dirent is not a list"))?;
                    let name = fields
                        .first()
                        .and_then(Item::as_text)
                        .ok_or_else(|| malformed("dirent without name"))?;
                    Ok(DirEntry {
                        name,
                        stat: parse_stat(&fields[1..])?,
                    })
                })
                .collect()
        })
    }

    fn fetch_file(&self, path: &str, revision: Revnum, sink: &mut dyn Write) -> Result<u64> {
        log_ra_debug!("get-file", path = path, revision = revision);
        self.with_connection("get-file", |conn| {
            conn.command(
                "get-file",
                vec![
                    Item::string(relative_path(path)),
                    revision_param(revision),
                    // want-props, want-contents, expand-keywords
                    Item::word("false"),
                    Item::word("true"),
                    Item::word("false"),
                ],
            )
            .map_err(|e| e.at(path, revision))?;

            // Content arrives as strings terminated by an empty one. The
            // stream is always drained so the connection stays in step even
            // when the sink gives up.
            let mut written = 0u64;
            let mut sink_error = None;
            loop {
                let chunk = conn.receive()?;
                let bytes = chunk
                    .as_bytes()
                    .ok_or_else(|| malformed("file content chunk is not a string"))?;
                if bytes.is_empty() {
                    break;
                }
                if sink_error.is_none() {
                    match sink.write_all(bytes) {
                        Ok(()) => written += bytes.len() as u64,
                        Err(e) => sink_error = Some(e),
                    }
                }
            }
            conn.read_response().map_err(|e| e.at(path, revision))?;

            match sink_error {
                Some(e) => Err(RaError::Sink(e)),
                None => Ok(written),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};

    const UUID: &str = "0f9a7c3e-5b1d-4c2a-9e8f-112233445566";
    const NO_AUTH: &str = "( success ( ( ) 0: ) ) ";

    fn s(text: &str) -> String {
        format!("{}:{}", text.len(), text)
    }

    fn greeting() -> String {
        "( success ( 2 2 ( ) ( edit-pipeline svndiff1 absent-entries depth log-revprops ) ) ) "
            .to_string()
    }

    fn repos_info() -> String {
        format!(
            "( success ( {} {} ( mergeinfo ) ) ) ",
            s(UUID),
            s("svn://localhost/repo")
        )
    }

    fn handshake() -> String {
        format!("{}{}{}", greeting(), NO_AUTH, repos_info())
    }

    /// Server side of one connection: canned bytes in, captured bytes out.
    struct Scripted {
        input: Cursor<Vec<u8>>,
        output: Arc<Mutex<Vec<u8>>>,
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct ScriptedConnector {
        scripts: Mutex<VecDeque<String>>,
        output: Arc<Mutex<Vec<u8>>>,
        connects: AtomicUsize,
    }

    impl ScriptedConnector {
        fn new(scripts: Vec<String>) -> Self {
            Self {
                scripts: Mutex::new(scripts.into()),
                output: Arc::new(Mutex::new(Vec::new())),
                connects: AtomicUsize::new(0),
            }
        }
    }

    impl Connect for ScriptedConnector {
        type Stream = Scripted;

        fn connect(&self, _url: &RepositoryUrl) -> io::Result<Scripted> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| io::Error::from(io::ErrorKind::ConnectionRefused))?;
            Ok(Scripted {
                input: Cursor::new(script.into_bytes()),
                output: Arc::clone(&self.output),
            })
        }
    }

    fn session(scripts: Vec<String>) -> Result<RaSvnSession<ScriptedConnector>> {
        let url = RepositoryUrl::parse("svn://localhost/repo").unwrap();
        RaSvnSession::with_connector(url, ScriptedConnector::new(scripts))
    }

    fn sent(session: &RaSvnSession<ScriptedConnector>) -> String {
        String::from_utf8(session.connector.output.lock().unwrap().clone()).unwrap()
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_handshake_without_auth() {
        let session = session(vec![handshake()]).unwrap();
        assert_eq!(session.info().uuid, UUID);
        assert_eq!(session.info().root_url, "svn://localhost/repo");
        assert_eq!(session.info().capabilities, vec!["mergeinfo".to_string()]);

        let out = sent(&session);
        assert!(out.starts_with(
            "( 2 ( edit-pipeline svndiff1 absent-entries depth mergeinfo log-revprops ) 20:svn://localhost/repo "
        ));
    }

    #[test]
    fn test_handshake_anonymous_auth() {
        let script = format!(
            "{}( success ( ( ANONYMOUS CRAM-MD5 ) {} ) ) ( success ( ) ) {}",
            greeting(),
            s("<svn://localhost:3690> test"),
            repos_info()
        );
        let session = session(vec![script]).unwrap();
        assert_eq!(session.info().uuid, UUID);
        assert!(sent(&session).ends_with("( ANONYMOUS ( 0: ) ) "));
    }

    #[test]
    fn test_handshake_rejects_auth_without_anonymous() {
        let script = format!(
            "{}( success ( ( CRAM-MD5 ) {} ) ) ",
            greeting(),
            s("realm")
        );
        let err = session(vec![script]).err().unwrap();
        assert!(matches!(err, RaError::Auth(_)));
    }

    #[test]
    fn test_handshake_rejects_protocol_version() {
        let err = session(vec!["( success ( 3 4 ( ) ( ) ) ) ".to_string()])
            .err()
            .unwrap();
        assert!(matches!(err, RaError::Version { min: 3, max: 4 }));
    }

    #[test]
    fn test_latest_revision() {
        let script = format!("{}{}( success ( 42 ) ) ", handshake(), NO_AUTH);
        let session = session(vec![script]).unwrap();
        assert_eq!(session.latest_revision().unwrap(), 42);
        assert!(sent(&session).ends_with("( get-latest-rev ( ) ) "));
    }

    #[test]
    fn test_stat_file_and_absent_path() {
        let script = format!(
            "{}{nb}( success ( ( ( file 11 false 7 ( {} ) ( {} ) ) ) ) ) {nb}( success ( ( ) ) ) ",
            handshake(),
            s("2024-03-01T12:00:00.000000Z"),
            s("alice"),
            nb = NO_AUTH
        );
        let session = session(vec![script]).unwrap();

        let stat = session.stat("/trunk/foo", 7).unwrap();
        assert_eq!(stat.kind, NodeKind::File);
        assert_eq!(stat.size, 11);
        assert_eq!(stat.created_rev, Some(7));
        assert_eq!(
            stat.last_changed,
            Some(UNIX_EPOCH + Duration::from_secs(1_709_294_400))
        );
        assert!(sent(&session).ends_with("( stat ( 9:trunk/foo ( 7 ) ) ) "));

        let err = session.stat("/trunk/nope", 7).unwrap_err();
        assert!(matches!(err, RaError::NotFound { ref path, revision: 7 } if path == "/trunk/nope"));
    }

    #[test]
    fn test_list_directory() {
        let script = format!(
            "{}{}( success ( 7 ( ) ( ( 3:src dir 0 false 5 ( ) ( ) ) ( 9:README.md file 12 false 7 ( ) ( ) ) ) ) ) ",
            handshake(),
            NO_AUTH
        );
        let session = session(vec![script]).unwrap();

        let entries = session.list_directory("/", 7).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "src");
        assert_eq!(entries[0].stat.kind, NodeKind::Directory);
        assert_eq!(entries[1].name, "README.md");
        assert_eq!(entries[1].stat.size, 12);
        assert!(sent(&session).ends_with(
            "( get-dir ( 0: ( 7 ) false true ( kind size has-props created-rev time last-author ) ) ) "
        ));
    }

    #[test]
    fn test_fetch_file_streams_chunks() {
        let script = format!(
            "{}{}( success ( ( {} ) 7 ( ) ) ) 6:hello  5:world 0: ( success ( ) ) ",
            handshake(),
            NO_AUTH,
            s("5eb63bbbe01eeed093cb22bb8f5acdc3")
        );
        let session = session(vec![script]).unwrap();

        let mut sink = Vec::new();
        let n = session.fetch_file("/greeting.txt", 7, &mut sink).unwrap();
        assert_eq!(n, 11);
        assert_eq!(sink, b"hello world");
    }

    #[test]
    fn test_server_failure_keeps_connection() {
        let failure = format!(
            "( failure ( ( 160013 {} {} 42 ) ) ) ",
            s("File not found: revision 7, path '/nope'"),
            s("subversion/libsvn_fs_fs/tree.c")
        );
        let script = format!(
            "{}{nb}{}{nb}( success ( 8 ) ) ",
            handshake(),
            failure,
            nb = NO_AUTH
        );
        let session = session(vec![script]).unwrap();

        let err = session.fetch_file("/nope", 7, &mut Vec::new()).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(session.latest_revision().unwrap(), 8);
        assert_eq!(session.connector.connects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sink_failure_drains_stream() {
        let script = format!(
            "{}{nb}( success ( ( ) 3 ( ) ) ) 3:abc 3:def 0: ( success ( ) ) {nb}( success ( 3 ) ) ",
            handshake(),
            nb = NO_AUTH
        );
        let session = session(vec![script]).unwrap();

        let err = session.fetch_file("/f", 3, &mut FailingSink).unwrap_err();
        assert!(matches!(err, RaError::Sink(_)));
        assert_eq!(session.latest_revision().unwrap(), 3);
        assert_eq!(session.connector.connects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reconnect_after_transport_failure() {
        let broken = format!("{}{}( success ( ", handshake(), NO_AUTH);
        let healthy = format!("{}{}( success ( 9 ) ) ", handshake(), NO_AUTH);
        let session = session(vec![broken, healthy]).unwrap();

        let err = session.latest_revision().unwrap_err();
        assert!(matches!(err, RaError::Io(_)));
        assert_eq!(session.latest_revision().unwrap(), 9);
        assert_eq!(session.connector.connects.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_server_error_chain() {
        let errors = vec![
            Item::List(vec![
                Item::Number(210005),
                Item::string("outer"),
                Item::string("f.c"),
                Item::Number(1),
            ]),
            Item::List(vec![
                Item::Number(160006),
                Item::string("No such revision 99"),
                Item::string("g.c"),
                Item::Number(2),
            ]),
        ];
        match server_error(&errors) {
            RaError::Server { code, message } => {
                assert_eq!(code, 160006);
                assert_eq!(message, "outer: No such revision 99");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(server_error(&[]), RaError::Malformed(_)));
    }
}
