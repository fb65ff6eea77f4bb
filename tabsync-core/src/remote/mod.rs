use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};

use crate::error::{Result, SyncError};
use crate::options::RemoteConfig;

pub mod session;

pub use session::Session;

pub const VERSION_HEADER: &str = "x-tabsync-version";
pub const CHECKSUM_HEADER: &str = "x-tabsync-checksum";

/// HTTP endpoint that hosts transfer sessions.
pub struct Remote {
    http: reqwest::Client,
    base: Url,
    auth: Option<(String, Option<String>)>,
    version: String,
}

impl Remote {
    pub fn new(cfg: &RemoteConfig) -> Result<Self> {
        let mut base = Url::parse(&cfg.url)
            .map_err(|e| SyncError::Config(format!("remote url `{}`: {e}", cfg.url)))?;
        if base.cannot_be_a_base() {
            return Err(SyncError::Config(format!(
                "remote url `{}` is not a base url",
                cfg.url
            )));
        }

        // Credentials travel as basic auth, never inside request paths.
        let auth = if base.username().is_empty() {
            None
        } else {
            Some((
                base.username().to_string(),
                base.password().map(str::to_owned),
            ))
        };
        let _ = base.set_username("");
        let _ = base.set_password(None);

        let mut builder = reqwest::Client::builder();
        if let Some(t) = cfg.timeout {
            builder = builder.timeout(t);
        }
        if let Some(t) = cfg.connect_timeout {
            builder = builder.connect_timeout(t);
        }

        Ok(Self {
            http: builder.build()?,
            base,
            auth,
            version: cfg.version.clone(),
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut u = self.base.clone();
        if segments.is_empty() {
            return Ok(u);
        }
        {
            let mut path = u
                .path_segments_mut()
                .map_err(|_| SyncError::Config(format!("cannot extend remote url {}", self.base)))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(u)
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let rb = self
            .http
            .request(method, url)
            .header(VERSION_HEADER, &self.version);
        match &self.auth {
            Some((user, pass)) => rb.basic_auth(user, pass.as_ref()),
            None => rb,
        }
    }

    pub(crate) async fn send(&self, rb: RequestBuilder) -> Result<Response> {
        check(rb.send().await?).await
    }

    /// Handshake against the server root.
    pub async fn verify(&self) -> Result<()> {
        let url = self.url(&[])?;
        self.send(self.request(Method::GET, url)).await?;
        tracing::debug!(remote = %self.base, version = %self.version, "handshake ok");
        Ok(())
    }

    pub async fn open_session(&self) -> Result<Session<'_>> {
        let url = self.url(&["sessions"])?;
        let resp = self.send(self.request(Method::POST, url)).await?;
        let body = resp.text().await?;
        let id = session_id(&body)
            .ok_or_else(|| SyncError::Protocol(format!("no session id in `{}`", body.trim())))?;
        tracing::info!(session = %id, remote = %self.base, "session opened");
        Ok(Session::new(self, id))
    }
}

/// Accepts a bare id as well as a path or URL ending in it.
fn session_id(body: &str) -> Option<String> {
    body.trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Maps the statuses every endpoint shares onto the error taxonomy.
pub(crate) async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    match status {
        StatusCode::EXPECTATION_FAILED => {
            Err(SyncError::VersionMismatch(resp.text().await.unwrap_or_default()))
        }
        StatusCode::UNAUTHORIZED => Err(SyncError::Unauthorized),
        _ => Err(SyncError::Http {
            status: status.as_u16(),
            body: resp.text().await.unwrap_or_default(),
        }),
    }
}
