use std::fs::File;
use std::io::Read;

use async_trait::async_trait;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpResult, FtpStream};
use tracing::{debug, info};

use super::{join_relative, parent_segments, PlacementTarget, StagedFile};
use crate::core::error::{UpdaterError, UpdaterResult};
use crate::core::manifest::FtpSettings;

/// The blocking FTP commands the target issues. Paths are absolute.
pub trait FtpSession: Send + 'static {
    fn cwd(&mut self, dir: &str) -> FtpResult<()>;
    fn mkdir(&mut self, dir: &str) -> FtpResult<()>;
    fn put(&mut self, path: &str, reader: &mut dyn Read) -> FtpResult<u64>;
    fn rm(&mut self, path: &str) -> FtpResult<()>;
    fn rename(&mut self, from: &str, to: &str) -> FtpResult<()>;
    /// `None` when the server refuses the transfer, which is how a missing
    /// file shows up.
    fn retr(&mut self, path: &str) -> FtpResult<Option<Vec<u8>>>;
    fn quit(&mut self) -> FtpResult<()>;
}

impl FtpSession for FtpStream {
    fn cwd(&mut self, dir: &str) -> FtpResult<()> {
        FtpStream::cwd(self, dir)
    }

    fn mkdir(&mut self, dir: &str) -> FtpResult<()> {
        FtpStream::mkdir(self, dir)
    }

    fn put(&mut self, path: &str, mut reader: &mut dyn Read) -> FtpResult<u64> {
        self.put_file(path, &mut reader)
    }

    fn rm(&mut self, path: &str) -> FtpResult<()> {
        FtpStream::rm(self, path)
    }

    fn rename(&mut self, from: &str, to: &str) -> FtpResult<()> {
        FtpStream::rename(self, from, to)
    }

    fn retr(&mut self, path: &str) -> FtpResult<Option<Vec<u8>>> {
        match self.retr_as_buffer(path) {
            Ok(buffer) => Ok(Some(buffer.into_inner())),
            Err(e @ FtpError::UnexpectedResponse(_)) => {
                debug!("{} not readable: {}", path, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn quit(&mut self) -> FtpResult<()> {
        FtpStream::quit(self)
    }
}

/// Places artifacts on an FTP server.
///
/// Every command addresses an absolute path computed from the directory
/// captured at login, so the session's working directory never matters.
/// The session is blocking; each command runs on the blocking pool with the
/// session moved in and handed back afterwards.
pub struct FtpTarget<S: FtpSession = FtpStream> {
    stream: Option<S>,
    host: String,
    base_dir: String,
}

impl FtpTarget<FtpStream> {
    /// Connect, log in and make sure the remote base directory exists.
    pub async fn connect(settings: &FtpSettings) -> UpdaterResult<Self> {
        info!("Connecting to FTP server at {}:{}", settings.host, settings.port);

        let settings = settings.clone();
        let host = settings.host.clone();
        let (stream, base_dir) = tokio::task::spawn_blocking(move || {
            let mut stream = FtpStream::connect((settings.host.as_str(), settings.port))?;
            stream.login(settings.username.as_str(), settings.password.as_str())?;
            stream.transfer_type(FileType::Binary)?;

            let home = stream.pwd()?;
            let base_dir = if settings.remote_path.is_empty() {
                home
            } else {
                let wanted = absolute_path(&home, &settings.remote_path);
                ensure_directories(&mut stream, &wanted)?;
                stream.cwd(&wanted)?;
                stream.pwd()?
            };
            Ok::<_, UpdaterError>((stream, base_dir))
        })
        .await
        .map_err(|e| UpdaterError::Other(format!("FTP connect task failed: {}", e)))??;

        info!("FTP login successful, base directory {}", base_dir);
        Ok(Self::from_session(stream, host, base_dir))
    }
}

impl<S: FtpSession> FtpTarget<S> {
    /// Wrap a logged-in session whose base directory is `base_dir`.
    pub(crate) fn from_session(session: S, host: String, base_dir: String) -> Self {
        Self {
            stream: Some(session),
            host,
            base_dir,
        }
    }

    fn absolute(&self, relative: &str) -> String {
        absolute_path(&self.base_dir, relative)
    }

    async fn with_session<T, F>(&mut self, op: F) -> UpdaterResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut S) -> UpdaterResult<T> + Send + 'static,
    {
        let mut stream = self.stream.take().ok_or(UpdaterError::FtpSessionLost)?;
        let (stream, result) = tokio::task::spawn_blocking(move || {
            let result = op(&mut stream);
            (stream, result)
        })
        .await
        .map_err(|e| UpdaterError::Other(format!("FTP task failed: {}", e)))?;
        self.stream = Some(stream);
        result
    }
}

/// `relative` resolved against the absolute directory `base`.
fn absolute_path(base: &str, relative: &str) -> String {
    if relative.starts_with('/') {
        return format!("/{}", join_relative("", relative));
    }
    let base = base.trim_end_matches('/');
    let joined = join_relative(base, relative);
    format!("/{}", joined)
}

/// Create each missing directory along the absolute path `dir`.
fn ensure_directories<S: FtpSession>(stream: &mut S, dir: &str) -> UpdaterResult<()> {
    let mut current = String::new();
    for segment in dir.split('/').filter(|s| !s.is_empty()) {
        current.push('/');
        current.push_str(segment);
        if stream.cwd(&current).is_err() {
            debug!("Creating FTP directory {}", current);
            stream.mkdir(&current)?;
        }
    }
    Ok(())
}

#[async_trait]
impl<S: FtpSession> PlacementTarget for FtpTarget<S> {
    fn describe(&self) -> String {
        format!("ftp://{}{}", self.host, self.base_dir)
    }

    async fn place(&mut self, relative: &str, staged: StagedFile) -> UpdaterResult<()> {
        let dest = self.absolute(relative);
        let parent = self.absolute(&parent_segments(relative).join("/"));

        self.with_session(move |stream| {
            ensure_directories(stream, &parent)?;

            let mut file = File::open(staged.path()).map_err(|source| UpdaterError::Io {
                path: staged.path().to_path_buf(),
                source,
            })?;
            let written = stream.put(&dest, &mut file)?;
            debug!("Stored {} ({} bytes)", dest, written);
            Ok(())
        })
        .await
    }

    async fn remove(&mut self, relative: &str) -> UpdaterResult<()> {
        let path = self.absolute(relative);
        self.with_session(move |stream| Ok(stream.rm(&path)?)).await
    }

    async fn read_document(&mut self, name: &str) -> UpdaterResult<Option<Vec<u8>>> {
        let path = self.absolute(name);
        self.with_session(move |stream| Ok(stream.retr(&path)?)).await
    }

    async fn write_document(&mut self, name: &str, contents: &[u8]) -> UpdaterResult<()> {
        let path = self.absolute(name);
        let tmp = self.absolute(&format!("{}.tmp", name));
        let contents = contents.to_vec();

        self.with_session(move |stream| {
            stream.put(&tmp, &mut contents.as_slice())?;
            if stream.rename(&tmp, &path).is_err() {
                // some servers refuse to rename over an existing file
                let _ = stream.rm(&path);
                stream.rename(&tmp, &path)?;
            }
            Ok(())
        })
        .await
    }

    async fn close(&mut self) -> UpdaterResult<()> {
        if self.stream.is_none() {
            return Ok(());
        }
        self.with_session(|stream| Ok(stream.quit()?)).await?;
        self.stream = None;
        info!("FTP session closed");
        Ok(())
    }
}
