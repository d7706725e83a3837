//! Concurrent tile download.
//!
//! Tiles are fetched by a bounded set of tasks sharing one semaphore, and a
//! single collector gathers the results. The first failure closes the
//! semaphore so queued fetches never start; fetches already running are
//! awaited, never cancelled mid-write. A reconstruction either has all of
//! its tiles or produces nothing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{FetchError, ReconstructError};
use crate::io::HttpClient;
use crate::pyramid::TileIdentifier;

/// Default number of tiles fetched at once.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// Upper bound on concurrent tile fetches.
pub const MAX_FETCH_CONCURRENCY: usize = 64;

/// Outcome of a successful [`TileFetcher::fetch_tiles`] call.
#[derive(Debug, Clone, Default)]
pub struct FetchSummary {
    /// Local tile files, in the same order as the requested identifiers
    pub paths: Vec<PathBuf>,

    /// Total bytes downloaded
    pub bytes: u64,
}

/// Downloads tiles into a local directory.
pub struct TileFetcher<C: HttpClient + 'static> {
    client: Arc<C>,
    concurrency: usize,
}

impl<C: HttpClient + 'static> TileFetcher<C> {
    /// Create a fetcher with the default concurrency.
    pub fn new(client: Arc<C>) -> Self {
        Self::with_concurrency(client, DEFAULT_FETCH_CONCURRENCY)
    }

    /// Create a fetcher with a custom concurrency, clamped to
    /// `1..=MAX_FETCH_CONCURRENCY`.
    pub fn with_concurrency(client: Arc<C>, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.clamp(1, MAX_FETCH_CONCURRENCY),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetch every tile and write it to `destination/{tier}-{x}-{y}.jpg`.
    ///
    /// `destination` must already exist; it is never created here.
    ///
    /// # Errors
    ///
    /// - [`ReconstructError::TileFetch`] for the first tile whose request fails
    ///   or returns an empty body
    /// - [`ReconstructError::TileWrite`] if a tile cannot be written
    ///
    /// Once a tile fails no further fetch is started. Fetches already in
    /// flight run to completion before this returns, so nothing writes into
    /// `destination` afterwards.
    pub async fn fetch_tiles(
        &self,
        identifiers: &[TileIdentifier],
        destination: &Path,
    ) -> Result<FetchSummary, ReconstructError> {
        if !destination.is_dir() {
            return Err(ReconstructError::TileWrite {
                path: destination.to_path_buf(),
                message: "destination directory does not exist".to_string(),
            });
        }

        info!(
            tiles = identifiers.len(),
            concurrency = self.concurrency,
            "Fetching tiles"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut downloads = JoinSet::new();

        for (index, identifier) in identifiers.iter().enumerate() {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let identifier = identifier.clone();
            let path = destination.join(identifier.file_name());

            downloads.spawn(async move {
                // A closed semaphore means another tile already failed
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return Ok(None);
                };

                let len = fetch_tile(client.as_ref(), &identifier, &path).await?;
                Ok::<_, ReconstructError>(Some((index, path, len)))
            });
        }

        let mut paths: Vec<Option<PathBuf>> = vec![None; identifiers.len()];
        let mut bytes = 0u64;
        let mut completed = 0usize;
        let mut failure: Option<ReconstructError> = None;

        // Drain every task, even after a failure: a tile write still in
        // progress must finish before the caller removes `destination`.
        while let Some(joined) = downloads.join_next().await {
            let error = match joined {
                Ok(Ok(Some((index, path, len)))) => {
                    completed += 1;
                    bytes += len;
                    paths[index] = Some(path);
                    continue;
                }
                Ok(Ok(None)) => continue,
                Ok(Err(e)) => e,
                Err(join_err) => ReconstructError::Task(join_err.to_string()),
            };

            if failure.is_none() {
                warn!(error = %error, completed = completed, "Tile fetch failed, skipping remaining fetches");
                semaphore.close();
                failure = Some(error);
            } else {
                debug!(error = %error, "Additional tile fetch failure");
            }
        }

        if let Some(error) = failure {
            return Err(error);
        }

        info!(tiles = completed, bytes = bytes, "All tiles fetched");

        Ok(FetchSummary {
            paths: paths.into_iter().flatten().collect(),
            bytes,
        })
    }
}

/// Fetch one tile and write it to `path`, returning the byte count.
async fn fetch_tile<C: HttpClient + ?Sized>(
    client: &C,
    identifier: &TileIdentifier,
    path: &Path,
) -> Result<u64, ReconstructError> {
    let data = client
        .get(&identifier.url)
        .await
        .map_err(|source| ReconstructError::TileFetch {
            url: identifier.url.clone(),
            source,
        })?;

    if data.is_empty() {
        return Err(ReconstructError::TileFetch {
            url: identifier.url.clone(),
            source: FetchError::EmptyBody {
                url: identifier.url.clone(),
            },
        });
    }

    tokio::fs::write(path, &data)
        .await
        .map_err(|e| ReconstructError::TileWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    debug!(tile = %identifier, group = identifier.group, bytes = data.len(), "Tile fetched");

    Ok(data.len() as u64)
}
