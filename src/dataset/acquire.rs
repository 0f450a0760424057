//! Idempotent download cache for the remote dataset

use crate::config::DataSourceConfig;
use crate::error::{AnalysisError, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Make sure the dataset exists at the cache path, downloading it if absent
///
/// An existing file is never re-fetched. When `expected_sha256` is set the
/// cached (or freshly downloaded) file must match it.
pub fn ensure_cached(source: &DataSourceConfig) -> Result<PathBuf> {
    let path = source.cache_path.clone();

    if path.exists() {
        tracing::info!("Using cached dataset at {}", path.display());
    } else {
        let url = source
            .url
            .as_deref()
            .ok_or_else(|| AnalysisError::NoSource {
                path: path.display().to_string(),
            })?;
        download(url, &path)?;
    }

    if let Some(expected) = &source.expected_sha256 {
        verify_checksum(&path, expected)?;
    }

    Ok(path)
}

/// Hex-encoded SHA-256 digest of a file
pub fn sha256_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let bytes = fs::read(path.as_ref())?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    let found = sha256_file(path)?;
    if !found.eq_ignore_ascii_case(expected.trim()) {
        return Err(AnalysisError::ChecksumMismatch {
            path: path.display().to_string(),
            expected: expected.to_string(),
            found,
        });
    }
    tracing::debug!("Checksum verified for {}", path.display());
    Ok(())
}

/// Fetch `url` into `dest` through a sibling `.part` file
fn download(url: &str, dest: &Path) -> Result<()> {
    tracing::info!("Downloading dataset from {}", url);

    let download_err = |reason: String| AnalysisError::Download {
        url: url.to_string(),
        reason,
    };

    let response = reqwest::blocking::get(url).map_err(|e| download_err(e.to_string()))?;
    if !response.status().is_success() {
        return Err(download_err(format!("HTTP status {}", response.status())));
    }
    let bytes = response.bytes().map_err(|e| download_err(e.to_string()))?;

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let partial = partial_path(dest);
    fs::write(&partial, &bytes)?;
    fs::rename(&partial, dest)?;

    tracing::info!("Cached {} bytes at {}", bytes.len(), dest.display());
    Ok(())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Serve one HTTP response on a loopback port, then close the listener
    fn serve_once(status: &str, body: &'static str) -> (String, JoinHandle<()>) {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/bdg_data.csv", listener.local_addr().unwrap());
        let status = status.to_string();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request: Vec<u8> = Vec::new();
            let mut buf = [0u8; 512];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        });

        (url, handle)
    }

    fn source(path: PathBuf, url: Option<&str>, sha: Option<&str>) -> DataSourceConfig {
        DataSourceConfig {
            url: url.map(str::to_string),
            cache_path: path,
            expected_sha256: sha.map(str::to_string),
        }
    }

    #[test]
    fn test_cached_file_is_not_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "cached").unwrap();

        // An unusable URL proves no network access happens
        let resolved = ensure_cached(&source(path.clone(), Some("not a url"), None)).unwrap();
        assert_eq!(resolved, path);
        assert_eq!(fs::read_to_string(&path).unwrap(), "cached");
    }

    #[test]
    fn test_missing_cache_without_url() {
        let dir = tempfile::tempdir().unwrap();
        let err = ensure_cached(&source(dir.path().join("data.csv"), None, None)).unwrap_err();
        assert!(matches!(err, AnalysisError::NoSource { .. }));
    }

    #[test]
    fn test_bad_url_is_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let err = ensure_cached(&source(path.clone(), Some("not a url"), None)).unwrap_err();
        assert!(matches!(err, AnalysisError::Download { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_sha256_file_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        fs::write(&path, "abc").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_checksum_pinning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        fs::write(&path, "abc").unwrap();

        let good = "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD";
        assert!(ensure_cached(&source(path.clone(), None, Some(good))).is_ok());

        let err = ensure_cached(&source(path, None, Some("deadbeef"))).unwrap_err();
        assert!(matches!(err, AnalysisError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_partial_path_is_sibling() {
        let p = partial_path(Path::new("cache/bdg_data.csv"));
        assert_eq!(p, PathBuf::from("cache/bdg_data.csv.part"));
    }

    #[test]
    fn test_download_caches_exact_body() {
        let body = "treatment,bully,kept\nC,0,40\n";
        let (url, server) = serve_once("200 OK", body);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bdg_data.csv");

        let resolved = ensure_cached(&source(path.clone(), Some(&url), None)).unwrap();
        server.join().unwrap();

        assert_eq!(resolved, path);
        assert_eq!(fs::read_to_string(&path).unwrap(), body);
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_second_call_uses_cache_without_server() {
        let body = "treatment,bully,kept\nMD,1,60\n";
        let (url, server) = serve_once("200 OK", body);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bdg_data.csv");
        let src = source(path.clone(), Some(&url), None);

        ensure_cached(&src).unwrap();
        server.join().unwrap();

        // The listener is gone, so any fetch would now fail
        let resolved = ensure_cached(&src).unwrap();
        assert_eq!(resolved, path);
        assert_eq!(fs::read_to_string(&path).unwrap(), body);
    }

    #[test]
    fn test_http_error_leaves_no_file() {
        let (url, server) = serve_once("404 Not Found", "missing");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bdg_data.csv");

        let err = ensure_cached(&source(path.clone(), Some(&url), None)).unwrap_err();
        server.join().unwrap();

        match err {
            AnalysisError::Download { reason, .. } => assert!(reason.contains("404")),
            other => panic!("expected download error, got {other:?}"),
        }
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }
}
