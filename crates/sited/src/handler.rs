//! Request routing and cache-backed file serving.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use sitecache::SiteCache;
use tracing::{debug, warn};

use crate::http::{Request, Response, Status};
use crate::mime::mime_type;

/// Served when the server-files directory has no 404.html of its own.
const FALLBACK_404_BODY: &[u8] =
    b"<html><head><title>404 Not Found</title></head><body><h1>404 Not Found</h1></body></html>\n";

/// Routes parsed requests to the d20 endpoint or the cached file store.
pub struct RequestHandler {
    root: PathBuf,
    server_files: PathBuf,
    cache: Arc<SiteCache>,
}

impl RequestHandler {
    pub fn new(root: PathBuf, server_files: PathBuf, cache: Arc<SiteCache>) -> Self {
        Self {
            root,
            server_files,
            cache,
        }
    }

    /// Produce the response for one parsed request.
    pub fn handle(&self, request: &Request) -> Response {
        if request.method != "GET" {
            return self.not_found();
        }

        match request.path.as_str() {
            "/d20" => roll_d20(),
            _ => self.serve_file(&request.path),
        }
    }

    /// Serve a file from the cache, falling back to disk on a miss.
    ///
    /// Freshly loaded files are put into the cache before responding, so the
    /// next request for the same path is a hit.
    fn serve_file(&self, raw_path: &str) -> Response {
        let path = if raw_path == "/" { "/index.html" } else { raw_path };

        if let Some(resource) = self.cache.get(path) {
            debug!("Cache hit for {}", path);
            return Response::new(
                Status::Ok,
                resource.content_type(),
                resource.content().to_vec(),
            );
        }

        let file_path = match resolve_under(&self.root, path) {
            Some(p) => p,
            None => {
                warn!("Rejected path escaping the web root: {}", path);
                return self.not_found();
            }
        };

        match fs::read(&file_path) {
            Ok(body) => {
                let content_type = mime_type(path);
                if let Err(e) = self.cache.put(path, content_type, &body) {
                    warn!("Could not cache {}: {}", path, e);
                }
                debug!("Loaded {} from disk ({} bytes)", path, body.len());
                Response::new(Status::Ok, content_type, body)
            }
            Err(e) => {
                debug!("No file for {}: {}", path, e);
                self.not_found()
            }
        }
    }

    /// Build the 404 response from server-files/404.html, or the built-in
    /// body when that page is missing.
    fn not_found(&self) -> Response {
        let body = fs::read(self.server_files.join("404.html"))
            .unwrap_or_else(|_| FALLBACK_404_BODY.to_vec());
        Response::new(Status::NotFound, "text/html", body)
    }
}

/// Respond with a random 1-20 roll as text/plain.
fn roll_d20() -> Response {
    let roll = fastrand::u8(1..=20);
    Response::new(Status::Ok, "text/plain", format!("{}\n", roll).into_bytes())
}

/// Join `path` under `root`, refusing any component that could climb out of
/// the root (`..`, absolute segments, drive prefixes).
fn resolve_under(root: &Path, path: &str) -> Option<PathBuf> {
    let rel = Path::new(path.trim_start_matches('/'));
    for component in rel.components() {
        match component {
            Component::Normal(_) => {}
            _ => return None,
        }
    }
    Some(root.join(rel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn get(path: &str) -> Request {
        Request {
            method: "GET".to_string(),
            path: path.to_string(),
        }
    }

    fn handler_with_capacity(capacity: usize) -> (TempDir, TempDir, RequestHandler) {
        let root = TempDir::new().unwrap();
        let files = TempDir::new().unwrap();
        let cache = Arc::new(SiteCache::new(capacity).unwrap());
        let handler = RequestHandler::new(
            root.path().to_path_buf(),
            files.path().to_path_buf(),
            cache,
        );
        (root, files, handler)
    }

    #[test]
    fn serves_file_from_disk() {
        let (root, _files, handler) = handler_with_capacity(10);
        fs::write(root.path().join("hello.txt"), "hi there").unwrap();

        let resp = handler.handle(&get("/hello.txt"));

        assert_eq!(resp.status, Status::Ok);
        assert_eq!(resp.content_type, "text/plain");
        assert_eq!(resp.body, b"hi there");
    }

    #[test]
    fn second_request_is_served_from_cache() {
        let (root, _files, handler) = handler_with_capacity(10);
        let on_disk = root.path().join("page.html");
        fs::write(&on_disk, "<p>cached</p>").unwrap();

        handler.handle(&get("/page.html"));
        fs::remove_file(&on_disk).unwrap();

        // The file is gone from disk but must still come out of the cache.
        let resp = handler.handle(&get("/page.html"));
        assert_eq!(resp.status, Status::Ok);
        assert_eq!(resp.body, b"<p>cached</p>");
        assert_eq!(handler.cache.stats().hits(), 1);
        assert_eq!(handler.cache.stats().misses(), 1);
    }

    #[test]
    fn root_maps_to_index_html() {
        let (root, _files, handler) = handler_with_capacity(10);
        fs::write(root.path().join("index.html"), "<h1>home</h1>").unwrap();

        let resp = handler.handle(&get("/"));

        assert_eq!(resp.status, Status::Ok);
        assert_eq!(resp.content_type, "text/html");
        assert_eq!(resp.body, b"<h1>home</h1>");
    }

    #[test]
    fn missing_file_uses_custom_404_page() {
        let (_root, files, handler) = handler_with_capacity(10);
        fs::write(files.path().join("404.html"), "<h1>gone</h1>").unwrap();

        let resp = handler.handle(&get("/nope.html"));

        assert_eq!(resp.status, Status::NotFound);
        assert_eq!(resp.content_type, "text/html");
        assert_eq!(resp.body, b"<h1>gone</h1>");
    }

    #[test]
    fn missing_404_page_falls_back_to_builtin() {
        let (_root, _files, handler) = handler_with_capacity(10);

        let resp = handler.handle(&get("/nope.html"));

        assert_eq!(resp.status, Status::NotFound);
        assert_eq!(resp.body, FALLBACK_404_BODY);
    }

    #[test]
    fn non_get_methods_are_not_found() {
        let (root, _files, handler) = handler_with_capacity(10);
        fs::write(root.path().join("index.html"), "x").unwrap();

        let resp = handler.handle(&Request {
            method: "POST".to_string(),
            path: "/index.html".to_string(),
        });

        assert_eq!(resp.status, Status::NotFound);
    }

    #[test]
    fn parent_traversal_is_rejected() {
        let (root, _files, handler) = handler_with_capacity(10);
        fs::write(root.path().join("ok.txt"), "fine").unwrap();

        let resp = handler.handle(&get("/../ok.txt"));
        assert_eq!(resp.status, Status::NotFound);

        let resp = handler.handle(&get("/a/../../ok.txt"));
        assert_eq!(resp.status, Status::NotFound);
    }

    #[test]
    fn d20_rolls_in_range() {
        for _ in 0..50 {
            let resp = roll_d20();
            assert_eq!(resp.status, Status::Ok);
            assert_eq!(resp.content_type, "text/plain");

            let text = String::from_utf8(resp.body).unwrap();
            let roll: u8 = text.trim().parse().unwrap();
            assert!((1..=20).contains(&roll), "roll {} out of range", roll);
        }
    }

    #[test]
    fn d20_is_never_cached() {
        let (_root, _files, handler) = handler_with_capacity(10);

        handler.handle(&get("/d20"));
        handler.handle(&get("/d20"));

        assert!(handler.cache.is_empty());
    }

    #[test]
    fn cache_evicts_oldest_file_at_capacity() {
        let (root, _files, handler) = handler_with_capacity(2);
        for name in ["a.txt", "b.txt", "c.txt"] {
            fs::write(root.path().join(name), name).unwrap();
        }

        handler.handle(&get("/a.txt"));
        handler.handle(&get("/b.txt"));
        handler.handle(&get("/c.txt")); // pushes /a.txt out

        assert_eq!(handler.cache.keys(), vec!["/c.txt", "/b.txt"]);
        assert_eq!(handler.cache.stats().evictions(), 1);
    }

    #[test]
    fn subdirectory_paths_resolve() {
        let (root, _files, handler) = handler_with_capacity(10);
        fs::create_dir(root.path().join("css")).unwrap();
        fs::write(root.path().join("css/site.css"), "body{}").unwrap();

        let resp = handler.handle(&get("/css/site.css"));

        assert_eq!(resp.status, Status::Ok);
        assert_eq!(resp.content_type, "text/css");
        assert_eq!(resp.body, b"body{}");
    }
}
