use std::path::{Component, Path as FsPath, PathBuf};

use axum::{
    debug_handler,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use mime_sniffer::MimeTypeSniffer;

/// Filesystem-backed object store. Uploads land under
/// `{root}/{room_id}/{file_name}` and are served back at `/files/{path}`.
#[derive(Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Collision-avoidance name: current millis plus the original name with
    /// spaces replaced. Only the final path component of the client-supplied
    /// name is kept.
    pub fn stored_name(file_name: &str, now_millis: i64) -> String {
        let base = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(file_name)
            .replace(' ', "_");
        format!("{now_millis}_{base}")
    }

    /// Writes the payload and returns the stored-path token.
    pub async fn upload(
        &self,
        room_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> anyhow::Result<String> {
        let dir = self.root.join(room_id);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(file_name), bytes).await?;
        Ok(format!("{room_id}/{file_name}"))
    }

    /// Resolves a stored-path token to the URL clients fetch it from.
    pub fn public_url(&self, path: &str) -> String {
        format!("/files/{path}")
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        // reject anything that would escape the root
        let rel = FsPath::new(path);
        if rel.components().any(|c| !matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(self.root.join(rel))
    }
}

#[debug_handler(state = crate::AppState)]
pub async fn serve(
    State(storage): State<Storage>,
    Path(path): Path<String>,
) -> Response {
    let Some(full) = storage.resolve(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match tokio::fs::read(full).await {
        Ok(bytes) => {
            // sniffed from the payload; links should render, not download
            let mime = bytes
                .sniff_mime_type()
                .unwrap_or("application/octet-stream")
                .to_owned();
            ([(header::CONTENT_TYPE, mime)], bytes).into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_name_replaces_spaces_and_prefixes_millis() {
        assert_eq!(
            Storage::stored_name("my holiday pic.png", 1700000000000),
            "1700000000000_my_holiday_pic.png"
        );
    }

    #[test]
    fn stored_name_drops_directories() {
        assert_eq!(
            Storage::stored_name("../../etc/passwd", 1),
            "1_passwd"
        );
        assert_eq!(
            Storage::stored_name("C:\\Users\\me\\cat.jpg", 1),
            "1_cat.jpg"
        );
    }

    #[test]
    fn public_url_is_namespaced_under_files() {
        let storage = Storage::new("files");
        assert_eq!(storage.public_url("abc/1_x.png"), "/files/abc/1_x.png");
    }

    #[test]
    fn resolve_rejects_traversal() {
        let storage = Storage::new("files");
        assert!(storage.resolve("../secret").is_none());
        assert!(storage.resolve("/etc/passwd").is_none());
        assert!(storage.resolve("room/1_a.png").is_some());
    }

    #[tokio::test]
    async fn serve_sets_a_sniffed_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path());
        let png = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR";
        storage.upload("r1", "1_a.png", png).await.unwrap();

        let resp = serve(State(storage), Path("r1/1_a.png".to_owned())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );
    }

    #[tokio::test]
    async fn serve_misses_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path());

        let resp = serve(State(storage), Path("r1/nope.png".to_owned())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_round_trips_through_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path());

        let path = storage.upload("room1", "1_a.txt", b"hello").await.unwrap();
        assert_eq!(path, "room1/1_a.txt");
        assert_eq!(storage.public_url(&path), "/files/room1/1_a.txt");

        let bytes = tokio::fs::read(dir.path().join("room1/1_a.txt")).await.unwrap();
        assert_eq!(bytes, b"hello");
    }
}
