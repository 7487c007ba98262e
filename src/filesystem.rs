use crate::forms::UploadPayload;
use actix_files::NamedFile;
use actix_web::{error, get, web, Error};
use anyhow::Context;
use once_cell::sync::OnceCell;
use std::path::PathBuf;

static DIR_MEDIA: OnceCell<PathBuf> = OnceCell::new();

pub fn init() {
    let dir = std::env::var("DIR_MEDIA")
        .expect("missing DIR_MEDIA environment variable (hint: 'DIR_MEDIA=./media')");
    let path = PathBuf::from(dir);
    if !path.exists() {
        std::fs::DirBuilder::new()
            .recursive(true)
            .create(&path)
            .expect("failed to create DIR_MEDIA");
    }
    DIR_MEDIA.set(path).expect("DIR_MEDIA set twice");
}

fn get_media_dir() -> &'static PathBuf {
    DIR_MEDIA.get().expect("filesystem::init() was not called")
}

pub fn get_file_url_by_filename(filename: &str) -> String {
    format!("/media/{}", filename)
}

/// Writes an upload into the media directory under its content hash and
/// returns the stored filename. Re-uploads of identical content land on
/// the same name and are skipped.
pub fn save_upload(payload: &UploadPayload) -> anyhow::Result<String> {
    let hash = blake3::hash(&payload.data);
    let filename = match payload.filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!("{}.{}", hash.to_hex(), ext),
        _ => hash.to_hex().to_string(),
    };

    let path = get_media_dir().join(&filename);
    if path.exists() {
        log::info!("save_upload: duplicate upload, skipping write");
    } else {
        std::fs::write(&path, &payload.data)
            .with_context(|| format!("save_upload: failed to write {:?}", path))?;
    }

    Ok(filename)
}

#[get("/media/{filename}")]
pub async fn view_file(path: web::Path<String>) -> Result<NamedFile, Error> {
    let filename = path.into_inner();
    // Stored names are content hashes; anything path-like is malicious.
    if filename.contains('/') || filename.contains("..") {
        return Err(error::ErrorNotFound("File not found."));
    }

    NamedFile::open(get_media_dir().join(filename))
        .map_err(|_| error::ErrorNotFound("File not found."))
}
