use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use aws_sdk_s3::primitives::ByteStream;
use sha2::{Digest, Sha256};
use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::common::errors::Error;
use crate::stack::CodeLocation;

const ASSET_PREFIX: &str = "assets";
const BOOTSTRAP_ENTRY: &str = "bootstrap";

/// A zipped function artifact, addressed by the hash of its archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub sha256: String,
    pub key: String,
    pub archive: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    AlreadyPresent,
}

/// Zips `path`. A directory is archived recursively with its relative layout; a
/// single file becomes the `bootstrap` entry of a custom runtime.
pub fn package(path: &Path) -> Result<Asset, Error> {
    let metadata = fs::metadata(path).map_err(|err| {
        Error::Asset(format!("artifact not found at {}: {err}", path.display()))
    })?;

    let entries = if metadata.is_dir() {
        let mut files = Vec::new();
        collect_files(path, &mut files)?;
        files.sort();
        if files.is_empty() {
            return Err(Error::Asset(format!("{} contains no files", path.display())));
        }
        files
            .into_iter()
            .map(|file| {
                let name = entry_name(path, &file)?;
                Ok((name, file))
            })
            .collect::<Result<Vec<_>, Error>>()?
    } else {
        vec![(BOOTSTRAP_ENTRY.to_string(), path.to_path_buf())]
    };

    let archive = write_archive(&entries)?;
    let sha256 = format!("{:x}", Sha256::digest(&archive));
    let key = format!("{ASSET_PREFIX}/{sha256}.zip");
    info!("Packaged {} into {key} ({} bytes)", path.display(), archive.len());

    Ok(Asset {
        sha256,
        key,
        archive,
    })
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), Error> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

fn entry_name(root: &Path, file: &Path) -> Result<String, Error> {
    let relative = file
        .strip_prefix(root)
        .map_err(|err| Error::Asset(format!("{}: {err}", file.display())))?;
    let parts: Vec<String> = relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

fn write_archive(entries: &[(String, PathBuf)]) -> Result<Vec<u8>, Error> {
    // Fixed timestamps keep the archive, and so its key, stable across rebuilds.
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o755);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, path) in entries {
        let contents = fs::read(path)?;
        zip.start_file(name.as_str(), options)?;
        zip.write_all(&contents)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Uploads the archive unless an object with the same content key already exists.
#[tracing::instrument(skip(s3_client, asset), fields(key = %asset.key))]
pub async fn upload(
    s3_client: &aws_sdk_s3::Client,
    bucket: &str,
    asset: &Asset,
) -> Result<(CodeLocation, UploadOutcome), Error> {
    let location = CodeLocation {
        bucket: bucket.to_string(),
        key: asset.key.clone(),
    };

    let existing = s3_client
        .head_object()
        .bucket(bucket)
        .key(&asset.key)
        .send()
        .await;
    match existing {
        Ok(_) => {
            info!("Asset already uploaded");
            return Ok((location, UploadOutcome::AlreadyPresent));
        }
        Err(err) if err.as_service_error().map_or(false, |e| e.is_not_found()) => {}
        Err(err) => return Err(Error::aws(err)),
    }

    info!("Uploading asset to s3://{bucket}/{}", asset.key);
    s3_client
        .put_object()
        .bucket(bucket)
        .key(&asset.key)
        .content_type("application/zip")
        .body(ByteStream::from(asset.archive.clone()))
        .send()
        .await
        .map_err(Error::aws)?;

    Ok((location, UploadOutcome::Uploaded))
}
