//! Filling image placeholders with uploaded media

use super::settle::{wait_for_placeholders, SettlePolicy};
use super::ItemFailure;
use crate::api::DocumentApi;
use crate::render::decode_url;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Resolve a Markdown image path against the source file's directory
///
/// Percent-encoded paths are tried decoded when the literal path is absent.
pub(crate) fn resolve_image_path(base_dir: &Path, raw: &str) -> Option<PathBuf> {
    let literal = base_dir.join(raw);
    if literal.is_file() {
        return Some(literal);
    }
    let decoded = base_dir.join(decode_url(raw));
    decoded.is_file().then_some(decoded)
}

/// Upload each local image and attach it to its placeholder
///
/// Placeholders are paired with `image_paths` by document position. A
/// placeholder whose image is missing or fails to upload is deleted. Returns
/// the number of images attached.
pub(crate) fn attach_images(
    api: &dyn DocumentApi,
    document_id: &str,
    image_paths: &[String],
    base_dir: &Path,
    created: &HashSet<String>,
    settle: SettlePolicy,
    failures: &mut Vec<ItemFailure>,
) -> usize {
    let placeholders =
        match wait_for_placeholders(api, document_id, image_paths.len(), created, settle) {
            Ok(blocks) => blocks,
            Err(source) => {
                failures.push(ItemFailure::ReadBack { source });
                return 0;
            }
        };

    if placeholders.len() != image_paths.len() {
        log::warn!(
            "Found {} image placeholders for {} images; only the first {} are filled",
            placeholders.len(),
            image_paths.len(),
            placeholders.len().min(image_paths.len())
        );
    }

    let mut attached = 0;
    for (placeholder, raw) in placeholders.iter().zip(image_paths) {
        let block_id = placeholder.block_id.as_str();
        let Some(path) = resolve_image_path(base_dir, raw) else {
            log::warn!("Image not found: {}", raw);
            discard(api, document_id, block_id);
            failures.push(ItemFailure::ImageMissing {
                block_id: block_id.to_string(),
                path: PathBuf::from(raw),
            });
            continue;
        };

        let token = match api.upload_image(&path, block_id, document_id) {
            Ok(token) => token,
            Err(source) => {
                log::warn!("Upload of {} failed: {}", path.display(), source);
                discard(api, document_id, block_id);
                failures.push(ItemFailure::ImageUpload {
                    block_id: block_id.to_string(),
                    path,
                    source,
                });
                continue;
            }
        };

        match api.replace_image(document_id, block_id, &token) {
            Ok(_) => {
                log::debug!("Attached {} to block {}", path.display(), block_id);
                attached += 1;
            }
            Err(source) => {
                log::warn!("Attaching {} failed: {}", path.display(), source);
                discard(api, document_id, block_id);
                failures.push(ItemFailure::ImageReplace {
                    block_id: block_id.to_string(),
                    path,
                    source,
                });
            }
        }
    }
    attached
}

/// Delete an unusable placeholder; failure is only logged
fn discard(api: &dyn DocumentApi, document_id: &str, block_id: &str) {
    if let Err(err) = api.delete_block(document_id, block_id) {
        log::warn!("Failed to delete image placeholder {}: {}", block_id, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_resolve_relative_to_base() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pic.png"), b"png").unwrap();

        // Act
        let found = resolve_image_path(dir.path(), "./pic.png");
        let missing = resolve_image_path(dir.path(), "other.png");

        // Assert
        assert_eq!(found, Some(dir.path().join("./pic.png")));
        assert_eq!(missing, None);
    }

    #[test]
    fn test_resolve_percent_encoded_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("my pic.png"), b"png").unwrap();

        let found = resolve_image_path(dir.path(), "my%20pic.png");

        assert_eq!(found, Some(dir.path().join("my pic.png")));
    }
}
