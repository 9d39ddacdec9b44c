// ABOUTME: Publishes built artifacts into the shared web root and removes them.
// ABOUTME: The shared root comes from TESTDOCK_ROOT, falling back to the temp dir.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::deploy::{DeployError, DeploymentIdentity};
use crate::diagnostics::{Diagnostics, Warning};

/// Environment variable naming the machine-wide root under which artifacts
/// are published.
pub const ROOT_ENV_VAR: &str = "TESTDOCK_ROOT";

/// Directory all deployments publish into, one subdirectory per pool.
pub fn shared_root() -> PathBuf {
    std::env::var_os(ROOT_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join("testdock-sites")
}

/// Copy the artifact tree into `<shared_root>/<pool_name>`, replacing any
/// leftover from a previous run. Returns the published web root.
pub async fn publish(
    source_root: &Path,
    identity: &DeploymentIdentity,
    diag: &mut Diagnostics,
) -> Result<PathBuf, DeployError> {
    if !source_root.is_dir() {
        return Err(DeployError::Configuration(format!(
            "artifact directory {} does not exist",
            source_root.display()
        )));
    }

    if std::env::var_os(ROOT_ENV_VAR).is_none() {
        diag.warn(Warning::root_fallback(format!(
            "{ROOT_ENV_VAR} is unset, publishing under the system temp directory"
        )));
    }

    let web_root = shared_root().join(identity.pool_name.as_str());
    if web_root.exists() {
        diag.warn(Warning::stale_web_root(format!(
            "replacing stale web root {}",
            web_root.display()
        )));
        tokio::fs::remove_dir_all(&web_root).await.map_err(|e| {
            DeployError::Configuration(format!(
                "failed to remove stale web root {}: {e}",
                web_root.display()
            ))
        })?;
    }

    copy_dir(source_root, &web_root).await.map_err(|e| {
        DeployError::Configuration(format!(
            "failed to publish {} to {}: {e}",
            source_root.display(),
            web_root.display()
        ))
    })?;

    tracing::info!(web_root = %web_root.display(), "artifact published");
    Ok(web_root)
}

/// Remove a published web root. A directory that is already gone is success.
pub async fn unpublish(web_root: &Path) -> Result<(), std::io::Error> {
    match tokio::fs::remove_dir_all(web_root).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn copy_dir<'a>(
    src: &'a Path,
    dst: &'a Path,
) -> Pin<Box<dyn Future<Output = std::io::Result<()>> + Send + 'a>> {
    Box::pin(async move {
        tokio::fs::create_dir_all(dst).await?;
        let mut entries = tokio::fs::read_dir(src).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = dst.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                copy_dir(&entry.path(), &target).await?;
            } else {
                tokio::fs::copy(entry.path(), &target).await?;
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copy_dir_preserves_nested_layout() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir(src.path().join("bin")).unwrap();
        std::fs::write(src.path().join("app.dll"), b"binary").unwrap();
        std::fs::write(src.path().join("bin").join("dep.dll"), b"dep").unwrap();

        let target = dst.path().join("out");
        copy_dir(src.path(), &target).await.unwrap();

        assert_eq!(std::fs::read(target.join("app.dll")).unwrap(), b"binary");
        assert_eq!(
            std::fs::read(target.join("bin").join("dep.dll")).unwrap(),
            b"dep"
        );
    }

    #[tokio::test]
    async fn unpublish_of_missing_directory_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("never-published");
        unpublish(&gone).await.unwrap();
    }

    #[tokio::test]
    async fn publish_rejects_missing_artifact() {
        let identity = DeploymentIdentity::derive(Path::new("/tmp/run42/app")).unwrap();
        let mut diag = Diagnostics::default();
        let result = publish(Path::new("/nonexistent/run42/app"), &identity, &mut diag).await;
        assert!(matches!(result, Err(DeployError::Configuration(_))));
    }
}
