use crate::modules::error::{code::ErrorCode, MailHeraldResult};
use crate::modules::settings::cli::SETTINGS;
use crate::raise_error;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

const HTML_FILE: &str = "body.html";
const IMAGE_FILE: &str = "body.png";

/// Rasterises an HTML body to a PNG inside the per-message directory by
/// invoking the configured external converter. Concurrent renders for the
/// same message overwrite each other's output; the paths stay stable.
pub async fn render_html_to_png(html: &str, dir: &Path) -> MailHeraldResult<PathBuf> {
    let html_path = dir.join(HTML_FILE);
    let image_path = dir.join(IMAGE_FILE);

    tokio::fs::write(&html_path, html).await.map_err(|e| {
        raise_error!(
            format!("error write file {}: {}", html_path.display(), e),
            ErrorCode::FileWriteFailed
        )
    })?;

    debug!(
        "rendering {} to {} via {}",
        html_path.display(),
        image_path.display(),
        &SETTINGS.mailherald_html_render_bin
    );

    let output = Command::new(&SETTINGS.mailherald_html_render_bin)
        .arg("--quiet")
        .arg(&html_path)
        .arg(&image_path)
        .output()
        .await
        .map_err(|e| {
            raise_error!(
                format!(
                    "failed to spawn {}: {}",
                    &SETTINGS.mailherald_html_render_bin, e
                ),
                ErrorCode::HtmlRenderFailed
            )
        })?;

    if !output.status.success() {
        return Err(raise_error!(
            format!(
                "{} exited with {}: {}",
                &SETTINGS.mailherald_html_render_bin,
                output.status,
                String::from_utf8_lossy(&output.stderr)
            ),
            ErrorCode::HtmlRenderFailed
        ));
    }

    Ok(image_path)
}
