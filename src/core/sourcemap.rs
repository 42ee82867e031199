//! Sourcemap upload sub-pipeline.
//!
//! Two strictly ordered sentry-cli invocations: register the release,
//! then upload the map files. The second step only runs if the first
//! succeeds.

use std::path::Path;

use crate::domain::{RunReport, StepKind};

use super::params::SourcemapParams;
use super::pipeline::{execute_step, PipelineError};
use super::runner::{CommandSpec, StepRunner};

/// `sentry-cli releases -o <org> -p <project> new <version>`
pub fn register_release_command(org: &str, project: &str, version: &str) -> CommandSpec {
    CommandSpec::new(
        "sentry-cli",
        ["releases", "-o", org, "-p", project, "new", version],
    )
}

/// `sentry-cli releases -o <org> -p <project> files <version>
///  upload-sourcemaps --url-prefix <prefix> <map_dir>`
pub fn upload_maps_command(
    org: &str,
    project: &str,
    version: &str,
    params: &SourcemapParams,
) -> CommandSpec {
    CommandSpec::new(
        "sentry-cli",
        [
            "releases",
            "-o",
            org,
            "-p",
            project,
            "files",
            version,
            "upload-sourcemaps",
            "--url-prefix",
            params.url_prefix.as_str(),
            params.map_dir.as_str(),
        ],
    )
}

/// Register the release, then upload the sourcemaps from the checkout.
#[allow(clippy::too_many_arguments)]
pub async fn upload(
    runner: &dyn StepRunner,
    org: &str,
    project: &str,
    version: &str,
    source_dir: &Path,
    params: &SourcemapParams,
    report: &mut RunReport,
) -> Result<(), PipelineError> {
    let register = register_release_command(org, project, version);
    execute_step(runner, report, StepKind::RegisterRelease, &register, source_dir)
        .await
        .map_err(|e| PipelineError::ReleaseRegistration {
            detail: e.to_string(),
        })?;

    let upload = upload_maps_command(org, project, version, params);
    execute_step(runner, report, StepKind::UploadMaps, &upload, source_dir)
        .await
        .map_err(|e| PipelineError::MapUpload {
            detail: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_command_shape() {
        let command = register_release_command("tenswin", "exshow", "1.2.3");
        assert_eq!(
            command.to_string(),
            "sentry-cli releases -o tenswin -p exshow new 1.2.3"
        );
    }

    #[test]
    fn test_upload_command_carries_trigger_params_verbatim() {
        let params = SourcemapParams {
            url_prefix: "http://exshow.xiaovbao.cn/static/js".to_string(),
            map_dir: "dist/static/js".to_string(),
        };
        let command = upload_maps_command("tenswin", "exshow", "1.2.3", &params);

        assert_eq!(
            command.to_string(),
            "sentry-cli releases -o tenswin -p exshow files 1.2.3 \
             upload-sourcemaps --url-prefix http://exshow.xiaovbao.cn/static/js dist/static/js"
        );
    }
}
