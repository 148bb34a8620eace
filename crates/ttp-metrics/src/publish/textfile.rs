//! Text-file channel: exposition files in a collector drop directory.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;
use ttp_config::ChannelKind;
use ttp_config::defaults::METRIC_PREFIX;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::{ChannelPublisher, ChannelSettings, PublishStatus, log_outcome, precheck};
use crate::exposition::{LabelPlacement, render};
use crate::metric::Metric;

const SERIES_EXTENSION: &str = "prom";

/// File name holding one series: `<name>[_<labelValue>...].prom`.
#[must_use]
pub fn series_file_name(name: &str, metric: &Metric) -> String {
    let mut stem = name.to_string();
    for label in metric.labels() {
        stem.push('_');
        stem.push_str(label.value());
    }
    format!("{stem}.{SERIES_EXTENSION}")
}

/// Writes each metric into its own series file under the drop directory.
pub struct TextFilePublisher<'a> {
    settings: &'a ChannelSettings,
}

impl<'a> TextFilePublisher<'a> {
    #[must_use]
    pub fn new(settings: &'a ChannelSettings) -> Self {
        Self { settings }
    }
}

impl ChannelPublisher for TextFilePublisher<'_> {
    fn kind(&self) -> ChannelKind {
        ChannelKind::TextFile
    }

    fn publish(&self, metric: &Metric, caller_prefix: &str) -> PublishStatus {
        let name = metric.prefixed_name(caller_prefix, METRIC_PREFIX);
        let checked = precheck(self.settings, ChannelKind::TextFile, metric, true);
        let status = match (checked, self.settings.drop_dir.as_deref()) {
            (Err(status), _) => status,
            (Ok(None), _) => PublishStatus::ValueUnsuited,
            (Ok(Some(_)), None) => PublishStatus::NoDropDir,
            (Ok(Some(value)), Some(dir)) => {
                let path: Utf8PathBuf = dir.join(series_file_name(&name, metric));
                let body = render(&name, metric, value, LabelPlacement::Inline);
                if self.settings.dry_run {
                    tracing::info!(target: super::PUBLISH_TARGET, path = %path, "dry run; write skipped");
                    PublishStatus::Published
                } else {
                    match atomic_write(&path, body.as_bytes()) {
                        Ok(()) => PublishStatus::Published,
                        Err(error) => {
                            tracing::warn!(target: super::PUBLISH_TARGET, path = %path, error = %error, "metric file write failed");
                            PublishStatus::WriteError
                        }
                    }
                }
            }
        };
        log_outcome(ChannelKind::TextFile, &name, status);
        status
    }
}

/// Replaces `path` with `contents` through a temporary sibling file so the
/// collector never reads a partial sample.
fn atomic_write(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "metric path did not have a parent directory",
        )
    })?;

    let mut builder = Builder::new();
    builder.prefix(".ttp-").suffix(".tmp");
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        builder.permissions(Permissions::from_mode(0o644));
    }

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
