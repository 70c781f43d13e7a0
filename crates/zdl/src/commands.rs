use std::time::Duration;

use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use zdl_core::{
    HttpFetcher, InstallationStore, ListReport, PinChange, Progress, TarXzExtractor,
    ToolchainManager,
};
use zdl_platform::AppPaths;
use zdl_types::Specifier;

use crate::cli::Command;
use crate::error::CliError;
use crate::settings::EffectiveSettings;

/// Run `command`, printing its results to stdout.
///
/// # Errors
/// Returns the first error of the underlying operation.
pub async fn run(
    command: &Command,
    settings: &EffectiveSettings,
    paths: &AppPaths,
) -> Result<(), CliError> {
    match command {
        Command::Config => {
            println!("settings file: {}", paths.settings_file().display());
            println!("{}", serde_json::to_string_pretty(settings)?);
            Ok(())
        }
        Command::Activate { spec } => {
            let spec = Specifier::parse(spec.as_deref());
            activate(build_manager(settings)?, &spec).await
        }
        Command::List { .. } => {
            let report = build_manager(settings)?
                .list(command.specifier().as_ref())
                .await?;
            print!("{}", render_list(&report));
            Ok(())
        }
        Command::Pin { spec } => {
            let spec = Specifier::parse(Some(spec));
            let change = build_manager(settings)?.pin(&spec).await?;
            println!("{}", render_pin(&change, true));
            Ok(())
        }
        Command::Unpin { spec } => {
            let spec = Specifier::parse(Some(spec));
            let change = build_manager(settings)?.unpin(&spec).await?;
            println!("{}", render_pin(&change, false));
            Ok(())
        }
        Command::Gc => {
            let removed = build_manager(settings)?.gc()?;
            if removed.is_empty() {
                println!("nothing to remove");
            }
            for version in removed {
                println!("removed: {version}");
            }
            Ok(())
        }
    }
}

fn build_manager(settings: &EffectiveSettings) -> Result<ToolchainManager, CliError> {
    let fetcher = HttpFetcher::new(
        Duration::from_secs(settings.download_timeout_secs),
        Duration::from_secs(settings.connect_timeout_secs),
    )?;

    Ok(ToolchainManager::new(
        settings.manager_config(),
        InstallationStore::new(&settings.install_dir),
        Box::new(fetcher),
        Box::new(TarXzExtractor),
    ))
}

async fn activate(manager: ToolchainManager, spec: &Specifier) -> Result<(), CliError> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let manager = manager.with_progress(tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!("{}", render_progress(&event));
        }
    });

    let result = manager.activate(spec).await;
    drop(manager);
    join_printer(printer).await;

    result.map(|_| ()).map_err(CliError::from)
}

/// Wait for the printer task, returning whether it finished cleanly.
async fn join_printer(printer: JoinHandle<()>) -> bool {
    match printer.await {
        Ok(()) => true,
        Err(error) => {
            debug!("progress printer stopped: {error}");
            false
        }
    }
}

fn render_progress(event: &Progress) -> String {
    match event {
        Progress::Downloading { url, .. } => format!("downloading: {url}"),
        Progress::Installed { version } => format!("installed: {version}"),
        Progress::Activating { version } => format!("activating version: {version}"),
        Progress::UpToDate { version } => format!("version up to date: {version}"),
        Progress::Removed { version } => format!("removed: {version}"),
    }
}

fn render_list(report: &ListReport) -> String {
    if report.entries.is_empty() && report.missing.is_none() {
        return "no versions installed\n".to_string();
    }

    let mut out = String::new();
    for entry in &report.entries {
        let marker = if entry.active { '*' } else { ' ' };
        let pinned = if entry.pinned { " (pinned)" } else { "" };
        out.push_str(&format!("{marker} {}{pinned}\n", entry.version));
    }
    out
}

fn render_pin(change: &PinChange, pinning: bool) -> String {
    match (pinning, change.changed) {
        (true, true) => format!("pinned: {}", change.version),
        (true, false) => format!("already pinned: {}", change.version),
        (false, true) => format!("unpinned: {}", change.version),
        (false, false) => format!("not pinned: {}", change.version),
    }
}

#[cfg(test)]
mod tests {
    use zdl_core::{ListEntry, ListReport, PinChange, Progress};
    use zdl_types::VersionId;

    use super::{join_printer, render_list, render_pin, render_progress};

    fn v(s: &str) -> VersionId {
        s.parse().expect("valid version in test")
    }

    #[test]
    fn progress_lines_match_expected_wording() {
        assert_eq!(
            render_progress(&Progress::Downloading {
                version: v("0.11.0"),
                url: "https://ziglang.org/download/0.11.0/zig.tar.xz".to_string(),
            }),
            "downloading: https://ziglang.org/download/0.11.0/zig.tar.xz"
        );
        assert_eq!(
            render_progress(&Progress::Activating {
                version: v("0.11.0")
            }),
            "activating version: 0.11.0"
        );
        assert_eq!(
            render_progress(&Progress::UpToDate {
                version: v("0.11.0")
            }),
            "version up to date: 0.11.0"
        );
        assert_eq!(
            render_progress(&Progress::Removed {
                version: v("0.9.0")
            }),
            "removed: 0.9.0"
        );
    }

    #[test]
    fn list_marks_active_and_pinned_versions() {
        let report = ListReport {
            entries: vec![
                ListEntry {
                    version: v("0.10.1"),
                    active: false,
                    pinned: true,
                },
                ListEntry {
                    version: v("0.11.0"),
                    active: true,
                    pinned: false,
                },
            ],
            missing: None,
        };

        assert_eq!(render_list(&report), "  0.10.1 (pinned)\n* 0.11.0\n");
    }

    #[test]
    fn empty_list_says_so() {
        assert_eq!(
            render_list(&ListReport::default()),
            "no versions installed\n"
        );
    }

    #[test]
    fn missing_filter_prints_nothing() {
        let report = ListReport {
            entries: Vec::new(),
            missing: Some(v("0.12.0")),
        };

        assert_eq!(render_list(&report), "");
    }

    #[tokio::test]
    async fn panicking_printer_is_reported() {
        let printer = tokio::spawn(async { panic!("printer failed") });
        assert!(!join_printer(printer).await);

        let printer = tokio::spawn(async {});
        assert!(join_printer(printer).await);
    }

    #[test]
    fn pin_messages_reflect_change() {
        let change = PinChange {
            version: v("0.11.0"),
            changed: false,
        };

        assert_eq!(render_pin(&change, true), "already pinned: 0.11.0");
        assert_eq!(render_pin(&change, false), "not pinned: 0.11.0");
    }
}
