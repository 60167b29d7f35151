//! Runs one parsed command against the registry or the sandbox

use crate::cli::args::{Args, Command};
use crate::config::AppConfig;
use crate::download::StartOutcome;
use crate::error::{RegistryError, Result};
use crate::image::ImageReference;
use crate::logging::Logger;
use crate::registry::{ManifestResolver, RegistryClient, StaticToken};
use crate::sandbox::SandboxCommand;
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct Runner {
    args: Args,
    config: AppConfig,
    output: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Result<Self> {
        let config = args.app_config()?;
        let output = if config.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(config.verbose)
        };
        Ok(Self { args, config, output })
    }

    pub fn output(&self) -> &Logger {
        &self.output
    }

    /// Returns the process exit code
    pub async fn run(&self) -> Result<i32> {
        match &self.args.command {
            Command::Pull { image, path, arch, .. } => {
                self.pull(image, path, arch).await?;
                Ok(0)
            }
            Command::Inspect { image, arch, manifest } => {
                if *manifest {
                    self.inspect_manifest(image, arch.as_deref()).await?;
                } else {
                    self.inspect(image, arch.as_deref()).await?;
                }
                Ok(0)
            }
            Command::Exec { root, command, args, no_pid_ns } => {
                self.exec(root, command, args, !no_pid_ns).await
            }
        }
    }

    fn resolver(&self, image: &str) -> Result<ManifestResolver> {
        let image = ImageReference::parse(image)?;
        let client = RegistryClient::new(self.config.registry.clone())?;
        debug!(?client, %image, "registry client ready");
        Ok(match &self.args.token {
            Some(token) => client.resolver_with_tokens(image, Arc::new(StaticToken::new(token.clone()))),
            None => client.resolver(image),
        })
    }

    async fn pull(&self, image: &str, directory: &Path, arch: &str) -> Result<()> {
        self.output.section("Layer Puller");
        let resolver = self.resolver(image)?;
        self.output.info(&format!("Resolving {} for {}", resolver.image(), arch));

        let session = resolver
            .create_download_session(arch, directory, self.config.download.clone())
            .await?;
        self.output.summary_kv(
            "Image",
            &[
                ("Reference", resolver.image().to_string()),
                ("Architecture", arch.to_string()),
                ("Layers", session.catalog().len().to_string()),
                ("Total size", self.output.format_size(session.total_size())),
                ("Output", session.file_path().display().to_string()),
            ],
        );

        let logger = self.output.clone();
        session.started().subscribe(move |s| logger.download_started(s));
        let logger = self.output.clone();
        session.updated().subscribe(move |s| logger.download_updated(s));
        let logger = self.output.clone();
        session.completed().subscribe(move |s| logger.download_completed(s));

        let cancel = session.cancel_token();
        let interrupt = tokio::spawn(cancel_on_interrupt(cancel));

        let result = session.start(self.config.download.resume).await;
        interrupt.abort();

        match result {
            Ok(StartOutcome::Completed) => Ok(()),
            Ok(StartOutcome::AlreadyDownloading) => {
                self.output.warning("Download already in progress");
                Ok(())
            }
            Err(RegistryError::Cancelled { downloaded }) => {
                println!();
                self.output.warning(&format!(
                    "Interrupted after {}; run the same command again to resume",
                    self.output.format_size(downloaded)
                ));
                Err(RegistryError::Cancelled { downloaded })
            }
            Err(e) => Err(e),
        }
    }

    async fn inspect(&self, image: &str, arch: Option<&str>) -> Result<()> {
        let resolver = self.resolver(image)?;
        let document = match arch {
            Some(arch) => {
                let catalog = resolver.layer_catalog(arch).await?;
                json!({
                    "image": resolver.image().to_string(),
                    "arch": catalog.arch(),
                    "file": catalog.file_name(),
                    "total_size": catalog.total_size(),
                    "layers": catalog.layers(),
                })
            }
            None => json!({
                "image": resolver.image().to_string(),
                "architectures": resolver.architectures().await?,
                "platforms": resolver.platforms().await?,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&document)?);
        Ok(())
    }

    /// Registry documents as received, unknown fields included
    async fn inspect_manifest(&self, image: &str, arch: Option<&str>) -> Result<()> {
        let resolver = self.resolver(image)?;
        let document = match arch {
            Some(arch) => resolver.arch_manifest(arch).await?.raw().clone(),
            None => resolver.manifest_list().await?.raw().clone(),
        };
        println!("{}", serde_json::to_string_pretty(&document)?);
        Ok(())
    }

    async fn exec(&self, root: &Path, command: &str, args: &[String], isolate_pid: bool) -> Result<i32> {
        let output = SandboxCommand::new(root, command)
            .with_args(args.iter().cloned())
            .with_isolate_pid(isolate_pid)
            .run()
            .await?;

        std::io::stdout().write_all(&output.stdout)?;
        std::io::stderr().write_all(&output.stderr)?;
        let code = output.exit_code();
        if code != 0 {
            self.output.detail(&format!("{} exited with status {}", command, code));
        }
        Ok(code)
    }
}

async fn cancel_on_interrupt(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            debug!("interrupt received, cancelling download");
            cancel.cancel();
        }
        Err(e) => warn!(error = %e, "cannot listen for interrupts"),
    }
}
