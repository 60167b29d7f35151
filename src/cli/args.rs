//! Command-line argument parsing

use crate::config::AppConfig;
use crate::error::{RegistryError, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "layer-puller")]
#[command(about = "Pull Docker image layers into a single resumable archive")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(long = "quiet", short = 'q', global = true)]
    pub quiet: bool,

    /// Registry API base URL
    #[arg(long = "registry", global = true, help = "Registry API base, e.g. https://registry-1.docker.io/v2")]
    pub registry: Option<String>,

    /// Token endpoint template
    #[arg(long = "token-url", global = true, help = "Token endpoint; {scope} is replaced with <repository>/<name>")]
    pub token_url: Option<String>,

    /// Pre-issued bearer token, skips the token endpoint
    #[arg(long = "token", global = true, env = "LAYER_PULLER_BEARER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Skip TLS verification
    #[arg(long = "skip-tls", short = 'k', global = true, help = "Skip TLS certificate verification")]
    pub skip_tls: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download every layer of an image into <path>/<repository>-<name>-<tag>-<arch>.tar[.gz]
    Pull {
        /// Image reference, e.g. library/ubuntu:22.04
        image: String,

        /// Output directory, created when missing
        path: PathBuf,

        #[arg(long = "arch", short = 'a', default_value = "amd64")]
        arch: String,

        /// Delete an existing partial archive and start over
        #[arg(long = "no-resume")]
        no_resume: bool,

        /// Bytes written per chunk
        #[arg(long = "chunk-size", short = 'c')]
        chunk_size: Option<usize>,
    },

    /// Print the architectures of an image, or the layers of one architecture, as JSON
    Inspect {
        image: String,

        #[arg(long = "arch", short = 'a')]
        arch: Option<String>,

        /// Print the registry's manifest list (or, with --arch, the image manifest) unchanged
        #[arg(long = "manifest", short = 'm')]
        manifest: bool,
    },

    /// Run a command inside an extracted root filesystem
    Exec {
        /// Root filesystem directory
        root: PathBuf,

        command: String,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,

        /// Keep the host PID namespace
        #[arg(long = "no-pid-ns")]
        no_pid_ns: bool,
    },
}

impl Args {
    /// Environment defaults overridden by the flags given on the command line
    pub fn app_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::from_env();

        if let Some(registry) = &self.registry {
            config.registry.base_endpoint = registry.clone();
        }
        if let Some(token_url) = &self.token_url {
            config.registry.token_endpoint = token_url.clone();
        }
        if self.skip_tls {
            config.registry.skip_tls = true;
        }
        if let Command::Pull { no_resume, chunk_size, .. } = &self.command {
            if *no_resume {
                config.download.resume = false;
            }
            if let Some(chunk_size) = chunk_size {
                config.download.chunk_size = *chunk_size;
            }
        }
        config.verbose = self.verbose;
        config.quiet = self.quiet;

        self.validate()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match &self.command {
            Command::Pull { image, arch, .. } | Command::Inspect { image, arch: Some(arch), .. } => {
                if image.trim().is_empty() {
                    return Err(RegistryError::Validation("Image cannot be empty".to_string()));
                }
                if arch.trim().is_empty() {
                    return Err(RegistryError::Validation("Architecture cannot be empty".to_string()));
                }
            }
            Command::Inspect { image, arch: None, .. } => {
                if image.trim().is_empty() {
                    return Err(RegistryError::Validation("Image cannot be empty".to_string()));
                }
            }
            Command::Exec { command, .. } => {
                if command.trim().is_empty() {
                    return Err(RegistryError::Validation("Command cannot be empty".to_string()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pull() {
        let args = Args::try_parse_from([
            "layer-puller",
            "pull",
            "library/busybox:1.36",
            "/tmp/images",
            "--arch",
            "arm64",
            "--no-resume",
            "--chunk-size",
            "4096",
            "--registry",
            "http://localhost:5000/v2",
        ])
        .unwrap();

        let config = args.app_config().unwrap();
        assert_eq!(config.registry.base_endpoint, "http://localhost:5000/v2");
        assert!(!config.download.resume);
        assert_eq!(config.download.chunk_size, 4096);
        match args.command {
            Command::Pull { image, path, arch, .. } => {
                assert_eq!(image, "library/busybox:1.36");
                assert_eq!(path, PathBuf::from("/tmp/images"));
                assert_eq!(arch, "arm64");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_pull_defaults() {
        let args = Args::try_parse_from(["layer-puller", "pull", "ubuntu", "."]).unwrap();
        match &args.command {
            Command::Pull { arch, no_resume, chunk_size, .. } => {
                assert_eq!(arch, "amd64");
                assert!(!no_resume);
                assert!(chunk_size.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_exec_keeps_command_flags() {
        let args = Args::try_parse_from([
            "layer-puller",
            "exec",
            "--no-pid-ns",
            "/srv/rootfs",
            "/bin/ls",
            "-la",
            "/etc",
        ])
        .unwrap();
        match args.command {
            Command::Exec { root, command, args, no_pid_ns } => {
                assert_eq!(root, PathBuf::from("/srv/rootfs"));
                assert_eq!(command, "/bin/ls");
                assert_eq!(args, vec!["-la", "/etc"]);
                assert!(no_pid_ns);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_inspect_manifest() {
        let args =
            Args::try_parse_from(["layer-puller", "inspect", "ubuntu:22.04", "--manifest", "-a", "arm64"]).unwrap();
        match args.command {
            Command::Inspect { image, arch, manifest } => {
                assert_eq!(image, "ubuntu:22.04");
                assert_eq!(arch.as_deref(), Some("arm64"));
                assert!(manifest);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let args =
            Args::try_parse_from(["layer-puller", "pull", "ubuntu", ".", "--chunk-size", "0"]).unwrap();
        assert!(matches!(args.app_config(), Err(RegistryError::Validation(_))));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["layer-puller", "-v", "-q", "inspect", "ubuntu"]).is_err());
    }
}
