//! subst-engine: `ContainerEngine` sobre la CLI de Docker.
pub mod docker;

pub use docker::{DockerCli, DEFAULT_DOCKER_BIN};
