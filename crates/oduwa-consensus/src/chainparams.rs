//! Process-wide selection of the active network.
//!
//! Parameters are installed exactly once. Re-selecting the same instance is a
//! no-op; anything else is refused. Consensus functions never read the global
//! themselves, they take `&ConsensusParams` from the caller.

use std::sync::OnceLock;

use tracing::info;

use crate::error::ConfigError;
use crate::params::{ChainParams, DeploymentPos, Network};

static ACTIVE: OnceLock<ChainParams> = OnceLock::new();

pub fn select_params(network: Network) -> Result<&'static ChainParams, ConfigError> {
    install(ChainParams::for_network(network))
}

/// Parses a network name and selects it. Unknown names are a startup error.
pub fn select_params_by_name(name: &str) -> Result<&'static ChainParams, ConfigError> {
    select_params(name.parse()?)
}

/// Installs a regtest rule set, possibly with patched deployment windows.
pub fn select_regtest(params: RegtestParams) -> Result<&'static ChainParams, ConfigError> {
    install(params.0)
}

/// The selected parameters.
///
/// # Panics
///
/// Panics if nothing was selected yet; that is a startup ordering bug.
pub fn active() -> &'static ChainParams {
    match ACTIVE.get() {
        Some(p) => p,
        None => panic!("chain parameters used before select_params"),
    }
}

pub fn try_active() -> Option<&'static ChainParams> {
    ACTIVE.get()
}

fn install(params: ChainParams) -> Result<&'static ChainParams, ConfigError> {
    let requested = params.network;
    let mut installed = false;
    let current = ACTIVE.get_or_init(|| {
        installed = true;
        params.clone()
    });
    if installed {
        info!(network = %requested, "selected chain parameters");
    } else if *current != params {
        return Err(ConfigError::AlreadySelected {
            active: current.network,
            requested,
        });
    }
    Ok(current)
}

/// Regtest parameters before selection. Only this wrapper can move
/// deployment windows, so the main and test rule sets have no mutation path.
#[derive(Clone, Debug, PartialEq)]
pub struct RegtestParams(ChainParams);

impl RegtestParams {
    pub fn new() -> Self {
        RegtestParams(ChainParams::for_network(Network::Regtest))
    }

    pub fn patch_deployment(&mut self, pos: DeploymentPos, start_time: i64, timeout: i64) {
        let d = &mut self.0.consensus.deployments[pos.index()];
        d.start_time = start_time;
        d.timeout = timeout;
    }

    pub fn params(&self) -> &ChainParams {
        &self.0
    }

    pub fn into_params(self) -> ChainParams {
        self.0
    }
}

impl Default for RegtestParams {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChainParams> for RegtestParams {
    type Error = ConfigError;

    fn try_from(params: ChainParams) -> Result<Self, Self::Error> {
        if params.network != Network::Regtest {
            return Err(ConfigError::NotRegtest(params.network));
        }
        Ok(RegtestParams(params))
    }
}
