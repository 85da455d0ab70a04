//! Per-network consensus rule sets.
//!
//! Each network's parameters are built once from the embedded tables below and
//! never change afterwards. The only mutation path is
//! [`crate::chainparams::RegtestParams::patch_deployment`].

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

use num_bigint::BigUint;

use crate::block::Block;
use crate::error::ConfigError;
use crate::genesis::create_genesis_block;
use crate::uint256::Uint256;

pub const COIN: i64 = 100_000_000;
pub const CENT: i64 = 1_000_000;

/// Time to elapse before a new stake modifier is computed.
pub const MODIFIER_INTERVAL: i64 = 10 * 60;

/// Ratio of the last selection section's length to the first one's.
pub const MODIFIER_INTERVAL_RATIO: i64 = 3;

/// Above this height the retarget filter lets negative spacing through and
/// guards against non-positive results instead.
pub const RETARGET_CLAMP_POLICY_HEIGHT: u32 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Network {
    Main,
    Test,
    Regtest,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Test => "test",
            Network::Regtest => "regtest",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(Network::Main),
            "test" => Ok(Network::Test),
            "regtest" => Ok(Network::Regtest),
            other => Err(ConfigError::UnknownNetwork(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeploymentPos {
    TestDummy,
}

pub const MAX_VERSION_BITS_DEPLOYMENTS: usize = 1;

impl DeploymentPos {
    pub const ALL: [DeploymentPos; MAX_VERSION_BITS_DEPLOYMENTS] = [DeploymentPos::TestDummy];

    pub fn index(self) -> usize {
        match self {
            DeploymentPos::TestDummy => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DeploymentPos::TestDummy => "testdummy",
        }
    }
}

/// A version-bits deployment window, in median-time-past seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deployment {
    pub bit: u8,
    pub start_time: i64,
    pub timeout: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CheckpointData {
    pub checkpoints: BTreeMap<u32, Uint256>,
    /// UNIX timestamp of the last checkpoint block.
    pub time_last_checkpoint: i64,
    /// Transactions between genesis and the last checkpoint.
    pub transactions_last_checkpoint: u64,
    /// Estimated transactions per day after the last checkpoint.
    pub transactions_per_day: f64,
}

/// Fixed inputs of the genesis block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenesisSpec {
    pub time: u32,
    pub nonce: u32,
    pub bits: u32,
    pub version: i32,
    pub reward: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConsensusParams {
    pub hash_genesis_block: Uint256,
    pub max_reorganization_depth: u32,
    pub majority_enforce_block_upgrade: u32,
    pub majority_reject_block_outdated: u32,
    pub majority_window: u32,
    pub pow_limit: Uint256,
    pub pos_limit: Uint256,
    pub pos_limit_v2: Uint256,
    pub target_timespan: i64,
    pub target_spacing_v1: i64,
    pub target_spacing: i64,
    /// First height that uses `target_spacing`.
    pub protocol_v2_height: u32,
    pub protocol_v1_retargeting_fixed_time: i64,
    pub pow_allow_min_difficulty_blocks: bool,
    pub pow_no_retargeting: bool,
    pub pos_no_retargeting: bool,
    pub rule_change_activation_threshold: u32,
    pub miner_confirmation_window: u32,
    pub deployments: [Deployment; MAX_VERSION_BITS_DEPLOYMENTS],
    pub last_pow_block: u32,
    pub stake_timestamp_mask: u32,
    pub coinbase_maturity: u32,
    pub stake_min_age: i64,
    pub stake_max_age: i64,
    pub modifier_interval: i64,
    pub minimum_chain_work: Uint256,
    /// Expected stake-modifier checksums at selected heights.
    pub stake_modifier_checkpoints: BTreeMap<u32, u32>,
}

impl ConsensusParams {
    pub fn is_protocol_v2(&self, height: u32) -> bool {
        height >= self.protocol_v2_height
    }

    pub fn target_spacing_at(&self, height: u32) -> i64 {
        if self.is_protocol_v2(height) {
            self.target_spacing
        } else {
            self.target_spacing_v1
        }
    }

    pub fn pow_limit_value(&self) -> BigUint {
        self.pow_limit.to_biguint()
    }

    pub fn deployment(&self, pos: DeploymentPos) -> &Deployment {
        &self.deployments[pos.index()]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChainParams {
    pub network: Network,
    pub consensus: ConsensusParams,
    pub message_start: [u8; 4],
    pub default_port: u16,
    pub prune_after_height: u64,
    pub genesis: GenesisSpec,
    pub checkpoint_data: CheckpointData,
    pub mining_requires_peers: bool,
    pub default_consistency_checks: bool,
    pub require_standard: bool,
    pub mine_blocks_on_demand: bool,
}

impl ChainParams {
    pub fn for_network(network: Network) -> ChainParams {
        match network {
            Network::Main => main_params(),
            Network::Test => testnet_params(),
            Network::Regtest => regtest_params(),
        }
    }

    pub fn genesis_block(&self) -> Block {
        let g = self.genesis;
        create_genesis_block(g.time, g.nonce, g.bits, g.version, g.reward)
    }
}

const fn h(s: &str) -> Uint256 {
    Uint256::from_hex_const(s)
}

const POW_LIMIT_20: Uint256 =
    h("00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff");
const POW_LIMIT_16: Uint256 =
    h("0000ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff");
const POS_LIMIT_V2: Uint256 =
    h("000000000000ffffffffffffffffffffffffffffffffffffffffffffffffffff");

pub const MAIN_GENESIS_HASH: Uint256 =
    h("000006301df0e22e8c3b5eed7aa53e9d3194652b4c7871390f265b0506c9583e");
pub const MAIN_GENESIS_MERKLE_ROOT: Uint256 =
    h("4cb2a8f18bb29e01f10306592dfc03ad28df3cd0260ef65125d5fc1958bc70ef");
/// Test and regtest share a genesis; it was never mined to its own target.
pub const TEST_GENESIS_HASH: Uint256 =
    h("ccc11a2070cf8cd0805101ebadc64d93e0a7235ac59d7029562365e606c0b319");
pub const TEST_GENESIS_MERKLE_ROOT: Uint256 =
    h("bda2cd7e8f622f435d4dc917f3a5cfc7f84bb322bd609bbcc667c0f7891eb3dc");

const MAIN_CHECKPOINTS: &[(u32, Uint256)] = &[
    (0, MAIN_GENESIS_HASH),
    (244_260, h("34cb64db3f25b869794a52a156ab2ef4d9cc2e8635660e9495f14f0fccd0125b")),
    (244_261, h("3928e448b5499715ed1cb6c48a38728cd0fe72d0385ffd57470aa8d9fefc2841")),
    (244_262, h("0304aef8843f995125235a4d80ce3a70981a68e7b1048948cf04fbfffb5e69c3")),
    (244_300, h("c29c11687dce9b2ead8863f9904ccd07d70e77bce0942bd99c039e02cef69c59")),
    (245_300, h("bc56f6ad6122fcc000dd4b9d9e501dcfcefc736f83c3903ba3adccc90f4be49d")),
    (321_586, h("60c2741577c676d759655b99840fca515f15ed90b79b108411f8787c2c92e8d8")),
    (393_647, h("40040135ad4f9de5173aeaeb8a8dec0dcf3733a57a258fc35c5d6c9fb2a86059")),
    (457_102, h("740f31be3627d7ffdc2bded13ba9ff73ed1ede85eac126cffb6f888043e15876")),
    (515_643, h("471a72164b5b6c582f4df3a259333a12a749f8add51c24a8d519e739d9caf76e")),
    (587_915, h("1e3a0efe5894242dbdb19b8c5c6e14cb8cbaa5537738423da268c245f68b092b")),
    (661_408, h("a612e00610b46cf131ce0161e64dfe16f03cae746b6873bef7e998ae95c7e5d8")),
    (743_420, h("c2334773223f3d8abc1bca58ac0e37842146954971cfc06334d3218a834fbfb8")),
    (823_569, h("2400332d2ab7c890443e9d17a9b02373687fad4df4a46fa89e2555845326e366")),
    (956_842, h("9a69d79fae6c38ce3b979f6a5d1eaf87633a289eac0e8285a61fa04173971695")),
    (1_054_923, h("d1d350718f4c63811375e4c9fcf0dbf1b40948098efde17a9344464cbcb92bff")),
    (1_194_263, h("a622843b76312678b90af5d7297839fad5c658e9811993917bf9ae8d1d085e8a")),
    (1_218_387, h("4567d7d237ec80ddcee1a837faca1c5bb05a4320f2794bdc198439ff74076a4f")),
];

const TEST_CHECKPOINTS: &[(u32, Uint256)] = &[(
    90_235,
    h("567898e79184dc2f7dc3a661f794f28566e4b856d70180914f7371b1b3cc82d8"),
)];

// January 1, 2008 .. December 31, 2008
const TESTDUMMY: Deployment = Deployment {
    bit: 28,
    start_time: 1_199_145_601,
    timeout: 1_230_767_999,
};

fn checkpoints(table: &[(u32, Uint256)]) -> BTreeMap<u32, Uint256> {
    table.iter().copied().collect()
}

fn main_params() -> ChainParams {
    ChainParams {
        network: Network::Main,
        consensus: ConsensusParams {
            hash_genesis_block: MAIN_GENESIS_HASH,
            max_reorganization_depth: 200,
            majority_enforce_block_upgrade: 9500,
            majority_reject_block_outdated: 950,
            majority_window: 1000,
            pow_limit: POW_LIMIT_20,
            pos_limit: POW_LIMIT_20,
            pos_limit_v2: POS_LIMIT_V2,
            target_timespan: 16 * 60,
            target_spacing_v1: 60,
            target_spacing: 2 * 60,
            protocol_v2_height: 10_000,
            protocol_v1_retargeting_fixed_time: 1_395_631_999,
            pow_allow_min_difficulty_blocks: false,
            pow_no_retargeting: false,
            pos_no_retargeting: false,
            rule_change_activation_threshold: 1916, // 95% of 2016
            miner_confirmation_window: 2016,
            deployments: [TESTDUMMY],
            last_pow_block: 5000,
            stake_timestamp_mask: 0xf,
            coinbase_maturity: 20,
            stake_min_age: 8 * 60 * 60,
            stake_max_age: 30 * 24 * 60 * 60,
            modifier_interval: MODIFIER_INTERVAL,
            minimum_chain_work: Uint256::ZERO,
            stake_modifier_checkpoints: BTreeMap::new(),
        },
        message_start: [0x6a, 0xe3, 0x1b, 0xc4],
        default_port: 26681,
        prune_after_height: 100_000,
        genesis: GenesisSpec {
            time: 1_537_540_522,
            nonce: 1_355_266,
            bits: 0x1e0f_ffff,
            version: 1,
            reward: 0,
        },
        checkpoint_data: CheckpointData {
            checkpoints: checkpoints(MAIN_CHECKPOINTS),
            time_last_checkpoint: 1_620_280_017,
            transactions_last_checkpoint: 2_443_168,
            transactions_per_day: 3500.0,
        },
        mining_requires_peers: true,
        default_consistency_checks: false,
        require_standard: true,
        mine_blocks_on_demand: false,
    }
}

fn testnet_params() -> ChainParams {
    ChainParams {
        network: Network::Test,
        consensus: ConsensusParams {
            hash_genesis_block: TEST_GENESIS_HASH,
            max_reorganization_depth: 500,
            majority_enforce_block_upgrade: 750,
            majority_reject_block_outdated: 950,
            majority_window: 1000,
            pow_limit: POW_LIMIT_16,
            pos_limit: POW_LIMIT_20,
            pos_limit_v2: POS_LIMIT_V2,
            target_timespan: 16 * 60,
            target_spacing_v1: 60,
            target_spacing: 64,
            protocol_v2_height: 0,
            protocol_v1_retargeting_fixed_time: 1_395_631_999,
            pow_allow_min_difficulty_blocks: true,
            pow_no_retargeting: false,
            pos_no_retargeting: false,
            rule_change_activation_threshold: 1512, // 75% for testchains
            miner_confirmation_window: 2016,
            deployments: [TESTDUMMY],
            last_pow_block: 0x7fff_ffff,
            stake_timestamp_mask: 0xf,
            coinbase_maturity: 10,
            stake_min_age: 8 * 60 * 60,
            stake_max_age: 30 * 24 * 60 * 60,
            modifier_interval: MODIFIER_INTERVAL,
            minimum_chain_work: h(
                "000000000000000000000000000000000000000000000028afadd1049e589cf2",
            ),
            stake_modifier_checkpoints: BTreeMap::new(),
        },
        message_start: [0xcd, 0xf2, 0xc0, 0xef],
        default_port: 25714,
        prune_after_height: 1000,
        genesis: GenesisSpec {
            time: 1_393_221_600,
            nonce: 216_178,
            bits: 0x1f00_ffff,
            version: 1,
            reward: 0,
        },
        checkpoint_data: CheckpointData {
            checkpoints: checkpoints(TEST_CHECKPOINTS),
            time_last_checkpoint: 1_549_558_800,
            transactions_last_checkpoint: 179_080,
            transactions_per_day: 2.0,
        },
        mining_requires_peers: true,
        default_consistency_checks: false,
        require_standard: false,
        mine_blocks_on_demand: false,
    }
}

fn regtest_params() -> ChainParams {
    ChainParams {
        network: Network::Regtest,
        consensus: ConsensusParams {
            hash_genesis_block: TEST_GENESIS_HASH,
            max_reorganization_depth: 50,
            majority_enforce_block_upgrade: 51,
            majority_reject_block_outdated: 75,
            majority_window: 100,
            pow_limit: POW_LIMIT_16,
            pos_limit: POW_LIMIT_20,
            pos_limit_v2: POS_LIMIT_V2,
            target_timespan: 16 * 60,
            target_spacing_v1: 64,
            target_spacing: 64,
            protocol_v2_height: 0,
            protocol_v1_retargeting_fixed_time: 1_395_631_999,
            pow_allow_min_difficulty_blocks: true,
            pow_no_retargeting: true,
            pos_no_retargeting: true,
            rule_change_activation_threshold: 108, // 75% for regtest
            miner_confirmation_window: 144,
            deployments: [TESTDUMMY],
            last_pow_block: 1000,
            stake_timestamp_mask: 0xf,
            coinbase_maturity: 10,
            stake_min_age: 60 * 60,
            stake_max_age: 30 * 24 * 60 * 60,
            modifier_interval: MODIFIER_INTERVAL,
            minimum_chain_work: Uint256::ZERO,
            stake_modifier_checkpoints: BTreeMap::new(),
        },
        message_start: [0x70, 0x35, 0x22, 0x06],
        default_port: 35714,
        prune_after_height: 100_000,
        genesis: GenesisSpec {
            time: 1_393_221_600,
            nonce: 216_178,
            bits: 0x1f00_ffff,
            version: 1,
            reward: 0,
        },
        checkpoint_data: CheckpointData {
            checkpoints: BTreeMap::new(),
            time_last_checkpoint: 0,
            transactions_last_checkpoint: 0,
            transactions_per_day: 0.0,
        },
        mining_requires_peers: false,
        default_consistency_checks: true,
        require_standard: false,
        mine_blocks_on_demand: true,
    }
}
