use oduwa_consensus::checkpoints::checkpoint_check;
use oduwa_consensus::kernel::KernelInput;
use oduwa_consensus::pow::pow_check;
use oduwa_consensus::{
    coin_age_weight, compute_next_stake_modifier, next_target_required, select_params,
    BlockHeader, BlockId, BlockIndex, ChainIndex, ChainParams, ConsensusError, Network, OutPoint,
    ProofType, Uint256,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const NETWORK_ENV: &str = "ODUWA_NETWORK";

#[derive(Deserialize)]
struct BlockSpec {
    time: u32,

    #[serde(default)]
    bits: String,

    #[serde(default)]
    proof: String,
}

#[derive(Deserialize)]
struct Request {
    op: String,

    #[serde(default)]
    network: Option<String>,

    #[serde(default)]
    header_hex: String,

    #[serde(default)]
    hash_hex: String,

    #[serde(default)]
    bits: String,

    #[serde(default)]
    height: u32,

    #[serde(default)]
    proof: String,

    #[serde(default)]
    candidate_time: i64,

    #[serde(default)]
    blocks: Vec<BlockSpec>,

    #[serde(default)]
    stake_modifier: u64,

    #[serde(default)]
    block_from_time: u32,

    #[serde(default)]
    tx_prev_time: u32,

    #[serde(default)]
    prevout_txid: String,

    #[serde(default)]
    prevout_n: u32,

    #[serde(default)]
    time: u32,

    #[serde(default)]
    begin: i64,

    #[serde(default)]
    end: i64,
}

#[derive(Default, Serialize)]
struct Response {
    ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    err: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    network: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    block_hash: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    merkle_root: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    bits: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    kernel_hash: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    stake_modifier: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    generated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    weight: Option<i64>,
}

impl Response {
    fn ok() -> Self {
        Response {
            ok: true,
            ..Response::default()
        }
    }

    fn err(msg: impl Into<String>) -> Self {
        Response {
            ok: false,
            err: Some(msg.into()),
            ..Response::default()
        }
    }
}

fn consensus_err(e: ConsensusError) -> Response {
    match e.code() {
        Some(code) => Response::err(code.as_str()),
        None => Response::err(e.to_string()),
    }
}

fn parse_bits(s: &str) -> Result<u32, Response> {
    u32::from_str_radix(s.trim_start_matches("0x"), 16).map_err(|_| Response::err("bad bits"))
}

fn parse_proof(s: &str) -> Result<ProofType, Response> {
    match s {
        "" | "work" => Ok(ProofType::Work),
        "stake" => Ok(ProofType::Stake),
        _ => Err(Response::err(format!("unknown proof type: {s}"))),
    }
}

fn parse_hash(s: &str) -> Result<Uint256, Response> {
    Uint256::from_hex(s).map_err(|_| Response::err("bad hex"))
}

/// Network named by the request, then the environment, then main.
fn resolve_network(req: &Request) -> Result<Network, Response> {
    let name = match &req.network {
        Some(n) => n.clone(),
        None => std::env::var(NETWORK_ENV).unwrap_or_else(|_| Network::Main.to_string()),
    };
    name.parse().map_err(|e: oduwa_consensus::ConfigError| Response::err(e.to_string()))
}

/// Genesis of `params` followed by `blocks`, with stake modifiers filled in.
fn build_chain(
    params: &ChainParams,
    blocks: &[BlockSpec],
) -> Result<(ChainIndex, BlockId), Response> {
    let genesis = params.genesis_block();
    let genesis_hash = genesis.hash().map_err(consensus_err)?;
    let mut chain = ChainIndex::new();
    let mut g = BlockIndex::new(
        genesis_hash,
        0,
        genesis.header.time,
        genesis.header.bits,
        ProofType::Work,
    );
    g.generated_stake_modifier = true;
    let mut tip = chain.insert(g).map_err(consensus_err)?;

    for (i, block) in blocks.iter().enumerate() {
        let height = i as u32 + 1;
        let bits = if block.bits.is_empty() {
            genesis.header.bits
        } else {
            parse_bits(&block.bits)?
        };
        let (modifier, generated) =
            compute_next_stake_modifier(&chain, Some(tip), &params.consensus)
                .map_err(consensus_err)?;
        let mut seed = genesis_hash.0;
        seed[..4].copy_from_slice(&height.to_le_bytes());
        let mut e = BlockIndex::new(
            oduwa_consensus::hash::hash256(&seed),
            height,
            block.time,
            bits,
            parse_proof(&block.proof)?,
        );
        e.prev = Some(tip);
        e.stake_modifier = modifier;
        e.generated_stake_modifier = generated;
        tip = chain.insert(e).map_err(consensus_err)?;
    }
    Ok((chain, tip))
}

fn handle(req: Request) -> Result<Response, Response> {
    let network = resolve_network(&req)?;
    let params = select_params(network).map_err(|e| Response::err(e.to_string()))?;
    let consensus = &params.consensus;
    debug!(op = %req.op, %network, "handling request");

    let mut resp = match req.op.as_str() {
        "genesis" => {
            let block = params.genesis_block();
            let hash = block.hash().map_err(consensus_err)?;
            Response {
                block_hash: Some(hash.to_hex()),
                merkle_root: Some(block.header.merkle_root.to_hex()),
                bits: Some(format!("{:08x}", block.header.bits)),
                ..Response::ok()
            }
        }
        "check_pow" => {
            let (hash, bits) = if req.header_hex.is_empty() {
                (parse_hash(&req.hash_hex)?, parse_bits(&req.bits)?)
            } else {
                let bytes = hex::decode(&req.header_hex).map_err(|_| Response::err("bad hex"))?;
                let header = BlockHeader::from_bytes(&bytes).map_err(consensus_err)?;
                (header.hash().map_err(consensus_err)?, header.bits)
            };
            pow_check(&hash, bits, consensus).map_err(consensus_err)?;
            Response {
                block_hash: Some(hash.to_hex()),
                ..Response::ok()
            }
        }
        "next_target" => {
            let proof = parse_proof(&req.proof)?;
            let (chain, tip) = build_chain(params, &req.blocks)?;
            let bits = next_target_required(&chain, Some(tip), req.candidate_time, consensus, proof);
            Response {
                bits: Some(format!("{bits:08x}")),
                ..Response::ok()
            }
        }
        "stake_modifier" => {
            let (chain, tip) = build_chain(params, &req.blocks)?;
            let (modifier, generated) =
                compute_next_stake_modifier(&chain, Some(tip), consensus).map_err(consensus_err)?;
            Response {
                stake_modifier: Some(format!("{modifier:016x}")),
                generated: Some(generated),
                ..Response::ok()
            }
        }
        "checkpoint" => {
            let hash = parse_hash(&req.hash_hex)?;
            checkpoint_check(req.height, &hash, &params.checkpoint_data).map_err(consensus_err)?;
            Response::ok()
        }
        "kernel_hash" => {
            let input = KernelInput {
                stake_modifier: req.stake_modifier,
                block_from_time: req.block_from_time,
                tx_prev_time: req.tx_prev_time,
                prevout: OutPoint::new(parse_hash(&req.prevout_txid)?, req.prevout_n),
                time: req.time,
            };
            Response {
                kernel_hash: Some(input.hash().to_hex()),
                ..Response::ok()
            }
        }
        "coin_age_weight" => Response {
            weight: Some(coin_age_weight(req.begin, req.end, consensus)),
            ..Response::ok()
        },
        other => return Err(Response::err(format!("unknown op: {other}"))),
    };
    resp.network = Some(network.to_string());
    Ok(resp)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let resp = match serde_json::from_reader::<_, Request>(std::io::stdin()) {
        Ok(req) => handle(req).unwrap_or_else(|e| e),
        Err(e) => Response::err(format!("bad request: {e}")),
    };
    let _ = serde_json::to_writer(std::io::stdout(), &resp);
}
