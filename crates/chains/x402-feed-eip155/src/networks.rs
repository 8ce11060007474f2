//! USDC deployments on well-known EVM networks.
//!
//! Used when a challenge omits `asset`, and to fill in the EIP-712 domain when
//! a challenge omits `extra.name` / `extra.version`.

use alloy_primitives::{Address, address};
use x402_feed_types::chain::ChainId;

/// A token contract and the EIP-712 domain it verifies signatures under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsdcDeployment {
    pub chain_id: u64,
    pub address: Address,
    pub decimals: u8,
    pub eip712_name: &'static str,
    pub eip712_version: &'static str,
}

const fn usdc(
    chain_id: u64,
    address: Address,
    eip712_name: &'static str,
) -> UsdcDeployment {
    UsdcDeployment {
        chain_id,
        address,
        decimals: 6,
        eip712_name,
        eip712_version: "2",
    }
}

pub static USDC_DEPLOYMENTS: &[UsdcDeployment] = &[
    usdc(8453, address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"), "USD Coin"),
    usdc(84532, address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e"), "USDC"),
    usdc(137, address!("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359"), "USDC"),
    usdc(80002, address!("0x41E94Eb019C0762f9Bfcf9Fb1E58725BfB0e7582"), "USDC"),
    usdc(43114, address!("0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"), "USD Coin"),
    usdc(43113, address!("0x5425890298aed601595a70AB815c96711a31Bc65"), "USD Coin"),
    usdc(1329, address!("0xe15fC38F6D8c56aF07bbCBe3BAf5708A2Bf42392"), "USDC"),
    usdc(1328, address!("0x4fCF1784B31630811181f670Aea7A7bEF803eaED"), "USDC"),
    usdc(42220, address!("0xcebA9300f2b948710d2653dD7B07f33A8B32118C"), "USDC"),
    usdc(11142220, address!("0x01C5C0122039549AD1493B8220cABEdD739BC44E"), "USDC"),
];

/// USDC on `chain`, if this is a known EVM network.
pub fn usdc_deployment(chain: &ChainId) -> Option<&'static UsdcDeployment> {
    let chain_id = chain.eip155_chain_id()?;
    USDC_DEPLOYMENTS.iter().find(|d| d.chain_id == chain_id)
}

/// Asset resolver for [`ChallengeParser`](x402_feed_types::challenge::ChallengeParser).
pub fn usdc_address(chain: &ChainId) -> Option<Address> {
    usdc_deployment(chain).map(|d| d.address)
}

/// Deployment whose contract is `asset` on `chain`.
pub fn usdc_deployment_at(chain: &ChainId, asset: Address) -> Option<&'static UsdcDeployment> {
    usdc_deployment(chain).filter(|d| d.address == asset)
}
