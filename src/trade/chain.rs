//! Chain plumbing for on-chain swaps
//!
//! The executor only talks to [`ChainRpc`]; the `ethers` provider sits behind
//! it so tests can swap in a mock.

use anyhow::Context;
use async_trait::async_trait;
use ethers::abi::parse_abi;
use ethers::contract::BaseContract;
use ethers::providers::{Http, Middleware, Provider, ProviderError};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::TradeSide;

/// Swap entry points exposed by every per-instrument contract
const SWAP_ABI: &[&str] = &[
    "function tokenBtoTokenA(uint256 amount)",
    "function tokenAtoTokenB(uint256 amount)",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Contract logic rejected the call
    #[error("execution reverted: {0}")]
    Reverted(String),

    #[error("rpc transport error: {0}")]
    Transport(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("call encoding failed: {0}")]
    Encoding(String),
}

impl From<ProviderError> for ChainError {
    fn from(err: ProviderError) -> Self {
        let message = err.to_string();
        if message.to_lowercase().contains("revert") {
            ChainError::Reverted(message)
        } else {
            ChainError::Transport(message)
        }
    }
}

/// Minimal RPC surface needed to submit a swap
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Current transaction count of `address`
    async fn nonce(&self, address: Address) -> Result<U256, ChainError>;

    async fn gas_price(&self) -> Result<U256, ChainError>;

    /// Broadcast a signed transaction, returning its hash once accepted
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, ChainError>;
}

/// JSON-RPC over HTTP
pub struct HttpChainRpc {
    provider: Provider<Http>,
}

impl HttpChainRpc {
    pub fn new(rpc_url: &str) -> anyhow::Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("Invalid RPC URL: {}", rpc_url))?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl ChainRpc for HttpChainRpc {
    async fn nonce(&self, address: Address) -> Result<U256, ChainError> {
        Ok(self.provider.get_transaction_count(address, None).await?)
    }

    async fn gas_price(&self) -> Result<U256, ChainError> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, ChainError> {
        let pending = self.provider.send_raw_transaction(raw).await?;
        Ok(pending.tx_hash())
    }
}

/// ABI encoder for the two swap entry points
#[derive(Debug, Clone)]
pub struct SwapContract {
    abi: BaseContract,
}

impl SwapContract {
    pub fn new() -> Result<Self, ChainError> {
        let abi = parse_abi(SWAP_ABI).map_err(|e| ChainError::Encoding(e.to_string()))?;
        Ok(Self {
            abi: BaseContract::from(abi),
        })
    }

    /// BUY swaps quote for base, SELL swaps base for quote
    pub fn function_name(side: TradeSide) -> &'static str {
        match side {
            TradeSide::Buy => "tokenBtoTokenA",
            TradeSide::Sell => "tokenAtoTokenB",
        }
    }

    pub fn encode(&self, side: TradeSide, amount: U256) -> Result<Bytes, ChainError> {
        self.abi
            .encode(Self::function_name(side), amount)
            .map_err(|e| ChainError::Encoding(e.to_string()))
    }
}

/// Sign a legacy transaction and return its RLP encoding
pub async fn sign_transaction(wallet: &LocalWallet, tx: TransactionRequest) -> Result<Bytes, ChainError> {
    let typed: TypedTransaction = tx.into();
    let signature = wallet
        .sign_transaction(&typed)
        .await
        .map_err(|e| ChainError::Signing(e.to_string()))?;
    Ok(typed.rlp_signed(&signature))
}

/// Encode a token amount in its smallest unit. Sub-unit dust is truncated.
pub fn to_smallest_unit(amount: Decimal, decimals: u32) -> Result<U256, ChainError> {
    if amount.is_sign_negative() {
        return Err(ChainError::Encoding(format!("negative amount {}", amount)));
    }
    let mut scaled = amount;
    for _ in 0..decimals {
        scaled = scaled.checked_mul(Decimal::TEN).ok_or_else(|| {
            ChainError::Encoding(format!("{} overflows at {} decimals", amount, decimals))
        })?;
    }
    let units = scaled
        .trunc()
        .to_u128()
        .ok_or_else(|| ChainError::Encoding(format!("{} is not representable", scaled)))?;
    Ok(U256::from(units))
}
