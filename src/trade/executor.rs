//! Trade executor
//!
//! Turns one BUY/SELL signal into a [`TradeRecord`], either as a simulated
//! ledger entry or after an on-chain swap has been accepted by the node.
//! A submission that fails at any point writes nothing.

use anyhow::{anyhow, Context};
use chrono::Utc;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, TransactionRequest, U256};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::chain::{sign_transaction, to_smallest_unit, ChainRpc, HttpChainRpc, SwapContract};
use crate::config::{AppConfig, MAX_PRICE_DECIMALS, PRIVATE_KEY_ENV};
use crate::error::{PipelineError, PipelineResult};
use crate::store::TradeStore;
use crate::types::{
    ExecutionMode, NotionalUnit, SignalAction, SignalDocument, TradeRecord, TradeSide,
};

/// Contract address and token decimals for one instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractBinding {
    pub address: Address,
    pub quote_decimals: u32,
    pub base_decimals: u32,
}

/// Everything an on-chain submission needs, built once at startup
pub struct OnchainExecution {
    rpc: Arc<dyn ChainRpc>,
    wallet: LocalWallet,
    contract: SwapContract,
    bindings: HashMap<String, ContractBinding>,
    buy_amount: Decimal,
    sell_amount: Decimal,
    gas_limit: U256,
    chain_id: u64,
}

impl OnchainExecution {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        wallet: LocalWallet,
        bindings: HashMap<String, ContractBinding>,
        buy_amount: Decimal,
        sell_amount: Decimal,
        gas_limit: u64,
        chain_id: u64,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            rpc,
            wallet: wallet.with_chain_id(chain_id),
            contract: SwapContract::new()?,
            bindings,
            buy_amount,
            sell_amount,
            gas_limit: U256::from(gas_limit),
            chain_id,
        })
    }

    pub fn account(&self) -> Address {
        self.wallet.address()
    }

    fn binding(&self, instrument: &str) -> PipelineResult<&ContractBinding> {
        self.bindings.get(instrument).ok_or_else(|| {
            PipelineError::Configuration(format!("no contract binding for {}", instrument))
        })
    }

    /// Amount, token decimals and unit for one side
    fn sizing(&self, side: TradeSide, binding: &ContractBinding) -> (Decimal, u32, NotionalUnit) {
        match side {
            TradeSide::Buy => (self.buy_amount, binding.quote_decimals, NotionalUnit::Quote),
            TradeSide::Sell => (self.sell_amount, binding.base_decimals, NotionalUnit::Base),
        }
    }
}

enum Backend {
    Simulated { notional_usd: Decimal },
    Onchain(OnchainExecution),
}

pub struct TradeExecutor {
    store: Arc<dyn TradeStore>,
    price_decimals: u32,
    backend: Backend,
}

impl TradeExecutor {
    pub fn simulated(store: Arc<dyn TradeStore>, notional_usd: Decimal, price_decimals: u32) -> Self {
        Self {
            store,
            price_decimals,
            backend: Backend::Simulated { notional_usd },
        }
    }

    pub fn onchain(store: Arc<dyn TradeStore>, price_decimals: u32, chain: OnchainExecution) -> Self {
        Self {
            store,
            price_decimals,
            backend: Backend::Onchain(chain),
        }
    }

    /// Build the executor for the configured mode.
    ///
    /// On-chain mode reads the signing key from the environment and resolves a
    /// contract binding for every instrument; any gap is a startup fault.
    pub fn from_config(config: &AppConfig, store: Arc<dyn TradeStore>) -> anyhow::Result<Self> {
        let execution = &config.execution;
        match config.execution_mode()? {
            ExecutionMode::Simulated => Ok(Self::simulated(
                store,
                execution.notional_usd,
                execution.price_decimals,
            )),
            ExecutionMode::Onchain => {
                let key = std::env::var(PRIVATE_KEY_ENV)
                    .with_context(|| format!("{} is required for on-chain execution", PRIVATE_KEY_ENV))?;
                let wallet: LocalWallet = key
                    .parse()
                    .map_err(|_| anyhow!("{} is not a valid secp256k1 key", PRIVATE_KEY_ENV))?;

                let mut bindings = HashMap::new();
                for instrument in &config.bot.instruments {
                    let address = config.contract_address(instrument)?;
                    let contract = config
                        .contract(instrument)
                        .with_context(|| format!("No contract binding configured for {}", instrument))?;
                    bindings.insert(
                        instrument.clone(),
                        ContractBinding {
                            address,
                            quote_decimals: contract.quote_decimals,
                            base_decimals: contract.base_decimals,
                        },
                    );
                }

                let rpc = Arc::new(HttpChainRpc::new(&execution.rpc_url)?);
                let chain = OnchainExecution::new(
                    rpc,
                    wallet,
                    bindings,
                    execution.buy_amount,
                    execution.sell_amount,
                    execution.gas_limit,
                    execution.chain_id,
                )?;
                info!(account = ?chain.account(), chain_id = execution.chain_id, "On-chain execution ready");
                Ok(Self::onchain(store, execution.price_decimals, chain))
            }
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        match self.backend {
            Backend::Simulated { .. } => ExecutionMode::Simulated,
            Backend::Onchain(_) => ExecutionMode::Onchain,
        }
    }

    /// Dispatch on the signal's stored action code.
    /// HOLD and unknown codes are a no-op and return `Ok(None)`.
    pub async fn execute_signal(&self, signal: &SignalDocument) -> PipelineResult<Option<TradeRecord>> {
        let side = match signal.signal_action() {
            Some(SignalAction::Hold) => {
                info!(instrument = %signal.instrument, timestamp = %signal.timestamp, "HOLD, no trade");
                return Ok(None);
            }
            Some(action) => TradeSide::from_action(action),
            None => {
                info!(
                    instrument = %signal.instrument,
                    action = signal.action,
                    "Unknown signal action, no trade"
                );
                return Ok(None);
            }
        };

        match side {
            Some(side) => self.execute(signal, side).await.map(Some),
            None => Ok(None),
        }
    }

    /// Execute one trade and persist its record
    pub async fn execute(&self, signal: &SignalDocument, side: TradeSide) -> PipelineResult<TradeRecord> {
        let price = normalize_price(signal.price, self.price_decimals);

        let record = match &self.backend {
            Backend::Simulated { notional_usd } => {
                self.record(signal, side, ExecutionMode::Simulated, *notional_usd, NotionalUnit::Usd, price, None)
            }
            Backend::Onchain(chain) => {
                let (amount, unit, tx_hash) = self.submit(chain, signal, side).await?;
                self.record(signal, side, ExecutionMode::Onchain, amount, unit, price, Some(tx_hash))
            }
        };

        if let Err(e) = self.store.insert(&record).await {
            error!(
                instrument = %record.instrument,
                tx_hash = record.transaction_hash.as_deref().unwrap_or("-"),
                error = %e,
                "Failed to persist trade record"
            );
            return Err(PipelineError::Store(e));
        }

        info!(
            instrument = %record.instrument,
            action = %record.action,
            mode = %record.mode,
            notional = %record.notional,
            price = %record.price,
            tx_hash = record.transaction_hash.as_deref().unwrap_or("-"),
            "Trade executed"
        );
        Ok(record)
    }

    /// Build, sign and broadcast the swap. Returns amount, unit and tx hash.
    async fn submit(
        &self,
        chain: &OnchainExecution,
        signal: &SignalDocument,
        side: TradeSide,
    ) -> PipelineResult<(Decimal, NotionalUnit, String)> {
        let binding = chain.binding(&signal.instrument)?;
        let (amount, decimals, unit) = chain.sizing(side, binding);
        let units = to_smallest_unit(amount, decimals)?;
        let data = chain.contract.encode(side, units)?;

        let account = chain.account();
        let nonce = chain.rpc.nonce(account).await?;
        let gas_price = chain.rpc.gas_price().await?;
        debug!(
            instrument = %signal.instrument,
            function = SwapContract::function_name(side),
            %nonce,
            %gas_price,
            %units,
            "Submitting swap"
        );

        let tx = TransactionRequest::new()
            .from(account)
            .to(binding.address)
            .data(data)
            .value(U256::zero())
            .gas(chain.gas_limit)
            .gas_price(gas_price)
            .nonce(nonce)
            .chain_id(chain.chain_id);

        let raw = sign_transaction(&chain.wallet, tx).await?;
        let hash = chain.rpc.send_raw_transaction(raw).await?;
        Ok((amount, unit, format!("{:#x}", hash)))
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        signal: &SignalDocument,
        side: TradeSide,
        mode: ExecutionMode,
        notional: Decimal,
        notional_unit: NotionalUnit,
        price: Decimal,
        transaction_hash: Option<String>,
    ) -> TradeRecord {
        TradeRecord {
            id: Uuid::new_v4(),
            instrument: signal.instrument.clone(),
            action: side,
            mode,
            notional,
            notional_unit,
            price,
            timestamp: signal.timestamp,
            oscillator: signal.oscillator,
            transaction_hash,
            executed_at: Utc::now(),
        }
    }
}

/// Scale a raw fixed-point price down by `10^decimals`
pub fn normalize_price(raw: Decimal, decimals: u32) -> Decimal {
    let divisor = Decimal::from_i128_with_scale(10i128.pow(decimals.min(MAX_PRICE_DECIMALS)), 0);
    (raw / divisor).normalize()
}
