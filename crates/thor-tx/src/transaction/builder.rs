//! High-level transaction builder.

use alloy_primitives::{B64, B256, U256};

use super::{Reserved, Transaction};
use crate::{clause::Clause, config::read_default_expiration};

/// Builder for unsigned transactions.
///
/// Setting either dynamic-fee field switches the built transaction to the dynamic-fee
/// family, a zero value included.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    /// Network identifier.
    chain_tag: u8,
    /// Recent block reference.
    block_ref: B64,
    /// Expiration in blocks.
    expiration: u32,
    /// User clauses.
    clauses: Vec<Clause>,
    /// Legacy gas price coefficient.
    gas_price_coef: Option<u8>,
    /// Dynamic-fee cap.
    max_fee_per_gas: Option<U256>,
    /// Dynamic-fee tip cap.
    max_priority_fee_per_gas: Option<U256>,
    /// Gas limit.
    gas: u64,
    /// Dependency transaction id.
    depends_on: Option<B256>,
    /// Anti-replay value.
    nonce: u64,
    /// Feature flags.
    reserved: Reserved,
}

impl TxBuilder {
    /// Creates a builder for `chain_tag` with the configured default expiration.
    #[must_use]
    pub fn new(chain_tag: u8) -> Self {
        Self {
            chain_tag,
            block_ref: B64::ZERO,
            expiration: read_default_expiration(),
            clauses: Vec::new(),
            gas_price_coef: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            gas: 0,
            depends_on: None,
            nonce: 0,
            reserved: Reserved::default(),
        }
    }

    /// Appends one clause.
    #[must_use]
    pub fn add_clause(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Appends many clauses.
    #[must_use]
    pub fn add_clauses<I>(mut self, clauses: I) -> Self
    where
        I: IntoIterator<Item = Clause>,
    {
        self.clauses.extend(clauses);
        self
    }

    /// Sets the block reference.
    #[must_use]
    pub const fn with_block_ref(mut self, block_ref: B64) -> Self {
        self.block_ref = block_ref;
        self
    }

    /// Sets the expiration window.
    #[must_use]
    pub const fn with_expiration(mut self, expiration: u32) -> Self {
        self.expiration = expiration;
        self
    }

    /// Sets the legacy gas price coefficient.
    #[must_use]
    pub const fn with_gas_price_coef(mut self, coef: u8) -> Self {
        self.gas_price_coef = Some(coef);
        self
    }

    /// Sets the dynamic-fee cap.
    #[must_use]
    pub const fn with_max_fee_per_gas(mut self, fee: U256) -> Self {
        self.max_fee_per_gas = Some(fee);
        self
    }

    /// Sets the dynamic-fee tip cap.
    #[must_use]
    pub const fn with_max_priority_fee_per_gas(mut self, fee: U256) -> Self {
        self.max_priority_fee_per_gas = Some(fee);
        self
    }

    /// Sets the gas limit.
    #[must_use]
    pub const fn with_gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }

    /// Sets the dependency transaction id.
    #[must_use]
    pub const fn with_depends_on(mut self, id: B256) -> Self {
        self.depends_on = Some(id);
        self
    }

    /// Sets the nonce.
    #[must_use]
    pub const fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the reserved features.
    #[must_use]
    pub fn with_reserved(mut self, reserved: Reserved) -> Self {
        self.reserved = reserved;
        self
    }

    /// Sets the delegation feature bit.
    #[must_use]
    pub const fn delegated(mut self) -> Self {
        self.reserved.features |= Reserved::DELEGATION_FEATURE;
        self
    }

    /// Builds the immutable transaction.
    ///
    /// Legacy transactions always carry a coefficient, zero when unset. Dynamic-fee
    /// transactions carry none since their wire layout has no slot for it.
    #[must_use]
    pub fn build(self) -> Transaction {
        let dynamic_fee = self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some();
        Transaction {
            chain_tag: self.chain_tag,
            block_ref: self.block_ref,
            expiration: self.expiration,
            clauses: self.clauses,
            gas_price_coef: if dynamic_fee {
                None
            } else {
                Some(self.gas_price_coef.unwrap_or_default())
            },
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
            gas: self.gas,
            depends_on: self.depends_on,
            nonce: self.nonce,
            reserved: self.reserved,
        }
    }
}

impl From<&Transaction> for TxBuilder {
    fn from(transaction: &Transaction) -> Self {
        Self {
            chain_tag: transaction.chain_tag,
            block_ref: transaction.block_ref,
            expiration: transaction.expiration,
            clauses: transaction.clauses.clone(),
            gas_price_coef: transaction.gas_price_coef,
            max_fee_per_gas: transaction.max_fee_per_gas,
            max_priority_fee_per_gas: transaction.max_priority_fee_per_gas,
            gas: transaction.gas,
            depends_on: transaction.depends_on,
            nonce: transaction.nonce,
            reserved: transaction.reserved.clone(),
        }
    }
}
