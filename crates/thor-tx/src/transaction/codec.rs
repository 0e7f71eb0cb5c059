//! Transaction encoder and decoder over the static profiles.

use std::collections::BTreeMap;

use alloy_primitives::{Address, B64, B256, U256, hex};

use super::{
    GasPayerSignature, Reserved, SignedTransaction, Transaction, TransactionError, profiles,
};
use crate::{
    clause::{Clause, fixed_bytes},
    codec::{CodecError, RlpItem, ScalarKind, Value},
    crypto::{SIGNATURE_LENGTH, recover_address},
};

/// Type byte prepended, outside the RLP list, to dynamic-fee encodings.
pub const DYNAMIC_FEE_TYPE: u8 = 0x02;

/// Root context of transaction fields.
const ROOT: &str = "tx";

/// Width of the feature word inside the reserved list.
const FEATURES_KIND: ScalarKind = ScalarKind::numeric(4);

/// Result of [`decode`]: the signing state is detected from the payload.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DecodedTransaction {
    /// Payload had no signature field.
    Unsigned(Transaction),
    /// Payload carried a signature; origin and gas payer were recovered from it.
    Signed(SignedTransaction),
}

impl DecodedTransaction {
    /// Decoded body.
    #[must_use]
    pub const fn transaction(&self) -> &Transaction {
        match self {
            Self::Unsigned(transaction) => transaction,
            Self::Signed(signed) => signed.transaction(),
        }
    }

    /// True for signed payloads.
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Signed(_))
    }

    /// Transaction id.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::Unsigned`] for unsigned payloads.
    pub fn id(&self) -> Result<B256, TransactionError> {
        match self {
            Self::Unsigned(_) => Err(TransactionError::Unsigned),
            Self::Signed(signed) => Ok(signed.id()),
        }
    }

    /// Recovered origin address.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::Unsigned`] for unsigned payloads.
    pub fn origin(&self) -> Result<Address, TransactionError> {
        match self {
            Self::Unsigned(_) => Err(TransactionError::Unsigned),
            Self::Signed(signed) => Ok(signed.origin()),
        }
    }

    /// Signed transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::Unsigned`] for unsigned payloads.
    pub fn into_signed(self) -> Result<SignedTransaction, TransactionError> {
        match self {
            Self::Unsigned(_) => Err(TransactionError::Unsigned),
            Self::Signed(signed) => Ok(signed),
        }
    }
}

/// Encodes the unsigned transaction.
///
/// # Errors
///
/// Returns [`TransactionError::Codec`] when a field is rejected by its kind.
pub fn encode(transaction: &Transaction) -> Result<Vec<u8>, TransactionError> {
    encode_with(transaction, None)
}

/// Encodes the signed transaction with its 65 or 130 byte signature field.
///
/// # Errors
///
/// Returns [`TransactionError::Codec`] when a field is rejected by its kind.
pub fn encode_signed(signed: &SignedTransaction) -> Result<Vec<u8>, TransactionError> {
    encode_with(signed.transaction(), Some(signed.signature()))
}

/// Selects the profile, packs the record and applies the type byte.
fn encode_with(
    transaction: &Transaction,
    signature: Option<Vec<u8>>,
) -> Result<Vec<u8>, TransactionError> {
    let dynamic_fee = transaction.is_dynamic_fee();
    let profile = profiles::select(dynamic_fee, signature.is_some());
    let mut record = body_record(transaction)?;
    if let Some(signature) = signature {
        record.insert("signature".to_owned(), Value::Bytes(signature));
    }
    let rlp = profile.encode_object(&Value::Record(record))?;
    if !dynamic_fee {
        return Ok(rlp);
    }
    let mut out = Vec::with_capacity(rlp.len().saturating_add(1));
    out.push(DYNAMIC_FEE_TYPE);
    out.extend_from_slice(&rlp);
    Ok(out)
}

/// Maps the model onto the record the profiles consume.
fn body_record(transaction: &Transaction) -> Result<BTreeMap<String, Value>, TransactionError> {
    let mut record = BTreeMap::new();
    let mut insert = |name: &str, value: Value| {
        record.insert(name.to_owned(), value);
    };
    insert("chain_tag", transaction.chain_tag.into());
    insert(
        "block_ref",
        Value::Text(hex::encode_prefixed(transaction.block_ref)),
    );
    insert("expiration", transaction.expiration.into());
    insert(
        "clauses",
        Value::List(transaction.clauses.iter().map(Clause::to_value).collect()),
    );
    if transaction.is_dynamic_fee() {
        insert(
            "max_priority_fee_per_gas",
            Value::Int(transaction.max_priority_fee_per_gas.unwrap_or_default()),
        );
        insert(
            "max_fee_per_gas",
            Value::Int(transaction.max_fee_per_gas.unwrap_or_default()),
        );
    } else {
        insert(
            "gas_price_coef",
            transaction.gas_price_coef.unwrap_or_default().into(),
        );
    }
    insert("gas", transaction.gas.into());
    insert(
        "depends_on",
        transaction
            .depends_on
            .map_or(Value::Null, |id| Value::Text(hex::encode_prefixed(id))),
    );
    insert("nonce", transaction.nonce.into());
    insert("reserved", Value::List(reserved_items(&transaction.reserved)?));
    Ok(record)
}

/// Feature word followed by the unused entries, trailing empty entries trimmed.
fn reserved_items(reserved: &Reserved) -> Result<Vec<Value>, TransactionError> {
    let features = FEATURES_KIND.encode(
        &Value::from(reserved.features),
        &format!("{ROOT}.reserved.features"),
    )?;
    let mut items = Vec::with_capacity(reserved.unused.len().saturating_add(1));
    items.push(features);
    items.extend(reserved.unused.iter().cloned());
    while items.last().is_some_and(Vec::is_empty) {
        items.pop();
    }
    Ok(items.into_iter().map(Value::Bytes).collect())
}

/// Decodes wire bytes into an unsigned or signed transaction.
///
/// The type byte selects the fee family and the list arity selects the signing state. For
/// signed payloads the origin, and for delegated ones the gas payer, are recovered from
/// the signature field.
///
/// # Errors
///
/// Returns [`TransactionError`] for malformed RLP, unknown layouts, non-canonical fields,
/// untrimmed reserved lists, or signatures that do not recover.
pub fn decode(bytes: &[u8]) -> Result<DecodedTransaction, TransactionError> {
    let (dynamic_fee, body) = match bytes.split_first() {
        Some((&DYNAMIC_FEE_TYPE, rest)) => (true, rest),
        _ => (false, bytes),
    };
    let item = RlpItem::from_rlp(body)?;
    let unsigned_profile = profiles::select(dynamic_fee, false);
    let signed_profile = profiles::select(dynamic_fee, true);
    let signed = match &item {
        RlpItem::List(items) if items.len() == profiles::field_count(signed_profile) => true,
        RlpItem::List(items) if items.len() != profiles::field_count(unsigned_profile) => {
            return Err(TransactionError::UnknownLayout {
                family: if dynamic_fee { "dynamic-fee" } else { "legacy" },
                actual: items.len(),
            });
        }
        _ => false,
    };
    let profile = if signed { signed_profile } else { unsigned_profile };
    let record = profile.unpack(&item, "")?;
    let transaction = transaction_from_record(&record, dynamic_fee)?;
    if !signed {
        return Ok(DecodedTransaction::Unsigned(transaction));
    }

    let signature = record
        .field("signature")
        .and_then(Value::as_bytes)
        .unwrap_or_default();
    let expected = if transaction.is_delegated() {
        SIGNATURE_LENGTH.saturating_mul(2)
    } else {
        SIGNATURE_LENGTH
    };
    if signature.len() != expected {
        return Err(TransactionError::InvalidSignatureLength {
            expected,
            actual: signature.len(),
        });
    }
    let (origin_part, payer_part) = signature.split_at(SIGNATURE_LENGTH);
    let origin = recover_address(&transaction.signing_hash()?, origin_part)?;
    let gas_payer = if transaction.is_delegated() {
        let address = recover_address(&transaction.delegation_hash(&origin)?, payer_part)?;
        Some(GasPayerSignature {
            address,
            signature: signature_array(payer_part),
        })
    } else {
        None
    };
    SignedTransaction::new(transaction, origin, signature_array(origin_part), gas_payer)
        .map(DecodedTransaction::Signed)
}

/// Copies a length-checked slice into a signature array.
fn signature_array(bytes: &[u8]) -> [u8; SIGNATURE_LENGTH] {
    let mut out = [0_u8; SIGNATURE_LENGTH];
    if let Some(source) = bytes.get(..SIGNATURE_LENGTH) {
        out.copy_from_slice(source);
    }
    out
}

/// Rebuilds the model from a record unpacked by a transaction profile.
fn transaction_from_record(
    record: &Value,
    dynamic_fee: bool,
) -> Result<Transaction, TransactionError> {
    let clauses = record
        .field("clauses")
        .and_then(Value::as_list)
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(index, clause)| Clause::from_value(clause, &format!("{ROOT}.clauses.#{index}")))
        .collect::<Result<Vec<_>, _>>()?;
    let (gas_price_coef, max_fee_per_gas, max_priority_fee_per_gas) = if dynamic_fee {
        (
            None,
            Some(int_field::<U256>(record, "max_fee_per_gas")?),
            Some(int_field::<U256>(record, "max_priority_fee_per_gas")?),
        )
    } else {
        (Some(int_field(record, "gas_price_coef")?), None, None)
    };
    let block_ref = record
        .field("block_ref")
        .ok_or_else(|| missing("block_ref"))
        .and_then(|value| {
            fixed_bytes(value, 8, &format!("{ROOT}.block_ref")).map_err(TransactionError::from)
        })?;
    let depends_on = match record.field("depends_on") {
        None | Some(Value::Null) => None,
        Some(value) => Some(B256::from_slice(&fixed_bytes(
            value,
            32,
            &format!("{ROOT}.depends_on"),
        )?)),
    };
    Ok(Transaction {
        chain_tag: int_field(record, "chain_tag")?,
        block_ref: B64::from_slice(&block_ref),
        expiration: int_field(record, "expiration")?,
        clauses,
        gas_price_coef,
        max_fee_per_gas,
        max_priority_fee_per_gas,
        gas: int_field(record, "gas")?,
        depends_on,
        nonce: int_field(record, "nonce")?,
        reserved: reserved_from_record(record)?,
    })
}

/// Parses the reserved list, rejecting a trailing empty entry.
fn reserved_from_record(record: &Value) -> Result<Reserved, TransactionError> {
    let items = record
        .field("reserved")
        .and_then(Value::as_list)
        .unwrap_or_default();
    let Some((first, rest)) = items.split_first() else {
        return Ok(Reserved::default());
    };
    if items.last().and_then(Value::as_bytes).is_some_and(<[u8]>::is_empty) {
        return Err(TransactionError::UntrimmedReserved);
    }
    let context = format!("{ROOT}.reserved.features");
    let first = first.as_bytes().unwrap_or_default();
    let features = FEATURES_KIND
        .decode(first, &context)?
        .as_int()
        .and_then(|features| u32::try_from(features).ok())
        .ok_or(CodecError::OutOfRange {
            context,
            max_bytes: 4,
            actual: first.len(),
        })?;
    let unused = rest
        .iter()
        .map(|item| item.as_bytes().unwrap_or_default().to_vec())
        .collect();
    Ok(Reserved { features, unused })
}

/// Reads an integer field and narrows it to `T`.
fn int_field<T>(record: &Value, name: &str) -> Result<T, TransactionError>
where
    T: TryFrom<U256>,
{
    let context = format!("{ROOT}.{name}");
    let value = record.field(name).ok_or_else(|| missing(name))?;
    let int = value.as_int().ok_or_else(|| CodecError::UnexpectedType {
        context: context.clone(),
        expected: "integer",
        actual: value.type_name(),
    })?;
    T::try_from(int).map_err(|_| {
        TransactionError::from(CodecError::OutOfRange {
            context,
            max_bytes: size_of::<T>(),
            actual: int.byte_len(),
        })
    })
}

/// Error for a field absent from the unpacked record.
fn missing(name: &str) -> TransactionError {
    TransactionError::from(CodecError::UnexpectedType {
        context: format!("{ROOT}.{name}"),
        expected: "field",
        actual: "null",
    })
}
