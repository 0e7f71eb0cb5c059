//! Transaction clauses: one recipient, amount and payload each.

use std::sync::LazyLock;

use alloy_primitives::{Address, Bytes, U256, hex};

use crate::codec::{CodecError, Profile, ScalarKind, Value};

/// Selector of the token `transfer(address,uint256)` function.
pub const TRANSFER_SELECTOR: [u8; 4] = hex!("a9059cbb");

/// Wire profile of one clause: `to`, `value`, `data`.
pub static CLAUSE_PROFILE: LazyLock<Profile> = LazyLock::new(|| {
    Profile::structure(
        "clause",
        vec![
            Profile::scalar("to", ScalarKind::OptionalFixedHexBlob(20)),
            Profile::scalar("value", ScalarKind::numeric(32)),
            Profile::scalar("data", ScalarKind::HexBlob),
        ],
    )
});

/// One leg of a multi-clause transaction.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Clause {
    /// Recipient; `None` deploys `data` as contract code.
    pub to: Option<Address>,
    /// Amount in the smallest unit of the native token.
    pub value: U256,
    /// Call data or init code.
    pub data: Bytes,
    /// Client-side note. Never encoded.
    pub comment: Option<String>,
    /// Client-side ABI description of `data`. Never encoded.
    pub abi: Option<String>,
}

impl Clause {
    /// Plain value transfer.
    #[must_use]
    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            to: Some(to),
            value,
            ..Self::default()
        }
    }

    /// Contract call with encoded call data.
    #[must_use]
    pub fn call(to: Address, data: impl Into<Bytes>, value: U256) -> Self {
        Self {
            to: Some(to),
            value,
            data: data.into(),
            ..Self::default()
        }
    }

    /// Token transfer of `amount` to `to` through the `token` contract.
    ///
    /// The call data is the `transfer(address,uint256)` selector followed by both arguments
    /// as 32-byte words. No native value is attached.
    #[must_use]
    pub fn transfer_token(token: Address, to: Address, amount: U256) -> Self {
        let mut data = Vec::with_capacity(TRANSFER_SELECTOR.len().saturating_add(64));
        data.extend_from_slice(&TRANSFER_SELECTOR);
        data.extend_from_slice(&[0_u8; 12]);
        data.extend_from_slice(to.as_slice());
        data.extend_from_slice(&amount.to_be_bytes::<32>());
        Self::call(token, data, U256::ZERO)
    }

    /// Contract deployment with init code.
    #[must_use]
    pub fn deploy(code: impl Into<Bytes>) -> Self {
        Self {
            data: code.into(),
            ..Self::default()
        }
    }

    /// Attaches a client-side comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Attaches a client-side ABI description.
    #[must_use]
    pub fn with_abi(mut self, abi: impl Into<String>) -> Self {
        self.abi = Some(abi.into());
        self
    }

    /// Record consumed by [`CLAUSE_PROFILE`]. Metadata is dropped.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::record([
            (
                "to",
                self.to
                    .map_or(Value::Null, |to| Value::Text(hex::encode_prefixed(to))),
            ),
            ("value", Value::Int(self.value)),
            ("data", Value::Text(hex::encode_prefixed(&self.data))),
        ])
    }

    /// Rebuilds a clause from a record unpacked by [`CLAUSE_PROFILE`].
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when a field is missing or has the wrong shape.
    pub fn from_value(value: &Value, context: &str) -> Result<Self, CodecError> {
        let to = match value.field("to") {
            None | Some(Value::Null) => None,
            Some(other) => Some(Address::from_slice(&fixed_bytes(
                other,
                20,
                &format!("{context}.to"),
            )?)),
        };
        let value_field = value.field("value").and_then(Value::as_int).ok_or_else(|| {
            CodecError::UnexpectedType {
                context: format!("{context}.value"),
                expected: "integer",
                actual: value.field("value").map_or("null", Value::type_name),
            }
        })?;
        let data = hex_bytes(value.field("data"), &format!("{context}.data"))?;
        Ok(Self {
            to,
            value: value_field,
            data: data.into(),
            comment: None,
            abi: None,
        })
    }
}

/// Decodes a hex text field produced by a hex-blob kind.
pub(crate) fn hex_bytes(value: Option<&Value>, context: &str) -> Result<Vec<u8>, CodecError> {
    let Some(Value::Text(text)) = value else {
        return Err(CodecError::UnexpectedType {
            context: context.to_owned(),
            expected: "hex text",
            actual: value.map_or("null", Value::type_name),
        });
    };
    let invalid = || CodecError::InvalidHex {
        context: context.to_owned(),
        value: text.clone(),
    };
    let digits = text.strip_prefix("0x").ok_or_else(invalid)?;
    hex::decode(digits).map_err(|_| invalid())
}

/// Decodes a hex text field and checks its byte length.
pub(crate) fn fixed_bytes(value: &Value, len: usize, context: &str) -> Result<Vec<u8>, CodecError> {
    let bytes = hex_bytes(Some(value), context)?;
    if bytes.len() != len {
        return Err(CodecError::InvalidLength {
            context: context.to_owned(),
            expected: len,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;

    use super::*;

    const RECIPIENT: Address = address!("7567d83b7b8d80addcb281a71d54fc7b3364ffed");

    #[test]
    fn clause_profile_encodes_call() {
        let clause = Clause::call(RECIPIENT, vec![0, 0, 0, 0x60, 0x60, 0x60], U256::from(10_000))
            .with_comment("pay")
            .with_abi("{}");
        let encoded = CLAUSE_PROFILE
            .encode_object(&clause.to_value())
            .expect("encode should succeed");
        assert_eq!(
            hex::encode(&encoded),
            "df947567d83b7b8d80addcb281a71d54fc7b3364ffed82271086000000606060"
        );

        let decoded = CLAUSE_PROFILE
            .decode_object(&encoded)
            .expect("decode should succeed");
        let rebuilt = Clause::from_value(&decoded, "clause").expect("record should map");
        assert_eq!(rebuilt.to, clause.to);
        assert_eq!(rebuilt.value, clause.value);
        assert_eq!(rebuilt.data, clause.data);
        assert_eq!(rebuilt.comment, None);
    }

    #[test]
    fn deploy_clause_has_empty_recipient() {
        let clause = Clause::deploy(vec![0x60, 0x80]);
        assert_eq!(clause.to, None);
        let encoded = CLAUSE_PROFILE
            .encode_object(&clause.to_value())
            .expect("encode should succeed");
        assert_eq!(hex::encode(&encoded), "c58080826080");

        let decoded = CLAUSE_PROFILE
            .decode_object(&encoded)
            .expect("decode should succeed");
        assert_eq!(
            Clause::from_value(&decoded, "clause").expect("record should map"),
            clause
        );
    }

    #[test]
    fn transfer_has_no_data() {
        let clause = Clause::transfer(RECIPIENT, U256::ZERO);
        let encoded = CLAUSE_PROFILE
            .encode_object(&clause.to_value())
            .expect("encode should succeed");
        assert_eq!(
            hex::encode(encoded),
            "d7947567d83b7b8d80addcb281a71d54fc7b3364ffed8080"
        );
    }

    #[test]
    fn transfer_selector_matches_signature() {
        let digest = alloy_primitives::keccak256(b"transfer(address,uint256)");
        assert_eq!(digest.get(..4), Some(TRANSFER_SELECTOR.as_slice()));
    }

    #[test]
    fn token_transfer_encodes_call_data() {
        let token = address!("0000000000000000000000000000456e65726779");
        let clause = Clause::transfer_token(token, RECIPIENT, U256::from(1_000));
        assert_eq!(clause.to, Some(token));
        assert_eq!(clause.value, U256::ZERO);
        assert_eq!(clause.data.len(), 68);
        assert_eq!(
            hex::encode(&clause.data),
            concat!(
                "a9059cbb",
                "0000000000000000000000007567d83b7b8d80addcb281a71d54fc7b3364ffed",
                "00000000000000000000000000000000000000000000000000000000000003e8",
            )
        );
    }

    #[test]
    fn from_value_reports_bad_fields() {
        let record = Value::record([("to", Value::from("0x01")), ("value", 1_u64.into())]);
        let error = Clause::from_value(&record, "tx.clauses.#0").expect_err("short address");
        assert_eq!(error.context(), Some("tx.clauses.#0.to"));
    }
}
