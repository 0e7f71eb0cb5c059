//! Wire profiles for the two fee families, unsigned and signed.

use std::sync::LazyLock;

use crate::{
    clause::CLAUSE_PROFILE,
    codec::{Kind, Profile, ScalarKind},
};

/// Leading fields shared by both families.
fn head() -> Vec<Profile> {
    vec![
        Profile::scalar("chain_tag", ScalarKind::numeric(1)),
        Profile::scalar("block_ref", ScalarKind::CompactFixedHexBlob(8)),
        Profile::scalar("expiration", ScalarKind::numeric(4)),
        Profile::array("clauses", CLAUSE_PROFILE.kind.clone()),
    ]
}

/// Trailing fields shared by both families.
fn tail() -> Vec<Profile> {
    vec![
        Profile::scalar("gas", ScalarKind::numeric(8)),
        Profile::scalar("depends_on", ScalarKind::OptionalFixedHexBlob(32)),
        Profile::scalar("nonce", ScalarKind::numeric(8)),
        Profile::array("reserved", Kind::Scalar(ScalarKind::Bytes)),
    ]
}

/// Signature field appended by the signed variants.
const fn signature() -> Profile {
    Profile::scalar("signature", ScalarKind::Bytes)
}

/// Assembles a transaction profile around the fee fields.
fn transaction(fee: Vec<Profile>, signed: bool) -> Profile {
    let mut fields = head();
    fields.extend(fee);
    fields.extend(tail());
    if signed {
        fields.push(signature());
    }
    Profile::structure("tx", fields)
}

/// Legacy fee field.
fn legacy_fee() -> Vec<Profile> {
    vec![Profile::scalar("gas_price_coef", ScalarKind::numeric(1))]
}

/// Dynamic fee fields, tip cap first.
fn dynamic_fee() -> Vec<Profile> {
    vec![
        Profile::scalar("max_priority_fee_per_gas", ScalarKind::numeric(32)),
        Profile::scalar("max_fee_per_gas", ScalarKind::numeric(32)),
    ]
}

/// Unsigned legacy transaction.
pub static LEGACY: LazyLock<Profile> = LazyLock::new(|| transaction(legacy_fee(), false));

/// Signed legacy transaction.
pub static LEGACY_SIGNED: LazyLock<Profile> = LazyLock::new(|| transaction(legacy_fee(), true));

/// Unsigned dynamic-fee transaction.
pub static DYNAMIC_FEE: LazyLock<Profile> = LazyLock::new(|| transaction(dynamic_fee(), false));

/// Signed dynamic-fee transaction.
pub static DYNAMIC_FEE_SIGNED: LazyLock<Profile> =
    LazyLock::new(|| transaction(dynamic_fee(), true));

/// Field count of a struct profile.
#[must_use]
pub fn field_count(profile: &Profile) -> usize {
    match &profile.kind {
        Kind::Struct(fields) => fields.len(),
        Kind::Scalar(_) | Kind::Array(_) => 1,
    }
}

/// Profile for the fee family and signing state.
#[must_use]
pub fn select(dynamic_fee: bool, signed: bool) -> &'static Profile {
    match (dynamic_fee, signed) {
        (false, false) => &*LEGACY,
        (false, true) => &*LEGACY_SIGNED,
        (true, false) => &*DYNAMIC_FEE,
        (true, true) => &*DYNAMIC_FEE_SIGNED,
    }
}
