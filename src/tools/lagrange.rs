//! Lagrange coefficient reconstruction, shared by CMP (`public_point`)
//! and FROST (signing).
//!
//! Grounded on `config.go`'s `Config::PublicPoint`, which sums `λ_j(0)·X_j`
//! over all parties using the library's own Lagrange helper; `accord`
//! exposes the equivalent as a free function usable by both protocols.

use crate::curve::{Curve, CurveScalar};
use crate::party::PartyId;
use crate::tools::hashing::Hash;

/// The x-coordinate a party's identifier maps to: its canonical encoding
/// hashed into the scalar field, not a positional index — so a
/// Lagrange coefficient computed over any subset of the original
/// participants is independent of how that subset happens to be ordered
/// or which parties are excluded.
pub fn id_to_scalar<C: Curve>(id: &PartyId) -> C::Scalar {
    let wide = Hash::new_with_dst("accord/id-to-scalar")
        .chain_bytes(id.as_bytes())
        .finalize_wide("accord/id-to-scalar");
    C::Scalar::from_wide_bytes(&wide)
}

/// `λ_id^{ids}(0) = ∏_{k∈ids, k≠id} k/(k−id)` in the scalar field.
///
/// Returns `None` if `id` isn't in `ids`, or if the set only contains
/// `id` (this lone-party case is mathematically trivial, `λ = 1`, but is
/// rejected here to surface a caller bug rather than silently no-op —
/// keygen/signing always involve at least `t+1 >= 2` parties).
pub fn lagrange_coefficient<C: Curve>(ids: &[PartyId], id: &PartyId) -> Option<C::Scalar> {
    if !ids.contains(id) {
        return None;
    }
    let target = id_to_scalar::<C>(id);

    let mut numerator = C::Scalar::one();
    let mut denominator = C::Scalar::one();
    let mut saw_other = false;
    for k_id in ids.iter() {
        if k_id == id {
            continue;
        }
        saw_other = true;
        let k = id_to_scalar::<C>(k_id);
        numerator = numerator * k;
        denominator = denominator * (k - target);
    }
    if !saw_other {
        return None;
    }
    let denominator_inv = denominator.invert()?;
    Some(numerator * denominator_inv)
}
