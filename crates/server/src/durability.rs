//! Tool wear after a vein operation.

use rand::Rng;

use crate::item::ToolDescriptor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurabilityPolicy {
    /// Damage rolls per broken block. Fractions are rolled, not rounded.
    pub multiplier: f64,
    pub respect_unbreaking: bool,
    /// Destroy the tool when wear reaches its max; otherwise leave it at 1.
    pub break_on_exceed: bool,
}

impl Default for DurabilityPolicy {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            respect_unbreaking: true,
            break_on_exceed: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityOutcome {
    /// Nothing to apply, or every roll was absorbed.
    Unchanged,
    Damaged { damage: u32 },
    /// Wear hit the max and was held one short of breaking.
    Clamped { damage: u32 },
    Broken,
}

/// Wear `tool` for `successful_breaks` blocks.
///
/// The tool is updated in place unless the outcome is `Broken`, in which case
/// the caller removes it from the player's hand.
pub fn apply_durability<R: Rng + ?Sized>(
    tool: &mut ToolDescriptor,
    successful_breaks: usize,
    policy: &DurabilityPolicy,
    rng: &mut R,
) -> DurabilityOutcome {
    if successful_breaks == 0 || policy.multiplier <= 0.0 || tool.unbreakable {
        return DurabilityOutcome::Unchanged;
    }
    let Some(max) = tool.max_durability.filter(|&m| m > 0) else {
        return DurabilityOutcome::Unchanged;
    };

    let raw = successful_breaks as f64 * policy.multiplier;
    let whole = raw.floor();
    let mut rolls = whole as u64;
    if rng.gen_bool((raw - whole).clamp(0.0, 1.0)) {
        rolls += 1;
    }

    let unbreaking = tool.unbreaking();
    if policy.respect_unbreaking && unbreaking > 0 {
        let consume = 1.0 / (f64::from(unbreaking) + 1.0);
        rolls = (0..rolls).filter(|_| rng.gen_bool(consume)).count() as u64;
    }
    if rolls == 0 {
        return DurabilityOutcome::Unchanged;
    }

    let damage = u64::from(tool.damage) + rolls;
    if damage >= u64::from(max) {
        if policy.break_on_exceed {
            return DurabilityOutcome::Broken;
        }
        tool.damage = max - 1;
        return DurabilityOutcome::Clamped { damage: tool.damage };
    }
    tool.damage = damage as u32;
    DurabilityOutcome::Damaged { damage: tool.damage }
}
