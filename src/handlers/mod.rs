// handlers/mod.rs - two security tiers
//
// Public (no token) → Protected (token + capability, plus ownership on mutation)
pub mod protected;
pub mod public;
