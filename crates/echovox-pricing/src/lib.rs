pub mod cost;
pub mod table;

pub use cost::{compute_cost, CostBreakdown};
pub use table::{pricing_for, ModalityRates, ModelPricing, DEFAULT_MODEL};
