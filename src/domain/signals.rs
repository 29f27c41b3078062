//! Live signal generation: the current regime and target allocation as of a date.

use chrono::NaiveDate;

use crate::domain::allocation::Allocation;
use crate::domain::asset_history::AssetHistory;
use crate::domain::error::QuadtraderError;
use crate::domain::macro_series::MacroInputs;
use crate::domain::strategy::QuadStrategy;

/// Classify the regime as of `as_of` (with its real streak) and allocate.
///
/// `assets` must have been through [`QuadStrategy::prepare`].
pub fn generate_signals(
    assets: &[AssetHistory],
    inputs: &MacroInputs,
    strategy: &QuadStrategy,
    as_of: NaiveDate,
) -> Result<Allocation, QuadtraderError> {
    let regime = strategy.regime.current_regime(inputs, as_of)?;
    let scores = strategy.momentum.scores_at(assets, as_of);
    if scores.is_empty() {
        tracing::warn!(as_of = %as_of, "no asset has a price on or before the signal date");
    }

    let allocation = strategy.allocation.allocate(&regime, &strategy.candidates(&scores));
    tracing::info!(
        as_of = %as_of,
        primary = %regime.primary,
        secondary = %regime.secondary,
        positions = allocation.position_count(),
        total_leverage = allocation.total_leverage,
        "signals generated"
    );
    Ok(allocation)
}
