use crate::surface::{Key, RenderSurface, SurfaceError, SurfaceSelectors};
use crate::utils::jitter_ms;
use rand::Rng;
use tokio::time::sleep;

/// Reveals additional candidates on an infinite-scroll listing.
///
/// The surface only loads more results in response to organic-looking
/// interaction, so the driver mixes randomized keyboard navigation with
/// randomized scrolls. The ranges are pacing heuristics against the
/// surface's automation detection, not correctness requirements.
pub struct PaginationDriver {
    selectors: SurfaceSelectors,
}

impl PaginationDriver {
    pub fn new(selectors: SurfaceSelectors) -> Self {
        Self { selectors }
    }

    /// Try to surface more candidates; true iff the candidate count grew.
    ///
    /// Obstruction and staleness during the sequence propagate to the
    /// caller for retry classification, never swallowed here.
    pub async fn advance<S: RenderSurface>(
        &self,
        surface: &mut S,
        previous_count: usize,
    ) -> Result<bool, SurfaceError> {
        let cards = surface.find_all(&self.selectors.result_card).await?;

        if let Some(last) = cards.last() {
            // Focus the tail of the list, then walk downward. An
            // occasional PageDown approximates a human skimming ahead.
            let presses = {
                let mut rng = rand::rng();
                rng.random_range(4..=10)
            };
            for _ in 0..presses {
                let key = {
                    let mut rng = rand::rng();
                    if rng.random_range(0..6) == 0 {
                        Key::PageDown
                    } else {
                        Key::ArrowDown
                    }
                };
                surface.send_keys(last, &[key]).await?;
                sleep(jitter_ms(40..140)).await;
            }
        }

        let containers = surface.find_all(&self.selectors.results_container).await?;
        if let Some(container) = containers.first() {
            let amount = {
                let mut rng = rand::rng();
                rng.random_range(320..=960)
            };
            surface.scroll_by(container, amount).await?;
        }

        sleep(jitter_ms(300..700)).await;

        let new_count = surface.find_all(&self.selectors.result_card).await?.len();
        Ok(new_count > previous_count)
    }
}
