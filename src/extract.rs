use crate::record::Record;
use crate::surface::{RenderSurface, SurfaceError, SurfaceSelectors};
use std::time::Duration;
use tokio::time::sleep;

const CLICK_RETRIES: u32 = 3;
const CLICK_BACKOFF: Duration = Duration::from_millis(250);

/// Extracts one [`Record`] from a candidate card on the listing surface.
///
/// Clicking a card loads its detail view into a shared pane, so
/// extraction is strictly sequential; the extractor itself is stateless
/// and holds only configuration.
pub struct RecordExtractor {
    selectors: SurfaceSelectors,
    title_wait: Duration,
}

impl RecordExtractor {
    pub fn new(selectors: SurfaceSelectors) -> Self {
        Self {
            selectors,
            title_wait: Duration::from_secs(5),
        }
    }

    pub fn with_title_wait(mut self, title_wait: Duration) -> Self {
        self.title_wait = title_wait;
        self
    }

    /// Extract the record behind `card`. `Ok(None)` means skip this
    /// candidate: no title appeared within the wait bound, or the click
    /// could not land after its retries. Only session-level failures
    /// propagate as `Err` for the caller to classify.
    pub async fn extract<S: RenderSurface>(
        &self,
        surface: &mut S,
        card: &S::Handle,
    ) -> Result<Option<Record>, SurfaceError> {
        if !self.click_with_retries(surface, card).await? {
            return Ok(None);
        }

        // The title is the only mandatory field; its absence is the one
        // path that rejects the whole candidate.
        let title = match surface
            .wait_for(&self.selectors.detail_title, self.title_wait)
            .await
        {
            Ok(handle) => match surface.text_of(&handle).await {
                Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
                Ok(_) => return Ok(None),
                Err(SurfaceError::SessionLost(msg)) => {
                    return Err(SurfaceError::SessionLost(msg));
                }
                Err(_) => return Ok(None),
            },
            Err(SurfaceError::SessionLost(msg)) => return Err(SurfaceError::SessionLost(msg)),
            Err(_) => return Ok(None),
        };

        let mut record = Record::new(title);

        // Every remaining field is independent: a failed or empty lookup
        // records None and never aborts the other fields.
        record.rating = self.field_text(surface, &self.selectors.rating).await;
        record.review_count = self.field_text(surface, &self.selectors.review_count).await;
        record.category = self.field_text(surface, &self.selectors.category).await;
        record.address = self.field_text(surface, &self.selectors.address).await;
        record.phone = self.field_text(surface, &self.selectors.phone).await;
        record.website = self
            .field_attribute(surface, &self.selectors.website, "href")
            .await;
        record.hours = self.field_text(surface, &self.selectors.hours).await;

        Ok(Some(record))
    }

    /// Click the card, retrying obstructed/stale interactions a few
    /// times with backoff. Returns false when the click never landed.
    async fn click_with_retries<S: RenderSurface>(
        &self,
        surface: &mut S,
        card: &S::Handle,
    ) -> Result<bool, SurfaceError> {
        let mut backoff = CLICK_BACKOFF;
        for attempt in 0..=CLICK_RETRIES {
            match surface.click(card).await {
                Ok(()) => return Ok(true),
                Err(SurfaceError::Obstructed(_)) | Err(SurfaceError::StaleHandle)
                    if attempt < CLICK_RETRIES =>
                {
                    log::debug!("click attempt {} failed, backing off", attempt + 1);
                    sleep(backoff).await;
                    backoff *= 2;
                }
                Err(SurfaceError::SessionLost(msg)) => {
                    return Err(SurfaceError::SessionLost(msg));
                }
                Err(_) => return Ok(false),
            }
        }
        Ok(false)
    }

    async fn field_text<S: RenderSurface>(
        &self,
        surface: &mut S,
        selector: &str,
    ) -> Option<String> {
        let handles = surface.find_all(selector).await.ok()?;
        let handle = handles.first()?;
        match surface.text_of(handle).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        }
    }

    async fn field_attribute<S: RenderSurface>(
        &self,
        surface: &mut S,
        selector: &str,
        name: &str,
    ) -> Option<String> {
        let handles = surface.find_all(selector).await.ok()?;
        let handle = handles.first()?;
        match surface.attribute_of(handle, name).await {
            Ok(Some(value)) if !value.is_empty() => Some(value),
            _ => None,
        }
    }
}
