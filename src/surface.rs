use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failure modes of a render-surface interaction.
///
/// Every surface operation can fail with any of these; classification
/// into retry policy lives in [`crate::retry`], not here.
#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("interaction obstructed: {0}")]
    Obstructed(String),

    #[error("element handle is no longer attached to the surface")]
    StaleHandle,

    #[error("timed out after {waited:?} waiting for '{selector}'")]
    Timeout { selector: String, waited: Duration },

    #[error("render session lost: {0}")]
    SessionLost(String),
}

/// Navigation keys the pagination driver may send to a focused element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    PageDown,
    End,
}

impl Key {
    /// DOM `KeyboardEvent.key` name for this key.
    pub fn dom_key(self) -> &'static str {
        match self {
            Key::ArrowDown => "ArrowDown",
            Key::PageDown => "PageDown",
            Key::End => "End",
        }
    }
}

/// A controllable, single-session render surface (a remote browser page).
///
/// Methods take `&mut self`: one logical session, one caller at a time.
/// Handles returned by `wait_for`/`find_all` are only valid until the
/// surface next mutates (navigation or revealed content) and must not be
/// retained across a pagination step.
#[allow(async_fn_in_trait)]
pub trait RenderSurface {
    type Handle: Clone;

    async fn navigate(&mut self, url: &str) -> Result<(), SurfaceError>;

    /// Block (bounded) until an element matching `selector` appears.
    async fn wait_for(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Self::Handle, SurfaceError>;

    /// Non-blocking snapshot of all elements currently matching `selector`.
    async fn find_all(&mut self, selector: &str) -> Result<Vec<Self::Handle>, SurfaceError>;

    async fn click(&mut self, handle: &Self::Handle) -> Result<(), SurfaceError>;

    async fn send_keys(
        &mut self,
        handle: &Self::Handle,
        keys: &[Key],
    ) -> Result<(), SurfaceError>;

    /// Scroll the given container element by `amount` pixels vertically.
    async fn scroll_by(
        &mut self,
        container: &Self::Handle,
        amount: i64,
    ) -> Result<(), SurfaceError>;

    async fn text_of(&mut self, handle: &Self::Handle) -> Result<String, SurfaceError>;

    async fn attribute_of(
        &mut self,
        handle: &Self::Handle,
        name: &str,
    ) -> Result<Option<String>, SurfaceError>;
}

/// Selector strings for the listing surface.
///
/// These are presentation-layer details of the remote UI and the part of
/// the system most likely to rot; they are bundled here so a caller can
/// override any of them without touching orchestration code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceSelectors {
    /// Scrollable container holding the result cards.
    pub results_container: String,
    /// One result card (candidate) in the listing.
    pub result_card: String,
    /// Title element of the expanded detail view. The only mandatory field.
    pub detail_title: String,
    pub rating: String,
    pub review_count: String,
    pub category: String,
    pub address: String,
    pub phone: String,
    /// Anchor whose `href` carries the website URL.
    pub website: String,
    pub hours: String,
}

impl Default for SurfaceSelectors {
    fn default() -> Self {
        Self {
            results_container: "[role='feed']".to_string(),
            result_card: "[role='article']".to_string(),
            detail_title: "h1".to_string(),
            rating: "span.fontDisplayLarge".to_string(),
            review_count: "button[jsaction*='pane.rating.moreReviews']".to_string(),
            category: "button[jsaction*='pane.rating.category']".to_string(),
            address: "button[data-item-id*='address']".to_string(),
            phone: "button[data-item-id*='phone']".to_string(),
            website: "a[data-item-id*='authority']".to_string(),
            hours: "div[jsaction*='pane.openhours']".to_string(),
        }
    }
}
