// src/iterator.rs

use crate::client::UsergridClient;
use crate::collection::Listing;
use crate::entity::{validate_collection, Entity};
use crate::error::UsergridError;
use crate::query::UsergridQuery;
use std::collections::VecDeque;

impl UsergridClient {
    /// Starts a forward-only walk over every entity of `collection` matching `query`.
    ///
    /// The first page is requested here, so [`EntityIterator::has_next_entity`] never
    /// touches the network. Later pages are requested one at a time as the current one
    /// is drained.
    pub async fn iterate(
        &self,
        collection: &str,
        query: &UsergridQuery,
    ) -> Result<EntityIterator<'_>, UsergridError> {
        validate_collection(collection)?;
        self.iterate_listing(Listing::Collection(collection.to_string()), query)
            .await
    }

    pub(crate) async fn iterate_listing(
        &self,
        listing: Listing,
        query: &UsergridQuery,
    ) -> Result<EntityIterator<'_>, UsergridError> {
        let page = self.fetch_page(&listing, query, None).await?;
        Ok(EntityIterator {
            client: self,
            listing,
            query: query.clone(),
            page_size: query.get_limit().unwrap_or(self.config.page_size),
            buffer: page.entities.into(),
            cursor: page.cursor,
            pages_fetched: 1,
        })
    }
}

/// Lazily yields the entities of a paged collection in server order.
///
/// The iterator holds at most one page. When the page is drained and the server handed
/// out a cursor, the next call to [`get_next_entity`](EntityIterator::get_next_entity)
/// requests the following page with that cursor. Once a page arrives without a cursor
/// (or with an empty one) and is drained, the iterator is finished for good; build a new
/// one to start over.
#[derive(Debug)]
pub struct EntityIterator<'a> {
    client: &'a UsergridClient,
    listing: Listing,
    query: UsergridQuery,
    page_size: u32,
    buffer: VecDeque<Entity>,
    cursor: Option<String>,
    pages_fetched: usize,
}

impl<'a> EntityIterator<'a> {
    /// True if the current page still has entities or another page is known to exist.
    pub fn has_next_entity(&self) -> bool {
        !self.buffer.is_empty() || self.cursor.is_some()
    }

    /// Returns the next entity, fetching the following page first if the current one is drained.
    ///
    /// Fails with [`UsergridError::Exhausted`] without any request when
    /// [`has_next_entity`](EntityIterator::has_next_entity) is false. Empty pages that
    /// still carry a cursor are skipped within the same call. A failed page request is
    /// returned as-is and leaves the iterator untouched, so the call can be repeated.
    pub async fn get_next_entity(&mut self) -> Result<Entity, UsergridError> {
        if let Some(entity) = self.buffer.pop_front() {
            return Ok(entity);
        }
        let Some(mut cursor) = self.cursor.clone() else {
            return Err(UsergridError::Exhausted);
        };

        // Nothing is written back until a page with entities or the last page arrives.
        let mut fetched = 0;
        loop {
            let page = self
                .client
                .fetch_page(&self.listing, &self.query, Some(&cursor))
                .await?;
            fetched += 1;

            let next = match page.cursor {
                Some(next) if next == cursor => {
                    log::warn!(
                        "Server returned cursor '{}' again for '{}'; treating it as the last page",
                        cursor,
                        self.listing.endpoint()
                    );
                    None
                }
                other => other,
            };

            match next {
                Some(next) if page.entities.is_empty() => cursor = next,
                next => {
                    self.pages_fetched += fetched;
                    self.cursor = next;
                    self.buffer = page.entities.into();
                    return self.buffer.pop_front().ok_or(UsergridError::Exhausted);
                }
            }
        }
    }

    /// Drains the iterator, fetching every remaining page.
    pub async fn collect_remaining(mut self) -> Result<Vec<Entity>, UsergridError> {
        let mut entities = Vec::new();
        while self.has_next_entity() {
            match self.get_next_entity().await {
                Ok(entity) => entities.push(entity),
                Err(UsergridError::Exhausted) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(entities)
    }

    /// Number of page requests made so far, including the initial one.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// The cursor the next page request will use, if any.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Entities of the current page not yet returned.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Path being listed, relative to the application URL.
    pub fn collection(&self) -> &str {
        self.listing.endpoint()
    }
}
