// src/collection.rs

use crate::client::UsergridClient;
use crate::entity::{validate_collection, Entity};
use crate::error::UsergridError;
use crate::query::UsergridQuery;
use crate::types::UsergridResponse;
use serde_json::{Map, Value};

/// One page of a collection listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Entities in server order.
    pub entities: Vec<Entity>,
    /// Token for the following page; `None` on the last page.
    pub cursor: Option<String>,
    pub count: Option<u64>,
}

impl Page {
    pub(crate) fn from_response(source: &Listing, response: UsergridResponse) -> Self {
        let entities = response
            .entities
            .into_iter()
            .map(|record| Entity::from_record(&source.collection_for(&record), record))
            .collect();
        Page {
            entities,
            cursor: response.cursor,
            count: response.count,
        }
    }

    pub fn is_last(&self) -> bool {
        self.cursor.is_none()
    }
}

// What a paged request lists: a collection, or the entities connected to one entity.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Listing {
    Collection(String),
    Connections {
        endpoint: String,
        relationship: String,
    },
}

impl Listing {
    pub(crate) fn endpoint(&self) -> &str {
        match self {
            Listing::Collection(name) => name,
            Listing::Connections { endpoint, .. } => endpoint,
        }
    }

    // Connected entities may come from any collection; their `type` names it.
    fn collection_for(&self, record: &Map<String, Value>) -> String {
        match self {
            Listing::Collection(name) => name.clone(),
            Listing::Connections { relationship, .. } => record
                .get("type")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .unwrap_or(relationship)
                .to_string(),
        }
    }
}

impl UsergridClient {
    /// Fetches a single page of `collection` with one `GET`.
    ///
    /// `cursor` is sent verbatim when present. The page size is the query's limit, or the
    /// configured default.
    pub async fn get_page(
        &self,
        collection: &str,
        query: &UsergridQuery,
        cursor: Option<&str>,
    ) -> Result<Page, UsergridError> {
        validate_collection(collection)?;
        self.fetch_page(&Listing::Collection(collection.to_string()), query, cursor)
            .await
    }

    pub(crate) async fn fetch_page(
        &self,
        listing: &Listing,
        query: &UsergridQuery,
        cursor: Option<&str>,
    ) -> Result<Page, UsergridError> {
        if query.get_limit() == Some(0) {
            return Err(UsergridError::InvalidInput(
                "Query limit must be greater than zero".to_string(),
            ));
        }
        let params = query.build_query_params(self.config.page_size, cursor);
        let response: UsergridResponse =
            self.get_with_params(listing.endpoint(), &params).await?;
        let page = Page::from_response(listing, response);
        log::debug!(
            "Fetched page of '{}': {} entities, more={}",
            listing.endpoint(),
            page.entities.len(),
            !page.is_last()
        );
        Ok(page)
    }

    /// Loads the first page of `collection` into a [`CollectionPager`].
    pub async fn collection(
        &self,
        collection: &str,
        query: &UsergridQuery,
    ) -> Result<CollectionPager<'_>, UsergridError> {
        let page = self.get_page(collection, query, None).await?;
        Ok(CollectionPager {
            client: self,
            collection: collection.to_string(),
            query: query.clone(),
            page,
            current_cursor: None,
            previous_cursors: Vec::new(),
        })
    }
}

/// Page-at-a-time view of a collection that can step forward and back.
///
/// Moving back re-requests the earlier page with the cursor that produced it; the server
/// is the source of truth and nothing is cached beyond the current page. A failed fetch
/// leaves the pager on the page it was showing.
#[derive(Debug)]
pub struct CollectionPager<'a> {
    client: &'a UsergridClient,
    collection: String,
    query: UsergridQuery,
    page: Page,
    // Cursor that produced `page`; `None` for the first page.
    current_cursor: Option<String>,
    previous_cursors: Vec<Option<String>>,
}

impl<'a> CollectionPager<'a> {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn entities(&self) -> &[Entity] {
        &self.page.entities
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Number of entities on the current page.
    pub fn count(&self) -> usize {
        self.page.entities.len()
    }

    /// Zero-based index of the current page.
    pub fn page_number(&self) -> usize {
        self.previous_cursors.len()
    }

    pub fn has_next_page(&self) -> bool {
        self.page.cursor.is_some()
    }

    pub fn has_previous_page(&self) -> bool {
        !self.previous_cursors.is_empty()
    }

    /// Advances to the next page. Returns `false` without a request on the last page.
    pub async fn next_page(&mut self) -> Result<bool, UsergridError> {
        let Some(next_cursor) = self.page.cursor.clone() else {
            return Ok(false);
        };
        let page = self
            .client
            .get_page(&self.collection, &self.query, Some(&next_cursor))
            .await?;
        let previous = std::mem::replace(&mut self.current_cursor, Some(next_cursor));
        self.previous_cursors.push(previous);
        self.page = page;
        Ok(true)
    }

    /// Steps back one page. Returns `false` without a request on the first page.
    pub async fn previous_page(&mut self) -> Result<bool, UsergridError> {
        let Some(previous) = self.previous_cursors.last().cloned() else {
            return Ok(false);
        };
        let page = self
            .client
            .get_page(&self.collection, &self.query, previous.as_deref())
            .await?;
        self.previous_cursors.pop();
        self.current_cursor = previous;
        self.page = page;
        Ok(true)
    }

    /// Reloads the first page and forgets the navigation history.
    pub async fn reset(&mut self) -> Result<(), UsergridError> {
        let page = self
            .client
            .get_page(&self.collection, &self.query, None)
            .await?;
        self.previous_cursors.clear();
        self.current_cursor = None;
        self.page = page;
        Ok(())
    }

    /// Looks up an entity on the current page by uuid.
    pub fn find_by_uuid(&self, uuid: &str) -> Option<&Entity> {
        self.page.entities.iter().find(|e| e.uuid() == Some(uuid))
    }
}
