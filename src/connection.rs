// src/connection.rs

use crate::client::UsergridClient;
use crate::collection::{Listing, Page};
use crate::entity::{validate_collection, validate_identifier, Entity};
use crate::error::UsergridError;
use crate::iterator::EntityIterator;
use crate::query::UsergridQuery;
use crate::types::UsergridResponse;

use reqwest::Method;
use serde_json::Value;

/// Which side of a connection to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionDirection {
    /// Entities this entity connects to (`<entity>/connections/<relationship>`).
    Outgoing,
    /// Entities that connect to this entity (`<entity>/connecting/<relationship>`).
    Incoming,
}

impl ConnectionDirection {
    fn path_segment(self) -> &'static str {
        match self {
            ConnectionDirection::Outgoing => "connections",
            ConnectionDirection::Incoming => "connecting",
        }
    }
}

fn validate_relationship(relationship: &str) -> Result<(), UsergridError> {
    if relationship.is_empty() {
        return Err(UsergridError::InvalidInput(
            "Relationship cannot be empty".to_string(),
        ));
    }
    validate_identifier(relationship)
}

// `<collection>/<id>` for an entity that is already on the server.
fn entity_path(entity: &Entity) -> Result<String, UsergridError> {
    validate_collection(entity.collection())?;
    Ok(format!("{}/{}", entity.collection(), entity.identifier()?))
}

// `<from>/<relationship>/<to collection>/<to id>`
fn connection_path(
    from: &Entity,
    relationship: &str,
    to: &Entity,
) -> Result<String, UsergridError> {
    validate_relationship(relationship)?;
    Ok(format!(
        "{}/{}/{}",
        entity_path(from)?,
        relationship,
        entity_path(to)?
    ))
}

impl UsergridClient {
    /// Connects `from` to `to` under `relationship` with
    /// `POST <collection>/<id>/<relationship>/<to collection>/<to id>`.
    ///
    /// Both entities need a uuid or a name.
    pub async fn connect(
        &self,
        from: &Entity,
        relationship: &str,
        to: &Entity,
    ) -> Result<(), UsergridError> {
        let endpoint = connection_path(from, relationship, to)?;
        let _: UsergridResponse = self
            ._request(Method::POST, &endpoint, &[], None::<&Value>, true)
            .await?;
        log::debug!("Connected '{}'", endpoint);
        Ok(())
    }

    /// Removes the connection created by [`connect`](UsergridClient::connect).
    pub async fn disconnect(
        &self,
        from: &Entity,
        relationship: &str,
        to: &Entity,
    ) -> Result<(), UsergridError> {
        let endpoint = connection_path(from, relationship, to)?;
        let _: UsergridResponse = self.delete(&endpoint).await?;
        log::debug!("Disconnected '{}'", endpoint);
        Ok(())
    }

    /// Fetches one page of the entities connected to `entity` under `relationship`.
    ///
    /// Each returned entity is placed in the collection named by its `type`.
    pub async fn get_connections(
        &self,
        direction: ConnectionDirection,
        entity: &Entity,
        relationship: &str,
        query: &UsergridQuery,
        cursor: Option<&str>,
    ) -> Result<Page, UsergridError> {
        let listing = connection_listing(direction, entity, relationship)?;
        self.fetch_page(&listing, query, cursor).await
    }

    /// Walks every entity connected to `entity` under `relationship`, page by page.
    pub async fn iterate_connections(
        &self,
        direction: ConnectionDirection,
        entity: &Entity,
        relationship: &str,
        query: &UsergridQuery,
    ) -> Result<EntityIterator<'_>, UsergridError> {
        let listing = connection_listing(direction, entity, relationship)?;
        self.iterate_listing(listing, query).await
    }
}

fn connection_listing(
    direction: ConnectionDirection,
    entity: &Entity,
    relationship: &str,
) -> Result<Listing, UsergridError> {
    validate_relationship(relationship)?;
    Ok(Listing::Connections {
        endpoint: format!(
            "{}/{}/{}",
            entity_path(entity)?,
            direction.path_segment(),
            relationship
        ),
        relationship: relationship.to_string(),
    })
}

impl Entity {
    /// Same as [`UsergridClient::connect`] with this entity as the source.
    pub async fn connect(
        &self,
        client: &UsergridClient,
        relationship: &str,
        to: &Entity,
    ) -> Result<(), UsergridError> {
        client.connect(self, relationship, to).await
    }

    pub async fn disconnect(
        &self,
        client: &UsergridClient,
        relationship: &str,
        to: &Entity,
    ) -> Result<(), UsergridError> {
        client.disconnect(self, relationship, to).await
    }

    /// First page of this entity's connections; see [`UsergridClient::get_connections`].
    pub async fn get_connections(
        &self,
        client: &UsergridClient,
        direction: ConnectionDirection,
        relationship: &str,
        query: &UsergridQuery,
    ) -> Result<Page, UsergridError> {
        client
            .get_connections(direction, self, relationship, query, None)
            .await
    }
}
