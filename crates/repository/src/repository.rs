//! The public repository API.
//!
//! [`DocumentRepository`] composes the injected notary with the storage
//! facade: drafting from a type catalog, saving and discarding drafts,
//! committing documents under names, and the full bag protocol. Argument
//! shapes are enforced structurally ([`Name`], [`Citation`], and
//! [`DocumentContent`] cannot be constructed malformed), and every failure
//! is wrapped once with the procedure and its arguments.

use std::collections::BTreeMap;
use std::sync::Arc;

use nebula_repository_storage::{OpContext, StorageDriver};
use nebula_repository_types::{
    CAPACITY_ATTRIBUTE, Citation, Document, DocumentContent, Name, Tag, ValidationError, Version,
};
use serde_json::Value;

use crate::error::RepositoryError;
use crate::facade::{FacadeError, StorageFacade};
use crate::notary::Notary;

/// Result type alias for repository operations.
pub type Result<T, E = RepositoryError> = std::result::Result<T, E>;

/// The public contract of a document repository.
///
/// The repository owns the facade, which owns the driver and caches;
/// callers hold the repository and nothing below it.
#[derive(Debug)]
pub struct DocumentRepository<D> {
    facade: StorageFacade<D>,
    notary: Arc<dyn Notary>,
}

impl<D: StorageDriver> DocumentRepository<D> {
    /// Creates a repository over a driver and a notary.
    #[must_use]
    pub fn new(driver: D, notary: Arc<dyn Notary>) -> Self {
        Self { facade: StorageFacade::new(driver, Arc::clone(&notary)), notary }
    }

    /// Creates a repository with an explicit immutable-object cache capacity.
    #[must_use]
    pub fn with_cache_capacity(driver: D, notary: Arc<dyn Notary>, capacity: usize) -> Self {
        Self {
            facade: StorageFacade::with_cache_capacity(driver, Arc::clone(&notary), capacity),
            notary,
        }
    }

    /// The underlying facade, for sweepers and advanced callers.
    #[must_use]
    pub fn facade(&self) -> &StorageFacade<D> {
        &self.facade
    }

    fn wrap<T>(
        result: std::result::Result<T, FacadeError>,
        procedure: &'static str,
        arguments: &str,
    ) -> Result<T> {
        result.map_err(|source| RepositoryError::Operation {
            procedure,
            arguments: arguments.to_string(),
            source,
        })
    }

    fn notarize(
        &self,
        content: DocumentContent,
        procedure: &'static str,
        arguments: &str,
    ) -> Result<Document> {
        self.notary.notarize(content).map_err(|source| RepositoryError::Notarization {
            procedure,
            arguments: arguments.to_string(),
            source,
        })
    }

    // ------------------------------------------------------------------
    // Drafting & committing
    // ------------------------------------------------------------------

    /// Drafts new content from a committed document type.
    ///
    /// The type's default attributes seed the draft; the caller's template
    /// overrides them key by key. The draft gets a fresh tag at the initial
    /// version and is not yet notarized or stored.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::UnknownType`] when no document is
    /// committed under `type_name`.
    pub async fn create_document(
        &self,
        ctx: &OpContext,
        type_name: &Name,
        permissions: &Name,
        template: BTreeMap<String, Value>,
    ) -> Result<DocumentContent> {
        let arguments = format!("type={type_name}, permissions={permissions}");
        let procedure = "create_document";

        let citation = Self::wrap(
            self.facade.read_name(ctx, type_name).await,
            procedure,
            &arguments,
        )?
        .ok_or_else(|| RepositoryError::UnknownType {
            procedure,
            type_name: type_name.clone(),
        })?;
        let type_document = Self::wrap(
            self.facade.read_document(ctx, &citation).await,
            procedure,
            &arguments,
        )?
        .ok_or_else(|| RepositoryError::UnknownType {
            procedure,
            type_name: type_name.clone(),
        })?;

        let mut attributes = type_document.content.attributes.clone();
        attributes.extend(template);
        Ok(DocumentContent {
            tag: Tag::random(),
            version: Version::initial(),
            type_name: Some(type_name.clone()),
            permissions: permissions.clone(),
            attributes,
        })
    }

    /// Notarizes content and stores it as an editable draft.
    ///
    /// Returns the draft's citation; saving again under the same (tag,
    /// version) overwrites the previous draft.
    pub async fn save_document(&self, ctx: &OpContext, content: DocumentContent) -> Result<Citation> {
        let arguments = format!("tag={}, version={}", content.tag, content.version);
        let procedure = "save_document";

        let document = self.notarize(content, procedure, &arguments)?;
        Self::wrap(self.facade.write_draft(ctx, &document).await, procedure, &arguments)?;
        self.notary.cite(&document).map_err(|source| RepositoryError::Notarization {
            procedure,
            arguments,
            source,
        })
    }

    /// Retrieves a draft's content for further editing.
    pub async fn retrieve_document(
        &self,
        ctx: &OpContext,
        citation: &Citation,
    ) -> Result<Option<DocumentContent>> {
        let arguments = format!("citation={citation}");
        let draft =
            Self::wrap(self.facade.read_draft(ctx, citation).await, "retrieve_document", &arguments)?;
        Ok(draft.map(|document| document.content))
    }

    /// Discards a draft, returning whether it existed.
    pub async fn discard_document(&self, ctx: &OpContext, citation: &Citation) -> Result<bool> {
        let arguments = format!("citation={citation}");
        Self::wrap(self.facade.delete_draft(ctx, citation).await, "discard_document", &arguments)
    }

    /// Commits content under a name: notarize, store the document, bind the
    /// name, and return the citation. Any draft under the same key is
    /// superseded.
    ///
    /// # Errors
    ///
    /// Fails with a name-exists conflict when the name is already bound.
    pub async fn commit_document(
        &self,
        ctx: &OpContext,
        name: &Name,
        content: DocumentContent,
    ) -> Result<Citation> {
        let arguments = format!("name={name}, tag={}, version={}", content.tag, content.version);
        let procedure = "commit_document";

        if Self::wrap(self.facade.name_exists(ctx, name).await, procedure, &arguments)? {
            return Err(RepositoryError::Operation {
                procedure,
                arguments,
                source: FacadeError::NameExists { name: name.clone() },
            });
        }

        let document = self.notarize(content, procedure, &arguments)?;
        let citation =
            Self::wrap(self.facade.write_document(ctx, &document).await, procedure, &arguments)?;
        Self::wrap(self.facade.write_name(ctx, name, &citation).await, procedure, &arguments)?;
        tracing::debug!(%name, %citation, "committed document");
        Ok(citation)
    }

    /// Resolves a name to its committed document (or promoted contract).
    pub async fn retrieve_name(&self, ctx: &OpContext, name: &Name) -> Result<Option<Document>> {
        let arguments = format!("name={name}");
        let procedure = "retrieve_name";

        let Some(citation) =
            Self::wrap(self.facade.read_name(ctx, name).await, procedure, &arguments)?
        else {
            return Ok(None);
        };
        if let Some(document) =
            Self::wrap(self.facade.read_document(ctx, &citation).await, procedure, &arguments)?
        {
            return Ok(Some(document));
        }
        // The document may have been promoted since it was named.
        Self::wrap(self.facade.read_contract(ctx, &citation).await, procedure, &arguments)
    }

    // ------------------------------------------------------------------
    // Bags
    // ------------------------------------------------------------------

    /// Creates a bag: commits a contract whose content declares `$capacity`.
    ///
    /// The bag is written to the staging slot first and then promoted, so a
    /// bag is always a proper contract. Returns the bag's citation, which is
    /// the handle every message operation takes.
    pub async fn create_bag(
        &self,
        ctx: &OpContext,
        permissions: &Name,
        capacity: u64,
    ) -> Result<Citation> {
        let arguments = format!("permissions={permissions}, capacity={capacity}");
        let procedure = "create_bag";

        if capacity == 0 {
            return Err(RepositoryError::InvalidArgument {
                procedure,
                arguments,
                source: ValidationError {
                    field: "capacity".to_string(),
                    constraint: "must be positive".to_string(),
                },
            });
        }

        let content =
            DocumentContent::draft(permissions.clone()).with_attribute(CAPACITY_ATTRIBUTE, capacity);
        let document = self.notarize(content, procedure, &arguments)?;
        Self::wrap(self.facade.write_document(ctx, &document).await, procedure, &arguments)?;
        let citation =
            Self::wrap(self.facade.write_contract(ctx, &document).await, procedure, &arguments)?;
        tracing::debug!(%citation, capacity, "created bag");
        Ok(citation)
    }

    /// Whether the bag currently has at least one available message.
    pub async fn message_available(&self, ctx: &OpContext, bag: &Citation) -> Result<bool> {
        let arguments = format!("bag={bag}");
        Self::wrap(self.facade.message_available(ctx, bag).await, "message_available", &arguments)
    }

    /// Number of available messages in the bag (an estimate under
    /// contention).
    pub async fn message_count(&self, ctx: &OpContext, bag: &Citation) -> Result<usize> {
        let arguments = format!("bag={bag}");
        Self::wrap(self.facade.message_count(ctx, bag).await, "message_count", &arguments)
    }

    /// Notarizes content and adds it to the bag as an available message.
    pub async fn add_message(
        &self,
        ctx: &OpContext,
        bag: &Citation,
        content: DocumentContent,
    ) -> Result<Citation> {
        let arguments = format!("bag={bag}, tag={}, version={}", content.tag, content.version);
        let procedure = "add_message";

        let message = self.notarize(content, procedure, &arguments)?;
        Self::wrap(self.facade.add_message(ctx, bag, &message).await, procedure, &arguments)
    }

    /// Borrows one message from the bag, if any is available.
    pub async fn borrow_message(&self, ctx: &OpContext, bag: &Citation) -> Result<Option<Document>> {
        let arguments = format!("bag={bag}");
        Self::wrap(self.facade.borrow_message(ctx, bag).await, "borrow_message", &arguments)
    }

    /// Returns a borrowed message to the bag under its next version.
    pub async fn return_message(
        &self,
        ctx: &OpContext,
        bag: &Citation,
        message: &Document,
    ) -> Result<Citation> {
        let arguments =
            format!("bag={bag}, tag={}, version={}", message.tag(), message.version());
        Self::wrap(self.facade.return_message(ctx, bag, message).await, "return_message", &arguments)
    }

    /// Acknowledges a borrowed message, returning the consumed payload.
    pub async fn delete_message(
        &self,
        ctx: &OpContext,
        bag: &Citation,
        citation: &Citation,
    ) -> Result<Document> {
        let arguments = format!("bag={bag}, message={citation}");
        Self::wrap(self.facade.delete_message(ctx, bag, citation).await, "delete_message", &arguments)
    }
}
