//! The storage facade: object protocol and bag state machine.
//!
//! [`StorageFacade`] enforces the namespace protocol on top of any
//! [`StorageDriver`]: names bind once, documents and contracts never change,
//! drafts stay mutable, and messages walk the
//! `available → processing → {acked, available@v+1}` state machine. The
//! three immutable classes are fronted by FIFO caches; drafts and messages
//! bypass caching entirely.
//!
//! Driver I/O errors are wrapped here exactly once with the operation's
//! context; protocol outcomes (name taken, bag full, lease expired, ...)
//! are their own typed variants and pass through untouched.

use std::sync::Arc;

use bytes::Bytes;
use nebula_repository_storage::{
    DriverError, MessageState, Namespace, ObjectCache, OpContext, StorageDriver, WriteMode, keys,
};
use nebula_repository_types::{Citation, CodecError, Document, Name, codec};
use rand::Rng;
use snafu::Snafu;

use crate::notary::{Notary, NotaryError};

/// Result type alias for facade operations.
pub type Result<T, E = FacadeError> = std::result::Result<T, E>;

/// Upper bound on one message listing page.
///
/// Bag counts are estimates under contention anyway, so one page is enough
/// for capacity admission and borrow candidate selection.
const MESSAGE_PAGE_SIZE: usize = 64;

/// Facade failure: protocol outcomes plus wrapped driver errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FacadeError {
    /// The name is already bound to a citation.
    #[snafu(display("name {name} is already bound"))]
    NameExists {
        /// The name that was already taken.
        name: Name,
    },

    /// A contract already exists under the document's key.
    #[snafu(display("contract {key} already exists"))]
    ContractExists {
        /// The conflicting storage key.
        key: String,
    },

    /// A different document already occupies the key.
    ///
    /// The staging slot tolerates byte-identical re-uploads (retries after
    /// an unknown write outcome); rewriting different content under the
    /// same (tag, version) is caller error.
    #[snafu(display("a different document already exists under {key}"))]
    DocumentExists {
        /// The conflicting storage key.
        key: String,
    },

    /// The message already exists in its bag, in either state.
    #[snafu(display("message {key} already exists in its bag"))]
    MessageExists {
        /// The conflicting storage key.
        key: String,
    },

    /// The bag has reached its declared capacity.
    #[snafu(display("bag {bag} is full (capacity {capacity})"))]
    BagFull {
        /// Key of the full bag.
        bag: String,
        /// The declared capacity.
        capacity: u64,
    },

    /// The message is no longer leased: an out-of-band sweeper or a
    /// competing party reclaimed it before the return or ack arrived.
    #[snafu(display("message lease expired for {key}"))]
    LeaseExpired {
        /// The processing key that was already gone.
        key: String,
    },

    /// No bag contract exists under the citation.
    #[snafu(display("bag {key} does not exist"))]
    NoBag {
        /// The missing bag's storage key.
        key: String,
    },

    /// The bag contract declares no usable `$capacity`.
    #[snafu(display("bag contract {key} declares no usable $capacity"))]
    MalformedBag {
        /// The offending bag's storage key.
        key: String,
    },

    /// A driver operation failed; context wrapped here exactly once.
    #[snafu(display("{operation} failed on {namespace}/{key}: {source}"))]
    Storage {
        /// Facade operation that was executing.
        operation: &'static str,
        /// Namespace the driver touched.
        namespace: Namespace,
        /// Key the driver touched.
        key: String,
        /// The underlying driver error.
        source: DriverError,
    },

    /// A stored object failed to decode.
    #[snafu(display("stored object {namespace}/{key} failed to decode: {source}"))]
    Corrupt {
        /// Namespace of the undecodable object.
        namespace: Namespace,
        /// Key of the undecodable object.
        key: String,
        /// The underlying codec error.
        source: CodecError,
    },

    /// An object could not be encoded for storage.
    #[snafu(display("encoding failed during {operation}: {source}"))]
    Encoding {
        /// Facade operation that was executing.
        operation: &'static str,
        /// The underlying codec error.
        source: CodecError,
    },

    /// The notary refused an operation.
    #[snafu(display("notary failed during {operation}: {source}"))]
    Notarization {
        /// Facade operation that was executing.
        operation: &'static str,
        /// The underlying notary error.
        source: NotaryError,
    },
}

/// Enforces the object protocol atop a driver, a notary, and three caches.
///
/// The facade performs no internal parallelism; concurrency arises from
/// independent callers, possibly in other processes against the same
/// backend, and every operation stays correct under arbitrary interleaving.
#[derive(Debug)]
pub struct StorageFacade<D> {
    driver: D,
    notary: Arc<dyn Notary>,
    names: ObjectCache<Citation>,
    documents: ObjectCache<Document>,
    contracts: ObjectCache<Document>,
}

impl<D: StorageDriver> StorageFacade<D> {
    /// Creates a facade with the default cache capacity.
    #[must_use]
    pub fn new(driver: D, notary: Arc<dyn Notary>) -> Self {
        Self::with_cache_capacity(driver, notary, nebula_repository_storage::DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a facade with an explicit per-cache capacity.
    #[must_use]
    pub fn with_cache_capacity(driver: D, notary: Arc<dyn Notary>, capacity: usize) -> Self {
        Self {
            driver,
            notary,
            names: ObjectCache::new(capacity),
            documents: ObjectCache::new(capacity),
            contracts: ObjectCache::new(capacity),
        }
    }

    /// The underlying driver, for sweepers and observability tests.
    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The injected notary.
    #[must_use]
    pub fn notary(&self) -> &Arc<dyn Notary> {
        &self.notary
    }

    fn wrap<T>(
        result: std::result::Result<T, DriverError>,
        operation: &'static str,
        namespace: Namespace,
        key: &str,
    ) -> Result<T> {
        result.map_err(|source| FacadeError::Storage {
            operation,
            namespace,
            key: key.to_string(),
            source,
        })
    }

    fn decode_document(namespace: Namespace, key: &str, bytes: &Bytes) -> Result<Document> {
        codec::decode(bytes)
            .map_err(|source| FacadeError::Corrupt { namespace, key: key.to_string(), source })
    }

    fn cite(&self, document: &Document, operation: &'static str) -> Result<Citation> {
        self.notary
            .cite(document)
            .map_err(|source| FacadeError::Notarization { operation, source })
    }

    // ------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------

    /// Returns whether the name is bound.
    pub async fn name_exists(&self, ctx: &OpContext, name: &Name) -> Result<bool> {
        let key = keys::name_key(name);
        if self.names.contains(&key) {
            return Ok(true);
        }
        Self::wrap(
            self.driver.exists(ctx, Namespace::Names, &key).await,
            "name_exists",
            Namespace::Names,
            &key,
        )
    }

    /// Reads the citation bound to a name, caching on success.
    pub async fn read_name(&self, ctx: &OpContext, name: &Name) -> Result<Option<Citation>> {
        let key = keys::name_key(name);
        if let Some(citation) = self.names.get(&key) {
            return Ok(Some(citation));
        }
        let Some(bytes) = Self::wrap(
            self.driver.read(ctx, Namespace::Names, &key).await,
            "read_name",
            Namespace::Names,
            &key,
        )?
        else {
            return Ok(None);
        };
        let citation: Citation = codec::decode(&bytes)
            .map_err(|source| FacadeError::Corrupt { namespace: Namespace::Names, key: key.clone(), source })?;
        self.names.insert(key, citation.clone());
        Ok(Some(citation))
    }

    /// Binds a name to a citation, exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::NameExists`] if the name is already bound.
    pub async fn write_name(&self, ctx: &OpContext, name: &Name, citation: &Citation) -> Result<()> {
        let key = keys::name_key(name);
        let payload = codec::encode(citation)
            .map_err(|source| FacadeError::Encoding { operation: "write_name", source })?;
        match self
            .driver
            .write(
                ctx,
                Namespace::Names,
                &key,
                Bytes::from(payload),
                WriteMode::CreateOnly,
                Some(&citation.digest),
            )
            .await
        {
            Ok(()) => {
                self.names.insert(key, citation.clone());
                Ok(())
            },
            Err(DriverError::Conflict { .. }) => Err(FacadeError::NameExists { name: name.clone() }),
            Err(source) => {
                Err(FacadeError::Storage { operation: "write_name", namespace: Namespace::Names, key, source })
            },
        }
    }

    // ------------------------------------------------------------------
    // Drafts (never cached)
    // ------------------------------------------------------------------

    /// Returns whether a draft exists under the citation's key.
    pub async fn draft_exists(&self, ctx: &OpContext, citation: &Citation) -> Result<bool> {
        let key = keys::doc_key(citation);
        Self::wrap(
            self.driver.exists(ctx, Namespace::Drafts, &key).await,
            "draft_exists",
            Namespace::Drafts,
            &key,
        )
    }

    /// Reads a draft.
    pub async fn read_draft(&self, ctx: &OpContext, citation: &Citation) -> Result<Option<Document>> {
        let key = keys::doc_key(citation);
        let Some(bytes) = Self::wrap(
            self.driver.read(ctx, Namespace::Drafts, &key).await,
            "read_draft",
            Namespace::Drafts,
            &key,
        )?
        else {
            return Ok(None);
        };
        Self::decode_document(Namespace::Drafts, &key, &bytes).map(Some)
    }

    /// Writes or overwrites a draft.
    pub async fn write_draft(&self, ctx: &OpContext, draft: &Document) -> Result<()> {
        let key = keys::object_key(draft.tag(), draft.version());
        let payload = codec::encode(draft)
            .map_err(|source| FacadeError::Encoding { operation: "write_draft", source })?;
        Self::wrap(
            self.driver
                .write(ctx, Namespace::Drafts, &key, Bytes::from(payload), WriteMode::Overwrite, None)
                .await,
            "write_draft",
            Namespace::Drafts,
            &key,
        )
    }

    /// Deletes a draft, returning whether it existed.
    pub async fn delete_draft(&self, ctx: &OpContext, citation: &Citation) -> Result<bool> {
        let key = keys::doc_key(citation);
        Self::wrap(
            self.driver.delete(ctx, Namespace::Drafts, &key).await,
            "delete_draft",
            Namespace::Drafts,
            &key,
        )
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    /// Returns whether a document exists under the citation's key.
    pub async fn document_exists(&self, ctx: &OpContext, citation: &Citation) -> Result<bool> {
        let key = keys::doc_key(citation);
        if self.documents.contains(&key) {
            return Ok(true);
        }
        Self::wrap(
            self.driver.exists(ctx, Namespace::Documents, &key).await,
            "document_exists",
            Namespace::Documents,
            &key,
        )
    }

    /// Reads a document, caching on success.
    pub async fn read_document(
        &self,
        ctx: &OpContext,
        citation: &Citation,
    ) -> Result<Option<Document>> {
        let key = keys::doc_key(citation);
        if let Some(document) = self.documents.get(&key) {
            return Ok(Some(document));
        }
        let Some(bytes) = Self::wrap(
            self.driver.read(ctx, Namespace::Documents, &key).await,
            "read_document",
            Namespace::Documents,
            &key,
        )?
        else {
            return Ok(None);
        };
        let document = Self::decode_document(Namespace::Documents, &key, &bytes)?;
        self.documents.insert(key, document.clone());
        Ok(Some(document))
    }

    /// Writes a notarized document into the staging slot and returns its
    /// citation.
    ///
    /// Documents may be re-uploaded byte-identically without error (retries
    /// after an unknown write outcome); rewriting different content under
    /// the same (tag, version) fails with
    /// [`FacadeError::DocumentExists`]. Any draft shadow under the same key
    /// is removed, so a draft and a document never coexist.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::ContractExists`] if the key was already
    /// promoted to a contract, [`FacadeError::DocumentExists`] on a
    /// non-idempotent rewrite.
    pub async fn write_document(&self, ctx: &OpContext, document: &Document) -> Result<Citation> {
        let citation = self.cite(document, "write_document")?;
        let key = keys::doc_key(&citation);

        let promoted = self.contracts.contains(&key)
            || Self::wrap(
                self.driver.exists(ctx, Namespace::Contracts, &key).await,
                "write_document",
                Namespace::Contracts,
                &key,
            )?;
        if promoted {
            return Err(FacadeError::ContractExists { key });
        }

        if let Some(occupant) = self.read_document(ctx, &citation).await? {
            let occupant_citation = self.cite(&occupant, "write_document")?;
            if occupant_citation.digest != citation.digest {
                return Err(FacadeError::DocumentExists { key });
            }
        }

        let payload = codec::encode(document)
            .map_err(|source| FacadeError::Encoding { operation: "write_document", source })?;
        Self::wrap(
            self.driver
                .write(
                    ctx,
                    Namespace::Documents,
                    &key,
                    Bytes::from(payload),
                    WriteMode::Overwrite,
                    Some(&citation.digest),
                )
                .await,
            "write_document",
            Namespace::Documents,
            &key,
        )?;

        // A committed document supersedes its draft.
        Self::wrap(
            self.driver.delete(ctx, Namespace::Drafts, &key).await,
            "write_document",
            Namespace::Drafts,
            &key,
        )?;

        self.documents.insert(key, document.clone());
        Ok(citation)
    }

    // ------------------------------------------------------------------
    // Contracts
    // ------------------------------------------------------------------

    /// Returns whether a contract exists under the citation's key.
    pub async fn contract_exists(&self, ctx: &OpContext, citation: &Citation) -> Result<bool> {
        let key = keys::doc_key(citation);
        if self.contracts.contains(&key) {
            return Ok(true);
        }
        Self::wrap(
            self.driver.exists(ctx, Namespace::Contracts, &key).await,
            "contract_exists",
            Namespace::Contracts,
            &key,
        )
    }

    /// Reads a contract, caching on success.
    pub async fn read_contract(
        &self,
        ctx: &OpContext,
        citation: &Citation,
    ) -> Result<Option<Document>> {
        let key = keys::doc_key(citation);
        if let Some(contract) = self.contracts.get(&key) {
            return Ok(Some(contract));
        }
        let Some(bytes) = Self::wrap(
            self.driver.read(ctx, Namespace::Contracts, &key).await,
            "read_contract",
            Namespace::Contracts,
            &key,
        )?
        else {
            return Ok(None);
        };
        let contract = Self::decode_document(Namespace::Contracts, &key, &bytes)?;
        self.contracts.insert(key, contract.clone());
        Ok(Some(contract))
    }

    /// Promotes a notarized document to a contract and returns its citation.
    ///
    /// The contract write and the staging-document delete are sequenced, not
    /// transactional: a crash between them leaves a harmless document shadow
    /// which the next promotion attempt refuses with
    /// [`FacadeError::ContractExists`]; removing the shadow by hand resolves
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::ContractExists`] if the key was already
    /// promoted.
    pub async fn write_contract(&self, ctx: &OpContext, contract: &Document) -> Result<Citation> {
        let citation = self.cite(contract, "write_contract")?;
        let key = keys::doc_key(&citation);
        let payload = codec::encode(contract)
            .map_err(|source| FacadeError::Encoding { operation: "write_contract", source })?;

        match self
            .driver
            .write(
                ctx,
                Namespace::Contracts,
                &key,
                Bytes::from(payload),
                WriteMode::CreateOnly,
                Some(&citation.digest),
            )
            .await
        {
            Ok(()) => {},
            Err(DriverError::Conflict { .. }) => return Err(FacadeError::ContractExists { key }),
            Err(source) => {
                return Err(FacadeError::Storage {
                    operation: "write_contract",
                    namespace: Namespace::Contracts,
                    key,
                    source,
                });
            },
        }

        // Remove the staging copy; see the atomicity note above.
        Self::wrap(
            self.driver.delete(ctx, Namespace::Documents, &key).await,
            "write_contract",
            Namespace::Documents,
            &key,
        )?;
        self.documents.remove(&key);
        self.contracts.insert(key, contract.clone());
        Ok(citation)
    }

    // ------------------------------------------------------------------
    // Bags & messages (never cached)
    // ------------------------------------------------------------------

    /// Reads the bag's contract, failing with [`FacadeError::NoBag`] when the
    /// bag does not exist.
    async fn require_bag(&self, ctx: &OpContext, bag: &Citation) -> Result<Document> {
        self.read_contract(ctx, bag)
            .await?
            .ok_or_else(|| FacadeError::NoBag { key: keys::doc_key(bag) })
    }

    /// Lists message keys in one state of a bag, relative to the state
    /// prefix. One page; the result is an estimate under contention.
    pub async fn list_messages(
        &self,
        ctx: &OpContext,
        bag: &Citation,
        state: MessageState,
    ) -> Result<Vec<String>> {
        let prefix = keys::bag_prefix(bag, state);
        Self::wrap(
            self.driver.list(ctx, Namespace::Messages, &prefix, MESSAGE_PAGE_SIZE).await,
            "list_messages",
            Namespace::Messages,
            &prefix,
        )
    }

    /// Number of currently available messages (an estimate under contention).
    pub async fn message_count(&self, ctx: &OpContext, bag: &Citation) -> Result<usize> {
        self.require_bag(ctx, bag).await?;
        Ok(self.list_messages(ctx, bag, MessageState::Available).await?.len())
    }

    /// Whether at least one message is currently available.
    pub async fn message_available(&self, ctx: &OpContext, bag: &Citation) -> Result<bool> {
        self.require_bag(ctx, bag).await?;
        let prefix = keys::bag_prefix(bag, MessageState::Available);
        let one = Self::wrap(
            self.driver.list(ctx, Namespace::Messages, &prefix, 1).await,
            "message_available",
            Namespace::Messages,
            &prefix,
        )?;
        Ok(!one.is_empty())
    }

    /// Adds a notarized message to the bag and returns its citation.
    ///
    /// The capacity pre-check is admission control, not a guarantee: under
    /// burst, a caller may still observe [`FacadeError::BagFull`] while the
    /// bag momentarily holds more than its declared capacity.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::BagFull`] at declared capacity and
    /// [`FacadeError::MessageExists`] when either state key is taken.
    pub async fn add_message(
        &self,
        ctx: &OpContext,
        bag: &Citation,
        message: &Document,
    ) -> Result<Citation> {
        let contract = self.require_bag(ctx, bag).await?;
        let capacity = contract
            .capacity()
            .ok_or_else(|| FacadeError::MalformedBag { key: keys::doc_key(bag) })?;

        let available = self.list_messages(ctx, bag, MessageState::Available).await?.len() as u64;
        if available >= capacity {
            return Err(FacadeError::BagFull { bag: keys::doc_key(bag), capacity });
        }

        let citation = self.cite(message, "add_message")?;
        let avail_key = keys::message_key(bag, MessageState::Available, &citation);
        let proc_key = keys::message_key(bag, MessageState::Processing, &citation);

        let taken = Self::wrap(
            self.driver.exists(ctx, Namespace::Messages, &avail_key).await,
            "add_message",
            Namespace::Messages,
            &avail_key,
        )? || Self::wrap(
            self.driver.exists(ctx, Namespace::Messages, &proc_key).await,
            "add_message",
            Namespace::Messages,
            &proc_key,
        )?;
        if taken {
            return Err(FacadeError::MessageExists { key: avail_key });
        }

        let payload = codec::encode(message)
            .map_err(|source| FacadeError::Encoding { operation: "add_message", source })?;
        Self::wrap(
            self.driver
                .write(
                    ctx,
                    Namespace::Messages,
                    &avail_key,
                    Bytes::from(payload),
                    WriteMode::Overwrite,
                    Some(&citation.digest),
                )
                .await,
            "add_message",
            Namespace::Messages,
            &avail_key,
        )?;
        Ok(citation)
    }

    /// Borrows one message: at most one borrower receives each message.
    ///
    /// Selection is uniformly random, not FIFO: distributed backends cannot
    /// cheaply provide ordering, and random picks reduce contention under
    /// many borrowers. The delete is the tie-break: whichever borrower's
    /// `delete` returns `true` owns the message; everyone else lost a race
    /// and re-lists. The loop retries only on genuine lost races; driver
    /// failures propagate immediately.
    ///
    /// Returns `Ok(None)` once no messages are available.
    pub async fn borrow_message(&self, ctx: &OpContext, bag: &Citation) -> Result<Option<Document>> {
        self.require_bag(ctx, bag).await?;
        let avail_prefix = keys::bag_prefix(bag, MessageState::Available);
        let proc_prefix = keys::bag_prefix(bag, MessageState::Processing);

        loop {
            let candidates = Self::wrap(
                self.driver.list(ctx, Namespace::Messages, &avail_prefix, MESSAGE_PAGE_SIZE).await,
                "borrow_message",
                Namespace::Messages,
                &avail_prefix,
            )?;
            if candidates.is_empty() {
                return Ok(None);
            }

            let pick = rand::rng().random_range(0..candidates.len());
            let suffix = &candidates[pick];
            let key = format!("{avail_prefix}/{suffix}");
            let dest = format!("{proc_prefix}/{suffix}");

            let Some(bytes) = Self::wrap(
                self.driver.read(ctx, Namespace::Messages, &key).await,
                "borrow_message",
                Namespace::Messages,
                &key,
            )?
            else {
                // Another borrower took it between list and read.
                tracing::debug!(%key, "lost borrow race on read; re-listing");
                continue;
            };

            if !Self::wrap(
                self.driver.delete(ctx, Namespace::Messages, &key).await,
                "borrow_message",
                Namespace::Messages,
                &key,
            )? {
                tracing::debug!(%key, "lost borrow race on delete; re-listing");
                continue;
            }

            Self::wrap(
                self.driver
                    .write(ctx, Namespace::Messages, &dest, bytes.clone(), WriteMode::Overwrite, None)
                    .await,
                "borrow_message",
                Namespace::Messages,
                &dest,
            )?;
            return Self::decode_document(Namespace::Messages, &key, &bytes).map(Some);
        }
    }

    /// Returns a borrowed message to its bag under the next version.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::LeaseExpired`] when the processing entry is
    /// already gone (the lease expired and another party re-enqueued a
    /// sibling version).
    pub async fn return_message(
        &self,
        ctx: &OpContext,
        bag: &Citation,
        message: &Document,
    ) -> Result<Citation> {
        self.require_bag(ctx, bag).await?;
        let citation = self.cite(message, "return_message")?;
        let proc_key = keys::message_key(bag, MessageState::Processing, &citation);

        if !Self::wrap(
            self.driver.delete(ctx, Namespace::Messages, &proc_key).await,
            "return_message",
            Namespace::Messages,
            &proc_key,
        )? {
            return Err(FacadeError::LeaseExpired { key: proc_key });
        }

        let mut content = message.content.clone();
        content.version = content.version.next();
        let renewed = self
            .notary
            .notarize(content)
            .map_err(|source| FacadeError::Notarization { operation: "return_message", source })?;
        let renewed_citation = self.cite(&renewed, "return_message")?;
        let avail_key = keys::message_key(bag, MessageState::Available, &renewed_citation);
        let payload = codec::encode(&renewed)
            .map_err(|source| FacadeError::Encoding { operation: "return_message", source })?;
        Self::wrap(
            self.driver
                .write(
                    ctx,
                    Namespace::Messages,
                    &avail_key,
                    Bytes::from(payload),
                    WriteMode::Overwrite,
                    Some(&renewed_citation.digest),
                )
                .await,
            "return_message",
            Namespace::Messages,
            &avail_key,
        )?;
        Ok(renewed_citation)
    }

    /// Acknowledges a borrowed message, removing it permanently and
    /// returning the consumed payload.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::LeaseExpired`] when the processing entry is
    /// already gone.
    pub async fn delete_message(
        &self,
        ctx: &OpContext,
        bag: &Citation,
        citation: &Citation,
    ) -> Result<Document> {
        self.require_bag(ctx, bag).await?;
        let proc_key = keys::message_key(bag, MessageState::Processing, citation);

        let Some(bytes) = Self::wrap(
            self.driver.read(ctx, Namespace::Messages, &proc_key).await,
            "delete_message",
            Namespace::Messages,
            &proc_key,
        )?
        else {
            return Err(FacadeError::LeaseExpired { key: proc_key });
        };
        if !Self::wrap(
            self.driver.delete(ctx, Namespace::Messages, &proc_key).await,
            "delete_message",
            Namespace::Messages,
            &proc_key,
        )? {
            return Err(FacadeError::LeaseExpired { key: proc_key });
        }
        Self::decode_document(Namespace::Messages, &proc_key, &bytes)
    }
}
