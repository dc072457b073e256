//! The dispatch entry point callers invoke.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use conduit_core::{
    Attribute, ConnectorObject, Filter, GuardedString, ObjectClass, OperationOptions, Schema,
    ScriptContext, SyncDelta, SyncToken, Uid, Value,
};
use tower::ServiceExt;

use crate::catalog::{ConnectorInfo, FRAMEWORK_VERSION};
use crate::config::{ApiConfiguration, OperationSettings};
use crate::error::FacadeError;
use crate::middleware::instrumentation::record_outcome;
use crate::middleware::{build_operation_chain, OperationChain};
use crate::operation::{
    CallContext, Invocation, OperationError, OperationKind, OperationOutput, OperationRequest,
    StreamItem, StreamOutcome, UpdateMode,
};
use crate::registry::OperationRegistry;
use crate::sink::ResultSink;

// ---------------------------------------------------------------------------
// ConnectorFacade
// ---------------------------------------------------------------------------

/// Uniform entry point to one configured connector.
///
/// Built once from an [`ApiConfiguration`] and an [`OperationRegistry`]; the
/// settings are copied in and nothing in the facade changes afterwards, so it
/// can be shared freely (`Arc<ConnectorFacade>`) between concurrent callers.
/// Call ids come from [`CallContext::next`], not from the facade.
///
/// Every supported kind gets its own chain (instrumentation around the timeout
/// guard around the implementation), built at construction and reused for
/// every call of that kind.
pub struct ConnectorFacade {
    connector: Arc<ConnectorInfo>,
    settings: OperationSettings,
    chains: HashMap<OperationKind, OperationChain>,
}

impl std::fmt::Debug for ConnectorFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorFacade")
            .field("connector", &self.connector.key)
            .field("supported", &self.settings.supported_operations)
            .finish_non_exhaustive()
    }
}

impl ConnectorFacade {
    /// Build a facade.
    ///
    /// # Errors
    ///
    /// - `IncompatibleFramework` if the connector's declared framework range
    ///   excludes [`FRAMEWORK_VERSION`].
    /// - `MissingImplementation` if a supported kind has nothing registered.
    pub fn new(
        config: &ApiConfiguration,
        registry: &OperationRegistry,
    ) -> Result<Self, FacadeError> {
        if let Some(required) = config.connector.incompatible_with(&FRAMEWORK_VERSION) {
            return Err(FacadeError::IncompatibleFramework {
                connector: config.connector.key.clone(),
                required,
                running: FRAMEWORK_VERSION,
            });
        }

        let settings = config.settings.clone();
        let mut chains = HashMap::with_capacity(settings.supported_operations.len());
        for &kind in &settings.supported_operations {
            let target = registry
                .target(kind)
                .ok_or(FacadeError::MissingImplementation { kind })?;
            chains.insert(kind, build_operation_chain(kind, target.clone(), &settings));
        }

        tracing::debug!(
            connector = %config.connector.key,
            supported = chains.len(),
            "connector facade built"
        );

        Ok(Self {
            connector: Arc::clone(&config.connector),
            settings,
            chains,
        })
    }

    #[must_use]
    pub fn connector_info(&self) -> &ConnectorInfo {
        &self.connector
    }

    /// The kinds this facade will run. Everything else fails as unsupported.
    #[must_use]
    pub fn supported_operations(&self) -> BTreeSet<OperationKind> {
        self.settings.supported_operations.clone()
    }

    #[must_use]
    pub fn is_supported(&self, kind: OperationKind) -> bool {
        self.chains.contains_key(&kind)
    }

    /// Dispatch `request` through the chain for its kind.
    ///
    /// Streaming kinds need `results`; their items go to it in production
    /// order and the output is [`OperationOutput::Streamed`].
    ///
    /// # Errors
    ///
    /// `Unsupported` without touching the implementation if the kind is not
    /// supported; otherwise whatever the chain reports.
    pub async fn invoke(
        &self,
        request: OperationRequest,
        results: Option<ResultSink>,
    ) -> Result<OperationOutput, OperationError> {
        let kind = request.kind();
        let Some(chain) = self.chains.get(&kind) else {
            tracing::debug!(kind = kind.as_str(), "rejecting unsupported operation");
            record_outcome(kind, "unsupported");
            return Err(OperationError::Unsupported { kind });
        };

        let inv = Invocation {
            ctx: CallContext::next(kind),
            request,
            results,
        };
        chain.clone().oneshot(inv).await
    }

    // -- typed surface -----------------------------------------------------

    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn schema(&self) -> Result<Schema, OperationError> {
        match self.invoke(OperationRequest::Schema, None).await? {
            OperationOutput::Schema(schema) => Ok(schema),
            _ => Err(unexpected(OperationKind::Schema)),
        }
    }

    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn create(
        &self,
        object_class: ObjectClass,
        attributes: Vec<Attribute>,
        options: OperationOptions,
    ) -> Result<Uid, OperationError> {
        let request = OperationRequest::Create {
            object_class,
            attributes,
            options,
        };
        expect_uid(OperationKind::Create, self.invoke(request, None).await?)
    }

    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn delete(
        &self,
        object_class: ObjectClass,
        uid: Uid,
        options: OperationOptions,
    ) -> Result<(), OperationError> {
        let request = OperationRequest::Delete {
            object_class,
            uid,
            options,
        };
        expect_done(OperationKind::Delete, self.invoke(request, None).await?)
    }

    /// Stream objects of `object_class` matching `filter` to `handler` until
    /// it returns `false`.
    ///
    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn search<H>(
        &self,
        object_class: ObjectClass,
        filter: Option<Filter>,
        mut handler: H,
        options: OperationOptions,
    ) -> Result<StreamOutcome, OperationError>
    where
        H: FnMut(ConnectorObject) -> bool + Send + 'static,
    {
        if let Some(filter) = &filter {
            tracing::debug!(object_class = %object_class, %filter, "search requested");
        }
        let request = OperationRequest::Search {
            object_class,
            filter,
            options,
        };
        let sink = ResultSink::new(move |item: StreamItem| match item {
            StreamItem::Object(object) => handler(object),
            StreamItem::Delta(_) => true,
        });
        expect_streamed(OperationKind::Search, self.invoke(request, Some(sink)).await?)
    }

    /// Replace the given attributes of an object.
    ///
    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn update(
        &self,
        object_class: ObjectClass,
        uid: Uid,
        attributes: Vec<Attribute>,
        options: OperationOptions,
    ) -> Result<Uid, OperationError> {
        self.update_with(object_class, uid, attributes, UpdateMode::Replace, options)
            .await
    }

    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn add_attribute_values(
        &self,
        object_class: ObjectClass,
        uid: Uid,
        attributes: Vec<Attribute>,
        options: OperationOptions,
    ) -> Result<Uid, OperationError> {
        self.update_with(object_class, uid, attributes, UpdateMode::AddValues, options)
            .await
    }

    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn remove_attribute_values(
        &self,
        object_class: ObjectClass,
        uid: Uid,
        attributes: Vec<Attribute>,
        options: OperationOptions,
    ) -> Result<Uid, OperationError> {
        self.update_with(object_class, uid, attributes, UpdateMode::RemoveValues, options)
            .await
    }

    async fn update_with(
        &self,
        object_class: ObjectClass,
        uid: Uid,
        attributes: Vec<Attribute>,
        mode: UpdateMode,
        options: OperationOptions,
    ) -> Result<Uid, OperationError> {
        let request = OperationRequest::Update {
            object_class,
            uid,
            attributes,
            mode,
            options,
        };
        expect_uid(OperationKind::Update, self.invoke(request, None).await?)
    }

    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn authenticate(
        &self,
        object_class: ObjectClass,
        username: impl Into<String>,
        password: GuardedString,
        options: OperationOptions,
    ) -> Result<Uid, OperationError> {
        let request = OperationRequest::Authenticate {
            object_class,
            username: username.into(),
            password,
            options,
        };
        expect_uid(OperationKind::Authenticate, self.invoke(request, None).await?)
    }

    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn resolve_username(
        &self,
        object_class: ObjectClass,
        username: impl Into<String>,
        options: OperationOptions,
    ) -> Result<Uid, OperationError> {
        let request = OperationRequest::ResolveUsername {
            object_class,
            username: username.into(),
            options,
        };
        expect_uid(
            OperationKind::ResolveUsername,
            self.invoke(request, None).await?,
        )
    }

    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn run_script_on_connector(
        &self,
        script: ScriptContext,
        options: OperationOptions,
    ) -> Result<Value, OperationError> {
        let request = OperationRequest::ScriptOnConnector { script, options };
        expect_script(
            OperationKind::ScriptOnConnector,
            self.invoke(request, None).await?,
        )
    }

    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn run_script_on_resource(
        &self,
        script: ScriptContext,
        options: OperationOptions,
    ) -> Result<Value, OperationError> {
        let request = OperationRequest::ScriptOnResource { script, options };
        expect_script(
            OperationKind::ScriptOnResource,
            self.invoke(request, None).await?,
        )
    }

    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn get_object(
        &self,
        object_class: ObjectClass,
        uid: Uid,
        options: OperationOptions,
    ) -> Result<Option<ConnectorObject>, OperationError> {
        let request = OperationRequest::GetObject {
            object_class,
            uid,
            options,
        };
        match self.invoke(request, None).await? {
            OperationOutput::Object(object) => Ok(object),
            _ => Err(unexpected(OperationKind::GetObject)),
        }
    }

    /// Check that the connector can reach its resource.
    ///
    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn test(&self) -> Result<(), OperationError> {
        expect_done(
            OperationKind::Test,
            self.invoke(OperationRequest::Test, None).await?,
        )
    }

    /// Check the connector's own configuration without contacting the resource.
    ///
    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn validate(&self) -> Result<(), OperationError> {
        expect_done(
            OperationKind::Validate,
            self.invoke(OperationRequest::Validate, None).await?,
        )
    }

    /// Stream changes after `token` (from the beginning if `None`) to
    /// `handler` until it returns `false`.
    ///
    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn sync<H>(
        &self,
        object_class: ObjectClass,
        token: Option<SyncToken>,
        mut handler: H,
        options: OperationOptions,
    ) -> Result<StreamOutcome, OperationError>
    where
        H: FnMut(SyncDelta) -> bool + Send + 'static,
    {
        let request = OperationRequest::Sync {
            object_class,
            token,
            options,
        };
        let sink = ResultSink::new(move |item: StreamItem| match item {
            StreamItem::Delta(delta) => handler(delta),
            StreamItem::Object(_) => true,
        });
        expect_streamed(OperationKind::Sync, self.invoke(request, Some(sink)).await?)
    }

    /// # Errors
    ///
    /// See [`invoke`](Self::invoke).
    pub async fn get_latest_sync_token(
        &self,
        object_class: ObjectClass,
    ) -> Result<Option<SyncToken>, OperationError> {
        let request = OperationRequest::GetLatestSyncToken { object_class };
        match self.invoke(request, None).await? {
            OperationOutput::SyncToken(token) => Ok(token),
            _ => Err(unexpected(OperationKind::GetLatestSyncToken)),
        }
    }
}

// ---------------------------------------------------------------------------
// Output adapters
// ---------------------------------------------------------------------------

fn unexpected(kind: OperationKind) -> OperationError {
    tracing::warn!(kind = kind.as_str(), "connector returned an output of the wrong shape");
    OperationError::UnexpectedOutput { kind }
}

fn expect_uid(kind: OperationKind, output: OperationOutput) -> Result<Uid, OperationError> {
    match output {
        OperationOutput::Uid(uid) => Ok(uid),
        _ => Err(unexpected(kind)),
    }
}

fn expect_done(kind: OperationKind, output: OperationOutput) -> Result<(), OperationError> {
    match output {
        OperationOutput::Done => Ok(()),
        _ => Err(unexpected(kind)),
    }
}

fn expect_script(kind: OperationKind, output: OperationOutput) -> Result<Value, OperationError> {
    match output {
        OperationOutput::ScriptResult(value) => Ok(value),
        _ => Err(unexpected(kind)),
    }
}

fn expect_streamed(
    kind: OperationKind,
    output: OperationOutput,
) -> Result<StreamOutcome, OperationError> {
    match output {
        OperationOutput::Streamed(outcome) => Ok(outcome),
        _ => Err(unexpected(kind)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
