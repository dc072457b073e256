//! In-memory connector backed by ordered maps.
//!
//! Implements every operation kind against a process-local store with a
//! change log for sync. Suitable for development, the demo binary, and tests.
//! An optional per-step latency makes it usable for timeout scenarios.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conduit_core::{
    Attribute, ConnectorObject, Filter, GuardedString, ObjectClass, ObjectClassInfo, ObjectMatcher,
    OperationOptions, Schema, ScriptContext, SyncDelta, SyncDeltaType, SyncToken, Uid, Value,
    Version,
};
use parking_lot::RwLock;

use crate::catalog::{ConnectorInfo, ConnectorKey};
use crate::error::{ConnectorError, ConnectorResult, RegistryError};
use crate::operation::{
    CallContext, OperationKind, OperationOutput, OperationRequest, StreamItem, UpdateMode,
};
use crate::registry::OperationRegistry;
use crate::sink::ResultSink;
use crate::traits::{SingleResultOperation, StreamingOperation};

/// Attribute holding an object's login name. Becomes the uid on create.
pub const NAME_ATTRIBUTE: &str = "__NAME__";
/// Write-only attribute holding an account password.
pub const PASSWORD_ATTRIBUTE: &str = "__PASSWORD__";

type ObjectKey = (ObjectClass, String);

#[derive(Default)]
struct State {
    objects: BTreeMap<ObjectKey, ConnectorObject>,
    passwords: HashMap<ObjectKey, GuardedString>,
    changes: Vec<(ObjectClass, SyncDelta)>,
    last_change: i64,
    next_id: u64,
}

impl State {
    fn record(
        &mut self,
        class: ObjectClass,
        delta_type: SyncDeltaType,
        uid: Uid,
        object: Option<ConnectorObject>,
    ) {
        self.last_change += 1;
        let delta = SyncDelta {
            token: SyncToken(Value::Int(self.last_change)),
            delta_type,
            uid,
            object,
        };
        self.changes.push((class, delta));
    }

    fn find_by_name(&self, class: &ObjectClass, username: &str) -> Option<&ConnectorObject> {
        self.objects.values().find(|object| {
            object.object_class == *class
                && object
                    .attribute(NAME_ATTRIBUTE)
                    .is_some_and(|name| {
                        name.single_value().and_then(Value::as_str) == Some(username)
                    })
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryConnector
// ---------------------------------------------------------------------------

/// Connector whose resource is an in-process map.
#[derive(Default)]
pub struct MemoryConnector {
    state: RwLock<State>,
    latency: Duration,
}

impl MemoryConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `latency` before every call and before every streamed item.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Identity of this connector.
    #[must_use]
    pub fn info() -> ConnectorInfo {
        ConnectorInfo::new(
            ConnectorKey::new("conduit.memory", Version::new(0, 1, 0, 0), "MemoryConnector"),
            "In-memory connector",
        )
    }

    /// A registry with this connector behind every operation kind.
    ///
    /// # Errors
    ///
    /// Only if a kind's category changes without this being updated.
    pub fn registry(self: &Arc<Self>) -> Result<OperationRegistry, RegistryError> {
        let mut registry = OperationRegistry::new();
        for kind in OperationKind::ALL {
            if kind.is_streaming() {
                let op: Arc<dyn StreamingOperation> = self.clone();
                registry.register_streaming(kind, op)?;
            } else {
                let op: Arc<dyn SingleResultOperation> = self.clone();
                registry.register_single(kind, op)?;
            }
        }
        Ok(registry)
    }

    /// Number of stored objects across all classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait out the configured latency. `false` once the caller has gone.
    async fn step(&self, ctx: &CallContext) -> bool {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        !ctx.is_cancelled()
    }

    fn create(&self, class: ObjectClass, attributes: Vec<Attribute>) -> ConnectorResult<Uid> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let name = attributes
            .iter()
            .find(|a| a.is(NAME_ATTRIBUTE))
            .and_then(Attribute::single_value)
            .and_then(Value::as_str)
            .map(str::to_string);
        let id = if let Some(name) = name {
            name
        } else {
            state.next_id += 1;
            format!("mem-{}", state.next_id)
        };

        let key = (class.clone(), id.clone());
        if state.objects.contains_key(&key) {
            return Err(ConnectorError::AlreadyExists { uid: Uid::new(id) });
        }

        let mut object = ConnectorObject::new(class.clone(), Uid::new(id));
        for attribute in attributes {
            if attribute.is(PASSWORD_ATTRIBUTE) {
                state.passwords.insert(key.clone(), password(&attribute)?);
            } else {
                object.attributes.push(attribute);
            }
        }

        let uid = object.uid.clone();
        state.record(class, SyncDeltaType::Create, uid.clone(), Some(object.clone()));
        state.objects.insert(key, object);
        Ok(uid)
    }

    fn update(
        &self,
        class: ObjectClass,
        uid: Uid,
        attributes: Vec<Attribute>,
        mode: UpdateMode,
    ) -> ConnectorResult<Uid> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let key = (class.clone(), uid.value.clone());
        let Some(object) = state.objects.get_mut(&key) else {
            return Err(ConnectorError::UnknownUid { uid });
        };
        for attribute in attributes {
            if attribute.is(PASSWORD_ATTRIBUTE) {
                state.passwords.insert(key.clone(), password(&attribute)?);
            } else {
                apply(object, attribute, mode);
            }
        }

        let snapshot = object.clone();
        let uid = snapshot.uid.clone();
        state.record(class, SyncDeltaType::Update, uid.clone(), Some(snapshot));
        Ok(uid)
    }

    fn delete(&self, class: ObjectClass, uid: Uid) -> ConnectorResult<()> {
        let mut state = self.state.write();
        let key = (class.clone(), uid.value.clone());
        if state.objects.remove(&key).is_none() {
            return Err(ConnectorError::UnknownUid { uid });
        }
        state.passwords.remove(&key);
        state.record(class, SyncDeltaType::Delete, uid, None);
        Ok(())
    }

    fn authenticate(
        &self,
        class: &ObjectClass,
        username: String,
        password: &GuardedString,
    ) -> ConnectorResult<Uid> {
        let state = self.state.read();
        let matched = state.find_by_name(class, &username).and_then(|object| {
            let key = (class.clone(), object.uid.value.clone());
            let stored = state.passwords.get(&key)?;
            let equal = stored.access(|s| password.access(|p| s == p));
            equal.then(|| object.uid.clone())
        });
        matched.ok_or(ConnectorError::InvalidCredential { username })
    }

    fn resolve_username(&self, class: &ObjectClass, username: &str) -> ConnectorResult<Uid> {
        self.state
            .read()
            .find_by_name(class, username)
            .map(|object| object.uid.clone())
            .ok_or_else(|| ConnectorError::UnknownUid {
                uid: Uid::new(username),
            })
    }

    fn schema(&self) -> Schema {
        let state = self.state.read();
        let mut classes: BTreeMap<&ObjectClass, BTreeSet<String>> = BTreeMap::new();
        for object in state.objects.values() {
            let names = classes.entry(&object.object_class).or_default();
            names.extend(object.attributes.iter().map(|a| a.name.clone()));
        }
        Schema {
            object_classes: classes
                .into_iter()
                .map(|(class, attributes)| ObjectClassInfo {
                    name: class.name().to_string(),
                    attributes: attributes.into_iter().collect(),
                })
                .collect(),
        }
    }

    fn run_script(&self, script: &ScriptContext, on_resource: bool) -> ConnectorResult<Value> {
        match (script.language.as_str(), on_resource) {
            ("echo", false) => Ok(Value::String(script.text.clone())),
            ("count", true) => {
                let class = ObjectClass::new(script.text.trim());
                let count = self
                    .state
                    .read()
                    .objects
                    .keys()
                    .filter(|(c, _)| *c == class)
                    .count();
                Ok(Value::Int(i64::try_from(count).unwrap_or(i64::MAX)))
            }
            (language, _) => Err(ConnectorError::Configuration {
                message: format!("unsupported script language `{language}`"),
            }),
        }
    }

    fn latest_token(&self, class: &ObjectClass) -> Option<SyncToken> {
        self.state
            .read()
            .changes
            .iter()
            .rev()
            .find(|(c, _)| c == class)
            .map(|(_, delta)| delta.token.clone())
    }
}

fn password(attribute: &Attribute) -> ConnectorResult<GuardedString> {
    match attribute.single_value() {
        Some(Value::String(secret)) => Ok(GuardedString::new(secret.clone())),
        _ => Err(ConnectorError::InvalidAttributeValue {
            attribute: attribute.name.clone(),
            message: "expected a single string".to_string(),
        }),
    }
}

fn apply(object: &mut ConnectorObject, attribute: Attribute, mode: UpdateMode) {
    let existing = object
        .attributes
        .iter_mut()
        .find(|a| a.is(&attribute.name));
    match (mode, existing) {
        (UpdateMode::Replace, Some(current)) => current.values = attribute.values,
        (UpdateMode::Replace | UpdateMode::AddValues, None) => object.attributes.push(attribute),
        (UpdateMode::AddValues, Some(current)) => {
            for value in attribute.values {
                if !current.values.contains(&value) {
                    current.values.push(value);
                }
            }
        }
        (UpdateMode::RemoveValues, Some(current)) => {
            current.values.retain(|v| !attribute.values.contains(v));
        }
        (UpdateMode::RemoveValues, None) => {}
    }
}

fn selected(filter: Option<&Filter>, object: &ConnectorObject) -> bool {
    match filter {
        Some(filter) => ObjectMatcher::matches(filter, object),
        None => true,
    }
}

/// Keep only the requested attributes, if the caller asked for a subset.
fn project(mut object: ConnectorObject, options: &OperationOptions) -> ConnectorObject {
    if let Some(names) = options.attributes_to_get() {
        object
            .attributes
            .retain(|a| names.iter().any(|name| a.is(name)));
    }
    object
}

fn not_single(kind: OperationKind) -> ConnectorError {
    ConnectorError::Configuration {
        message: format!("`{kind}` is not a single-result operation"),
    }
}

#[async_trait]
impl SingleResultOperation for MemoryConnector {
    async fn execute(
        &self,
        request: OperationRequest,
        ctx: &CallContext,
    ) -> ConnectorResult<OperationOutput> {
        if !self.step(ctx).await {
            return Err(ConnectorError::Other(anyhow::anyhow!(
                "call {} abandoned by caller",
                ctx.call_id
            )));
        }
        let kind = request.kind();
        match request {
            OperationRequest::Schema => Ok(OperationOutput::Schema(self.schema())),
            OperationRequest::Create {
                object_class,
                attributes,
                ..
            } => self.create(object_class, attributes).map(OperationOutput::Uid),
            OperationRequest::Delete {
                object_class, uid, ..
            } => self
                .delete(object_class, uid)
                .map(|()| OperationOutput::Done),
            OperationRequest::Update {
                object_class,
                uid,
                attributes,
                mode,
                ..
            } => self
                .update(object_class, uid, attributes, mode)
                .map(OperationOutput::Uid),
            OperationRequest::Authenticate {
                object_class,
                username,
                password,
                ..
            } => self
                .authenticate(&object_class, username, &password)
                .map(OperationOutput::Uid),
            OperationRequest::ResolveUsername {
                object_class,
                username,
                ..
            } => self
                .resolve_username(&object_class, &username)
                .map(OperationOutput::Uid),
            OperationRequest::ScriptOnConnector { script, .. } => self
                .run_script(&script, false)
                .map(OperationOutput::ScriptResult),
            OperationRequest::ScriptOnResource { script, .. } => self
                .run_script(&script, true)
                .map(OperationOutput::ScriptResult),
            OperationRequest::GetObject {
                object_class,
                uid,
                options,
            } => {
                let object = self
                    .state
                    .read()
                    .objects
                    .get(&(object_class, uid.value))
                    .cloned();
                Ok(OperationOutput::Object(
                    object.map(|o| project(o, &options)),
                ))
            }
            OperationRequest::Test | OperationRequest::Validate => Ok(OperationOutput::Done),
            OperationRequest::GetLatestSyncToken { object_class } => {
                Ok(OperationOutput::SyncToken(self.latest_token(&object_class)))
            }
            OperationRequest::Search { .. } | OperationRequest::Sync { .. } => {
                Err(not_single(kind))
            }
        }
    }
}

#[async_trait]
impl StreamingOperation for MemoryConnector {
    async fn execute(
        &self,
        request: OperationRequest,
        results: &mut ResultSink,
        ctx: &CallContext,
    ) -> ConnectorResult<()> {
        let items: Vec<StreamItem> = match request {
            OperationRequest::Search {
                object_class,
                filter,
                options,
            } => self
                .state
                .read()
                .objects
                .values()
                .filter(|o| o.object_class == object_class && selected(filter.as_ref(), o))
                .map(|o| StreamItem::Object(project(o.clone(), &options)))
                .collect(),
            OperationRequest::Sync {
                object_class,
                token,
                ..
            } => {
                let after = match token {
                    None => 0,
                    Some(SyncToken(Value::Int(n))) => n,
                    Some(SyncToken(other)) => {
                        return Err(ConnectorError::InvalidAttributeValue {
                            attribute: "token".to_string(),
                            message: format!("expected an integer token, got {other}"),
                        })
                    }
                };
                self.state
                    .read()
                    .changes
                    .iter()
                    .filter(|(class, delta)| {
                        *class == object_class
                            && matches!(delta.token, SyncToken(Value::Int(n)) if n > after)
                    })
                    .map(|(_, delta)| StreamItem::Delta(delta.clone()))
                    .collect()
            }
            other => {
                return Err(ConnectorError::Configuration {
                    message: format!("`{}` is not a streaming operation", other.kind()),
                })
            }
        };

        for item in items {
            if !self.step(ctx).await || !results.push(item).await {
                tracing::debug!(call_id = ctx.call_id, "memory connector stopped producing");
                break;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
