//! Message type definitions

use crate::batch::BatchConfiguration;
use crate::community::Community;
use crate::error::DefinitionError;
use crate::instance::MessageInstance;
use crate::suspension::Verdict;
use murmur_core::{CommunityId, PolicySet, Resolution};
use std::fmt;
use std::sync::Arc;

/// Decides whether a message is accepted, dropped or delayed.
pub type ValidateFn = Arc<dyn Fn(&MessageInstance) -> Verdict + Send + Sync>;

/// Applies a batch of accepted messages.
pub type ApplyFn = Arc<dyn Fn(&[MessageInstance]) + Send + Sync>;

/// Reverts a previously applied message.
pub type UndoFn = Arc<dyn Fn(&MessageInstance) + Send + Sync>;

/// Callbacks a definition runs on its messages.
#[derive(Clone)]
pub struct MessageCallbacks {
    validate: ValidateFn,
    apply: ApplyFn,
    undo: Option<UndoFn>,
}

impl MessageCallbacks {
    /// Validate and apply callbacks, no undo.
    pub fn new<V, A>(validate: V, apply: A) -> Self
    where
        V: Fn(&MessageInstance) -> Verdict + Send + Sync + 'static,
        A: Fn(&[MessageInstance]) + Send + Sync + 'static,
    {
        Self {
            validate: Arc::new(validate),
            apply: Arc::new(apply),
            undo: None,
        }
    }

    /// Add an undo callback.
    pub fn with_undo<U>(mut self, undo: U) -> Self
    where
        U: Fn(&MessageInstance) + Send + Sync + 'static,
    {
        self.undo = Some(Arc::new(undo));
        self
    }
}

/// A message type: name, policies, callbacks and batching.
///
/// Two definitions are the same type iff they share community and name.
pub struct MessageDefinition {
    community: CommunityId,
    name: String,
    policies: PolicySet,
    callbacks: MessageCallbacks,
    batch: BatchConfiguration,
    database_id: u32,
}

impl MessageDefinition {
    /// Validate the policy combination, resolve the database id and register
    /// the definition with `community`.
    ///
    /// The database id is inserted into the store only the first time a name
    /// is defined in a community; later definitions reuse the cached id.
    pub fn new(
        community: &Community,
        name: impl Into<String>,
        policies: PolicySet,
        callbacks: MessageCallbacks,
        batch: Option<BatchConfiguration>,
    ) -> Result<Arc<Self>, DefinitionError> {
        let name = name.into();

        policies
            .validate()
            .map_err(|violation| DefinitionError::PolicyViolation {
                name: name.clone(),
                violation,
            })?;

        if policies.resolution == Resolution::Dynamic && callbacks.undo.is_none() {
            return Err(DefinitionError::MissingUndoCallback { name });
        }

        let batch = batch.unwrap_or_default();
        batch.validate()?;

        let database_id = community
            .meta_message_id(&name)
            .map_err(|source| DefinitionError::Store {
                name: name.clone(),
                source,
            })?;

        let definition = Arc::new(Self {
            community: community.id(),
            name,
            policies,
            callbacks,
            batch,
            database_id,
        });
        community.register_definition(definition.clone());
        tracing::debug!(
            definition = %definition.name,
            policies = %definition.policies,
            database_id,
            "Defined message type"
        );
        Ok(definition)
    }

    /// Community this type belongs to.
    pub fn community(&self) -> CommunityId {
        self.community
    }

    /// Type name, unique within the community.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Chosen policies.
    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    /// Batching parameters.
    pub fn batch(&self) -> &BatchConfiguration {
        &self.batch
    }

    /// Persistence id of this type.
    pub fn database_id(&self) -> u32 {
        self.database_id
    }

    /// Run the validate callback.
    pub fn validate(&self, message: &MessageInstance) -> Verdict {
        (self.callbacks.validate)(message)
    }

    /// Run the apply callback on a batch.
    pub fn apply(&self, messages: &[MessageInstance]) {
        (self.callbacks.apply)(messages);
    }

    /// Run the undo callback; `false` if the type has none.
    pub fn undo(&self, message: &MessageInstance) -> bool {
        match &self.callbacks.undo {
            Some(undo) => {
                undo(message);
                true
            }
            None => false,
        }
    }

    /// Whether an undo callback is present.
    pub fn has_undo(&self) -> bool {
        self.callbacks.undo.is_some()
    }
}

impl PartialEq for MessageDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.community == other.community && self.name == other.name
    }
}

impl Eq for MessageDefinition {}

impl fmt::Debug for MessageDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDefinition")
            .field("name", &self.name)
            .field("policies", &self.policies)
            .field("database_id", &self.database_id)
            .finish_non_exhaustive()
    }
}
