//! Schema composer.
//!
//! Fragments are registered in order and merged pairwise, later
//! registrations winning conflicts. Composition works over a snapshot of
//! the registry: the returned schema is an owned value and later
//! registrations never touch it.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{CompositionError, LoaderError};
use crate::fragment::SchemaFragment;
use crate::merge::merge_body;
use crate::schema::UnifiedFormSchema;

/// Source of fragment documents, injected by the embedding application.
///
/// The composer imposes no timeout or retry policy; whatever the loader
/// reports is propagated unchanged.
#[async_trait]
pub trait FragmentLoader: Send + Sync {
    async fn load(&self, id: &str) -> Result<Value, LoaderError>;
}

#[async_trait]
impl<F, Fut> FragmentLoader for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, LoaderError>> + Send + 'static,
{
    async fn load(&self, id: &str) -> Result<Value, LoaderError> {
        (self)(id.to_string()).await
    }
}

/// Ordered, append-only fragment registry.
#[derive(Debug, Clone, Default)]
pub struct Composer {
    fragments: Vec<Arc<SchemaFragment>>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Registering a fragment identical to one already
    /// registered is a no-op and returns `false`.
    pub fn register(&mut self, fragment: SchemaFragment) -> bool {
        if self.contains(&fragment) {
            debug!(fragment = fragment.id(), "identical fragment already registered");
            return false;
        }
        debug!(
            fragment = fragment.id(),
            version = fragment.version(),
            position = self.fragments.len(),
            "registered fragment"
        );
        self.fragments.push(Arc::new(fragment));
        true
    }

    /// Parse and register a fragment document.
    pub fn register_json(&mut self, value: Value) -> Result<bool, CompositionError> {
        let fragment = SchemaFragment::from_json(value)?;
        Ok(self.register(fragment))
    }

    pub fn fragments(&self) -> &[Arc<SchemaFragment>] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Compose every registered fragment.
    pub fn compose(&self) -> Result<UnifiedFormSchema, CompositionError> {
        compose_fragments(self.fragments.iter().map(Arc::as_ref))
    }

    /// Merge every registered fragment without validating the result.
    pub fn merge(&self) -> Result<UnifiedFormSchema, CompositionError> {
        merge_fragments(self.fragments.iter().map(Arc::as_ref))
    }

    /// Compose the registered fragments followed by `extra`, without
    /// registering it.
    pub fn compose_with(&self, extra: &SchemaFragment) -> Result<UnifiedFormSchema, CompositionError> {
        let skip_extra = self.contains(extra);
        compose_fragments(
            self.fragments
                .iter()
                .map(Arc::as_ref)
                .chain((!skip_extra).then_some(extra)),
        )
    }

    /// Fetch a fragment through `loader`, register it and return the
    /// resulting unified schema.
    ///
    /// Nothing is registered unless loading, parsing and composition all
    /// succeed.
    pub async fn load_schema<L>(
        &mut self,
        id: &str,
        loader: &L,
    ) -> Result<UnifiedFormSchema, CompositionError>
    where
        L: FragmentLoader + ?Sized,
    {
        let document = loader
            .load(id)
            .await
            .map_err(|source| CompositionError::Loader {
                id: id.to_string(),
                source,
            })?;
        let fragment = SchemaFragment::from_json(document)?;
        let schema = self.compose_with(&fragment)?;
        self.register(fragment);
        Ok(schema)
    }

    fn contains(&self, fragment: &SchemaFragment) -> bool {
        self.fragments
            .iter()
            .any(|f| f.fingerprint() == fragment.fingerprint())
    }
}

/// Merge fragments in iteration order into one validated schema.
///
/// A fragment identical to one already merged is skipped, so repeating a
/// fragment never lets its values win a second time.
pub fn compose_fragments<'a, I>(fragments: I) -> Result<UnifiedFormSchema, CompositionError>
where
    I: IntoIterator<Item = &'a SchemaFragment>,
{
    let (schema, count) = merge_counted(fragments)?;
    schema.validate()?;

    info!(
        schema = %schema.id,
        version = %schema.version,
        fragments = count,
        steps = schema.steps.len(),
        transitions = schema.transitions.len(),
        "composed schema"
    );
    Ok(schema)
}

/// Merge fragments without checking the structural invariants of the
/// result. Linters use this to inspect schemas `compose_fragments` rejects.
pub fn merge_fragments<'a, I>(fragments: I) -> Result<UnifiedFormSchema, CompositionError>
where
    I: IntoIterator<Item = &'a SchemaFragment>,
{
    merge_counted(fragments).map(|(schema, _)| schema)
}

fn merge_counted<'a, I>(fragments: I) -> Result<(UnifiedFormSchema, usize), CompositionError>
where
    I: IntoIterator<Item = &'a SchemaFragment>,
{
    let mut acc = Map::new();
    let mut count = 0usize;
    let mut seen = HashSet::new();
    for fragment in fragments {
        if !seen.insert(fragment.fingerprint()) {
            debug!(fragment = fragment.id(), "skipping repeated fragment");
            continue;
        }
        acc = merge_body(acc, fragment.body(), fragment.directives(), fragment.id())?;
        count += 1;
    }
    if count == 0 {
        return Err(CompositionError::Empty);
    }

    let schema = serde_json::from_value(Value::Object(acc)).map_err(|e| {
        CompositionError::InvalidFragment {
            message: format!("merged document does not form a schema: {}", e),
        }
    })?;
    Ok((schema, count))
}
