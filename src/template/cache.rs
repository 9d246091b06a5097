use super::{TemplateKey, TemplateRegistry};
use crate::error::TemplateError;
use crate::model::{Codedata, FlowNode};
use ahash::AHashMap;
use parking_lot::RwLock;

/// Memoizes successful lookups of an inner registry.
///
/// Reads take a shared lock; only a miss takes the write lock. Failures are not
/// cached, so a later catalog refresh can still satisfy them.
pub struct CachedRegistry<R> {
    inner: R,
    cache: RwLock<AHashMap<TemplateKey, FlowNode>>,
}

impl<R: TemplateRegistry> CachedRegistry<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: RwLock::new(AHashMap::new()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    pub fn invalidate(&self) {
        self.cache.write().clear();
    }
}

impl<R: TemplateRegistry> TemplateRegistry for CachedRegistry<R> {
    fn node_template(&self, codedata: &Codedata) -> Result<FlowNode, TemplateError> {
        let key = TemplateKey::from(codedata);
        if let Some(hit) = self.cache.read().get(&key) {
            return Ok(hit.clone());
        }
        let template = self.inner.node_template(codedata)?;
        tracing::debug!(template = %codedata.descriptor(), "Caching node template");
        self.cache.write().insert(key, template.clone());
        Ok(template)
    }
}
