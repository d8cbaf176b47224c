use std::collections::HashMap;
use std::rc::Rc;

use crate::error::Error;
use crate::image::BuildResource;

/// Deduplicating map from normalized resource name to a resolved
/// [`BuildResource`]. One registry is shared across every workflow of a CLI
/// invocation so that actions in different workflows referencing the same
/// upstream source share one set of generated resources.
///
/// Iteration follows first-registration order, which keeps generated output
/// stable across runs.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: HashMap<String, Rc<BuildResource>>,
    order: Vec<String>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the resource registered under `name`, or invoke `factory`
    /// exactly once, register its result, and return it.
    pub fn get_or_create<F>(&mut self, name: &str, factory: F) -> Result<Rc<BuildResource>, Error>
    where
        F: FnOnce() -> Result<BuildResource, Error>,
    {
        if let Some(existing) = self.resources.get(name) {
            return Ok(Rc::clone(existing));
        }

        let resource = Rc::new(factory()?);
        self.resources.insert(name.to_string(), Rc::clone(&resource));
        self.order.push(name.to_string());
        Ok(resource)
    }

    pub fn get(&self, name: &str) -> Option<&Rc<BuildResource>> {
        self.resources.get(name)
    }

    /// Registered resources in first-registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<BuildResource>> {
        self.order.iter().map(|name| &self.resources[name])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
