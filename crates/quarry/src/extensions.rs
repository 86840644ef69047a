//! Named user functions callable on a selection

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::selection::Selection;

/// What an extension hands back
#[derive(Debug)]
pub enum ExtensionOutput {
    Selection(Selection),
    Value(Value),
}

pub type ExtensionFn = Rc<dyn Fn(&Selection, &[Value]) -> Result<ExtensionOutput>>;

/// Extension table owned by a [`Quarry`](crate::Quarry)
#[derive(Clone, Default)]
pub struct Registry {
    functions: FxHashMap<String, ExtensionFn>,
}

impl Registry {
    /// Register `f` under `name`, replacing any previous function of that name
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Selection, &[Value]) -> Result<ExtensionOutput> + 'static,
    {
        self.functions.insert(name.into(), Rc::new(f));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<ExtensionFn> {
        self.functions.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn invoke(&self, name: &str, selection: &Selection, args: &[Value]) -> Result<ExtensionOutput> {
        let f = self
            .functions
            .get(name)
            .ok_or_else(|| Error::UnknownExtension(name.to_string()))?;
        f(selection, args)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
