//! Variables passed to an imported template.

use std::collections::BTreeMap;

use minijinja::value::{Value, ValueKind};
use minijinja::{Error, ErrorKind};

use crate::Engine;

/// Name under which the engine is exposed to templates.
pub const ENGINE_KEY: &str = "engine";

/// Template variable scope.
///
/// The engine is injected under [`ENGINE_KEY`] at import time unless the
/// caller already supplied that key.
#[derive(Clone, Debug, Default)]
pub struct TemplateContext {
    vars: BTreeMap<String, Value>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable, replacing any previous value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Build a context from a template map value. `none` and undefined give
    /// an empty context.
    pub(crate) fn from_value(value: Option<&Value>) -> Result<Self, Error> {
        let Some(value) = value.filter(|v| !v.is_none() && !v.is_undefined()) else {
            return Ok(Self::new());
        };
        if value.kind() != ValueKind::Map {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("import context must be a map, got {}", value.kind()),
            ));
        }

        let mut context = Self::new();
        for key in value.try_iter()? {
            let item = value.get_item(&key)?;
            match key.as_str() {
                Some(name) => context.insert(name, item),
                None => context.insert(key.to_string(), item),
            }
        }
        Ok(context)
    }

    pub(crate) fn with_engine(mut self, engine: &Engine) -> Self {
        self.vars
            .entry(ENGINE_KEY.to_owned())
            .or_insert_with(|| Value::from_object(engine.clone()));
        self
    }

    pub(crate) fn into_value(self) -> Value {
        Value::from_iter(self.vars)
    }
}
