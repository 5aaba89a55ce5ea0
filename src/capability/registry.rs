use super::CapabilityError;
use crate::shared::ids::validate_identifier_value;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

pub type HandlerFn =
    Box<dyn Fn(&Map<String, Value>) -> Result<Value, CapabilityError> + Send + Sync>;

/// A capability's argument contract. Fixed handlers only ever see the keys
/// they declare; open handlers receive the caller's map untouched.
pub enum Handler {
    Fixed {
        params: &'static [&'static str],
        call: HandlerFn,
    },
    Open(HandlerFn),
}

impl Handler {
    pub fn fixed<F>(params: &'static [&'static str], call: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Value, CapabilityError> + Send + Sync + 'static,
    {
        Handler::Fixed {
            params,
            call: Box::new(call),
        }
    }

    pub fn open<F>(call: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Value, CapabilityError> + Send + Sync + 'static,
    {
        Handler::Open(Box::new(call))
    }

    fn invoke(&self, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        match self {
            Handler::Fixed { params, call } => {
                let filtered = params
                    .iter()
                    .filter_map(|key| args.get(*key).map(|value| (key.to_string(), value.clone())))
                    .collect::<Map<String, Value>>();
                call(&filtered)
            }
            Handler::Open(call) => call(args),
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Fixed { params, .. } => f.debug_struct("Fixed").field("params", params).finish(),
            Handler::Open(_) => f.write_str("Open"),
        }
    }
}

#[derive(Debug)]
pub struct CapabilityEntry {
    pub name: String,
    pub description: String,
    handler: Handler,
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: BTreeMap<String, CapabilityEntry>,
}

impl RegistryBuilder {
    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        handler: Handler,
    ) -> Result<&mut Self, CapabilityError> {
        validate_identifier_value("capability", name).map_err(|reason| {
            CapabilityError::InvalidName {
                name: name.to_string(),
                reason,
            }
        })?;
        if self.entries.contains_key(name) {
            return Err(CapabilityError::DuplicateCapability {
                name: name.to_string(),
            });
        }
        self.entries.insert(
            name.to_string(),
            CapabilityEntry {
                name: name.to_string(),
                description: description.to_string(),
                handler,
            },
        );
        Ok(self)
    }

    pub fn build(self) -> CapabilityRegistry {
        CapabilityRegistry {
            entries: self.entries,
        }
    }
}

/// Name to handler table. Frozen once built; each worker owns its own.
#[derive(Debug)]
pub struct CapabilityRegistry {
    entries: BTreeMap<String, CapabilityEntry>,
}

impl CapabilityRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn invoke(&self, name: &str, args: &Map<String, Value>) -> Result<Value, CapabilityError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| CapabilityError::Unregistered {
                name: name.to_string(),
            })?;
        entry.handler.invoke(args)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn describe(&self) -> Map<String, Value> {
        self.entries
            .values()
            .map(|entry| {
                (
                    entry.name.clone(),
                    Value::Object(Map::from_iter([(
                        "description".to_string(),
                        Value::String(entry.description.clone()),
                    )])),
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
