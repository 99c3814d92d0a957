//! Config groups and ordered config lists

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::input::{InputValue, MInput};
use crate::error::{FerryError, Result};
use crate::validation::ConfigValidator;

/// A named, ordered group of inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MConfig {
    pub name: String,
    pub inputs: Vec<MInput>,
    pub validators: Vec<ConfigValidator>,
}

impl MConfig {
    pub fn new(name: impl Into<String>, inputs: Vec<MInput>) -> Self {
        Self {
            name: name.into(),
            inputs,
            validators: Vec::new(),
        }
    }

    pub fn validator(mut self, validator: ConfigValidator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn input(&self, name: &str) -> Option<&MInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn input_mut(&mut self, name: &str) -> Option<&mut MInput> {
        self.inputs.iter_mut().find(|i| i.name == name)
    }

    pub fn clone_schema(&self) -> Self {
        Self {
            name: self.name.clone(),
            inputs: self.inputs.iter().map(MInput::clone_schema).collect(),
            validators: self.validators.clone(),
        }
    }
}

/// Split `"config.input"` into its two halves
fn split_name(full_name: &str) -> Result<(&str, &str)> {
    match full_name.split_once('.') {
        Some((config, input)) if !config.is_empty() && !input.is_empty() => Ok((config, input)),
        _ => Err(FerryError::InvalidInputName(full_name.to_string())),
    }
}

/// An ordered list of config groups; the unit that links and jobs store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MConfigList {
    pub configs: Vec<MConfig>,
}

impl MConfigList {
    pub fn new(configs: Vec<MConfig>) -> Self {
        Self { configs }
    }

    pub fn config(&self, name: &str) -> Option<&MConfig> {
        self.configs.iter().find(|c| c.name == name)
    }

    pub fn config_mut(&mut self, name: &str) -> Option<&mut MConfig> {
        self.configs.iter_mut().find(|c| c.name == name)
    }

    /// Look up an input by its `"config.input"` name
    pub fn input(&self, full_name: &str) -> Result<&MInput> {
        let (config, input) = split_name(full_name)?;
        self.config(config)
            .ok_or_else(|| FerryError::ConfigNotFound(config.to_string()))?
            .input(input)
            .ok_or_else(|| FerryError::InputNotFound(full_name.to_string()))
    }

    pub fn input_mut(&mut self, full_name: &str) -> Result<&mut MInput> {
        let (config, input) = split_name(full_name)?;
        self.config_mut(config)
            .ok_or_else(|| FerryError::ConfigNotFound(config.to_string()))?
            .input_mut(input)
            .ok_or_else(|| FerryError::InputNotFound(full_name.to_string()))
    }

    pub fn value(&self, full_name: &str) -> Option<&InputValue> {
        self.input(full_name).ok().and_then(|i| i.value.as_ref())
    }

    pub fn set_value(&mut self, full_name: &str, value: InputValue) -> Result<()> {
        self.input_mut(full_name)?.set_value(value)
    }

    pub fn set_from_str(&mut self, full_name: &str, raw: &str) -> Result<()> {
        self.input_mut(full_name)?.set_from_str(raw)
    }

    pub fn string_value(&self, full_name: &str) -> Option<&str> {
        self.value(full_name).and_then(InputValue::as_str)
    }

    pub fn bool_value(&self, full_name: &str) -> Option<bool> {
        match self.value(full_name) {
            Some(InputValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn integer_value(&self, full_name: &str) -> Option<i32> {
        match self.value(full_name) {
            Some(InputValue::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    /// Same configs and inputs, every value cleared
    pub fn clone_schema(&self) -> Self {
        Self {
            configs: self.configs.iter().map(MConfig::clone_schema).collect(),
        }
    }

    pub fn clear_values(&mut self) {
        for input in self.configs.iter_mut().flat_map(|c| c.inputs.iter_mut()) {
            input.value = None;
        }
    }

    /// Copy every value from `original` whose config name, input name and
    /// input type still exist here. Values that no longer fit are dropped.
    ///
    /// Returns the number of inputs that received a value.
    pub fn copy_matching_from(&mut self, original: &MConfigList) -> usize {
        let mut copied = 0;
        for config in &mut self.configs {
            let Some(source) = original.config(&config.name) else {
                debug!(config = %config.name, "No source config, leaving inputs unset");
                continue;
            };
            for input in &mut config.inputs {
                let Some(value) = source
                    .input(&input.name)
                    .filter(|old| old.input_type == input.input_type)
                    .and_then(|old| old.value.clone())
                else {
                    continue;
                };
                match input.set_value(value) {
                    Ok(()) => copied += 1,
                    Err(e) => debug!(
                        config = %config.name,
                        input = %input.name,
                        error = %e,
                        "Dropping value that no longer fits"
                    ),
                }
            }
        }
        copied
    }
}
