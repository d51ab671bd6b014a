//! Processor registry.
//!
//! Maps a processor type name from the configuration to a factory closure
//! producing a constructed trait object. Registration happens once at
//! startup with the builtin set; a missing required option (e.g. a detector
//! processor without `detector-mapping-file`) fails construction, which is
//! startup-fatal.

use super::command::CommandProcessor;
use super::detector::DetectorProcessor;
use super::general::GeneralProcessor;
use super::histogram::HistogramProcessor;
use super::odb::OdbProcessor;
use super::Processor;
use crate::command::CommandRunner;
use crate::config::ProcessorSettings;
use crate::detector::DetectorMap;
use crate::error::{AppResult, RelayError};
use crate::histogram::SharedHistogramStore;
use crate::odb::FileOdbSource;
use std::collections::HashMap;
use std::time::Duration;

/// Shared construction context handed to every factory.
pub struct RegistryContext {
    /// Verbosity level from `general-settings`.
    pub verbose: u8,
    /// Session histogram store.
    pub histograms: SharedHistogramStore,
}

type Factory = Box<dyn Fn(&ProcessorSettings, &RegistryContext) -> AppResult<Box<dyn Processor>>>;

/// Registry mapping processor type names to factories.
pub struct ProcessorRegistry {
    factories: HashMap<String, Factory>,
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

fn required_command(settings: &ProcessorSettings) -> AppResult<CommandRunner> {
    let entry = settings.command.as_ref().ok_or_else(|| {
        RelayError::Configuration(format!(
            "processor type '{}' requires a 'command' entry",
            settings.r#type
        ))
    })?;
    Ok(CommandRunner::from_settings(entry))
}

impl ProcessorRegistry {
    /// Create a registry with the builtin processor set registered.
    pub fn with_builtin() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };

        registry.register("general", |settings, ctx| {
            Ok(Box::new(GeneralProcessor::new(
                Duration::from_millis(settings.period_millis),
                ctx.verbose,
            )))
        });

        registry.register("command", |settings, ctx| {
            Ok(Box::new(CommandProcessor::new(
                required_command(settings)?,
                ctx.verbose,
            )))
        });

        registry.register("detector", |settings, ctx| {
            let runner = required_command(settings)?;
            let mapping_file = settings.detector_mapping_file.as_ref().ok_or_else(|| {
                RelayError::Configuration(
                    "detector processor requires 'detector-mapping-file'".into(),
                )
            })?;
            let map = DetectorMap::load(mapping_file)?;
            Ok(Box::new(DetectorProcessor::new(
                runner,
                map,
                ctx.histograms.clone(),
                ctx.verbose,
            )))
        });

        registry.register("odb", |settings, _ctx| {
            let snapshot_file = settings.odb_snapshot_file.as_ref().ok_or_else(|| {
                RelayError::Configuration("odb processor requires 'odb-snapshot-file'".into())
            })?;
            Ok(Box::new(OdbProcessor::new(
                Box::new(FileOdbSource::new(snapshot_file)),
                Duration::from_millis(settings.period_millis),
            )))
        });

        registry.register("histogram", |settings, ctx| {
            Ok(Box::new(HistogramProcessor::new(
                ctx.histograms.clone(),
                Duration::from_millis(settings.period_millis),
            )))
        });

        registry
    }

    /// Register a factory under a type name.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&ProcessorSettings, &RegistryContext) -> AppResult<Box<dyn Processor>> + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// True when a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Construct a processor from its configuration entry.
    pub fn create(
        &self,
        settings: &ProcessorSettings,
        ctx: &RegistryContext,
    ) -> AppResult<Box<dyn Processor>> {
        let factory = self.factories.get(&settings.r#type).ok_or_else(|| {
            RelayError::Configuration(format!("unknown processor type '{}'", settings.r#type))
        })?;
        factory(settings, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram;

    fn ctx() -> RegistryContext {
        RegistryContext {
            verbose: 0,
            histograms: histogram::shared_store(),
        }
    }

    fn entry(r#type: &str) -> ProcessorSettings {
        ProcessorSettings {
            r#type: r#type.into(),
            period_millis: 1000,
            detector_mapping_file: None,
            odb_snapshot_file: None,
            command: None,
        }
    }

    #[test]
    fn test_builtin_types_registered() {
        let registry = ProcessorRegistry::with_builtin();
        for name in crate::config::KNOWN_PROCESSOR_TYPES {
            assert!(registry.contains(name), "missing builtin '{}'", name);
        }
    }

    #[test]
    fn test_general_and_histogram_construct() {
        let registry = ProcessorRegistry::with_builtin();
        let ctx = ctx();
        let general = registry.create(&entry("general"), &ctx).unwrap();
        assert_eq!(general.kind(), "general");
        let hist = registry.create(&entry("histogram"), &ctx).unwrap();
        assert_eq!(hist.kind(), "histogram");
    }

    #[test]
    fn test_missing_required_option_is_startup_fatal() {
        let registry = ProcessorRegistry::with_builtin();
        let ctx = ctx();

        let err = registry.create(&entry("command"), &ctx).unwrap_err();
        assert!(matches!(err, RelayError::Configuration(_)));

        let err = registry.create(&entry("detector"), &ctx).unwrap_err();
        assert!(matches!(err, RelayError::Configuration(_)));

        let err = registry.create(&entry("odb"), &ctx).unwrap_err();
        assert!(matches!(err, RelayError::Configuration(_)));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let registry = ProcessorRegistry::with_builtin();
        let err = registry.create(&entry("waveform"), &ctx()).unwrap_err();
        assert!(matches!(err, RelayError::Configuration(_)));
    }
}
