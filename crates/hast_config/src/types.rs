//! Configuration types deserialized from the hardware generation TOML.

use hast_vhdl::VhdlGenerationOptions;
use serde::{Deserialize, Serialize};

/// The top-level hardware generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareGenerationConfig {
    /// Name of the target device profile.
    pub device_name: String,
    /// Full names of the members exposed to the host. When empty, every
    /// interface member of the syntax tree is exposed.
    #[serde(default)]
    pub hardware_entry_point_members: Vec<String>,
    /// Generate the SimpleMemory bus and its arbitration proxy.
    #[serde(default = "default_use_simple_memory")]
    pub use_simple_memory: bool,
    /// Transformer settings.
    #[serde(default)]
    pub transformer: TransformerConfig,
    /// VHDL rendering options.
    #[serde(default)]
    pub vhdl: VhdlGenerationOptions,
}

fn default_use_simple_memory() -> bool {
    true
}

impl HardwareGenerationConfig {
    /// A configuration for `device_name` with default settings.
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            hardware_entry_point_members: Vec::new(),
            use_simple_memory: default_use_simple_memory(),
            transformer: TransformerConfig::default(),
            vhdl: VhdlGenerationOptions::default(),
        }
    }
}

/// Settings of the member transformation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformerConfig {
    /// Per-prefix instance count overrides.
    #[serde(default)]
    pub member_invocation_instance_counts: Vec<MemberInvocationInstanceCountConfiguration>,
}

impl TransformerConfig {
    /// The configuration whose prefix is the longest match for `member_name`,
    /// or the default (no recursion, no parallelism) when nothing matches.
    pub fn instance_count_configuration_for(
        &self,
        member_name: &str,
    ) -> MemberInvocationInstanceCountConfiguration {
        self.member_invocation_instance_counts
            .iter()
            .filter(|configuration| member_name.starts_with(&configuration.member_name_prefix))
            .max_by_key(|configuration| configuration.member_name_prefix.len())
            .cloned()
            .unwrap_or_else(|| MemberInvocationInstanceCountConfiguration::new(member_name))
    }

    /// Adds a configuration, replacing one with the same prefix.
    pub fn add_or_replace(&mut self, configuration: MemberInvocationInstanceCountConfiguration) {
        self.member_invocation_instance_counts
            .retain(|existing| existing.member_name_prefix != configuration.member_name_prefix);
        self.member_invocation_instance_counts.push(configuration);
    }
}

/// How many concurrently running copies of a member's hardware are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInvocationInstanceCountConfiguration {
    /// Members whose full name starts with this prefix are affected.
    pub member_name_prefix: String,
    /// How many invocations may run side by side.
    #[serde(default = "default_max_degree_of_parallelism")]
    pub max_degree_of_parallelism: u32,
    /// How deep the member may call itself.
    #[serde(default)]
    pub max_recursion_depth: u32,
}

fn default_max_degree_of_parallelism() -> u32 {
    1
}

impl MemberInvocationInstanceCountConfiguration {
    /// Default configuration for `member_name_prefix`: one instance.
    pub fn new(member_name_prefix: impl Into<String>) -> Self {
        Self {
            member_name_prefix: member_name_prefix.into(),
            max_degree_of_parallelism: default_max_degree_of_parallelism(),
            max_recursion_depth: 0,
        }
    }

    /// Sets the degree of parallelism.
    pub fn with_max_degree_of_parallelism(mut self, value: u32) -> Self {
        self.max_degree_of_parallelism = value;
        self
    }

    /// Sets the recursion depth.
    pub fn with_max_recursion_depth(mut self, value: u32) -> Self {
        self.max_recursion_depth = value;
        self
    }

    /// `max_recursion_depth + max_degree_of_parallelism`.
    pub fn max_invocation_instance_count(&self) -> u32 {
        self.max_recursion_depth
            .saturating_add(self.max_degree_of_parallelism)
    }
}
