//! Assembly of the complete hardware design.
//!
//! [`ManifestBuilder::build`] runs the whole pipeline: verification, entry
//! point selection, member IDs, instance-count propagation, member
//! transformation and proxy wiring. It either returns a complete manifest
//! or fails; nothing is emitted halfway.

use crate::call_graph::CallGraph;
use crate::error::TransformError;
use crate::external_proxy::build_external_invocation_proxy;
use crate::internal_proxy::build_internal_invocation_proxies;
use crate::member_id_table::MemberIdTable;
use crate::member_transformer::{
    MemberTransformer, MemberTransformerContext, StateMachineMemberTransformer, TransformedMember,
};
use crate::memory_proxy::build_memory_proxy;
use crate::naming;
use crate::tree::{Member, SyntaxTree};
use crate::verification::verify;
use hast_config::{validate_config, HardwareGenerationConfig};
use hast_device::DeviceDriver;
use hast_vhdl::{
    DataObjectReference, DataType, Declaration, Module, Port, PortMode, Render, Statement,
    VhdlGenerationOptions, VhdlManifest,
};
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Name of the generated top-level entity.
pub const TOP_ENTITY_NAME: &str = "Hast_IP";

/// A finished design together with what the host needs to drive it.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedVhdlManifest {
    /// The generated VHDL.
    pub manifest: VhdlManifest,
    /// IDs the host selects entry points by.
    pub member_id_table: MemberIdTable,
    /// Full names of the entry points, sorted.
    pub hardware_entry_point_members: Vec<String>,
    /// Non-fatal problems, such as recursion deeper than the instances built.
    pub warnings: Vec<String>,
}

impl TransformedVhdlManifest {
    /// Renders the manifest.
    pub fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        self.manifest.to_vhdl(options)
    }
}

/// Builds a [`TransformedVhdlManifest`] from a syntax tree.
pub struct ManifestBuilder<'a> {
    config: &'a HardwareGenerationConfig,
    device_driver: &'a dyn DeviceDriver,
    member_transformer: Box<dyn MemberTransformer + 'a>,
}

impl<'a> ManifestBuilder<'a> {
    /// A builder using [`StateMachineMemberTransformer`].
    pub fn new(config: &'a HardwareGenerationConfig, device_driver: &'a dyn DeviceDriver) -> Self {
        Self {
            config,
            device_driver,
            member_transformer: Box::new(StateMachineMemberTransformer),
        }
    }

    /// Replaces the member transformer.
    pub fn with_member_transformer(mut self, transformer: impl MemberTransformer + 'a) -> Self {
        self.member_transformer = Box::new(transformer);
        self
    }

    /// Runs the pipeline on `tree`.
    pub fn build(&self, tree: &SyntaxTree) -> Result<TransformedVhdlManifest, TransformError> {
        validate_config(self.config)?;
        info!(
            device = %self.device_driver.manifest().name,
            members = tree.members.len(),
            "verifying syntax tree"
        );
        verify(tree)?;

        let entry_points = self.entry_points(tree)?;
        let member_id_table = MemberIdTable::build(entry_points.iter().copied())?;
        let entry_point_names: Vec<String> = entry_points
            .iter()
            .map(|member| member.full_name.clone())
            .collect();
        let entry_point_set: BTreeSet<String> = entry_point_names.iter().cloned().collect();

        let call_graph = CallGraph::from_tree(tree);
        let counts = call_graph.propagate_instance_counts(&self.config.transformer, &entry_point_set);
        let reachable = call_graph.reachable_from(entry_point_names.iter().map(String::as_str));
        let mut jobs: Vec<(&Member, u32)> = Vec::new();
        for name in &reachable {
            let member = tree
                .member(name)
                .ok_or_else(|| TransformError::UnknownMember(name.clone()))?;
            jobs.extend((0..counts.count(name)).map(|instance| (member, instance)));
        }

        info!(
            entry_points = entry_point_names.len(),
            members = reachable.len(),
            instances = jobs.len(),
            "transforming members"
        );
        let context = MemberTransformerContext::new(tree, self.device_driver, self.config.use_simple_memory);
        let transformer = self.member_transformer.as_ref();
        let mut members = jobs
            .par_iter()
            .map(|(member, instance)| transformer.transform(&context, member, *instance))
            .collect::<Result<Vec<TransformedMember>, TransformError>>()?;
        members.sort_by(|a, b| (&a.member_name, a.instance).cmp(&(&b.member_name, b.instance)));

        let mut module = Module::new(TOP_ENTITY_NAME);
        self.add_ports(&mut module);
        let architecture = &mut module.architecture;
        architecture.declarations.push(Declaration::LineComment(
            "Generated hardware: one state machine per member instance, wired together by invocation proxies."
                .to_string(),
        ));
        architecture.declarations.push(Declaration::LineComment("Type declarations".to_string()));
        let used_types = jobs.iter().flat_map(|(member, _)| member.declared_types());
        architecture.declarations.extend(
            context
                .types
                .type_declarations(used_types)?
                .into_iter()
                .map(Declaration::Type),
        );

        for member in &members {
            architecture
                .declarations
                .push(Declaration::LineComment(format!("{} declarations", member.component.name)));
            architecture.declarations.extend(member.result.declarations.iter().cloned());
            architecture.body.push(Statement::Process(member.result.body.clone()));
        }

        info!("building invocation proxies");
        architecture.body.push(Statement::Process(build_external_invocation_proxy(
            &entry_point_names,
            &member_id_table,
        )?));
        let internal = build_internal_invocation_proxies(tree, &members, &counts)?;
        debug!(proxies = internal.processes.len(), "built internal invocation proxies");
        architecture
            .body
            .extend(internal.processes.into_iter().map(Statement::Process));

        if self.config.use_simple_memory {
            info!("building SimpleMemory proxy");
            let components: Vec<_> = members.iter().map(|member| &member.component).collect();
            architecture.body.extend(build_memory_proxy(&components));
        }

        for statement in &mut architecture.body {
            if let Statement::Process(process) = statement {
                process.add_to_sensitivity_list(DataObjectReference::signal(naming::CLOCK));
            }
        }

        info!(
            processes = architecture.body.len(),
            warnings = internal.warnings.len(),
            "hardware manifest built"
        );
        Ok(TransformedVhdlManifest {
            manifest: VhdlManifest {
                top_module: module,
                modules: Vec::new(),
            },
            member_id_table,
            hardware_entry_point_members: entry_point_names,
            warnings: internal.warnings,
        })
    }

    /// The configured entry points, or every interface member when none
    /// are configured, sorted by name.
    fn entry_points<'t>(&self, tree: &'t SyntaxTree) -> Result<Vec<&'t Member>, TransformError> {
        let mut entry_points = if self.config.hardware_entry_point_members.is_empty() {
            tree.interface_members().collect::<Vec<_>>()
        } else {
            let mut selected = Vec::new();
            for name in &self.config.hardware_entry_point_members {
                let member = tree
                    .member(name)
                    .ok_or_else(|| TransformError::UnknownMember(name.clone()))?;
                if let Some(parameter) = member.parameters.first() {
                    return Err(TransformError::unsupported(
                        &member.full_name,
                        format!("parameter '{}' on a hardware entry point", parameter.name),
                    ));
                }
                selected.push(member);
            }
            selected
        };
        entry_points.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        entry_points.dedup_by(|a, b| a.full_name == b.full_name);
        if entry_points.is_empty() {
            return Err(TransformError::NoInterfaceMembers);
        }
        Ok(entry_points)
    }

    fn add_ports(&self, module: &mut Module) {
        let ports = &mut module.entity.ports;
        ports.push(Port::new(naming::MEMBER_ID, PortMode::In, DataType::Integer));
        ports.push(Port::new(naming::RESET, PortMode::In, DataType::StdLogic));
        ports.push(Port::new(naming::STARTED, PortMode::In, DataType::Boolean));
        ports.push(Port::new(naming::FINISHED, PortMode::Out, DataType::Boolean));
        ports.push(Port::new(naming::CLOCK, PortMode::In, DataType::StdLogic));
        if self.config.use_simple_memory {
            let width = self.device_driver.manifest().data_bus_width_bits();
            ports.push(Port::new(naming::DATA_IN, PortMode::In, DataType::std_logic_vector(width)));
            ports.push(Port::new(naming::DATA_OUT, PortMode::Out, DataType::std_logic_vector(width)));
            ports.push(Port::new(naming::CELL_INDEX, PortMode::Out, DataType::Integer));
            ports.push(Port::new(naming::READ_ENABLE, PortMode::Out, DataType::Boolean));
            ports.push(Port::new(naming::WRITE_ENABLE, PortMode::Out, DataType::Boolean));
            ports.push(Port::new(naming::READS_DONE, PortMode::In, DataType::Boolean));
            ports.push(Port::new(naming::WRITES_DONE, PortMode::In, DataType::Boolean));
        }
    }
}
